use miniscroll_api::{
    BodyPart, Engine, EngineCallbacks, ObjectHandle, ShaderParam, ShaderParamType, Vector,
};
use tracing::debug;

use crate::bindings::ClassBindings;
use crate::builder::MiniscrollBuilder;
use crate::dispatcher::Dispatcher;

/// Game initialization, run when the engine calls `on_init`
pub type InitFn = Box<dyn FnMut(&mut Dispatcher, &mut dyn Engine) -> anyhow::Result<()>>;

/// Per-tick game logic, run after every wrapper has been updated
pub type UpdateFn = Box<dyn FnMut(&mut Dispatcher, &mut dyn Engine, f32) -> anyhow::Result<()>>;

/// The callback table handed to the engine: the dispatcher plus the game's
/// own init and per-tick hooks.
pub struct Miniscroll {
    dispatcher: Dispatcher,
    init: Option<InitFn>,
    update: Option<UpdateFn>,
}

impl Miniscroll {
    pub fn builder() -> MiniscrollBuilder {
        MiniscrollBuilder::new()
    }

    pub(crate) fn from_parts(
        dispatcher: Dispatcher,
        init: Option<InitFn>,
        update: Option<UpdateFn>,
    ) -> Self {
        Self {
            dispatcher,
            init,
            update,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }
}

/// Wire the class bindings and the optional game hooks into a callback
/// table for the engine, using the default dispatch configuration.
pub fn setup(
    bindings: ClassBindings,
    init: Option<InitFn>,
    update: Option<UpdateFn>,
) -> Miniscroll {
    debug!(
        target: "miniscroll",
        "Setting up callbacks (init: {}, update: {})",
        init.is_some(),
        update.is_some()
    );
    Miniscroll::from_parts(Dispatcher::new(bindings), init, update)
}

impl EngineCallbacks for Miniscroll {
    fn on_init(&mut self, engine: &mut dyn Engine) -> anyhow::Result<()> {
        match self.init.as_mut() {
            Some(init) => init(&mut self.dispatcher, engine),
            None => Ok(()),
        }
    }

    fn on_update(&mut self, engine: &mut dyn Engine, dt: f32) -> anyhow::Result<()> {
        self.dispatcher.handle_update(engine, dt)?;
        if let Some(update) = self.update.as_mut() {
            update(&mut self.dispatcher, engine, dt)?;
        }
        Ok(())
    }

    fn on_create(&mut self, engine: &mut dyn Engine, object: ObjectHandle) -> anyhow::Result<()> {
        Ok(self.dispatcher.handle_create(engine, object)?)
    }

    fn on_delete(&mut self, engine: &mut dyn Engine, object: ObjectHandle) -> anyhow::Result<()> {
        Ok(self.dispatcher.handle_delete(engine, object)?)
    }

    fn on_collide(
        &mut self,
        engine: &mut dyn Engine,
        first: &BodyPart,
        second: &BodyPart,
        position: Vector,
        normal: Vector,
    ) -> anyhow::Result<()> {
        Ok(self
            .dispatcher
            .handle_collide(engine, first, second, position, normal)?)
    }

    fn on_separate(
        &mut self,
        engine: &mut dyn Engine,
        first: &BodyPart,
        second: &BodyPart,
    ) -> anyhow::Result<()> {
        Ok(self.dispatcher.handle_separate(engine, first, second)?)
    }

    fn on_shader_param(
        &mut self,
        engine: &mut dyn Engine,
        object: ObjectHandle,
        shader: &str,
        param: &str,
        param_type: ShaderParamType,
    ) -> anyhow::Result<Option<ShaderParam>> {
        Ok(self
            .dispatcher
            .handle_shader_param(engine, object, shader, param, param_type)?)
    }
}
