//! Game object callbacks for orx-style engines
//!
//! miniscroll shadows engine objects with user-defined wrappers. Wrapper types
//! are bound to config section names; when the engine creates an object whose
//! section (or one of its parent sections) is bound, a wrapper is created and
//! from then on receives the object's lifecycle callbacks, always with the
//! object's config section active.

use std::any::Any;

use miniscroll_api::{Collision, Separation, ShaderParam, ShaderParamType};

pub mod bindings;
pub mod builder;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod registry;
pub mod runtime;

pub use bindings::{ClassBindings, MiniFactory};
pub use builder::{BuildError, MiniscrollBuilder};
pub use config::{
    ConfigLoadError, DispatchConfig, FailurePolicy, LoggingConfig, MiniscrollConfig,
};
pub use context::{Context, ContextGuard, MiniContext};
pub use dispatcher::{Callback, DispatchError, Dispatcher};
pub use registry::{Instance, InstanceRegistry, MiniObject};
pub use runtime::{setup, InitFn, Miniscroll, UpdateFn};

// Re-export the engine boundary so games only need this crate
pub use miniscroll_api as api;

/// Lets the registry hand wrappers back as their concrete type
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Trait that wrapper types implement
///
/// Every method has an empty default, so a wrapper only overrides what it
/// cares about. Each call runs with the object's class section (and its
/// input set, if the section declares one) active on the engine. Returning
/// an error is handled according to the dispatcher's
/// [`FailurePolicy`].
pub trait Mini: AsAny + 'static {
    /// Called once, right after the wrapper is registered
    fn on_create(&mut self, _ctx: &mut MiniContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once, after the wrapper has been removed from the registry
    fn on_delete(&mut self, _ctx: &mut MiniContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called every engine tick
    ///
    /// # Arguments
    /// * `ctx` - The object and the engine
    /// * `dt` - Seconds since the last tick, scaled by the object's clock
    fn on_update(&mut self, _ctx: &mut MiniContext<'_>, _dt: f32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the object starts touching another object
    fn on_collide(
        &mut self,
        _ctx: &mut MiniContext<'_>,
        _collision: &Collision,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the object stops touching another object
    fn on_separate(
        &mut self,
        _ctx: &mut MiniContext<'_>,
        _separation: &Separation,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a shader on the object needs a parameter value
    ///
    /// The returned value should match `param_type`. `None` leaves the
    /// parameter to the engine.
    fn on_shader_param(
        &mut self,
        _ctx: &mut MiniContext<'_>,
        _shader: &str,
        _param: &str,
        _param_type: ShaderParamType,
    ) -> anyhow::Result<Option<ShaderParam>> {
        Ok(None)
    }
}
