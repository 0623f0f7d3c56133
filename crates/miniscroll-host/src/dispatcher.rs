use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use miniscroll_api::{
    BodyPart, Collision, Engine, Guid, ObjectHandle, Separation, ShaderParam, ShaderParamType,
    Vector,
};
use tracing::{debug, error, trace, warn};

use crate::bindings::ClassBindings;
use crate::config::{DispatchConfig, FailurePolicy};
use crate::context::{Context, ContextGuard, MiniContext};
use crate::registry::{Instance, InstanceRegistry, MiniObject};
use crate::Mini;

/// Wrapper callback names, as used in logs and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Create,
    Delete,
    Update,
    Collide,
    Separate,
    ShaderParam,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Callback::Create => "on_create",
            Callback::Delete => "on_delete",
            Callback::Update => "on_update",
            Callback::Collide => "on_collide",
            Callback::Separate => "on_separate",
            Callback::ShaderParam => "on_shader_param",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{callback} failed for {object} ({class})")]
    Callback {
        callback: Callback,
        object: ObjectHandle,
        class: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Keeps the wrapper instances for bound engine objects and routes engine
/// notifications to them.
///
/// Every wrapper callback runs with the object's class section (and input
/// set, if it has one) active on the engine.
pub struct Dispatcher {
    bindings: ClassBindings,
    registry: InstanceRegistry,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(bindings: ClassBindings) -> Self {
        Self::with_config(bindings, DispatchConfig::default())
    }

    pub fn with_config(bindings: ClassBindings, config: DispatchConfig) -> Self {
        debug!(
            target: "miniscroll",
            "Dispatcher created with {} class binding(s): {:?}",
            bindings.len(),
            bindings.names()
        );
        Self {
            bindings,
            registry: InstanceRegistry::new(),
            config,
        }
    }

    pub fn bindings(&self) -> &ClassBindings {
        &self.bindings
    }

    /// Swap in a new binding table, returning the old one.
    ///
    /// Existing instances are kept; only objects created afterwards are
    /// resolved against the new table.
    pub fn replace_bindings(&mut self, bindings: ClassBindings) -> ClassBindings {
        debug!(target: "miniscroll", "Replacing class bindings: {:?}", bindings.names());
        std::mem::replace(&mut self.bindings, bindings)
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn instance_count(&self) -> usize {
        self.registry.len()
    }

    // ===== Wrapper lookups =====

    /// Whether `object` has a wrapper of type `T`
    pub fn exists<T: Mini>(&self, object: ObjectHandle) -> bool {
        self.registry.get_as::<T>(object).is_some()
    }

    pub fn from_object<T: Mini>(&self, object: ObjectHandle) -> Option<&T> {
        self.registry.get_as::<T>(object)
    }

    pub fn from_object_mut<T: Mini>(&mut self, object: ObjectHandle) -> Option<&mut T> {
        self.registry.get_as_mut::<T>(object)
    }

    /// The `T` wrapper of the object with `guid`, if one exists
    pub fn from_guid<T: Mini>(&self, engine: &dyn Engine, guid: Guid) -> Option<&T> {
        let object = engine.object_from_guid(guid)?;
        self.from_object::<T>(object)
    }

    /// All live `T` wrappers with their handles, oldest first
    pub fn objects<T: Mini>(&self) -> impl Iterator<Item = (ObjectHandle, &T)> + '_ {
        self.registry.objects::<T>()
    }

    /// Create an engine object from `section` and bind it right away.
    ///
    /// Returns the handle if the object got a wrapper. The engine's own
    /// creation notification for it arrives later and is a no-op.
    pub fn create_from_config(
        &mut self,
        engine: &mut dyn Engine,
        section: &str,
    ) -> Result<Option<ObjectHandle>, DispatchError> {
        let Some(object) = engine.create_object(section) else {
            debug!(target: "miniscroll", "Engine could not create an object from '{}'", section);
            return Ok(None);
        };
        self.handle_create(engine, object)?;
        Ok(self.registry.contains(object).then_some(object))
    }

    // ===== Engine notifications =====

    /// Object created: bind it if its section hierarchy matches a class
    pub fn handle_create(
        &mut self,
        engine: &mut dyn Engine,
        object: ObjectHandle,
    ) -> Result<(), DispatchError> {
        if self.registry.contains(object) {
            debug!(target: "miniscroll", "Ignoring repeated creation of {}", object);
            return Ok(());
        }

        let Some(resolved) = self.bindings.resolve(&*engine, object) else {
            return Ok(());
        };

        let (input_set, input_names) =
            read_input_set(engine, &resolved.section, &self.config.input_key);
        let guid = engine.object_guid(object);
        let instance_section = match guid {
            Some(guid) => guid.to_string(),
            None => resolved.section.clone(),
        };
        let meta = MiniObject::new(
            object,
            guid,
            resolved.class_name.to_string(),
            Context::new(resolved.section.clone(), input_set.clone()),
            Context::new(instance_section, input_set),
            input_names,
        );
        let mini = (resolved.factory)(&meta);

        debug!(
            target: "miniscroll",
            "Binding {} (section '{}') to class '{}'",
            object,
            resolved.section,
            resolved.class_name
        );

        let policy = self.config.failure_policy;
        let Some(instance) = self.registry.insert(Instance::new(meta, mini)) else {
            return Ok(());
        };
        invoke(policy, Callback::Create, engine, instance, |mini, ctx| {
            mini.on_create(ctx)
        })?;
        Ok(())
    }

    /// Object deleted: drop its wrapper, then let the wrapper know
    pub fn handle_delete(
        &mut self,
        engine: &mut dyn Engine,
        object: ObjectHandle,
    ) -> Result<(), DispatchError> {
        let Some(mut instance) = self.registry.remove(object) else {
            trace!(target: "miniscroll", "No instance to remove for {}", object);
            return Ok(());
        };

        debug!(
            target: "miniscroll",
            "Removed {} ({}), {} instance(s) left",
            object,
            instance.object.class_name(),
            self.registry.len()
        );

        invoke(
            self.config.failure_policy,
            Callback::Delete,
            engine,
            &mut instance,
            |mini, ctx| mini.on_delete(ctx),
        )?;
        Ok(())
    }

    /// Engine tick: fire input triggers, then update every instance with its
    /// clock-scaled delta.
    pub fn handle_update(&mut self, engine: &mut dyn Engine, dt: f32) -> Result<(), DispatchError> {
        let policy = self.config.failure_policy;
        let trigger = self.config.input_trigger.as_str();
        let handles = self.registry.handles().to_vec();

        for handle in handles {
            let Some(instance) = self.registry.get_mut(handle) else {
                continue;
            };
            trace!(target: "miniscroll", "Updating {} ({})", handle, instance.object.class_name());
            invoke(policy, Callback::Update, engine, instance, |mini, ctx| {
                ctx.fire_input_triggers(trigger);
                let dt = ctx.scaled_dt(dt);
                mini.on_update(ctx, dt)
            })?;
        }
        Ok(())
    }

    /// Collision began: each bound side hears about it from its own point
    /// of view.
    pub fn handle_collide(
        &mut self,
        engine: &mut dyn Engine,
        first: &BodyPart,
        second: &BodyPart,
        position: Vector,
        normal: Vector,
    ) -> Result<(), DispatchError> {
        let policy = self.config.failure_policy;
        for (own, other) in [(first, second), (second, first)] {
            let Some(instance) = self.registry.get_mut(own.object) else {
                continue;
            };
            let collision = Collision::seen_from(own, other, position, normal);
            invoke(policy, Callback::Collide, engine, instance, |mini, ctx| {
                mini.on_collide(ctx, &collision)
            })?;
        }
        Ok(())
    }

    /// Collision ended: same routing as [`Dispatcher::handle_collide`]
    pub fn handle_separate(
        &mut self,
        engine: &mut dyn Engine,
        first: &BodyPart,
        second: &BodyPart,
    ) -> Result<(), DispatchError> {
        let policy = self.config.failure_policy;
        for (own, other) in [(first, second), (second, first)] {
            let Some(instance) = self.registry.get_mut(own.object) else {
                continue;
            };
            let separation = Separation::seen_from(own, other);
            invoke(policy, Callback::Separate, engine, instance, |mini, ctx| {
                mini.on_separate(ctx, &separation)
            })?;
        }
        Ok(())
    }

    /// Ask the object's wrapper for a shader parameter value
    pub fn handle_shader_param(
        &mut self,
        engine: &mut dyn Engine,
        object: ObjectHandle,
        shader: &str,
        param: &str,
        param_type: ShaderParamType,
    ) -> Result<Option<ShaderParam>, DispatchError> {
        let policy = self.config.failure_policy;
        let Some(instance) = self.registry.get_mut(object) else {
            return Ok(None);
        };

        let value = invoke(policy, Callback::ShaderParam, engine, instance, |mini, ctx| {
            mini.on_shader_param(ctx, shader, param, param_type)
        })?
        .flatten();

        if let Some(value) = &value {
            if value.param_type() != param_type {
                warn!(
                    target: "miniscroll",
                    "{} answered {}.{} with {:?}, expected {:?}",
                    object,
                    shader,
                    param,
                    value.param_type(),
                    param_type
                );
            }
        }
        Ok(value)
    }
}

/// Read the input set named by `key` in `section`, enable it, and list its
/// actions.
fn read_input_set(
    engine: &mut dyn Engine,
    section: &str,
    key: &str,
) -> (Option<String>, Vec<String>) {
    let mut scope = ContextGuard::section(engine, section);
    if !scope.has_value(key) {
        return (None, Vec::new());
    }
    let Some(set) = scope.get_string(key) else {
        return (None, Vec::new());
    };

    scope.enable_input_set(&set);
    let names = ContextGuard::input_set(&mut *scope, &set).input_actions();
    (Some(set), names)
}

/// Run one wrapper callback inside the object's class context, applying the
/// failure policy.
///
/// Returns `Ok(None)` when an isolated failure was logged and swallowed.
fn invoke<R>(
    policy: FailurePolicy,
    callback: Callback,
    engine: &mut dyn Engine,
    instance: &mut Instance,
    call: impl FnOnce(&mut dyn Mini, &mut MiniContext<'_>) -> anyhow::Result<R>,
) -> Result<Option<R>, DispatchError> {
    let Instance { object, mini } = instance;
    let object: &MiniObject = object;

    let run = || {
        let mut scope = object.context().enter(engine);
        let mut ctx = MiniContext::new(&mut *scope, object);
        call(&mut **mini, &mut ctx)
    };

    match policy {
        FailurePolicy::Propagate => match run() {
            Ok(value) => Ok(Some(value)),
            Err(source) => Err(DispatchError::Callback {
                callback,
                object: object.handle(),
                class: object.class_name().to_string(),
                source,
            }),
        },
        FailurePolicy::Isolate => match panic::catch_unwind(AssertUnwindSafe(run)) {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(e)) => {
                error!(
                    target: "miniscroll",
                    "{} failed for {} ({}): {:#}",
                    callback,
                    object.handle(),
                    object.class_name(),
                    e
                );
                Ok(None)
            }
            Err(payload) => {
                error!(
                    target: "miniscroll",
                    "{} panicked for {} ({}): {}",
                    callback,
                    object.handle(),
                    object.class_name(),
                    panic_message(&*payload)
                );
                Ok(None)
            }
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
