use crate::types::{BodyPart, ClockId, Guid, ObjectHandle, ShaderParam, ShaderParamType, Vector};

/// Queries and commands miniscroll needs from the game engine.
///
/// Config lookups (`has_value`, `get_string`, `get_guid`) are relative to the
/// section on top of the active-section stack, and input queries are
/// relative to the input set on top of the active-input-set stack. Both
/// stacks are process-wide: every push must be matched by exactly one pop,
/// otherwise every later lookup reads the wrong section.
pub trait Engine {
    // ===== Objects =====

    /// Name of the config section the object was created from
    fn object_section(&self, object: ObjectHandle) -> Option<String>;

    fn object_guid(&self, object: ObjectHandle) -> Option<Guid>;

    fn object_from_guid(&self, guid: Guid) -> Option<ObjectHandle>;

    /// Create an object from a config section.
    ///
    /// The engine will also deliver a creation notification for it.
    fn create_object(&mut self, section: &str) -> Option<ObjectHandle>;

    /// Fire a named trigger event on the object
    fn fire_trigger(&mut self, object: ObjectHandle, event: &str, refinements: &[&str]);

    // ===== Config =====

    /// Parent section of `section` in the inheritance hierarchy, if any
    fn parent_section(&self, section: &str) -> Option<String>;

    fn has_value(&self, key: &str) -> bool;

    fn get_string(&self, key: &str) -> Option<String>;

    fn get_guid(&self, key: &str) -> Option<Guid>;

    fn push_section(&mut self, section: &str);

    fn pop_section(&mut self);

    // ===== Input =====

    fn enable_input_set(&mut self, set: &str);

    fn push_input_set(&mut self, set: &str);

    fn pop_input_set(&mut self);

    /// Names of every action in the active input set
    fn input_actions(&self) -> Vec<String>;

    /// Whether the action went from inactive to active this tick
    fn has_been_activated(&self, action: &str) -> bool;

    // ===== Clocks =====

    fn object_clock(&self, object: ObjectHandle) -> Option<ClockId>;

    /// Rescale a raw frame delta with the clock's own time modifiers
    fn compute_dt(&self, clock: ClockId, dt: f32) -> f32;
}

/// The engine's callback table.
///
/// The engine calls these from its single update loop. Implementations must
/// not expect to be re-entered while one of them is running.
pub trait EngineCallbacks {
    /// Called once after the engine has finished initializing
    fn on_init(&mut self, engine: &mut dyn Engine) -> anyhow::Result<()>;

    /// Called once per engine tick with the raw frame delta in seconds
    fn on_update(&mut self, engine: &mut dyn Engine, dt: f32) -> anyhow::Result<()>;

    /// Called after an object was created
    fn on_create(&mut self, engine: &mut dyn Engine, object: ObjectHandle) -> anyhow::Result<()>;

    /// Called before an object is destroyed
    fn on_delete(&mut self, engine: &mut dyn Engine, object: ObjectHandle) -> anyhow::Result<()>;

    /// Called when two objects start touching
    fn on_collide(
        &mut self,
        engine: &mut dyn Engine,
        first: &BodyPart,
        second: &BodyPart,
        position: Vector,
        normal: Vector,
    ) -> anyhow::Result<()>;

    /// Called when two objects stop touching
    fn on_separate(
        &mut self,
        engine: &mut dyn Engine,
        first: &BodyPart,
        second: &BodyPart,
    ) -> anyhow::Result<()>;

    /// Called when a shader associated with `object` needs a parameter value
    fn on_shader_param(
        &mut self,
        engine: &mut dyn Engine,
        object: ObjectHandle,
        shader: &str,
        param: &str,
        param_type: ShaderParamType,
    ) -> anyhow::Result<Option<ShaderParam>>;
}
