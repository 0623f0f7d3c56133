use std::ops::{Deref, DerefMut};

use miniscroll_api::{Engine, Guid, ObjectHandle};

use crate::registry::MiniObject;

/// A config section, optionally paired with an input set, to make active
/// around a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    section: String,
    input_set: Option<String>,
}

impl Context {
    pub fn new(section: impl Into<String>, input_set: Option<String>) -> Self {
        Self {
            section: section.into(),
            input_set,
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn input_set(&self) -> Option<&str> {
        self.input_set.as_deref()
    }

    /// Push the section, then the input set if there is one.
    ///
    /// Both are popped, in reverse order, when the returned guard is dropped.
    pub fn enter<'e>(&self, engine: &'e mut dyn Engine) -> ContextGuard<'e> {
        engine.push_section(&self.section);
        if let Some(set) = &self.input_set {
            engine.push_input_set(set);
        }
        ContextGuard {
            engine,
            pushed_section: true,
            pushed_input_set: self.input_set.is_some(),
        }
    }
}

/// Keeps a section and/or input set active on the engine's stacks.
///
/// Dropping the guard pops whatever it pushed. This also happens while
/// unwinding, so a failing or panicking callback cannot leave the stacks
/// unbalanced. The guard derefs to the engine, so code running inside the
/// scope goes through it.
pub struct ContextGuard<'e> {
    engine: &'e mut dyn Engine,
    pushed_section: bool,
    pushed_input_set: bool,
}

impl<'e> ContextGuard<'e> {
    /// Make only `section` active
    pub fn section(engine: &'e mut dyn Engine, section: &str) -> Self {
        engine.push_section(section);
        Self {
            engine,
            pushed_section: true,
            pushed_input_set: false,
        }
    }

    /// Make only the input set `set` active
    pub fn input_set(engine: &'e mut dyn Engine, set: &str) -> Self {
        engine.push_input_set(set);
        Self {
            engine,
            pushed_section: false,
            pushed_input_set: true,
        }
    }
}

impl<'e> Deref for ContextGuard<'e> {
    type Target = dyn Engine + 'e;

    fn deref(&self) -> &Self::Target {
        &*self.engine
    }
}

impl<'e> DerefMut for ContextGuard<'e> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.engine
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if self.pushed_input_set {
            self.engine.pop_input_set();
        }
        if self.pushed_section {
            self.engine.pop_section();
        }
    }
}

/// What a [`Mini`](crate::Mini) callback gets to work with: the engine, with
/// the object's class section already active, and the object's metadata.
pub struct MiniContext<'a> {
    engine: &'a mut dyn Engine,
    object: &'a MiniObject,
}

impl<'a> MiniContext<'a> {
    pub(crate) fn new(engine: &'a mut dyn Engine, object: &'a MiniObject) -> Self {
        Self { engine, object }
    }

    /// Handle of the engine object this callback is for
    pub fn object(&self) -> ObjectHandle {
        self.object.handle()
    }

    pub fn guid(&self) -> Option<Guid> {
        self.object.guid()
    }

    /// Name of the bound class the object matched
    pub fn class_name(&self) -> &str {
        self.object.class_name()
    }

    /// Action names of the object's input set
    pub fn input_names(&self) -> &[String] {
        self.object.input_names()
    }

    pub fn engine(&mut self) -> &mut dyn Engine {
        &mut *self.engine
    }

    /// Scope the object's class section (`instance == false`) or its
    /// per-object instance section (`instance == true`).
    ///
    /// Only the section is pushed, never the input set.
    pub fn section(&mut self, instance: bool) -> ContextGuard<'_> {
        let object = self.object;
        let context = if instance {
            object.instance_context()
        } else {
            object.context()
        };
        ContextGuard::section(&mut *self.engine, context.section())
    }

    /// Config string from the currently active section
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.engine.get_string(key)
    }

    pub fn fire_trigger(&mut self, event: &str, refinements: &[&str]) {
        let object = self.object.handle();
        self.engine.fire_trigger(object, event, refinements);
    }

    /// Fire `event` with the action name as refinement for every declared
    /// action that became active this tick.
    pub(crate) fn fire_input_triggers(&mut self, event: &str) {
        let object = self.object;
        for name in object.input_names() {
            if self.engine.has_been_activated(name) {
                self.engine
                    .fire_trigger(object.handle(), event, &[name.as_str()]);
            }
        }
    }

    /// Rescale `dt` with the object's clock, or pass it through when the
    /// object has none.
    pub(crate) fn scaled_dt(&self, dt: f32) -> f32 {
        match self.engine.object_clock(self.object.handle()) {
            Some(clock) => self.engine.compute_dt(clock, dt),
            None => dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use miniscroll_api::ClockId;
    use miniscroll_sim::SimEngine;

    use super::*;

    /// Records every stack operation; `get_string("depth")` reports the
    /// current section and input set depths as "sections/inputs".
    #[derive(Default)]
    struct StackLog {
        sections: Vec<String>,
        input_sets: Vec<String>,
        ops: Vec<String>,
    }

    impl Engine for StackLog {
        fn object_section(&self, _object: ObjectHandle) -> Option<String> {
            None
        }

        fn object_guid(&self, _object: ObjectHandle) -> Option<Guid> {
            None
        }

        fn object_from_guid(&self, _guid: Guid) -> Option<ObjectHandle> {
            None
        }

        fn create_object(&mut self, _section: &str) -> Option<ObjectHandle> {
            None
        }

        fn fire_trigger(&mut self, _object: ObjectHandle, _event: &str, _refinements: &[&str]) {}

        fn parent_section(&self, _section: &str) -> Option<String> {
            None
        }

        fn has_value(&self, key: &str) -> bool {
            key == "depth"
        }

        fn get_string(&self, key: &str) -> Option<String> {
            (key == "depth").then(|| format!("{}/{}", self.sections.len(), self.input_sets.len()))
        }

        fn get_guid(&self, _key: &str) -> Option<Guid> {
            None
        }

        fn push_section(&mut self, section: &str) {
            self.ops.push(format!("push section {}", section));
            self.sections.push(section.to_string());
        }

        fn pop_section(&mut self) {
            let popped = self.sections.pop();
            self.ops.push(format!("pop section {}", popped.unwrap_or_default()));
        }

        fn enable_input_set(&mut self, _set: &str) {}

        fn push_input_set(&mut self, set: &str) {
            self.ops.push(format!("push input {}", set));
            self.input_sets.push(set.to_string());
        }

        fn pop_input_set(&mut self) {
            let popped = self.input_sets.pop();
            self.ops.push(format!("pop input {}", popped.unwrap_or_default()));
        }

        fn input_actions(&self) -> Vec<String> {
            Vec::new()
        }

        fn has_been_activated(&self, _action: &str) -> bool {
            false
        }

        fn object_clock(&self, _object: ObjectHandle) -> Option<ClockId> {
            None
        }

        fn compute_dt(&self, _clock: ClockId, dt: f32) -> f32 {
            dt
        }
    }

    fn engine() -> SimEngine {
        let mut engine = SimEngine::new();
        engine.define_section("Logo", None, &[("Speed", "3")]);
        engine.define_input_set("LogoInput", &["Fire"]);
        engine
    }

    #[test]
    fn test_enter_pushes_and_drop_pops() {
        let mut engine = engine();
        let context = Context::new("Logo", Some("LogoInput".to_string()));

        {
            let scope = context.enter(&mut engine);
            assert_eq!(scope.get_string("Speed").as_deref(), Some("3"));
            assert_eq!(scope.input_actions(), vec!["Fire"]);
        }

        assert_eq!(engine.section_depth(), 0);
        assert_eq!(engine.input_set_depth(), 0);
    }

    #[test]
    fn test_enter_pushes_exactly_once_each() {
        let mut engine = StackLog::default();
        let context = Context::new("Logo", Some("LogoInput".to_string()));

        {
            let scope = context.enter(&mut engine);
            assert_eq!(scope.get_string("depth").as_deref(), Some("1/1"));
        }

        assert_eq!(engine.get_string("depth").as_deref(), Some("0/0"));
        assert_eq!(
            engine.ops,
            vec![
                "push section Logo",
                "push input LogoInput",
                "pop input LogoInput",
                "pop section Logo",
            ]
        );
    }

    #[test]
    fn test_single_stack_guards() {
        let mut engine = StackLog::default();

        {
            let mut outer = ContextGuard::section(&mut engine, "Logo");
            assert_eq!(outer.get_string("depth").as_deref(), Some("1/0"));
            let inner = ContextGuard::input_set(&mut *outer, "LogoInput");
            assert_eq!(inner.get_string("depth").as_deref(), Some("1/1"));
        }

        assert_eq!(engine.get_string("depth").as_deref(), Some("0/0"));
        assert_eq!(engine.ops.len(), 4);
    }

    #[test]
    fn test_enter_without_input_set() {
        let mut engine = engine();
        let context = Context::new("Logo", None);

        let scope = context.enter(&mut engine);
        assert!(scope.input_actions().is_empty());
        drop(scope);

        assert_eq!(engine.section_depth(), 0);
        assert_eq!(engine.unbalanced_pops(), 0);
    }

    #[test]
    fn test_guards_nest() {
        let mut engine = engine();
        engine.define_section("Other", None, &[("Speed", "8")]);

        let mut outer = ContextGuard::section(&mut engine, "Logo");
        {
            let inner = ContextGuard::section(&mut *outer, "Other");
            assert_eq!(inner.get_string("Speed").as_deref(), Some("8"));
        }
        assert_eq!(outer.get_string("Speed").as_deref(), Some("3"));
        drop(outer);

        assert_eq!(engine.section_depth(), 0);
    }

    #[test]
    fn test_pops_while_unwinding() {
        let mut engine = engine();
        let context = Context::new("Logo", Some("LogoInput".to_string()));

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _scope = context.enter(&mut engine);
            panic!("callback blew up");
        }));

        assert!(result.is_err());
        assert_eq!(engine.section_depth(), 0);
        assert_eq!(engine.input_set_depth(), 0);

        let mut log = StackLog::default();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _scope = context.enter(&mut log);
            panic!("callback blew up");
        }));
        assert!(result.is_err());
        assert_eq!(log.ops.last().map(String::as_str), Some("pop section Logo"));
        assert_eq!(log.ops.len(), 4);
    }
}
