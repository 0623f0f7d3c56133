//! Builder pattern for Miniscroll
//!
//! Collects class bindings, dispatch settings and the game's hooks, then
//! produces the callback table for the engine.

use miniscroll_api::Engine;

use crate::bindings::ClassBindings;
use crate::config::DispatchConfig;
use crate::dispatcher::Dispatcher;
use crate::registry::MiniObject;
use crate::runtime::{InitFn, Miniscroll, UpdateFn};
use crate::Mini;

/// Error during builder configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Section '{0}' is bound more than once")]
    DuplicateBinding(String),
    #[error("Input trigger name must not be empty")]
    EmptyInputTrigger,
    #[error("Input config key must not be empty")]
    EmptyInputKey,
}

/// Builder for Miniscroll
///
/// ```no_run
/// # use miniscroll_host::{Mini, Miniscroll};
/// #[derive(Default)]
/// struct Logo;
/// impl Mini for Logo {}
///
/// let callbacks = Miniscroll::builder()
///     .bind::<Logo>("Logo")
///     .on_update(|_dispatcher, _engine, _dt| Ok(()))
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct MiniscrollBuilder {
    bindings: ClassBindings,
    duplicates: Vec<String>,
    config: DispatchConfig,
    init: Option<InitFn>,
    update: Option<UpdateFn>,
}

impl MiniscrollBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `section` to `T`
    pub fn bind<T: Mini + Default>(mut self, section: impl Into<String>) -> Self {
        let section = section.into();
        self.note_duplicate(&section);
        self.bindings.bind::<T>(section);
        self
    }

    /// Bind `section` to a wrapper built from the object's metadata
    pub fn bind_with<T, F>(mut self, section: impl Into<String>, factory: F) -> Self
    where
        T: Mini,
        F: Fn(&MiniObject) -> T + 'static,
    {
        let section = section.into();
        self.note_duplicate(&section);
        self.bindings.bind_with(section, factory);
        self
    }

    /// Start from an existing binding table, replacing anything bound so far
    pub fn with_bindings(mut self, bindings: ClassBindings) -> Self {
        self.bindings = bindings;
        self.duplicates.clear();
        self
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `init` when the engine finishes initializing
    pub fn on_init<F>(mut self, init: F) -> Self
    where
        F: FnMut(&mut Dispatcher, &mut dyn Engine) -> anyhow::Result<()> + 'static,
    {
        self.init = Some(Box::new(init));
        self
    }

    /// Run `update` every tick, after the wrappers
    pub fn on_update<F>(mut self, update: F) -> Self
    where
        F: FnMut(&mut Dispatcher, &mut dyn Engine, f32) -> anyhow::Result<()> + 'static,
    {
        self.update = Some(Box::new(update));
        self
    }

    pub fn build(self) -> Result<Miniscroll, BuildError> {
        if let Some(section) = self.duplicates.into_iter().next() {
            return Err(BuildError::DuplicateBinding(section));
        }
        if self.config.input_trigger.is_empty() {
            return Err(BuildError::EmptyInputTrigger);
        }
        if self.config.input_key.is_empty() {
            return Err(BuildError::EmptyInputKey);
        }

        let dispatcher = Dispatcher::with_config(self.bindings, self.config);
        Ok(Miniscroll::from_parts(dispatcher, self.init, self.update))
    }

    fn note_duplicate(&mut self, section: &str) {
        if self.bindings.contains(section) {
            self.duplicates.push(section.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Logo;
    impl Mini for Logo {}

    #[test]
    fn test_build_with_bindings() {
        let callbacks = MiniscrollBuilder::new()
            .bind::<Logo>("Logo")
            .bind_with("Title", |_| Logo)
            .build()
            .unwrap();

        assert_eq!(callbacks.dispatcher().bindings().names(), vec!["Logo", "Title"]);
    }

    #[test]
    fn test_with_bindings_replaces_earlier_binds() {
        let callbacks = MiniscrollBuilder::new()
            .bind::<Logo>("Logo")
            .bind::<Logo>("Logo")
            .with_bindings(ClassBindings::new().with::<Logo>("Title"))
            .bind::<Logo>("Logo")
            .build()
            .unwrap();

        assert_eq!(callbacks.dispatcher().bindings().names(), vec!["Logo", "Title"]);
    }

    #[test]
    fn test_duplicate_binding_is_rejected() {
        let result = MiniscrollBuilder::new()
            .bind::<Logo>("Logo")
            .bind::<Logo>("Logo")
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateBinding("Logo".to_string()))
        );
    }

    #[test]
    fn test_empty_trigger_name_is_rejected() {
        let config = DispatchConfig {
            input_trigger: String::new(),
            ..DispatchConfig::default()
        };
        let result = MiniscrollBuilder::new().with_config(config).build();
        assert_eq!(result.err(), Some(BuildError::EmptyInputTrigger));
    }
}
