//! A headless engine for miniscroll
//!
//! [`SimEngine`] implements the engine boundary entirely in memory: config
//! sections with inheritance, input sets, clocks and objects. Scenes can be
//! described in TOML and played back tick by tick, which is how the demo
//! binary and the integration tests drive the dispatcher.

pub mod engine;
pub mod error;
pub mod scene;

pub use engine::{FiredTrigger, SimEngine};
pub use error::SimError;
pub use scene::{
    ClockDef, ContactDef, InputSetDef, Scene, SceneLoadError, ScriptStep, SectionDef, SpawnDef,
};
