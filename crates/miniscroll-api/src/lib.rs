//! Engine-facing API for miniscroll
//!
//! This crate describes the boundary between miniscroll and the game engine:
//! the queries miniscroll makes ([`Engine`]), the callback table the engine
//! drives ([`EngineCallbacks`]), and the plain data passed across.
//! Engine bindings implement these; game code should depend on
//! miniscroll-host instead.

pub mod engine;
pub mod events;
pub mod types;

pub use engine::{Engine, EngineCallbacks};
pub use events::EngineEvent;
pub use types::{
    BodyPart, ClockId, Collision, Guid, ObjectHandle, Separation, ShaderParam, ShaderParamType,
    Vector,
};
