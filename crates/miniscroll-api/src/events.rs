use crate::engine::{Engine, EngineCallbacks};
use crate::types::{BodyPart, ObjectHandle, Vector};

/// A lifecycle notification the engine delivers through [`EngineCallbacks`].
///
/// Engines that cannot call back synchronously (because the callback owner is
/// borrowed at the time) queue these and deliver them between calls.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Init,
    Created(ObjectHandle),
    Deleted(ObjectHandle),
    Update {
        dt: f32,
    },
    CollisionBegin {
        first: BodyPart,
        second: BodyPart,
        position: Vector,
        normal: Vector,
    },
    CollisionEnd {
        first: BodyPart,
        second: BodyPart,
    },
}

impl EngineEvent {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::Init => "init",
            EngineEvent::Created(_) => "create",
            EngineEvent::Deleted(_) => "delete",
            EngineEvent::Update { .. } => "update",
            EngineEvent::CollisionBegin { .. } => "collide",
            EngineEvent::CollisionEnd { .. } => "separate",
        }
    }

    /// Route this event to the matching callback
    pub fn deliver(
        &self,
        callbacks: &mut dyn EngineCallbacks,
        engine: &mut dyn Engine,
    ) -> anyhow::Result<()> {
        match self {
            EngineEvent::Init => callbacks.on_init(engine),
            EngineEvent::Created(object) => callbacks.on_create(engine, *object),
            EngineEvent::Deleted(object) => callbacks.on_delete(engine, *object),
            EngineEvent::Update { dt } => callbacks.on_update(engine, *dt),
            EngineEvent::CollisionBegin {
                first,
                second,
                position,
                normal,
            } => callbacks.on_collide(engine, first, second, *position, *normal),
            EngineEvent::CollisionEnd { first, second } => {
                callbacks.on_separate(engine, first, second)
            }
        }
    }
}
