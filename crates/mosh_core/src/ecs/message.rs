//! Topic-tagged messages exchanged between components.

use glam::{Quat, Vec3};

/// Stable topic names.
pub mod topics {
    pub const HEALTH_DAMAGE: &str = "health.damage";
    pub const HEALTH_DEATH: &str = "health.death";
    pub const HEALTH_UPDATE: &str = "health.update";
    pub const UPDATE_POSITION: &str = "update.position";
    pub const UPDATE_ROTATION: &str = "update.rotation";
    pub const PLAYER_ACTION: &str = "player.action";
    pub const RESOURCE_LOADED: &str = "resource.loaded";
}

/// A message and its payload. Each variant maps to one topic; `Custom`
/// carries free-form topics with a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `health.damage`
    Damage { value: f32, attacker: String },
    /// `health.death`
    Death { attacker: String },
    /// `health.update`
    HealthUpdate { health: f32, max_health: f32 },
    /// `update.position`
    PositionUpdate { value: Vec3 },
    /// `update.rotation`
    RotationUpdate { value: Quat },
    /// `player.action`
    Action { action: String, time: f32 },
    /// `resource.loaded`
    ResourcesLoaded,
    Custom {
        topic: String,
        payload: serde_json::Value,
    },
}

impl Message {
    pub fn custom(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Custom {
            topic: topic.into(),
            payload,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Self::Damage { .. } => topics::HEALTH_DAMAGE,
            Self::Death { .. } => topics::HEALTH_DEATH,
            Self::HealthUpdate { .. } => topics::HEALTH_UPDATE,
            Self::PositionUpdate { .. } => topics::UPDATE_POSITION,
            Self::RotationUpdate { .. } => topics::UPDATE_ROTATION,
            Self::Action { .. } => topics::PLAYER_ACTION,
            Self::ResourcesLoaded => topics::RESOURCE_LOADED,
            Self::Custom { topic, .. } => topic,
        }
    }
}
