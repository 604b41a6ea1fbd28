//! Gameplay components.
//!
//! Each component is configured from a serde parameter bag, so scenes can be
//! described in JSON as well as in code.

mod attack;
mod camera;
mod health;
mod npc;
mod player;
mod spatial_grid;

pub use attack::{AttackController, AttackParams};
pub use camera::{CameraParams, ThirdPersonCamera};
pub use health::{vitality, HealthComponent, HealthParams, Vitality};
pub use npc::{NpcController, NpcParams};
pub use player::{PlayerController, PlayerInput, PlayerParams};
pub use spatial_grid::{Nearby, SpatialGridController};

use crate::ecs::ConfigError;
use serde::de::DeserializeOwned;

/// Deserialize a parameter bag. Unknown fields are ignored.
pub(crate) fn parse_params<T: DeserializeOwned>(
    component: &'static str,
    value: serde_json::Value,
) -> Result<T, ConfigError> {
    serde_json::from_value(value)
        .map_err(|source| ConfigError::MalformedParameters { component, source })
}

pub(crate) fn invalid(
    component: &'static str,
    field: &'static str,
    reason: impl Into<String>,
) -> ConfigError {
    ConfigError::InvalidParameter {
        component,
        field,
        reason: reason.into(),
    }
}
