//! Mosh Core
//!
//! The simulation layer of the game, independent of any renderer:
//! - Entities, components and topic-based messaging
//! - Entity manager driving the per-frame sweep
//! - Spatial hash grid for proximity queries
//! - Finite state machines for character behavior
//! - Gameplay components (health, NPC/player control, attacks, camera follow)
//! - Frame time and math helpers

pub mod components;
pub mod ecs;
pub mod fsm;
pub mod math;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
