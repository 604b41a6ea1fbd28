//! Entity Component core.
//!
//! Entities are named aggregates owning a pose and an ordered set of boxed
//! components. Components never hold references to each other or to their
//! entity: they discover siblings by [`ComponentKind`] through a context
//! handed to every hook, and talk to each other through topic-tagged
//! [`Message`]s routed synchronously by the owning entity.
//!
//! The [`EntityManager`] owns every live entity, assigns generational
//! [`EntityId`]s and drives the per-frame sweep in insertion order.

mod component;
mod context;
mod entity;
mod error;
mod manager;
mod message;
pub mod query;

#[cfg(test)]
pub(crate) mod testing;

pub use component::{AsAny, Component, ComponentKind, ComponentType};
pub use context::{ComponentContext, InitContext, Siblings};
pub use entity::{Entity, EntityId, Pose};
pub use error::{ConfigError, LookupError, UpdateError};
pub use manager::{Entities, EntityManager, SweepReport};
pub use message::{topics, Message};

pub(crate) use context::{Dispatch, Envelope, Slot};
