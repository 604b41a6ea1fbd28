//! Proximity queries.
//!
//! A uniform [`SpatialHashGrid`] over the ground plane (x/z) answers
//! radius-bounded "who is near" questions for combat range checks and AI
//! target acquisition. Entities join the grid through the
//! `SpatialGridController` component, which owns one [`ClientHandle`].

mod spatial_hash;

pub use spatial_hash::{ClientHandle, ClientView, GridBounds, SharedGrid, SpatialHashGrid};
