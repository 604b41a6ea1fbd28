//! Mosh Services Layer
//!
//! Everything the simulation reads from outside: settings and recorded input.

pub mod input;
pub mod settings;

pub use input::{InputSegment, InputTrack};
pub use settings::{Settings, SettingsError};
