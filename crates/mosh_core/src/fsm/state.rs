//! State trait, character input and the shared animation proxy.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Key state driving character states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub shift: bool,
    pub space: bool,
}

impl CharacterInput {
    pub fn is_moving(&self) -> bool {
        self.forward || self.backward
    }
}

/// Metadata of one loaded animation clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    /// Seconds.
    pub duration: f32,
}

/// Clip metadata keyed by clip name, filled by the asset layer.
pub type AnimationLibrary = HashMap<String, ClipInfo>;

/// Shared handle to the animation library.
///
/// Handed to every state factory. The asset layer fills it once clips are
/// loaded and then sends `resource.loaded`, so states constructed afterwards
/// see the clip metadata.
#[derive(Debug, Clone, Default)]
pub struct AnimationProxy(Rc<RefCell<AnimationLibrary>>);

impl AnimationProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, clip: &str, info: ClipInfo) {
        self.0.borrow_mut().insert(clip.to_string(), info);
    }

    pub fn clip(&self, clip: &str) -> Option<ClipInfo> {
        self.0.borrow().get(clip).copied()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Playback position of a state's animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBinding {
    pub clip: &'static str,
    /// Seconds since the action started (wrapped when looping, clamped
    /// otherwise).
    pub time: f32,
    /// `None` when the clip was never loaded.
    pub duration: Option<f32>,
    pub looping: bool,
}

impl ActionBinding {
    /// Bind `clip`, reading its duration from the proxy.
    pub fn new(proxy: &AnimationProxy, clip: &'static str, looping: bool) -> Self {
        Self {
            clip,
            time: 0.0,
            duration: proxy.clip(clip).map(|info| info.duration),
            looping,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.time += dt.max(0.0);
        match (self.duration, self.looping) {
            (Some(duration), true) if duration > 0.0 => self.time %= duration,
            (Some(duration), false) => self.time = self.time.min(duration),
            // a one-shot without a clip never leaves its first frame
            (None, false) => self.time = 0.0,
            _ => {}
        }
    }

    /// One-shot actions finish at the end of their clip; a missing clip is
    /// finished right away.
    pub fn finished(&self) -> bool {
        if self.looping {
            return false;
        }
        match self.duration {
            Some(duration) => self.time >= duration,
            None => true,
        }
    }
}

/// One behavior phase of a character.
pub trait State {
    /// Called once when the state becomes current. `previous` is the name of
    /// the state being left, if any.
    fn enter(&mut self, _previous: Option<&str>) {}

    /// Called once when the state stops being current.
    fn exit(&mut self) {}

    /// Advance the state. Returning a name asks the machine to switch to it.
    fn update(&mut self, _dt: f32, _input: &CharacterInput) -> Option<&'static str> {
        None
    }

    /// The action exposed to `player.action` listeners, if any.
    fn action(&self) -> Option<&ActionBinding> {
        None
    }
}
