//! Input recording for deterministic playback

use mosh_core::fsm::CharacterInput;
use serde::{Deserialize, Serialize};

/// Keys held from `start_frame` up to, not including, `end_frame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSegment {
    pub start_frame: u64,
    pub end_frame: u64,
    pub keys: CharacterInput,
}

impl InputSegment {
    pub fn contains(&self, frame: u64) -> bool {
        (self.start_frame..self.end_frame).contains(&frame)
    }
}

/// Frame-ranged key states. Overlapping segments combine: a key is down
/// when any active segment holds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTrack {
    pub segments: Vec<InputSegment>,
}

impl InputTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment (builder style).
    pub fn hold(mut self, start_frame: u64, end_frame: u64, keys: CharacterInput) -> Self {
        self.segments.push(InputSegment {
            start_frame,
            end_frame,
            keys,
        });
        self
    }

    pub fn input_at(&self, frame: u64) -> CharacterInput {
        self.segments
            .iter()
            .filter(|segment| segment.contains(frame))
            .fold(CharacterInput::default(), |held, segment| {
                let keys = segment.keys;
                CharacterInput {
                    forward: held.forward || keys.forward,
                    backward: held.backward || keys.backward,
                    left: held.left || keys.left,
                    right: held.right || keys.right,
                    shift: held.shift || keys.shift,
                    space: held.space || keys.space,
                }
            })
    }

    /// Last frame any segment is active, exclusive.
    pub fn end_frame(&self) -> u64 {
        self.segments
            .iter()
            .map(|segment| segment.end_frame)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk, sprint, turn and swing a few times.
    pub fn demo() -> Self {
        let forward = CharacterInput {
            forward: true,
            ..CharacterInput::default()
        };
        let sprint = CharacterInput {
            shift: true,
            ..forward
        };
        let turn = CharacterInput {
            left: true,
            ..CharacterInput::default()
        };
        let swing = CharacterInput {
            space: true,
            ..CharacterInput::default()
        };
        Self::new()
            .hold(40, 100, forward)
            .hold(100, 160, sprint)
            .hold(160, 190, turn)
            .hold(200, 210, swing)
            .hold(260, 270, swing)
            .hold(300, 360, forward)
            .hold(380, 390, swing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_half_open() {
        let keys = CharacterInput {
            forward: true,
            ..CharacterInput::default()
        };
        let track = InputTrack::new().hold(10, 20, keys);
        assert_eq!(track.input_at(9), CharacterInput::default());
        assert_eq!(track.input_at(10), keys);
        assert_eq!(track.input_at(19), keys);
        assert_eq!(track.input_at(20), CharacterInput::default());
        assert_eq!(track.end_frame(), 20);
    }

    #[test]
    fn overlapping_segments_combine() {
        let track = InputTrack::new()
            .hold(
                0,
                10,
                CharacterInput {
                    forward: true,
                    ..CharacterInput::default()
                },
            )
            .hold(
                5,
                10,
                CharacterInput {
                    shift: true,
                    ..CharacterInput::default()
                },
            );
        let held = track.input_at(7);
        assert!(held.forward && held.shift);
        assert!(!track.input_at(3).shift);
    }

    #[test]
    fn tracks_load_from_json() {
        let track: InputTrack = serde_json::from_str(
            r#"{ "segments": [ { "startFrame": 2, "endFrame": 4, "keys": { "space": true } } ] }"#,
        )
        .unwrap();
        assert!(track.input_at(3).space);
        assert!(!track.input_at(3).forward);
    }
}
