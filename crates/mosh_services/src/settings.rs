//! Settings management

use crate::input::InputTrack;
use mosh_core::components::{AttackParams, HealthParams, NpcParams, PlayerParams};
use mosh_core::fsm::{ClipInfo, ATTACK, DEATH, IDLE, RUN, WALK};
use mosh_core::time::MAX_STEP_SECONDS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {reason}")]
    Invalid { reason: String },
}

/// Game settings. Every section falls back to its defaults when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub grid: GridSettings,
    pub arena: ArenaSettings,
    pub player: PlayerSettings,
    pub npc: NpcSettings,
    /// Clip durations in seconds, keyed by clip name.
    pub clips: BTreeMap<String, f32>,
    pub input: InputTrack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Frames to run.
    pub frames: u64,
    /// Raw frame interval fed to the frame clock.
    pub frame_ms: f64,
    /// Upper bound on one simulation step, in seconds.
    pub max_step: f32,
    /// Seed for spawn scatter.
    pub seed: u64,
    /// Frame at which the simulated asset load completes.
    pub assets_ready_after: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// `[[min_x, min_z], [max_x, max_z]]`
    pub bounds: [[f32; 2]; 2],
    /// `[nx, nz]`
    pub dimensions: [usize; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub health: f32,
    pub max_health: f32,
    pub strength: f32,
    pub attack_timing: f32,
    pub attack_radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcSettings {
    pub count: usize,
    pub health: f32,
    pub max_health: f32,
    pub walk_speed: f32,
    pub seek_radius: f32,
    pub contact_query_radius: f32,
    pub contact_distance: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let clips = [(IDLE, 2.0), (WALK, 1.0), (RUN, 0.8), (ATTACK, 1.2), (DEATH, 2.5)]
            .into_iter()
            .map(|(name, duration)| (name.to_string(), duration))
            .collect();
        Self {
            simulation: SimulationSettings::default(),
            grid: GridSettings::default(),
            arena: ArenaSettings::default(),
            player: PlayerSettings::default(),
            npc: NpcSettings::default(),
            clips,
            input: InputTrack::demo(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_ms: 16.0,
            max_step: MAX_STEP_SECONDS,
            seed: 0x6d6f_7368,
            assets_ready_after: 30,
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            bounds: [[-1000.0, -1000.0], [1000.0, 1000.0]],
            dimensions: [100, 100],
        }
    }
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            width: 100.0,
            depth: 100.0,
            height: 20.0,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            health: 100.0,
            max_health: 100.0,
            strength: 5000.0,
            attack_timing: 0.25,
            attack_radius: 5.0,
        }
    }
}

impl Default for NpcSettings {
    fn default() -> Self {
        Self {
            count: 10,
            health: 50.0,
            max_health: 50.0,
            walk_speed: 2.0,
            seek_radius: 100.0,
            contact_query_radius: 5.0,
            contact_distance: 4.0,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Load from `path`, or fall back to the defaults when there is none.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                info!("using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Checks that cannot be expressed by the types alone. Component
    /// parameters are validated again when the scene is built.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let sim = &self.simulation;
        if !(sim.max_step > 0.0 && sim.max_step.is_finite()) {
            return Err(invalid(format!("max_step must be positive, got {}", sim.max_step)));
        }
        if !(sim.frame_ms >= 0.0 && sim.frame_ms.is_finite()) {
            return Err(invalid(format!("frame_ms must be >= 0, got {}", sim.frame_ms)));
        }
        let arena = &self.arena;
        if !(arena.width > 0.0 && arena.depth > 0.0) {
            return Err(invalid(format!(
                "arena must have a positive footprint, got {} x {}",
                arena.width, arena.depth
            )));
        }
        if let Some((name, duration)) = self.clips.iter().find(|(_, d)| !(**d >= 0.0)) {
            return Err(invalid(format!("clip '{name}' has duration {duration}")));
        }
        Ok(())
    }

    pub fn player_health(&self) -> HealthParams {
        HealthParams {
            health: self.player.health,
            max_health: self.player.max_health,
            strength: self.player.strength,
        }
    }

    pub fn player_attack(&self) -> AttackParams {
        AttackParams {
            timing: self.player.attack_timing,
            radius: self.player.attack_radius,
            action: ATTACK.to_string(),
        }
    }

    pub fn player_controller(&self) -> PlayerParams {
        PlayerParams {
            arena_width: self.arena.width,
            arena_depth: self.arena.depth,
            ..PlayerParams::default()
        }
    }

    pub fn npc_health(&self) -> HealthParams {
        HealthParams {
            health: self.npc.health,
            max_health: self.npc.max_health,
            strength: 0.0,
        }
    }

    pub fn npc_controller(&self) -> NpcParams {
        NpcParams {
            walk_speed: self.npc.walk_speed,
            seek_radius: self.npc.seek_radius,
            contact_query_radius: self.npc.contact_query_radius,
            contact_distance: self.npc.contact_distance,
            ..NpcParams::default()
        }
    }

    /// Clip metadata as the asset layer would report it.
    pub fn clip_library(&self) -> impl Iterator<Item = (&str, ClipInfo)> + '_ {
        self.clips
            .iter()
            .map(|(name, duration)| (name.as_str(), ClipInfo { duration: *duration }))
    }
}

fn invalid(reason: String) -> SettingsError {
    SettingsError::Invalid { reason }
}
