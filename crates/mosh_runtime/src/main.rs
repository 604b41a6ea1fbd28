//! Mosh Runtime
//!
//! Headless driver: builds the scene from settings and steps it for a fixed
//! number of frames with scripted input.

mod scene;

use anyhow::{Context, Result};
use mosh_core::time::FrameClock;
use mosh_services::Settings;
use scene::{Scene, PLAYER};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Mosh v{}", mosh_core::VERSION);

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load_or_default(path.as_deref()).context("loading settings")?;
    let mut scene = Scene::build(&settings).context("building the scene")?;

    let sim = &settings.simulation;
    let mut clock = FrameClock::new(sim.max_step);
    let mut failures = 0;
    for frame in 0..sim.frames {
        if frame == sim.assets_ready_after {
            scene.load_assets(&settings);
        }
        scene
            .apply_input(settings.input.input_at(frame))
            .context("applying input")?;

        let dt = clock.advance(sim.frame_ms);
        let report = scene.step(dt);
        if report.failures > 0 {
            failures += report.failures;
            warn!(frame, failures = report.failures, "frame had failing entities");
        }
        debug!(frame, dt, messages = report.messages, "frame");
    }

    let player = scene.manager().get(PLAYER).context("player vanished")?;
    let profile = scene.manager().profile();
    info!(
        frames = clock.frames(),
        elapsed = clock.elapsed(),
        failures,
        "simulation finished"
    );
    info!(
        alive = scene.player_alive(),
        position = ?player.position(),
        zombies_standing = scene.living_npcs(),
        "player"
    );
    info!(
        sweeps = profile.sweeps(),
        mean_ms = profile.mean_sweep_ms(),
        worst_ms = profile.worst_sweep_ms(),
        messages = profile.total_messages(),
        "sweep profile"
    );
    Ok(())
}
