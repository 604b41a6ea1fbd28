//! Dance-floor scene: the player, its camera and a crowd of zombies.

use mosh_core::components::{
    vitality, AttackController, CameraParams, HealthComponent, NpcController, PlayerController,
    PlayerInput, SpatialGridController, ThirdPersonCamera, Vitality,
};
use mosh_core::ecs::query::{SharedGrid, SpatialHashGrid};
use mosh_core::ecs::{ConfigError, Entity, EntityManager, LookupError, Message, SweepReport};
use mosh_core::fsm::{AnimationProxy, CharacterInput};
use mosh_core::math::{DeterministicRng, Vec3};
use mosh_services::Settings;
use tracing::{info, warn};

pub const PLAYER: &str = "player";
pub const CAMERA: &str = "player-camera";

pub struct Scene {
    manager: EntityManager,
    grid: SharedGrid,
    proxy: AnimationProxy,
    npcs: Vec<String>,
}

impl Scene {
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        let grid = SpatialHashGrid::new(settings.grid.bounds, settings.grid.dimensions)?.shared();
        let proxy = AnimationProxy::new();
        let mut manager = EntityManager::new();

        let mut player = Entity::new();
        player.add_component(PlayerInput::new())?;
        player.add_component(PlayerController::new(
            settings.player_controller(),
            proxy.clone(),
        )?)?;
        player.add_component(HealthComponent::new(settings.player_health())?)?;
        player.add_component(SpatialGridController::new(grid.clone()))?;
        player.add_component(AttackController::new(settings.player_attack())?)?;
        manager.add(player, PLAYER)?;

        let mut camera = Entity::new();
        camera.add_component(ThirdPersonCamera::new(CameraParams::following(PLAYER))?)?;
        manager.add(camera, CAMERA)?;

        let mut rng = DeterministicRng::new(settings.simulation.seed);
        let (half_width, half_depth) = (settings.arena.width * 0.5, settings.arena.depth * 0.5);
        let mut npcs = Vec::with_capacity(settings.npc.count);
        for i in 0..settings.npc.count {
            let mut npc = Entity::new();
            npc.add_component(NpcController::new(
                settings.npc_controller(),
                proxy.clone(),
            )?)?;
            npc.add_component(HealthComponent::new(settings.npc_health())?)?;
            npc.add_component(SpatialGridController::new(grid.clone()))?;
            npc.set_position(Vec3::new(
                rng.range(-half_width, half_width),
                0.0,
                rng.range(-half_depth, half_depth),
            ));
            let name = format!("npc-zombie-{i}");
            manager.add(npc, &name)?;
            npcs.push(name);
        }

        info!(entities = manager.len(), npcs = npcs.len(), "scene built");
        Ok(Self {
            manager,
            grid,
            proxy,
            npcs,
        })
    }

    /// Publish clip metadata and tell every entity its resources are in.
    pub fn load_assets(&mut self, settings: &Settings) {
        for (clip, info) in settings.clip_library() {
            self.proxy.insert(clip, info);
        }
        let names: Vec<String> = self.manager.iter().map(|e| e.name().to_string()).collect();
        for name in names {
            if let Err(error) = self.manager.broadcast_to(&name, Message::ResourcesLoaded) {
                warn!(entity = %name, %error, "resource notification failed");
            }
        }
        info!(clips = self.proxy.len(), "assets loaded");
    }

    pub fn apply_input(&mut self, keys: CharacterInput) -> Result<(), LookupError> {
        let player = self.manager.get_mut(PLAYER)?;
        if let Some(input) = player.component_mut::<PlayerInput>() {
            input.set(keys);
        }
        Ok(())
    }

    pub fn step(&mut self, dt: f32) -> SweepReport {
        self.manager.update(dt)
    }

    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    pub fn grid(&self) -> &SharedGrid {
        &self.grid
    }

    pub fn living_npcs(&self) -> usize {
        self.npcs
            .iter()
            .filter_map(|name| self.manager.get(name).ok())
            .filter(|npc| vitality(npc) == Vitality::Alive)
            .count()
    }

    pub fn player_alive(&self) -> bool {
        self.manager
            .get(PLAYER)
            .map(|player| vitality(player) == Vitality::Alive)
            .unwrap_or(false)
    }
}
