#![allow(dead_code)]

use mosh_core::components::{
    AttackController, AttackParams, HealthComponent, HealthParams, NpcController, NpcParams,
    PlayerController, PlayerInput, PlayerParams, SpatialGridController,
};
use mosh_core::define_component;
use mosh_core::ecs::query::{SharedGrid, SpatialHashGrid};
use mosh_core::ecs::{
    Component, ComponentContext, ConfigError, Entity, EntityManager, InitContext, Message,
    UpdateError,
};
use mosh_core::fsm::{AnimationProxy, ClipInfo, ATTACK, DEATH, IDLE, RUN, WALK};
use mosh_core::math::Vec3;

/// Keeps every message on the subscribed topics.
#[derive(Default)]
pub struct Recorder {
    topics: Vec<&'static str>,
    pub messages: Vec<Message>,
}

impl Recorder {
    pub fn on(topics: &[&'static str]) -> Self {
        Self {
            topics: topics.to_vec(),
            messages: Vec::new(),
        }
    }

    pub fn count(&self, topic: &str) -> usize {
        self.messages.iter().filter(|m| m.topic() == topic).count()
    }
}

impl Component for Recorder {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        for topic in &self.topics {
            ctx.subscribe(topic);
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        message: &Message,
    ) -> Result<(), UpdateError> {
        self.messages.push(message.clone());
        Ok(())
    }
}
define_component!(Recorder, "Recorder");

pub fn arena_grid() -> SharedGrid {
    SpatialHashGrid::new([[-100.0, -100.0], [100.0, 100.0]], [20, 20])
        .expect("valid grid")
        .shared()
}

pub fn loaded_proxy() -> AnimationProxy {
    let proxy = AnimationProxy::new();
    for (clip, duration) in [(IDLE, 2.0), (WALK, 1.0), (RUN, 0.8), (ATTACK, 1.0), (DEATH, 2.0)] {
        proxy.insert(clip, ClipInfo { duration });
    }
    proxy
}

pub fn player(grid: &SharedGrid, proxy: &AnimationProxy) -> Entity {
    let mut entity = Entity::new();
    entity.add_component(PlayerInput::new()).unwrap();
    entity
        .add_component(PlayerController::new(PlayerParams::default(), proxy.clone()).unwrap())
        .unwrap();
    entity
        .add_component(
            HealthComponent::new(HealthParams {
                health: 100.0,
                max_health: 100.0,
                strength: 5000.0,
            })
            .unwrap(),
        )
        .unwrap();
    entity
        .add_component(SpatialGridController::new(grid.clone()))
        .unwrap();
    entity
        .add_component(
            AttackController::new(AttackParams {
                timing: 0.25,
                radius: 5.0,
                action: ATTACK.to_string(),
            })
            .unwrap(),
        )
        .unwrap();
    entity
}

pub fn zombie(grid: &SharedGrid, proxy: &AnimationProxy, at: Vec3, walk_speed: f32) -> Entity {
    let mut entity = Entity::new();
    entity.set_position(at);
    entity
        .add_component(
            NpcController::new(
                NpcParams {
                    walk_speed,
                    ..NpcParams::default()
                },
                proxy.clone(),
            )
            .unwrap(),
        )
        .unwrap();
    entity
        .add_component(
            HealthComponent::new(HealthParams {
                health: 50.0,
                max_health: 50.0,
                strength: 0.0,
            })
            .unwrap(),
        )
        .unwrap();
    entity
        .add_component(SpatialGridController::new(grid.clone()))
        .unwrap();
    entity
}

/// Tell every entity its resources are in.
pub fn load_resources(manager: &mut EntityManager) {
    let names: Vec<String> = manager.iter().map(|e| e.name().to_string()).collect();
    for name in names {
        manager.broadcast_to(&name, Message::ResourcesLoaded).unwrap();
    }
}
