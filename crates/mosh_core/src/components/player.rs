//! Player input and locomotion.

use crate::components::{invalid, parse_params};
use crate::define_component;
use crate::ecs::{
    topics, Component, ComponentContext, ConfigError, InitContext, Message, UpdateError,
};
use crate::fsm::{
    player_machine, AnimationProxy, CharacterInput, FiniteStateMachine, ATTACK, DEATH, IDLE,
};
use crate::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::debug;

/// Current key state, written by the input layer and read by siblings.
#[derive(Debug, Clone, Default)]
pub struct PlayerInput {
    keys: CharacterInput,
}

impl PlayerInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, keys: CharacterInput) {
        self.keys = keys;
    }

    pub fn current(&self) -> CharacterInput {
        self.keys
    }
}

impl Component for PlayerInput {}
define_component!(PlayerInput, "PlayerInput");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerParams {
    /// Arena footprint along x.
    pub arena_width: f32,
    /// Arena footprint along z.
    pub arena_depth: f32,
    pub deceleration: Vec3,
    pub acceleration: Vec3,
}

impl Default for PlayerParams {
    fn default() -> Self {
        Self {
            arena_width: 100.0,
            arena_depth: 100.0,
            deceleration: Vec3::new(-0.0005, -0.0001, -5.0),
            acceleration: Vec3::new(1.0, 0.25, 50.0),
        }
    }
}

/// Drives the player character from [`PlayerInput`].
pub struct PlayerController {
    params: PlayerParams,
    machine: FiniteStateMachine,
    velocity: Vec3,
}

impl PlayerController {
    const NAME: &'static str = "PlayerController";

    pub fn new(params: PlayerParams, proxy: AnimationProxy) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("arenaWidth", params.arena_width),
            ("arenaDepth", params.arena_depth),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(Self::NAME, field, format!("must be positive, got {value}")));
            }
        }
        if !params.acceleration.is_finite() || !params.deceleration.is_finite() {
            return Err(invalid(Self::NAME, "acceleration", "must be finite"));
        }
        Ok(Self {
            params,
            machine: player_machine(proxy)?,
            velocity: Vec3::ZERO,
        })
    }

    pub fn from_value(value: serde_json::Value, proxy: AnimationProxy) -> Result<Self, ConfigError> {
        Self::new(parse_params(Self::NAME, value)?, proxy)
    }

    pub fn machine(&self) -> &FiniteStateMachine {
        &self.machine
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Integrate velocity and heading for one step and write the pose.
    fn locomote(&mut self, ctx: &mut ComponentContext<'_>, dt: f32, input: &CharacterInput) {
        let velocity = &mut self.velocity;
        let mut slowdown = *velocity * self.params.deceleration * dt;
        slowdown.z = slowdown.z.signum() * slowdown.z.abs().min(velocity.z.abs());
        *velocity += slowdown;

        let mut acc = self.params.acceleration;
        if input.shift {
            acc *= 2.0;
        }
        if self.machine.is_in(ATTACK) {
            acc = Vec3::ZERO;
        }

        if input.forward {
            velocity.z += acc.z * dt;
        }
        if input.backward {
            velocity.z -= acc.z * dt;
        }

        let mut rotation = ctx.rotation();
        let turn = 4.0 * PI * dt * acc.y;
        if input.left {
            rotation *= Quat::from_rotation_y(turn);
        }
        if input.right {
            rotation *= Quat::from_rotation_y(-turn);
        }
        let rotation = rotation.normalize();

        let forward = (rotation * Vec3::Z).normalize_or_zero() * velocity.z * dt;
        let sideways = (rotation * Vec3::X).normalize_or_zero() * velocity.x * dt;
        let mut position = ctx.position() + forward + sideways;

        let half_width = self.params.arena_width * 0.5;
        let half_depth = self.params.arena_depth * 0.5;
        position.x = position.x.clamp(-half_width, half_width);
        position.z = position.z.clamp(-half_depth, half_depth);

        if rotation != ctx.rotation() {
            ctx.set_rotation(rotation);
        }
        if position != ctx.position() {
            ctx.set_position(position);
        }
    }
}

impl Component for PlayerController {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        ctx.subscribe(topics::HEALTH_DEATH);
        ctx.subscribe(topics::RESOURCE_LOADED);
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), UpdateError> {
        if self.machine.is_uninitialized() {
            return Ok(());
        }
        let input = ctx
            .sibling::<PlayerInput>()
            .map(PlayerInput::current)
            .unwrap_or_default();

        self.machine.update(dt, &input)?;
        if let (Some(action), Some(time)) = (
            self.machine.current_name(),
            self.machine.current_action().map(|binding| binding.time),
        ) {
            ctx.broadcast(Message::Action {
                action: action.to_string(),
                time,
            });
        }

        if self.machine.is_in(DEATH) {
            self.velocity = Vec3::ZERO;
            return Ok(());
        }
        self.locomote(ctx, dt, &input);
        Ok(())
    }

    fn on_message(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        message: &Message,
    ) -> Result<(), UpdateError> {
        match message {
            Message::Death { attacker } => {
                debug!(entity = ctx.name(), attacker = %attacker, "player down");
                self.machine.set_state(DEATH)?;
            }
            Message::ResourcesLoaded if self.machine.is_uninitialized() => {
                self.machine.set_state(IDLE)?;
            }
            _ => {}
        }
        Ok(())
    }
}
define_component!(PlayerController, "PlayerController");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{HealthComponent, HealthParams};
    use crate::ecs::testing::MessageLog;
    use crate::ecs::Entity;
    use crate::fsm::{ClipInfo, RUN, WALK};
    use approx::assert_relative_eq;

    fn keys(forward: bool, shift: bool) -> CharacterInput {
        CharacterInput {
            forward,
            shift,
            ..CharacterInput::default()
        }
    }

    fn player(proxy: AnimationProxy) -> Entity {
        let mut entity = Entity::new();
        entity.add_component(PlayerInput::new()).unwrap();
        entity
            .add_component(PlayerController::new(PlayerParams::default(), proxy).unwrap())
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
            .add_component(MessageLog::subscribed(&[topics::PLAYER_ACTION]))
            .unwrap();
        entity.init_entity().unwrap();
        entity.broadcast(Message::ResourcesLoaded).unwrap();
        entity
    }

    fn press(entity: &mut Entity, input: CharacterInput) {
        entity.component_mut::<PlayerInput>().unwrap().set(input);
    }

    fn machine(entity: &Entity) -> &FiniteStateMachine {
        entity.component::<PlayerController>().unwrap().machine()
    }

    #[test]
    fn waits_for_resources() {
        let mut entity = Entity::new();
        entity.add_component(PlayerInput::new()).unwrap();
        entity
            .add_component(
                PlayerController::new(PlayerParams::default(), AnimationProxy::new()).unwrap(),
            )
            .unwrap();
        entity.init_entity().unwrap();
        press(&mut entity, keys(true, false));
        entity.update(0.1).unwrap();
        assert_eq!(entity.position(), Vec3::ZERO);
        assert!(machine(&entity).is_uninitialized());
    }

    #[test]
    fn walking_moves_forward() {
        let mut entity = player(AnimationProxy::new());
        press(&mut entity, keys(true, false));
        entity.update(0.1).unwrap();
        assert!(machine(&entity).is_in(WALK));
        // 50 * 0.1 = 5 units/s, applied over 0.1 s
        assert_relative_eq!(entity.position().z, 0.5, epsilon = 1e-5);
        assert_relative_eq!(entity.position().x, 0.0, epsilon = 1e-5);

        press(&mut entity, keys(true, true));
        entity.update(0.1).unwrap();
        assert!(machine(&entity).is_in(RUN));
        assert!(entity.component::<PlayerController>().unwrap().velocity().z > 5.0);
    }

    #[test]
    fn turning_is_yaw_only() {
        let mut entity = player(AnimationProxy::new());
        press(
            &mut entity,
            CharacterInput {
                left: true,
                ..CharacterInput::default()
            },
        );
        entity.update(0.5).unwrap();
        let (axis, angle) = entity.rotation().to_axis_angle();
        assert_relative_eq!(angle, 0.5 * PI, epsilon = 1e-4);
        assert_relative_eq!(axis.y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn stays_inside_the_arena() {
        let mut entity = player(AnimationProxy::new());
        press(&mut entity, keys(true, true));
        for _ in 0..200 {
            entity.update(1.0 / 30.0).unwrap();
        }
        assert_relative_eq!(entity.position().z, 50.0);
    }

    #[test]
    fn attacking_broadcasts_the_action_and_stands_still() {
        let proxy = AnimationProxy::new();
        proxy.insert(ATTACK, ClipInfo { duration: 1.0 });
        let mut entity = player(proxy);
        press(
            &mut entity,
            CharacterInput {
                space: true,
                ..CharacterInput::default()
            },
        );
        entity.update(0.1).unwrap();
        assert!(machine(&entity).is_in(ATTACK));
        press(&mut entity, keys(true, false));
        entity.update(0.1).unwrap();
        entity.update(0.1).unwrap();
        assert_eq!(entity.position(), Vec3::ZERO);

        let log = entity.component::<MessageLog>().unwrap();
        let times: Vec<f32> = log
            .messages()
            .iter()
            .filter_map(|message| match message {
                Message::Action { action, time } if action == ATTACK => Some(*time),
                _ => None,
            })
            .collect();
        assert_eq!(times.len(), 3);
        assert_relative_eq!(times[2], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn death_freezes_the_player() {
        let mut entity = player(AnimationProxy::new());
        entity
            .broadcast(Message::Damage {
                value: 100.0,
                attacker: "npc".into(),
            })
            .unwrap();
        assert!(machine(&entity).is_in(DEATH));
        press(&mut entity, keys(true, true));
        entity.update(0.1).unwrap();
        assert_eq!(entity.position(), Vec3::ZERO);
        assert!(machine(&entity).is_in(DEATH));
    }
}
