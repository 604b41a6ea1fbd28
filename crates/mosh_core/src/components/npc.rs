//! Zombie AI: face the player, shuffle towards it, die when told to.

use crate::components::{invalid, parse_params, vitality, SpatialGridController, Vitality};
use crate::define_component;
use crate::ecs::{
    topics, Component, ComponentContext, ConfigError, Entities, InitContext, Message, UpdateError,
};
use crate::fsm::{npc_machine, AnimationProxy, CharacterInput, FiniteStateMachine, DEATH, IDLE};
use crate::math::{yaw_towards, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NpcParams {
    /// Name of the entity to chase.
    pub target: String,
    /// Radius of the target search.
    pub seek_radius: f32,
    /// Radius of the grid query used for contact detection.
    pub contact_query_radius: f32,
    /// Exact planar distance at which a neighbour blocks movement.
    pub contact_distance: f32,
    /// Units per second. Zero keeps the NPC in place.
    pub walk_speed: f32,
    /// Height at which the model is presented above the entity position.
    pub model_lift: f32,
}

impl Default for NpcParams {
    fn default() -> Self {
        Self {
            target: "player".to_string(),
            seek_radius: 100.0,
            contact_query_radius: 5.0,
            contact_distance: 4.0,
            walk_speed: 0.0,
            model_lift: 0.35,
        }
    }
}

pub struct NpcController {
    params: NpcParams,
    machine: FiniteStateMachine,
    input: CharacterInput,
    /// Where the presentation layer should draw the model.
    model_position: Vec3,
}

impl NpcController {
    const NAME: &'static str = "NpcController";

    pub fn new(params: NpcParams, proxy: AnimationProxy) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("seekRadius", params.seek_radius),
            ("contactQueryRadius", params.contact_query_radius),
            ("contactDistance", params.contact_distance),
            ("walkSpeed", params.walk_speed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(Self::NAME, field, format!("must be >= 0, got {value}")));
            }
        }
        if params.contact_distance > params.contact_query_radius {
            return Err(invalid(
                Self::NAME,
                "contactDistance",
                "must not exceed contactQueryRadius",
            ));
        }
        if params.target.is_empty() {
            return Err(invalid(Self::NAME, "target", "must not be empty"));
        }
        Ok(Self {
            params,
            machine: npc_machine(proxy)?,
            input: CharacterInput::default(),
            model_position: Vec3::ZERO,
        })
    }

    pub fn from_value(value: serde_json::Value, proxy: AnimationProxy) -> Result<Self, ConfigError> {
        Self::new(parse_params(Self::NAME, value)?, proxy)
    }

    pub fn params(&self) -> &NpcParams {
        &self.params
    }

    pub fn machine(&self) -> &FiniteStateMachine {
        &self.machine
    }

    pub fn model_position(&self) -> Vec3 {
        self.model_position
    }

    fn think(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), UpdateError> {
        let grid = ctx.require_sibling::<SpatialGridController>()?;
        let world = ctx.world();
        let position = ctx.position();

        let target = grid
            .find_nearby_entities(self.params.seek_radius)
            .into_iter()
            .filter_map(|near| world.get(near.entity).map(|entity| (near.distance, entity)))
            .filter(|(_, entity)| {
                entity.name() == self.params.target && vitality(entity) == Vitality::Alive
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, entity)| entity.position());

        let direction = target.and_then(|target| {
            Vec3::new(target.x - position.x, 0.0, target.z - position.z).try_normalize()
        });
        let Some(direction) = direction else {
            self.input = CharacterInput::default();
            return Ok(());
        };

        if let Some(rotation) = yaw_towards(direction) {
            ctx.set_rotation(rotation);
        }

        let blocked = self.is_blocked(grid, world);
        let moving = self.params.walk_speed > 0.0 && !blocked;
        if moving {
            ctx.set_position(position + direction * self.params.walk_speed * dt);
        }
        self.input.forward = moving;
        Ok(())
    }

    /// Any living or non-health-gated neighbour within the contact distance.
    fn is_blocked(&self, grid: &SpatialGridController, world: &Entities) -> bool {
        grid.find_nearby_entities(self.params.contact_query_radius)
            .into_iter()
            .filter(|near| near.distance <= self.params.contact_distance)
            .any(|near| match world.get(near.entity) {
                Some(entity) => vitality(entity) != Vitality::Dead,
                None => false,
            })
    }
}

impl Component for NpcController {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        self.model_position = ctx.position() + Vec3::Y * self.params.model_lift;
        ctx.subscribe(topics::HEALTH_DEATH);
        ctx.subscribe(topics::UPDATE_POSITION);
        ctx.subscribe(topics::RESOURCE_LOADED);
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), UpdateError> {
        if self.machine.is_uninitialized() {
            return Ok(());
        }
        if !self.machine.is_in(DEATH) {
            self.think(ctx, dt)?;
        }
        self.machine.update(dt, &self.input)?;

        if let (Some(action), Some(time)) = (
            self.machine.current_name(),
            self.machine.current_action().map(|binding| binding.time),
        ) {
            ctx.broadcast(Message::Action {
                action: action.to_string(),
                time,
            });
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        message: &Message,
    ) -> Result<(), UpdateError> {
        match message {
            Message::Death { attacker } => {
                debug!(entity = ctx.name(), attacker = %attacker, "npc down");
                self.input = CharacterInput::default();
                self.machine.set_state(DEATH)?;
            }
            Message::PositionUpdate { value } => {
                self.model_position = *value + Vec3::Y * self.params.model_lift;
            }
            Message::ResourcesLoaded if self.machine.is_uninitialized() => {
                self.machine.set_state(IDLE)?;
            }
            _ => {}
        }
        Ok(())
    }
}
define_component!(NpcController, "NpcController");
