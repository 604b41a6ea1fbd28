//! Melee hits, timed against the attack animation.

use crate::components::{
    invalid, parse_params, vitality, HealthComponent, SpatialGridController, Vitality,
};
use crate::define_component;
use crate::ecs::{
    topics, Component, ComponentContext, ConfigError, InitContext, Message, UpdateError,
};
use crate::math::{planar, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::debug;

/// Targets count as "in front" when the cosine between the attacker's facing
/// and the direction to them falls in this range.
const FACING: RangeInclusive<f32> = 0.9..=1.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackParams {
    /// Seconds into the action at which the hit lands.
    pub timing: f32,
    /// Reach of the hit.
    #[serde(default = "AttackParams::default_radius")]
    pub radius: f32,
    /// Action name that triggers a hit.
    #[serde(default = "AttackParams::default_action")]
    pub action: String,
}

impl AttackParams {
    fn default_radius() -> f32 {
        2.0
    }

    fn default_action() -> String {
        "attack".to_string()
    }
}

/// Listens to `player.action` and damages whatever stands in front of the
/// entity when the action crosses its hit time.
#[derive(Debug)]
pub struct AttackController {
    params: AttackParams,
    current: Option<String>,
    timer: f32,
}

impl AttackController {
    const NAME: &'static str = "AttackController";

    pub fn new(params: AttackParams) -> Result<Self, ConfigError> {
        if !params.timing.is_finite() || params.timing < 0.0 {
            return Err(invalid(
                Self::NAME,
                "timing",
                format!("must be >= 0, got {}", params.timing),
            ));
        }
        if !params.radius.is_finite() || params.radius < 0.0 {
            return Err(invalid(
                Self::NAME,
                "radius",
                format!("must be >= 0, got {}", params.radius),
            ));
        }
        Ok(Self {
            params,
            current: None,
            timer: 0.0,
        })
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Self::new(parse_params(Self::NAME, value)?)
    }

    fn on_action(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        action: &str,
        time: f32,
    ) -> Result<(), UpdateError> {
        if self.current.as_deref() != Some(action) {
            self.current = Some(action.to_string());
            self.timer = 0.0;
        }
        let previous = self.timer;
        self.timer = time;

        let crossed = previous < self.params.timing && time >= self.params.timing;
        if crossed && action == self.params.action {
            self.strike(ctx)?;
        }
        Ok(())
    }

    fn strike(&self, ctx: &mut ComponentContext<'_>) -> Result<(), UpdateError> {
        let grid = ctx.require_sibling::<SpatialGridController>()?;
        let strength = ctx
            .sibling::<HealthComponent>()
            .map(HealthComponent::strength)
            .unwrap_or(0.0);
        let world = ctx.world();
        let origin = ctx.position();
        let facing = planar(ctx.rotation() * Vec3::Z).normalize_or_zero();

        for near in grid.find_nearby_entities(self.params.radius) {
            let Some(target) = world.get(near.entity) else {
                continue;
            };
            if vitality(target) != Vitality::Alive {
                continue;
            }
            let towards = (planar(target.position()) - planar(origin)).normalize_or_zero();
            if !FACING.contains(&facing.dot(towards)) {
                continue;
            }
            debug!(attacker = ctx.name(), victim = target.name(), strength, "hit");
            ctx.send_to(
                near.entity,
                Message::Damage {
                    value: strength,
                    attacker: ctx.name().to_string(),
                },
            );
        }
        Ok(())
    }
}

impl Component for AttackController {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        ctx.subscribe(topics::PLAYER_ACTION);
        Ok(())
    }

    fn on_message(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        message: &Message,
    ) -> Result<(), UpdateError> {
        match message {
            Message::Action { action, time } => self.on_action(ctx, action, *time),
            _ => Ok(()),
        }
    }
}
define_component!(AttackController, "AttackController");
