//! Hit points.

use crate::components::{invalid, parse_params};
use crate::define_component;
use crate::ecs::{
    topics, Component, ComponentContext, ComponentType, ConfigError, Entity, InitContext, Message,
    UpdateError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthParams {
    pub health: f32,
    pub max_health: f32,
    /// Damage dealt by this entity's attacks.
    #[serde(default)]
    pub strength: f32,
}

/// Tracks health, applies `health.damage` and announces the outcome.
///
/// Health stays within `[0, max_health]`. Reaching 0 is final: later damage
/// (negative values included) leaves it at 0 and never re-announces death.
#[derive(Debug, Clone)]
pub struct HealthComponent {
    health: f32,
    max_health: f32,
    strength: f32,
}

impl HealthComponent {
    const NAME: &'static str = "HealthComponent";

    pub fn new(params: HealthParams) -> Result<Self, ConfigError> {
        let HealthParams {
            health,
            max_health,
            strength,
        } = params;
        if !max_health.is_finite() || max_health <= 0.0 {
            return Err(invalid(
                Self::NAME,
                "maxHealth",
                format!("must be positive, got {max_health}"),
            ));
        }
        if !health.is_finite() || !(0.0..=max_health).contains(&health) {
            return Err(invalid(
                Self::NAME,
                "health",
                format!("must be within [0, {max_health}], got {health}"),
            ));
        }
        if !strength.is_finite() {
            return Err(invalid(Self::NAME, "strength", "must be finite"));
        }
        Ok(Self {
            health,
            max_health,
            strength,
        })
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Self::new(parse_params(Self::NAME, value)?)
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    fn on_damage(&mut self, ctx: &mut ComponentContext<'_>, value: f32, attacker: &str) {
        let was_alive = self.is_alive();
        if value.is_nan() {
            warn!(entity = ctx.name(), attacker, "ignoring NaN damage");
        } else if was_alive {
            self.health = (self.health - value).clamp(0.0, self.max_health);
        }
        if was_alive && !self.is_alive() {
            debug!(entity = ctx.name(), attacker, "killed");
            ctx.broadcast(Message::Death {
                attacker: attacker.to_string(),
            });
        }
        ctx.broadcast(Message::HealthUpdate {
            health: self.health,
            max_health: self.max_health,
        });
    }
}

impl Component for HealthComponent {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        ctx.subscribe(topics::HEALTH_DAMAGE);
        Ok(())
    }

    fn on_message(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        message: &Message,
    ) -> Result<(), UpdateError> {
        if let Message::Damage { value, attacker } = message {
            self.on_damage(ctx, *value, attacker);
        }
        Ok(())
    }
}
define_component!(HealthComponent, "HealthComponent");

/// Whether an entity can be hurt, and if so whether it is still standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vitality {
    Alive,
    Dead,
    /// No health component attached.
    Ungated,
}

pub fn vitality(entity: &Entity) -> Vitality {
    if !entity.has_component(HealthComponent::KIND) {
        return Vitality::Ungated;
    }
    match entity.component::<HealthComponent>() {
        Some(health) if health.is_alive() => Vitality::Alive,
        _ => Vitality::Dead,
    }
}
