//! Third-person follow camera.

use crate::components::{invalid, parse_params};
use crate::define_component;
use crate::ecs::{Component, ComponentContext, ConfigError, InitContext, UpdateError};
use crate::math::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraParams {
    /// Name of the entity to follow.
    pub target: String,
    /// Camera position in target space.
    #[serde(default = "CameraParams::default_offset")]
    pub offset: Vec3,
    /// Look-at point in target space.
    #[serde(default = "CameraParams::default_look_at")]
    pub look_at: Vec3,
}

impl CameraParams {
    pub fn following(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            offset: Self::default_offset(),
            look_at: Self::default_look_at(),
        }
    }

    fn default_offset() -> Vec3 {
        Vec3::new(-15.0, 20.0, -30.0)
    }

    fn default_look_at() -> Vec3 {
        Vec3::new(0.0, 10.0, 50.0)
    }
}

/// Eases the owning entity's pose towards a point behind and above the
/// target, looking ahead of it. The pose uses the camera convention: local
/// `-Z` points at the look-at point.
#[derive(Debug)]
pub struct ThirdPersonCamera {
    params: CameraParams,
    position: Vec3,
    look_at: Vec3,
}

impl ThirdPersonCamera {
    const NAME: &'static str = "ThirdPersonCamera";

    pub fn new(params: CameraParams) -> Result<Self, ConfigError> {
        if params.target.is_empty() {
            return Err(invalid(Self::NAME, "target", "must not be empty"));
        }
        if !params.offset.is_finite() || !params.look_at.is_finite() {
            return Err(invalid(Self::NAME, "offset", "must be finite"));
        }
        Ok(Self {
            params,
            position: Vec3::ZERO,
            look_at: Vec3::ZERO,
        })
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Self::new(parse_params(Self::NAME, value)?)
    }

    pub fn look_at(&self) -> Vec3 {
        self.look_at
    }
}

/// Rotation whose `-Z` axis points from `eye` to `target`, with `+Y` up.
fn look_rotation(eye: Vec3, target: Vec3) -> Option<Quat> {
    let back = (eye - target).try_normalize()?;
    let right = Vec3::Y.cross(back).try_normalize()?;
    let up = back.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, back)).normalize())
}

impl Component for ThirdPersonCamera {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        self.position = ctx.position();
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), UpdateError> {
        let Some(target) = ctx.world().find(&self.params.target) else {
            return Ok(());
        };
        let pose = target.pose();
        let ideal_position = pose.rotation * self.params.offset + pose.position;
        let ideal_look_at = pose.rotation * self.params.look_at + pose.position;

        let t = 1.0 - 0.001_f32.powf(dt);
        self.position = self.position.lerp(ideal_position, t);
        self.look_at = self.look_at.lerp(ideal_look_at, t);

        ctx.set_position(self.position);
        if let Some(rotation) = look_rotation(self.position, self.look_at) {
            ctx.set_rotation(rotation);
        }
        Ok(())
    }
}
define_component!(ThirdPersonCamera, "ThirdPersonCamera");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Entity, EntityManager};
    use approx::assert_relative_eq;
    use serde_json::json;

    fn rig() -> EntityManager {
        let mut manager = EntityManager::new();
        let mut target = Entity::new();
        target.set_position(Vec3::new(10.0, 0.0, 0.0));
        manager.add(target, "player").unwrap();

        let mut camera = Entity::new();
        camera
            .add_component(ThirdPersonCamera::new(CameraParams::following("player")).unwrap())
            .unwrap();
        manager.add(camera, "player-camera").unwrap();
        manager
    }

    #[test]
    fn converges_behind_the_target() {
        let mut manager = rig();
        for _ in 0..200 {
            manager.update(1.0 / 30.0);
        }
        let camera = manager.get("player-camera").unwrap();
        assert_relative_eq!(camera.position().x, -5.0, epsilon = 1e-3);
        assert_relative_eq!(camera.position().y, 20.0, epsilon = 1e-3);
        assert_relative_eq!(camera.position().z, -30.0, epsilon = 1e-3);

        let view = camera.rotation() * Vec3::NEG_Z;
        let expected = (Vec3::new(10.0, 10.0, 50.0) - camera.position()).normalize();
        assert_relative_eq!(view.dot(expected), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn a_full_second_closes_most_of_the_gap() {
        let mut manager = rig();
        manager.update(1.0);
        let camera = manager.get("player-camera").unwrap();
        // 1 - 0.001^1 of the way from the origin
        assert_relative_eq!(camera.position().y, 20.0 * 0.999, epsilon = 1e-3);
    }

    #[test]
    fn missing_target_holds_still() {
        let mut manager = rig();
        manager.remove("player").unwrap();
        let report = manager.update(0.1);
        assert_eq!(report.failures, 0);
        let camera = manager.get("player-camera").unwrap();
        assert_eq!(camera.position(), Vec3::ZERO);
    }

    #[test]
    fn params_default_the_rig() {
        let camera = ThirdPersonCamera::from_value(json!({ "target": "player" })).unwrap();
        assert_eq!(camera.params.offset, Vec3::new(-15.0, 20.0, -30.0));
        assert!(ThirdPersonCamera::from_value(json!({})).is_err());
    }
}
