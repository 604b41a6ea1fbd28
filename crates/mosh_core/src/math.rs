//! Math utilities
//!
//! Re-exports glam with ground-plane helpers and a seeded RNG for spawn scatter

pub use glam::*;

/// Project a world position onto the ground plane (x, z).
#[inline]
pub fn planar(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Distance between two positions measured on the ground plane.
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar(a).distance(planar(b))
}

/// Yaw-only rotation turning the local +Z axis towards `direction`.
///
/// Returns `None` when `direction` has no extent on the ground plane.
pub fn yaw_towards(direction: Vec3) -> Option<Quat> {
    let flat = Vec3::new(direction.x, 0.0, direction.z).try_normalize()?;
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Deterministic random number generator (SplitMix64).
///
/// Same seed, same sequence, on every platform.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform sample in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        // 24 high bits fit the f32 mantissa exactly.
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform sample in `[min, max)`.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }
}
