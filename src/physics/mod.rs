//! Player physics
//!
//! One [`PlayerPhysics`] per connected player, advanced once per tick
//! against any [`VoxelWorld`](crate::world::VoxelWorld).

pub mod aabb;
pub mod collision;
pub mod player;

pub use aabb::AABB;
pub use collision::{move_with_collision, BodyDims, MoveResult};
pub use player::{sample_medium, Medium, MovementMode, PlayerPhysics};

use crate::constants::physics as defaults;
use cgmath::Vector3;
use serde::{Deserialize, Serialize};

pub type Vec3 = Vector3<f32>;

/// Tunable physics values, loaded from the `[physics]` config section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub player_width: f32,
    pub player_height: f32,
    pub eye_height: f32,
    pub step_height: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub sneak_speed: f32,
    pub fly_speed: f32,
    pub max_air: i32,
    pub fall_damage_threshold: f32,
    pub fall_damage_per_block: f32,
    pub slime_bounce: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            player_width: defaults::PLAYER_WIDTH,
            player_height: defaults::PLAYER_HEIGHT,
            eye_height: defaults::EYE_HEIGHT,
            step_height: defaults::STEP_HEIGHT,
            gravity: defaults::GRAVITY,
            jump_velocity: defaults::JUMP_VELOCITY,
            walk_speed: defaults::WALK_SPEED,
            sprint_speed: defaults::SPRINT_SPEED,
            sneak_speed: defaults::SNEAK_SPEED,
            fly_speed: defaults::FLY_SPEED,
            max_air: defaults::MAX_AIR,
            fall_damage_threshold: defaults::FALL_DAMAGE_THRESHOLD,
            fall_damage_per_block: defaults::FALL_DAMAGE_PER_BLOCK,
            slime_bounce: defaults::SLIME_BOUNCE,
        }
    }
}

impl PhysicsConfig {
    pub fn body_dims(&self) -> BodyDims {
        BodyDims {
            width: self.player_width,
            height: self.player_height,
            step_height: self.step_height,
        }
    }
}
