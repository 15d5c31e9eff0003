//! Voxel collision for a single upright body
//!
//! Movement is resolved one axis at a time (X, Z, then Y). Every candidate
//! voxel is looked up individually so slab shapes stay exact.

use super::aabb::{
    aabb_for_voxel, aabb_from_feet, aabb_intersects, aabb_translated, aabb_union,
    aabb_voxel_bounds, AABB,
};
use crate::constants::physics::{COLLISION_EPSILON, GROUND_PROBE};
use crate::world::{collision_shape, is_solid, VoxelPos, VoxelWorld};
use cgmath::{Point3, Vector3};

/// Size of the body being moved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDims {
    pub width: f32,
    pub height: f32,
    pub step_height: f32,
}

/// Outcome of one collision-resolved move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    pub position: Point3<f32>,
    pub blocked_x: bool,
    pub blocked_z: bool,
    /// Downward motion was stopped by a floor
    pub landed: bool,
    pub hit_ceiling: bool,
    /// The body was lifted onto a ledge this move
    pub stepped: bool,
}

/// Collision boxes of every solid voxel overlapping `aabb`.
///
/// Layers outside the world's vertical range are skipped entirely.
pub fn collect_colliders<W: VoxelWorld + ?Sized>(world: &W, aabb: &AABB) -> Vec<AABB> {
    let (min, max) = aabb_voxel_bounds(aabb);
    let min_y = min.y.max(0);
    let max_y = max.y.min(world.height() - 1);

    let mut colliders = Vec::new();
    for x in min.x..=max.x {
        for y in min_y..=max_y {
            for z in min.z..=max.z {
                let pos = VoxelPos::new(x, y, z);
                let shape = collision_shape(world.get_block(pos));
                if let Some(block) = aabb_for_voxel(pos, shape) {
                    if aabb_intersects(aabb, &block) {
                        colliders.push(block);
                    }
                }
            }
        }
    }
    colliders
}

pub fn collides<W: VoxelWorld + ?Sized>(world: &W, aabb: &AABB) -> bool {
    !collect_colliders(world, aabb).is_empty()
}

/// Whether a body at `feet` has something solid within the ground probe distance
pub fn probe_ground<W: VoxelWorld + ?Sized>(world: &W, feet: Point3<f32>, dims: &BodyDims) -> bool {
    let body = aabb_from_feet(feet, dims.width, dims.height);
    let probe = aabb_translated(&body, Vector3::new(0.0, -GROUND_PROBE, 0.0));
    collides(world, &probe)
}

/// Whether any footprint corner has a solid voxel in the layer below the feet
pub fn corners_supported<W: VoxelWorld + ?Sized>(world: &W, feet: Point3<f32>, width: f32) -> bool {
    let half = width * 0.5 - COLLISION_EPSILON;
    let y = (feet.y - GROUND_PROBE).floor() as i32;
    if !world.is_y_in_bounds(y) {
        return false;
    }
    [(-half, -half), (half, -half), (-half, half), (half, half)]
        .iter()
        .any(|&(dx, dz)| {
            let pos = VoxelPos::new(
                (feet.x + dx).floor() as i32,
                y,
                (feet.z + dz).floor() as i32,
            );
            is_solid(world.get_block(pos))
        })
}

/// Colliders the box would sweep into on its way from `from` to `to`.
///
/// Voxels the body already overlaps are left out so an embedded body can
/// always move out again.
fn blocking_colliders<W: VoxelWorld + ?Sized>(world: &W, from: &AABB, to: &AABB) -> Vec<AABB> {
    let sweep = aabb_union(from, to);
    collect_colliders(world, &sweep)
        .into_iter()
        .filter(|c| !aabb_intersects(from, c))
        .collect()
}

/// Move along one horizontal axis (0 = X, 2 = Z). Returns the new feet
/// position, whether the move was blocked, and whether it stepped up.
fn move_horizontal<W: VoxelWorld + ?Sized>(
    world: &W,
    feet: Point3<f32>,
    axis: usize,
    delta: f32,
    dims: &BodyDims,
    allow_step_up: bool,
) -> (Point3<f32>, bool, bool) {
    let mut target = feet;
    target[axis] += delta;

    let from = aabb_from_feet(feet, dims.width, dims.height);
    let to = aabb_from_feet(target, dims.width, dims.height);
    let blocking = blocking_colliders(world, &from, &to);
    if blocking.is_empty() {
        return (target, false, false);
    }

    if allow_step_up {
        let top = blocking
            .iter()
            .map(|c| c.max.y)
            .fold(f32::NEG_INFINITY, f32::max);
        let raise = top - feet.y;
        if raise > 0.0 && raise <= dims.step_height {
            let lifted_from = aabb_from_feet(Point3::new(feet.x, top, feet.z), dims.width, dims.height);
            let lifted = Point3::new(target.x, top, target.z);
            let lifted_to = aabb_from_feet(lifted, dims.width, dims.height);
            if !collides(world, &aabb_union(&lifted_from, &lifted_to)) {
                return (lifted, false, true);
            }
        }
    }

    // Slide up to the nearest face, never backwards past the start
    let half = dims.width * 0.5;
    let mut resolved = target;
    if delta > 0.0 {
        let face = blocking
            .iter()
            .map(|c| c.min[axis])
            .fold(f32::INFINITY, f32::min);
        resolved[axis] = (face - half - COLLISION_EPSILON).clamp(feet[axis], target[axis]);
    } else {
        let face = blocking
            .iter()
            .map(|c| c.max[axis])
            .fold(f32::NEG_INFINITY, f32::max);
        resolved[axis] = (face + half + COLLISION_EPSILON).clamp(target[axis], feet[axis]);
    }
    (resolved, true, false)
}

/// Resolve `delta` against the world, X then Z then Y.
///
/// Each axis is swept, so fast bodies cannot tunnel through thin floors.
/// Step-up is only attempted for the horizontal axes and only when
/// `allow_step_up` is set.
pub fn move_with_collision<W: VoxelWorld + ?Sized>(
    world: &W,
    feet: Point3<f32>,
    delta: Vector3<f32>,
    dims: &BodyDims,
    allow_step_up: bool,
) -> MoveResult {
    let mut result = MoveResult {
        position: feet,
        blocked_x: false,
        blocked_z: false,
        landed: false,
        hit_ceiling: false,
        stepped: false,
    };
    if !(delta.x.is_finite() && delta.y.is_finite() && delta.z.is_finite()) {
        return result;
    }

    for (axis, amount) in [(0usize, delta.x), (2usize, delta.z)] {
        if amount.abs() < f32::EPSILON {
            continue;
        }
        let (position, blocked, stepped) =
            move_horizontal(world, result.position, axis, amount, dims, allow_step_up);
        result.position = position;
        result.stepped |= stepped;
        if axis == 0 {
            result.blocked_x = blocked;
        } else {
            result.blocked_z = blocked;
        }
    }

    if delta.y.abs() >= f32::EPSILON {
        let start = result.position;
        let target = Point3::new(start.x, start.y + delta.y, start.z);
        let from = aabb_from_feet(start, dims.width, dims.height);
        let to = aabb_from_feet(target, dims.width, dims.height);
        let blocking = blocking_colliders(world, &from, &to);

        if blocking.is_empty() {
            result.position = target;
        } else if delta.y < 0.0 {
            // Snap onto the highest surface in the way
            let top = blocking
                .iter()
                .map(|c| c.max.y)
                .fold(f32::NEG_INFINITY, f32::max);
            result.position.y = top.clamp(target.y, start.y);
            result.landed = true;
        } else {
            let ceiling = blocking
                .iter()
                .map(|c| c.min.y)
                .fold(f32::INFINITY, f32::min);
            result.position.y = (ceiling - dims.height - COLLISION_EPSILON).clamp(start.y, target.y);
            result.hit_ceiling = true;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BlockId, BlockKind, MemoryWorld};

    const DIMS: BodyDims = BodyDims {
        width: 0.6,
        height: 1.8,
        step_height: 0.6,
    };

    fn floor_world() -> MemoryWorld {
        let mut world = MemoryWorld::new();
        world.fill(VoxelPos::new(-8, 10, -8), VoxelPos::new(8, 10, 8), BlockId::STONE);
        world
    }

    #[test]
    fn test_falling_snaps_to_floor() {
        let world = floor_world();
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 11.3, 0.5),
            Vector3::new(0.0, -1.0, 0.0),
            &DIMS,
            false,
        );
        assert!(result.landed);
        assert_eq!(result.position.y, 11.0);
    }

    #[test]
    fn test_wall_blocks_horizontal_motion() {
        let mut world = floor_world();
        world.fill(VoxelPos::new(2, 11, -2), VoxelPos::new(2, 12, 2), BlockId::STONE);
        let result = move_with_collision(
            &world,
            Point3::new(1.0, 11.0, 0.5),
            Vector3::new(1.0, 0.0, 0.0),
            &DIMS,
            true,
        );
        assert!(result.blocked_x);
        assert!(result.position.x <= 2.0 - 0.3);
        assert!(result.position.x > 1.6);
    }

    #[test]
    fn test_step_up_onto_slab_and_block() {
        let mut world = floor_world();
        world.set_block(VoxelPos::new(1, 11, 0), BlockKind::StoneSlab.id());
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 11.0, 0.5),
            Vector3::new(0.5, 0.0, 0.0),
            &DIMS,
            true,
        );
        assert!(result.stepped);
        assert_eq!(result.position.y, 11.5);

        // A full block is higher than the step height
        world.set_block(VoxelPos::new(1, 11, 0), BlockId::STONE);
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 11.0, 0.5),
            Vector3::new(0.5, 0.0, 0.0),
            &DIMS,
            true,
        );
        assert!(!result.stepped);
        assert!(result.blocked_x);
    }

    #[test]
    fn test_no_step_up_when_disallowed() {
        let mut world = floor_world();
        world.set_block(VoxelPos::new(1, 11, 0), BlockKind::StoneSlab.id());
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 11.0, 0.5),
            Vector3::new(0.5, 0.0, 0.0),
            &DIMS,
            false,
        );
        assert!(result.blocked_x);
        assert_eq!(result.position.y, 11.0);
    }

    #[test]
    fn test_ceiling_stops_rise() {
        let mut world = floor_world();
        world.set_block(VoxelPos::new(0, 13, 0), BlockId::STONE);
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 11.0, 0.5),
            Vector3::new(0.0, 0.5, 0.0),
            &DIMS,
            false,
        );
        assert!(result.hit_ceiling);
        assert!(result.position.y + DIMS.height <= 13.0);
    }

    #[test]
    fn test_ground_probe_and_corners() {
        let world = floor_world();
        assert!(probe_ground(&world, Point3::new(0.5, 11.03, 0.5), &DIMS));
        assert!(!probe_ground(&world, Point3::new(0.5, 11.5, 0.5), &DIMS));
        assert!(corners_supported(&world, Point3::new(8.5, 11.0, 0.5), 0.6));
        assert!(!corners_supported(&world, Point3::new(9.5, 11.0, 0.5), 0.6));
    }

    #[test]
    fn test_out_of_range_layers_are_ignored() {
        let world = MemoryWorld::with_height(16);
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(0.0, -5.0, 0.0),
            &DIMS,
            false,
        );
        assert!(!result.landed);
        assert_eq!(result.position.y, -4.5);
    }

    #[test]
    fn test_fast_fall_does_not_tunnel() {
        let world = floor_world();
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 14.0, 0.5),
            Vector3::new(0.0, -7.8, 0.0),
            &DIMS,
            false,
        );
        assert!(result.landed);
        assert_eq!(result.position.y, 11.0);
    }

    #[test]
    fn test_embedded_body_can_walk_out() {
        let mut world = floor_world();
        world.set_block(VoxelPos::new(0, 11, 0), BlockId::STONE);
        let result = move_with_collision(
            &world,
            Point3::new(0.5, 11.0, 0.5),
            Vector3::new(-1.0, 0.0, 0.0),
            &DIMS,
            false,
        );
        assert!(!result.blocked_x);
        assert_eq!(result.position.x, -0.5);
    }
}
