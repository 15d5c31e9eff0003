/// Data-oriented axis-aligned bounding boxes
///
/// Pure functions over plain `AABB` data; the collision sweep builds every
/// box it tests through these.
use crate::constants::physics::COLLISION_EPSILON;
use crate::world::{CollisionShape, VoxelPos};
use cgmath::{Point3, Vector3};

/// Axis-Aligned Bounding Box - pure data structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

/// Create new AABB from min/max points
pub fn create_aabb(min: Point3<f32>, max: Point3<f32>) -> AABB {
    AABB { min, max }
}

/// Box of a body standing with its feet centred on `feet`
pub fn aabb_from_feet(feet: Point3<f32>, width: f32, height: f32) -> AABB {
    let half = width * 0.5;
    AABB {
        min: Point3::new(feet.x - half, feet.y, feet.z - half),
        max: Point3::new(feet.x + half, feet.y + height, feet.z + half),
    }
}

/// Collision box of a voxel with the given shape, `None` when it has no volume
pub fn aabb_for_voxel(pos: VoxelPos, shape: CollisionShape) -> Option<AABB> {
    let height = shape.height();
    if height <= 0.0 {
        return None;
    }
    let min = Point3::new(pos.x as f32, pos.y as f32, pos.z as f32);
    Some(AABB {
        min,
        max: Point3::new(min.x + 1.0, min.y + height, min.z + 1.0),
    })
}

/// Test if two AABBs overlap by more than the collision epsilon.
///
/// Boxes that only touch do not intersect, so a body resting exactly on a
/// surface is not considered embedded in it.
pub fn aabb_intersects(a: &AABB, b: &AABB) -> bool {
    a.min.x < b.max.x - COLLISION_EPSILON
        && a.max.x > b.min.x + COLLISION_EPSILON
        && a.min.y < b.max.y - COLLISION_EPSILON
        && a.max.y > b.min.y + COLLISION_EPSILON
        && a.min.z < b.max.z - COLLISION_EPSILON
        && a.max.z > b.min.z + COLLISION_EPSILON
}

/// Test if AABB contains a point
pub fn aabb_contains_point(aabb: &AABB, point: Point3<f32>) -> bool {
    point.x >= aabb.min.x
        && point.x <= aabb.max.x
        && point.y >= aabb.min.y
        && point.y <= aabb.max.y
        && point.z >= aabb.min.z
        && point.z <= aabb.max.z
}

/// Create translated copy of AABB
pub fn aabb_translated(aabb: &AABB, offset: Vector3<f32>) -> AABB {
    AABB {
        min: aabb.min + offset,
        max: aabb.max + offset,
    }
}

/// Smallest box containing both inputs
pub fn aabb_union(a: &AABB, b: &AABB) -> AABB {
    AABB {
        min: Point3::new(a.min.x.min(b.min.x), a.min.y.min(b.min.y), a.min.z.min(b.min.z)),
        max: Point3::new(a.max.x.max(b.max.x), a.max.y.max(b.max.y), a.max.z.max(b.max.z)),
    }
}

/// Inclusive voxel range covered by the box
pub fn aabb_voxel_bounds(aabb: &AABB) -> (VoxelPos, VoxelPos) {
    (
        VoxelPos::new(
            aabb.min.x.floor() as i32,
            aabb.min.y.floor() as i32,
            aabb.min.z.floor() as i32,
        ),
        VoxelPos::new(
            aabb.max.x.floor() as i32,
            aabb.max.y.floor() as i32,
            aabb.max.z.floor() as i32,
        ),
    )
}
