use super::{BlockId, BlockKind, VoxelPos, VoxelWorld};
use crate::constants::world::MAX_RAY_DISTANCE;
use cgmath::{InnerSpace, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Direction components smaller than this are clamped before use
pub const DIRECTION_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Build a ray from an origin and a (not necessarily normalized) direction.
    ///
    /// Returns `None` for zero-length or non-finite input.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Option<Self> {
        let length = direction.magnitude();
        let finite = origin.x.is_finite() && origin.y.is_finite() && origin.z.is_finite();
        if !finite || !length.is_finite() || length < DIRECTION_EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / length,
        })
    }

    /// Ray looking along a yaw/pitch pair. Yaw 0 looks toward -Z, positive pitch looks up.
    pub fn from_look(origin: Point3<f32>, yaw: f32, pitch: f32) -> Option<Self> {
        let direction = Vector3::new(
            -yaw.sin() * pitch.cos(),
            pitch.sin(),
            -yaw.cos() * pitch.cos(),
        );
        Self::new(origin, direction)
    }

    pub fn point_at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockFace {
    Right,  // +X
    Left,   // -X
    Top,    // +Y
    Bottom, // -Y
    Front,  // +Z
    Back,   // -Z
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::Right,
        BlockFace::Left,
        BlockFace::Top,
        BlockFace::Bottom,
        BlockFace::Front,
        BlockFace::Back,
    ];

    pub fn normal(&self) -> Vector3<f32> {
        let offset = self.offset();
        Vector3::new(offset.x as f32, offset.y as f32, offset.z as f32)
    }

    pub fn offset(&self) -> Vector3<i32> {
        match self {
            BlockFace::Right => Vector3::new(1, 0, 0),
            BlockFace::Left => Vector3::new(-1, 0, 0),
            BlockFace::Top => Vector3::new(0, 1, 0),
            BlockFace::Bottom => Vector3::new(0, -1, 0),
            BlockFace::Front => Vector3::new(0, 0, 1),
            BlockFace::Back => Vector3::new(0, 0, -1),
        }
    }

    pub fn opposite(&self) -> BlockFace {
        match self {
            BlockFace::Right => BlockFace::Left,
            BlockFace::Left => BlockFace::Right,
            BlockFace::Top => BlockFace::Bottom,
            BlockFace::Bottom => BlockFace::Top,
            BlockFace::Front => BlockFace::Back,
            BlockFace::Back => BlockFace::Front,
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, BlockFace::Top | BlockFace::Bottom)
    }

    /// Face crossed when stepping into a voxel along `axis` in direction `step`
    fn entered(axis: usize, step: i32) -> BlockFace {
        match (axis, step > 0) {
            (0, true) => BlockFace::Left,
            (0, false) => BlockFace::Right,
            (1, true) => BlockFace::Bottom,
            (1, false) => BlockFace::Top,
            (_, true) => BlockFace::Back,
            (_, false) => BlockFace::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub position: VoxelPos,
    /// Face of the hit voxel the ray entered through
    pub face: BlockFace,
    pub distance: f32,
    pub block: BlockId,
}

impl RaycastHit {
    /// The cell a block placed against this face would occupy
    pub fn adjacent_position(&self) -> VoxelPos {
        self.position.offset_by(self.face.offset())
    }
}

/// Blocks a ray stops at: anything but air and fluids
fn is_targetable(block: BlockId) -> bool {
    !matches!(
        block.kind(),
        Some(BlockKind::Air) | Some(BlockKind::Water) | Some(BlockKind::Lava)
    )
}

/// Step a ray through the voxel grid (Amanatides & Woo) and return the first
/// targetable voxel within `max_distance`, capped at [`MAX_RAY_DISTANCE`].
pub fn raycast_block<W: VoxelWorld + ?Sized>(
    world: &W,
    ray: &Ray,
    max_distance: f32,
) -> Option<RaycastHit> {
    if !(max_distance > 0.0) {
        return None;
    }
    let max_distance = max_distance.min(MAX_RAY_DISTANCE);
    // Each axis crosses at most ceil(distance) + 1 boundaries
    let max_steps = 3 * (max_distance.ceil() as usize + 1);

    let origin = [ray.origin.x, ray.origin.y, ray.origin.z];
    let mut voxel = [
        origin[0].floor() as i32,
        origin[1].floor() as i32,
        origin[2].floor() as i32,
    ];
    let mut step = [0i32; 3];
    let mut t_max = [0f32; 3];
    let mut t_delta = [0f32; 3];

    for axis in 0..3 {
        let mut d = ray.direction[axis];
        if d.abs() < DIRECTION_EPSILON {
            d = DIRECTION_EPSILON.copysign(d);
        }
        t_delta[axis] = 1.0 / d.abs();

        if d > 0.0 {
            step[axis] = 1;
            t_max[axis] = (voxel[axis] as f32 + 1.0 - origin[axis]) / d;
        } else {
            step[axis] = -1;
            // Sitting exactly on a boundary while moving negative: we are
            // already in the lower voxel, and the next boundary is a full cell away.
            if origin[axis] == voxel[axis] as f32 {
                voxel[axis] -= 1;
            }
            t_max[axis] = (origin[axis] - voxel[axis] as f32) / -d;
        }
    }

    let height = world.height();
    let start = VoxelPos::new(voxel[0], voxel[1], voxel[2]);
    if world.is_y_in_bounds(start.y) {
        let block = world.get_block(start);
        if is_targetable(block) {
            let dominant = (0..3)
                .max_by(|&a, &b| ray.direction[a].abs().total_cmp(&ray.direction[b].abs()))
                .unwrap_or(0);
            return Some(RaycastHit {
                position: start,
                face: BlockFace::entered(dominant, step[dominant]),
                distance: 0.0,
                block,
            });
        }
    }

    for _ in 0..max_steps {
        let axis = if t_max[0] < t_max[1] {
            if t_max[0] < t_max[2] { 0 } else { 2 }
        } else if t_max[1] < t_max[2] {
            1
        } else {
            2
        };

        let distance = t_max[axis];
        if distance > max_distance {
            return None;
        }

        voxel[axis] = voxel[axis].checked_add(step[axis])?;
        t_max[axis] += t_delta[axis];

        let y = voxel[1];
        if (y < 0 && step[1] < 0) || (y >= height && step[1] > 0) {
            return None;
        }
        if !world.is_y_in_bounds(y) {
            continue;
        }

        let position = VoxelPos::new(voxel[0], voxel[1], voxel[2]);
        let block = world.get_block(position);
        if is_targetable(block) {
            return Some(RaycastHit {
                position,
                face: BlockFace::entered(axis, step[axis]),
                distance,
                block,
            });
        }
    }
    None
}
