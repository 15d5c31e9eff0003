use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Position of a voxel in the world (world coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The voxel containing a world-space point
    pub fn from_world_pos(pos: Point3<f32>) -> Self {
        Self {
            x: pos.x.floor() as i32,
            y: pos.y.floor() as i32,
            z: pos.z.floor() as i32,
        }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn offset_by(&self, delta: Vector3<i32>) -> Self {
        self.offset(delta.x, delta.y, delta.z)
    }

    pub fn above(&self) -> Self {
        self.offset(0, 1, 0)
    }

    pub fn below(&self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The six face-adjacent neighbours
    pub fn neighbors(&self) -> [VoxelPos; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }

    /// The four horizontal neighbours
    pub fn horizontal_neighbors(&self) -> [VoxelPos; 4] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }
}
