//! Block placement validation and orientation
//!
//! The placed cell is the one adjacent to the clicked face of the targeted block,
//! see [`RaycastHit::adjacent_position`](crate::world::RaycastHit::adjacent_position).

use crate::world::{is_solid, BlockFace, BlockId, BlockKind, VoxelPos, VoxelWorld};
use cgmath::Vector3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

/// How the placer was looking when the block went down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceContext {
    /// Clicked face of the supporting block
    pub face: BlockFace,
    /// Radians, 0 looks toward -Z
    pub yaw: f32,
    /// Radians, positive looks up
    pub pitch: f32,
}

impl PlaceContext {
    pub fn new(face: BlockFace, yaw: f32, pitch: f32) -> Self {
        Self { face, yaw, pitch }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    North, // -Z
    South, // +Z
    East,  // +X
    West,  // -X
    Up,
    Down,
}

impl Facing {
    /// Horizontal facing for a yaw angle, quantized to four bins
    pub fn from_yaw(yaw: f32) -> Facing {
        let normalized = yaw.rem_euclid(TAU);
        let bin = (normalized / FRAC_PI_2).round() as i32 % 4;
        match bin {
            0 => Facing::North,
            1 => Facing::West,
            2 => Facing::South,
            _ => Facing::East,
        }
    }

    pub fn from_face(face: BlockFace) -> Facing {
        match face {
            BlockFace::Right => Facing::East,
            BlockFace::Left => Facing::West,
            BlockFace::Top => Facing::Up,
            BlockFace::Bottom => Facing::Down,
            BlockFace::Front => Facing::South,
            BlockFace::Back => Facing::North,
        }
    }

    pub fn offset(self) -> Vector3<i32> {
        match self {
            Facing::North => Vector3::new(0, 0, -1),
            Facing::South => Vector3::new(0, 0, 1),
            Facing::East => Vector3::new(1, 0, 0),
            Facing::West => Vector3::new(-1, 0, 0),
            Facing::Up => Vector3::new(0, 1, 0),
            Facing::Down => Vector3::new(0, -1, 0),
        }
    }
}

impl Axis {
    pub fn from_face(face: BlockFace) -> Axis {
        match face {
            BlockFace::Right | BlockFace::Left => Axis::X,
            BlockFace::Top | BlockFace::Bottom => Axis::Y,
            BlockFace::Front | BlockFace::Back => Axis::Z,
        }
    }
}

/// Rotation state stored alongside a directional block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    None,
    Axis(Axis),
    Facing(Facing),
}

/// A validated placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceResult {
    pub position: VoxelPos,
    pub block: BlockId,
    pub orientation: Orientation,
    /// Second cell claimed by two-cell blocks (door upper half, bed head)
    pub secondary: Option<VoxelPos>,
}

fn is_free<W: VoxelWorld + ?Sized>(world: &W, pos: VoxelPos) -> bool {
    world.is_y_in_bounds(pos.y)
        && world
            .get_block(pos)
            .kind()
            .map(BlockKind::is_replaceable)
            .unwrap_or(false)
}

fn has_solid_neighbor<W: VoxelWorld + ?Sized>(world: &W, pos: VoxelPos) -> bool {
    pos.neighbors()
        .iter()
        .any(|&n| is_solid(world.get_block(n)))
}

fn ground_is<W: VoxelWorld + ?Sized>(world: &W, pos: VoxelPos, allowed: &[BlockKind]) -> bool {
    world
        .get_block(pos.below())
        .kind()
        .map(|kind| allowed.contains(&kind))
        .unwrap_or(false)
}

/// Whether `block` may be placed at `pos`
pub fn can_place_block<W: VoxelWorld + ?Sized>(
    world: &W,
    pos: VoxelPos,
    block: BlockId,
    ctx: &PlaceContext,
) -> bool {
    get_place_result(world, pos, block, ctx).is_some()
}

/// Validate a placement and resolve its orientation. `None` rejects it.
pub fn get_place_result<W: VoxelWorld + ?Sized>(
    world: &W,
    pos: VoxelPos,
    block: BlockId,
    ctx: &PlaceContext,
) -> Option<PlaceResult> {
    if block.is_air() || !is_free(world, pos) {
        return None;
    }

    let kind = block.kind();
    let mut result = PlaceResult {
        position: pos,
        block,
        orientation: Orientation::None,
        secondary: None,
    };

    match kind {
        Some(BlockKind::Torch) => {
            if ctx.face == BlockFace::Bottom {
                return None;
            }
            let support = pos.offset_by(ctx.face.opposite().offset());
            if !is_solid(world.get_block(support)) {
                return None;
            }
        }
        Some(BlockKind::Cactus) => {
            if !ground_is(world, pos, &[BlockKind::Sand, BlockKind::RedSand, BlockKind::Cactus]) {
                return None;
            }
            if pos
                .horizontal_neighbors()
                .iter()
                .any(|&n| is_solid(world.get_block(n)))
            {
                return None;
            }
        }
        Some(BlockKind::SugarCane) => {
            let ground = [
                BlockKind::Grass,
                BlockKind::Dirt,
                BlockKind::Sand,
                BlockKind::RedSand,
                BlockKind::SugarCane,
            ];
            if !ground_is(world, pos, &ground) {
                return None;
            }
        }
        Some(BlockKind::OakDoor) => {
            let upper = pos.above();
            if !is_free(world, upper) || !is_solid(world.get_block(pos.below())) {
                return None;
            }
            result.orientation = Orientation::Facing(Facing::from_yaw(ctx.yaw));
            result.secondary = Some(upper);
        }
        Some(BlockKind::Bed) => {
            let facing = Facing::from_yaw(ctx.yaw);
            let head = pos.offset_by(facing.offset());
            if !is_free(world, head)
                || !is_solid(world.get_block(pos.below()))
                || !is_solid(world.get_block(head.below()))
            {
                return None;
            }
            result.orientation = Orientation::Facing(facing);
            result.secondary = Some(head);
        }
        Some(BlockKind::OakLog) => {
            result.orientation = Orientation::Axis(Axis::from_face(ctx.face));
        }
        Some(BlockKind::OakStairs) | Some(BlockKind::StoneStairs) => {
            result.orientation = Orientation::Facing(Facing::from_yaw(ctx.yaw));
        }
        Some(BlockKind::Piston) | Some(BlockKind::Observer) => {
            let facing = if ctx.pitch < -FRAC_PI_4 {
                Facing::Up
            } else if ctx.pitch > FRAC_PI_4 {
                Facing::Down
            } else {
                Facing::from_face(ctx.face)
            };
            result.orientation = Orientation::Facing(facing);
        }
        _ => {}
    }

    if !has_solid_neighbor(world, pos) {
        return None;
    }

    Some(result)
}
