//! Block rules
//!
//! Static block tables and the pure functions built on them: break time,
//! drops, placement validation and voxel raycasting. Nothing here owns
//! world storage; callers pass any [`VoxelWorld`].

pub mod block;
pub mod block_drops;
pub mod mining;
pub mod placement;
pub mod position;
pub mod ray;
pub mod world_interface;

pub use block::{
    block_properties, collision_shape, is_kind, is_solid, slipperiness, BlockId, BlockKind,
    BlockProperties, CollisionShape, ToolRule,
};
pub use block_drops::{can_harvest, drop_table, drops_with, get_block_drops};
pub use mining::{break_time_with, get_break_time, MiningContext, MiningProgress};
pub use placement::{
    can_place_block, get_place_result, Axis, Facing, Orientation, PlaceContext, PlaceResult,
};
pub use position::VoxelPos;
pub use ray::{raycast_block, BlockFace, Ray, RaycastHit};
pub use world_interface::{MemoryWorld, VoxelWorld};
