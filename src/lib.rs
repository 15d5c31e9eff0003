//! Voxel sandbox core
//!
//! Three independent pieces share one block table:
//!
//! - block rules ([`world`]): break times, drops, placement and raycasts
//! - player physics ([`physics`]): per-tick movement against a [`world::VoxelWorld`]
//! - multiplayer rooms ([`network`]): lobby state machine and relays
//!
//! The first two are synchronous and allocation-light; callers own the tick
//! loop. The room server runtime is behind the `native` feature.

pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod item;
pub mod network;
pub mod physics;
pub mod time;
pub mod world;

pub use config::{load_config, EngineConfig, ServerConfig};
pub use error::{EngineError, EngineResult};
pub use input::PlayerInput;
pub use physics::{PhysicsConfig, PlayerPhysics};
pub use world::{BlockId, BlockKind, MemoryWorld, VoxelPos, VoxelWorld};
