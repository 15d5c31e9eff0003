use crate::constants::world::WORLD_HEIGHT;
use crate::world::{BlockId, VoxelPos};
use std::collections::HashMap;

/// The storage contract the block rules and physics run against.
///
/// Implementations must be safe for concurrent reads when several players
/// are advanced in parallel.
pub trait VoxelWorld: Send + Sync {
    /// Get a block at the given position
    fn get_block(&self, pos: VoxelPos) -> BlockId;

    /// Set a block at the given position
    fn set_block(&mut self, pos: VoxelPos, block: BlockId);

    /// Number of voxel layers; valid Y is `0..height()`
    fn height(&self) -> i32 {
        WORLD_HEIGHT
    }

    /// Whether Y lies inside the vertical extent
    fn is_y_in_bounds(&self, y: i32) -> bool {
        y >= 0 && y < self.height()
    }
}

/// Sparse in-memory world. Unset voxels are air; out-of-range Y reads as air.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    blocks: HashMap<VoxelPos, BlockId>,
    height: i32,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::with_height(WORLD_HEIGHT)
    }

    pub fn with_height(height: i32) -> Self {
        Self {
            blocks: HashMap::new(),
            height,
        }
    }

    /// Fill an inclusive box with one block
    pub fn fill(&mut self, min: VoxelPos, max: VoxelPos, block: BlockId) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set_block(VoxelPos::new(x, y, z), block);
                }
            }
        }
    }

    /// Number of non-air voxels
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelWorld for MemoryWorld {
    fn get_block(&self, pos: VoxelPos) -> BlockId {
        if !self.is_y_in_bounds(pos.y) {
            return BlockId::AIR;
        }
        self.blocks.get(&pos).copied().unwrap_or(BlockId::AIR)
    }

    fn set_block(&mut self, pos: VoxelPos, block: BlockId) {
        if !self.is_y_in_bounds(pos.y) {
            return;
        }
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    fn height(&self) -> i32 {
        self.height
    }
}
