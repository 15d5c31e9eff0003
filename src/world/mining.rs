//! Block breaking time

use crate::constants::mining::*;
use crate::item::{ToolRef, ToolTier};
use crate::world::{block_properties, BlockId, VoxelPos};

/// Player state that affects how fast a block breaks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningContext {
    pub in_water: bool,
    pub on_ground: bool,
    pub haste_level: u32,
    pub fatigue_level: u32,
}

impl Default for MiningContext {
    fn default() -> Self {
        Self {
            in_water: false,
            on_ground: true,
            haste_level: 0,
            fatigue_level: 0,
        }
    }
}

/// Ticks needed to break `block`, given a wire tool token and an optional tier override.
///
/// Returns `None` for unbreakable blocks and `Some(0)` for instant ones.
pub fn get_break_time(
    block: BlockId,
    tool: Option<&str>,
    tier_override: Option<ToolTier>,
    ctx: &MiningContext,
) -> Option<u32> {
    break_time_with(block, &ToolRef::resolve(tool, tier_override), ctx)
}

/// Same as [`get_break_time`] for an already parsed tool
pub fn break_time_with(block: BlockId, tool: &ToolRef, ctx: &MiningContext) -> Option<u32> {
    let props = block_properties(block);
    if props.hardness < 0 {
        return None;
    }
    if props.hardness == 0 {
        return Some(0);
    }

    let mut multiplier = 1.0f64;
    if props.tool.matches_category(tool) {
        multiplier *= tool.tier.mining_speed() as f64;
    }
    if ctx.haste_level > 0 {
        multiplier *= 1.0 + HASTE_PER_LEVEL * ctx.haste_level as f64;
    }
    if ctx.fatigue_level > 0 {
        multiplier *= FATIGUE_BASE.powi(ctx.fatigue_level as i32);
    }

    // Damage per tick is multiplier / hardness, each penalty divides it.
    // Work with the reciprocal so exact inputs stay exact.
    let mut ticks = props.hardness as f64 / multiplier;
    if !props.tool.is_satisfied_by(tool) {
        ticks *= WRONG_TOOL_PENALTY;
    }
    if ctx.in_water {
        ticks *= SUBMERGED_PENALTY;
    }
    if !ctx.on_ground {
        ticks *= AIRBORNE_PENALTY;
    }

    if ticks <= 1.0 {
        return Some(0);
    }
    Some(ticks.ceil() as u32)
}

/// Break progress on one targeted voxel, advanced once per game tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningProgress {
    pub block_pos: VoxelPos,
    pub total_ticks: u32,
    pub elapsed_ticks: u32,
}

impl MiningProgress {
    pub fn new(block_pos: VoxelPos, total_ticks: u32) -> Self {
        Self {
            block_pos,
            total_ticks,
            elapsed_ticks: 0,
        }
    }

    /// Advance one tick. Returns true once the block is broken.
    pub fn tick(&mut self) -> bool {
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_ticks >= self.total_ticks
    }

    /// Fraction in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        if self.total_ticks == 0 {
            return 1.0;
        }
        (self.elapsed_ticks as f32 / self.total_ticks as f32).min(1.0)
    }

    pub fn reset(&mut self) {
        self.elapsed_ticks = 0;
    }
}
