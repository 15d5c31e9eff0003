use crate::item::{ToolCategory, ToolRef, ToolTier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a block type, as stored in the world and sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct BlockId(pub u16);

impl Default for BlockId {
    fn default() -> Self {
        BlockId::AIR
    }
}

impl BlockId {
    pub const AIR: BlockId = BlockKind::Air.id();
    pub const STONE: BlockId = BlockKind::Stone.id();
    pub const GRASS: BlockId = BlockKind::Grass.id();
    pub const DIRT: BlockId = BlockKind::Dirt.id();
    pub const SAND: BlockId = BlockKind::Sand.id();
    pub const WATER: BlockId = BlockKind::Water.id();
    pub const LAVA: BlockId = BlockKind::Lava.id();
    pub const BEDROCK: BlockId = BlockKind::Bedrock.id();

    /// The registry entry for this id, if it has one
    pub fn kind(self) -> Option<BlockKind> {
        BlockKind::from_id(self)
    }

    pub fn is_air(self) -> bool {
        self == BlockId::AIR
    }
}

impl From<BlockKind> for BlockId {
    fn from(kind: BlockKind) -> Self {
        kind.id()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}", kind.properties().name),
            None => write!(f, "Block({})", self.0),
        }
    }
}

/// Collision shape used by the physics engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionShape {
    /// No collision at all (air, fluids, plants, ladders)
    None,
    /// Bottom half of the voxel
    Slab,
    Full,
}

impl CollisionShape {
    /// Height of the collision box inside the voxel
    pub fn height(self) -> f32 {
        match self {
            CollisionShape::None => 0.0,
            CollisionShape::Slab => 0.5,
            CollisionShape::Full => 1.0,
        }
    }
}

/// Which tool a block prefers, and whether a drop requires it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRule {
    pub category: Option<ToolCategory>,
    pub min_tier: ToolTier,
    /// Breaking with anything that fails the rule is slower and drops nothing
    pub required: bool,
}

impl ToolRule {
    pub const NONE: ToolRule = ToolRule {
        category: None,
        min_tier: ToolTier::Hand,
        required: false,
    };

    const fn preferred(category: ToolCategory) -> Self {
        Self {
            category: Some(category),
            min_tier: ToolTier::Hand,
            required: false,
        }
    }

    const fn required(category: ToolCategory, min_tier: ToolTier) -> Self {
        Self {
            category: Some(category),
            min_tier,
            required: true,
        }
    }

    /// Whether the tool's category matches the preferred one
    pub fn matches_category(&self, tool: &ToolRef) -> bool {
        self.category.is_some() && self.category == tool.category
    }

    /// Whether the tool satisfies the block's minimum requirement
    pub fn is_satisfied_by(&self, tool: &ToolRef) -> bool {
        !self.required || (self.matches_category(tool) && tool.tier >= self.min_tier)
    }
}

/// Static properties of a block kind
#[derive(Debug, Clone, Copy)]
pub struct BlockProperties {
    pub name: &'static str,
    /// Ticks to break by hand with the right tool: `-1` unbreakable, `0` instant
    pub hardness: i32,
    pub tool: ToolRule,
    pub shape: CollisionShape,
    pub slipperiness: f32,
    pub silk_touch: bool,
    pub fortune: bool,
}

const fn props(
    name: &'static str,
    hardness: i32,
    tool: ToolRule,
    shape: CollisionShape,
) -> BlockProperties {
    BlockProperties {
        name,
        hardness,
        tool,
        shape,
        slipperiness: crate::constants::physics::DEFAULT_SLIPPERINESS,
        silk_touch: false,
        fortune: false,
    }
}

impl BlockProperties {
    /// Properties for ids that have no registry entry
    pub const FALLBACK: BlockProperties = props(
        "Unknown",
        crate::constants::mining::DEFAULT_HARDNESS,
        ToolRule::NONE,
        CollisionShape::Full,
    );

    const fn silk(mut self) -> Self {
        self.silk_touch = true;
        self
    }

    const fn ore(mut self) -> Self {
        self.silk_touch = true;
        self.fortune = true;
        self
    }

    const fn slippery(mut self, slipperiness: f32) -> Self {
        self.slipperiness = slipperiness;
        self
    }
}

macro_rules! block_kinds {
    ($($variant:ident = $id:literal),* $(,)?) => {
        /// Every block kind the registry knows about
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum BlockKind {
            $($variant = $id),*
        }

        impl BlockKind {
            pub const ALL: &'static [BlockKind] = &[$(BlockKind::$variant),*];

            pub fn from_id(id: BlockId) -> Option<BlockKind> {
                match id.0 {
                    $($id => Some(BlockKind::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

block_kinds! {
    Air = 0,
    Stone = 1,
    Grass = 2,
    Dirt = 3,
    Cobblestone = 4,
    OakPlanks = 5,
    Sand = 6,
    RedSand = 7,
    Gravel = 8,
    OakLog = 9,
    OakLeaves = 10,
    Glass = 11,
    Water = 12,
    Lava = 13,
    Bedrock = 14,
    CoalOre = 15,
    IronOre = 16,
    GoldOre = 17,
    DiamondOre = 18,
    EmeraldOre = 19,
    LapisOre = 20,
    RedstoneOre = 21,
    CopperOre = 22,
    NetherQuartzOre = 23,
    Obsidian = 24,
    Sandstone = 25,
    Ladder = 26,
    Vines = 27,
    Cobweb = 28,
    Torch = 29,
    TallGrass = 30,
    Flower = 31,
    SnowLayer = 32,
    SnowBlock = 33,
    Ice = 34,
    PackedIce = 35,
    Cactus = 36,
    SugarCane = 37,
    OakDoor = 38,
    Bed = 39,
    OakStairs = 40,
    StoneStairs = 41,
    StoneSlab = 42,
    OakSlab = 43,
    Piston = 44,
    Observer = 45,
    SlimeBlock = 46,
    HayBale = 47,
    HoneyBlock = 48,
    CraftingTable = 49,
    Furnace = 50,
    Chest = 51,
    Bookshelf = 52,
    Clay = 53,
    Glowstone = 54,
    Netherrack = 55,
    Wool = 56,
    Bricks = 57,
}

impl BlockKind {
    pub const fn id(self) -> BlockId {
        BlockId(self as u16)
    }

    /// Static property table. Exhaustive, so a new kind cannot be added without its row.
    pub const fn properties(self) -> BlockProperties {
        use BlockKind::*;
        use CollisionShape::{Full, None as Empty, Slab};
        use ToolCategory::*;

        match self {
            Air => props("Air", -1, ToolRule::NONE, Empty),
            Stone => props("Stone", 45, ToolRule::required(Pickaxe, ToolTier::Wood), Full).silk(),
            Grass => props("Grass", 18, ToolRule::preferred(Shovel), Full).silk(),
            Dirt => props("Dirt", 15, ToolRule::preferred(Shovel), Full),
            Cobblestone => props("Cobblestone", 60, ToolRule::required(Pickaxe, ToolTier::Wood), Full),
            OakPlanks => props("Oak Planks", 60, ToolRule::preferred(Axe), Full),
            Sand => props("Sand", 15, ToolRule::preferred(Shovel), Full),
            RedSand => props("Red Sand", 15, ToolRule::preferred(Shovel), Full),
            Gravel => props("Gravel", 18, ToolRule::preferred(Shovel), Full),
            OakLog => props("Oak Log", 60, ToolRule::preferred(Axe), Full),
            OakLeaves => props("Oak Leaves", 6, ToolRule::preferred(Hoe), Full).silk(),
            Glass => props("Glass", 9, ToolRule::NONE, Full).silk(),
            Water => props("Water", -1, ToolRule::NONE, Empty),
            Lava => props("Lava", -1, ToolRule::NONE, Empty),
            Bedrock => props("Bedrock", -1, ToolRule::NONE, Full),
            CoalOre => props("Coal Ore", 90, ToolRule::required(Pickaxe, ToolTier::Wood), Full).ore(),
            IronOre => props("Iron Ore", 90, ToolRule::required(Pickaxe, ToolTier::Stone), Full).silk(),
            GoldOre => props("Gold Ore", 90, ToolRule::required(Pickaxe, ToolTier::Iron), Full).silk(),
            DiamondOre => props("Diamond Ore", 90, ToolRule::required(Pickaxe, ToolTier::Iron), Full).ore(),
            EmeraldOre => props("Emerald Ore", 90, ToolRule::required(Pickaxe, ToolTier::Iron), Full).ore(),
            LapisOre => props("Lapis Ore", 90, ToolRule::required(Pickaxe, ToolTier::Stone), Full).ore(),
            RedstoneOre => props("Redstone Ore", 90, ToolRule::required(Pickaxe, ToolTier::Iron), Full).ore(),
            CopperOre => props("Copper Ore", 90, ToolRule::required(Pickaxe, ToolTier::Stone), Full).ore(),
            NetherQuartzOre => {
                props("Nether Quartz Ore", 90, ToolRule::required(Pickaxe, ToolTier::Wood), Full).ore()
            }
            Obsidian => props("Obsidian", 1500, ToolRule::required(Pickaxe, ToolTier::Diamond), Full),
            Sandstone => props("Sandstone", 24, ToolRule::required(Pickaxe, ToolTier::Wood), Full),
            Ladder => props("Ladder", 12, ToolRule::preferred(Axe), Empty),
            Vines => props("Vines", 6, ToolRule::preferred(Shears), Empty).silk(),
            Cobweb => props("Cobweb", 120, ToolRule::required(Sword, ToolTier::Hand), Empty).silk(),
            Torch => props("Torch", 0, ToolRule::NONE, Empty),
            TallGrass => props("Tall Grass", 0, ToolRule::NONE, Empty).silk(),
            Flower => props("Flower", 0, ToolRule::NONE, Empty),
            SnowLayer => props("Snow Layer", 3, ToolRule::required(Shovel, ToolTier::Wood), Empty).silk(),
            SnowBlock => props("Snow Block", 6, ToolRule::required(Shovel, ToolTier::Wood), Full).silk(),
            Ice => props("Ice", 15, ToolRule::preferred(Pickaxe), Full).silk().slippery(0.98),
            PackedIce => {
                props("Packed Ice", 15, ToolRule::preferred(Pickaxe), Full).silk().slippery(0.98)
            }
            Cactus => props("Cactus", 12, ToolRule::NONE, Full),
            SugarCane => props("Sugar Cane", 0, ToolRule::NONE, Empty),
            OakDoor => props("Oak Door", 90, ToolRule::preferred(Axe), Full),
            Bed => props("Bed", 6, ToolRule::NONE, Slab),
            OakStairs => props("Oak Stairs", 60, ToolRule::preferred(Axe), Full),
            StoneStairs => props("Stone Stairs", 45, ToolRule::required(Pickaxe, ToolTier::Wood), Full),
            StoneSlab => props("Stone Slab", 60, ToolRule::required(Pickaxe, ToolTier::Wood), Slab),
            OakSlab => props("Oak Slab", 60, ToolRule::preferred(Axe), Slab),
            Piston => props("Piston", 45, ToolRule::preferred(Pickaxe), Full),
            Observer => props("Observer", 90, ToolRule::required(Pickaxe, ToolTier::Wood), Full),
            SlimeBlock => props("Slime Block", 0, ToolRule::NONE, Full).slippery(0.8),
            HayBale => props("Hay Bale", 15, ToolRule::preferred(Hoe), Full),
            HoneyBlock => props("Honey Block", 0, ToolRule::NONE, Full),
            CraftingTable => props("Crafting Table", 75, ToolRule::preferred(Axe), Full),
            Furnace => props("Furnace", 105, ToolRule::required(Pickaxe, ToolTier::Wood), Full),
            Chest => props("Chest", 75, ToolRule::preferred(Axe), Full),
            Bookshelf => props("Bookshelf", 45, ToolRule::preferred(Axe), Full).silk(),
            Clay => props("Clay", 18, ToolRule::preferred(Shovel), Full).silk(),
            Glowstone => props("Glowstone", 9, ToolRule::NONE, Full).silk(),
            Netherrack => props("Netherrack", 12, ToolRule::required(Pickaxe, ToolTier::Wood), Full),
            Wool => props("Wool", 24, ToolRule::preferred(Shears), Full),
            Bricks => props("Bricks", 60, ToolRule::required(Pickaxe, ToolTier::Wood), Full),
        }
    }

    pub fn is_fluid(self) -> bool {
        matches!(self, BlockKind::Water | BlockKind::Lava)
    }

    pub fn is_climbable(self) -> bool {
        matches!(self, BlockKind::Ladder | BlockKind::Vines)
    }

    /// Cells that a placement may overwrite
    pub fn is_replaceable(self) -> bool {
        matches!(
            self,
            BlockKind::Air
                | BlockKind::Water
                | BlockKind::Lava
                | BlockKind::TallGrass
                | BlockKind::SnowLayer
        )
    }

    /// Landing on these scales the fall distance down
    pub fn is_soft_landing(self) -> bool {
        matches!(self, BlockKind::HayBale | BlockKind::HoneyBlock)
    }
}

/// Property lookup for a raw id, falling back to [`BlockProperties::FALLBACK`]
pub fn block_properties(id: BlockId) -> BlockProperties {
    id.kind()
        .map(BlockKind::properties)
        .unwrap_or(BlockProperties::FALLBACK)
}

/// Whether the block has any collision volume
pub fn is_solid(id: BlockId) -> bool {
    block_properties(id).shape != CollisionShape::None
}

pub fn collision_shape(id: BlockId) -> CollisionShape {
    block_properties(id).shape
}

/// Ground friction query used by the player physics
pub fn slipperiness(id: BlockId) -> f32 {
    block_properties(id).slipperiness
}

pub fn is_kind(id: BlockId, kind: BlockKind) -> bool {
    id == kind.id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_kind() {
        for &kind in BlockKind::ALL {
            assert_eq!(kind.id().kind(), Some(kind));
        }
    }

    #[test]
    fn test_unknown_id_falls_back() {
        let unknown = BlockId(9000);
        assert_eq!(unknown.kind(), None);
        let props = block_properties(unknown);
        assert_eq!(props.hardness, 15);
        assert_eq!(props.tool, ToolRule::NONE);
        assert!(is_solid(unknown));
        assert_eq!(unknown.to_string(), "Block(9000)");
    }

    #[test]
    fn test_shapes() {
        assert!(!is_solid(BlockId::AIR));
        assert!(!is_solid(BlockId::WATER));
        assert!(!is_solid(BlockKind::Ladder.id()));
        assert_eq!(collision_shape(BlockKind::StoneSlab.id()).height(), 0.5);
        assert_eq!(collision_shape(BlockId::STONE).height(), 1.0);
    }

    #[test]
    fn test_tool_rule() {
        let rule = BlockKind::IronOre.properties().tool;
        assert!(!rule.is_satisfied_by(&ToolRef::HAND));
        assert!(!rule.is_satisfied_by(&ToolRef::new(ToolCategory::Pickaxe, ToolTier::Wood)));
        assert!(rule.is_satisfied_by(&ToolRef::new(ToolCategory::Pickaxe, ToolTier::Stone)));
        assert!(!rule.is_satisfied_by(&ToolRef::new(ToolCategory::Axe, ToolTier::Netherite)));

        let dirt = BlockKind::Dirt.properties().tool;
        assert!(dirt.is_satisfied_by(&ToolRef::HAND));
    }

    #[test]
    fn test_ice_is_slippery() {
        assert!(slipperiness(BlockKind::Ice.id()) > slipperiness(BlockId::STONE));
    }
}
