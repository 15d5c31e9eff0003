use crate::item::{Item, ItemDrop, ToolRef};
use crate::world::{block_properties, BlockId, BlockKind};
use rand::Rng;

const fn drop_of(item: Item, count: u32) -> ItemDrop {
    ItemDrop::new(item, count)
}

const fn block_item(kind: BlockKind) -> Item {
    Item::Block(kind.id())
}

/// Explicit drop table. `None` means the block drops one of itself,
/// `Some(&[])` means it drops nothing.
pub fn drop_table(kind: BlockKind) -> Option<&'static [ItemDrop]> {
    use BlockKind::*;

    const COBBLE: [ItemDrop; 1] = [drop_of(block_item(BlockKind::Cobblestone), 1)];
    const DIRT: [ItemDrop; 1] = [drop_of(block_item(BlockKind::Dirt), 1)];
    const COAL: [ItemDrop; 1] = [drop_of(Item::Coal, 1)];
    const RAW_IRON: [ItemDrop; 1] = [drop_of(Item::RawIron, 1)];
    const RAW_GOLD: [ItemDrop; 1] = [drop_of(Item::RawGold, 1)];
    const DIAMOND: [ItemDrop; 1] = [drop_of(Item::Diamond, 1)];
    const EMERALD: [ItemDrop; 1] = [drop_of(Item::Emerald, 1)];
    const LAPIS: [ItemDrop; 1] = [drop_of(Item::LapisLazuli, 6)];
    const REDSTONE: [ItemDrop; 1] = [drop_of(Item::Redstone, 4)];
    const RAW_COPPER: [ItemDrop; 1] = [drop_of(Item::RawCopper, 3)];
    const QUARTZ: [ItemDrop; 1] = [drop_of(Item::NetherQuartz, 1)];
    const CLAY: [ItemDrop; 1] = [drop_of(Item::ClayBall, 4)];
    const GLOWSTONE: [ItemDrop; 1] = [drop_of(Item::GlowstoneDust, 3)];
    const BOOKS: [ItemDrop; 1] = [drop_of(Item::Book, 3)];
    const TWINE: [ItemDrop; 1] = [drop_of(Item::Twine, 1)];
    const SNOWBALL: [ItemDrop; 1] = [drop_of(Item::Snowball, 1)];
    const SNOWBALLS: [ItemDrop; 1] = [drop_of(Item::Snowball, 4)];
    const NOTHING: [ItemDrop; 0] = [];

    let table: &'static [ItemDrop] = match kind {
        Stone => &COBBLE,
        Grass => &DIRT,
        CoalOre => &COAL,
        IronOre => &RAW_IRON,
        GoldOre => &RAW_GOLD,
        DiamondOre => &DIAMOND,
        EmeraldOre => &EMERALD,
        LapisOre => &LAPIS,
        RedstoneOre => &REDSTONE,
        CopperOre => &RAW_COPPER,
        NetherQuartzOre => &QUARTZ,
        Clay => &CLAY,
        Glowstone => &GLOWSTONE,
        Bookshelf => &BOOKS,
        Cobweb => &TWINE,
        SnowLayer => &SNOWBALL,
        SnowBlock => &SNOWBALLS,
        OakLeaves | Glass | TallGrass | Ice | PackedIce | Vines => &NOTHING,
        _ => return None,
    };
    Some(table)
}

/// Whether breaking `block` with `tool` yields anything at all
pub fn can_harvest(block: BlockId, tool: &ToolRef) -> bool {
    let props = block_properties(block);
    props.hardness >= 0 && props.tool.is_satisfied_by(tool)
}

/// Drops for breaking `block` with a wire tool token.
///
/// The Fortune bonus draws from `rng`; pass a seeded generator for reproducible results.
pub fn get_block_drops<R: Rng>(
    block: BlockId,
    tool: Option<&str>,
    fortune_level: u32,
    silk_touch: bool,
    rng: &mut R,
) -> Vec<ItemDrop> {
    drops_with(block, &ToolRef::resolve(tool, None), fortune_level, silk_touch, rng)
}

/// Same as [`get_block_drops`] for an already parsed tool
pub fn drops_with<R: Rng>(
    block: BlockId,
    tool: &ToolRef,
    fortune_level: u32,
    silk_touch: bool,
    rng: &mut R,
) -> Vec<ItemDrop> {
    if !can_harvest(block, tool) {
        return Vec::new();
    }

    let props = block_properties(block);
    if silk_touch && props.silk_touch {
        return vec![ItemDrop::single(Item::Block(block))];
    }

    let mut drops = match block.kind().and_then(drop_table) {
        Some(table) => table.to_vec(),
        None => vec![ItemDrop::single(Item::Block(block))],
    };

    if props.fortune && fortune_level > 0 {
        for drop in &mut drops {
            let bonus = (rng.gen::<f64>() * (fortune_level as f64 + 1.0)).floor() as u32;
            drop.count *= 1 + bonus;
        }
    }

    drops
}
