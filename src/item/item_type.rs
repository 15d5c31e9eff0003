use crate::world::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An item produced by breaking a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    /// The item form of a placeable block
    Block(BlockId),
    Coal,
    Diamond,
    Emerald,
    LapisLazuli,
    Redstone,
    RawIron,
    RawGold,
    RawCopper,
    NetherQuartz,
    Flint,
    ClayBall,
    GlowstoneDust,
    Snowball,
    Book,
    #[serde(rename = "string")]
    Twine,
}

impl Item {
    /// The block this item places, if any
    pub fn as_block(&self) -> Option<BlockId> {
        match self {
            Item::Block(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Block(id) => write!(f, "{}", id),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A stack of items dropped into the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub item: Item,
    pub count: u32,
}

impl ItemDrop {
    pub const fn new(item: Item, count: u32) -> Self {
        Self { item, count }
    }

    pub const fn single(item: Item) -> Self {
        Self { item, count: 1 }
    }
}
