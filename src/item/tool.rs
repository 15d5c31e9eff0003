//! Tool references
//!
//! Tools are carried on the wire as string tokens such as `"iron_pickaxe"`.
//! They are parsed into a [`ToolRef`] on demand and never stored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Pickaxe,
    Axe,
    Shovel,
    Hoe,
    Sword,
    Shears,
}

impl ToolCategory {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "pickaxe" => Some(Self::Pickaxe),
            "axe" => Some(Self::Axe),
            "shovel" | "spade" => Some(Self::Shovel),
            "hoe" => Some(Self::Hoe),
            "sword" => Some(Self::Sword),
            "shears" => Some(Self::Shears),
            _ => None,
        }
    }
}

/// Material tier, ordered from bare hand to netherite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTier {
    #[default]
    Hand = 0,
    Wood = 1,
    Stone = 2,
    Iron = 3,
    Diamond = 4,
    Netherite = 5,
}

impl ToolTier {
    pub const ALL: [ToolTier; 6] = [
        ToolTier::Hand,
        ToolTier::Wood,
        ToolTier::Stone,
        ToolTier::Iron,
        ToolTier::Diamond,
        ToolTier::Netherite,
    ];

    /// Mining speed multiplier when the tool category matches the block
    pub fn mining_speed(self) -> f32 {
        match self {
            ToolTier::Hand => 1.0,
            ToolTier::Wood => 2.0,
            ToolTier::Stone => 4.0,
            ToolTier::Iron => 6.0,
            ToolTier::Diamond => 8.0,
            ToolTier::Netherite => 9.0,
        }
    }

    /// Gold has no tier of its own; it harvests like wood
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "wood" | "wooden" | "gold" | "golden" => Some(Self::Wood),
            "stone" => Some(Self::Stone),
            "iron" => Some(Self::Iron),
            "diamond" => Some(Self::Diamond),
            "netherite" => Some(Self::Netherite),
            _ => None,
        }
    }
}

/// A parsed tool token. `category == None` means an empty hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolRef {
    pub category: Option<ToolCategory>,
    pub tier: ToolTier,
}

impl ToolRef {
    pub const HAND: ToolRef = ToolRef {
        category: None,
        tier: ToolTier::Hand,
    };

    pub fn new(category: ToolCategory, tier: ToolTier) -> Self {
        Self {
            category: Some(category),
            tier,
        }
    }

    /// Parse a `material_category` token. Unknown materials or categories
    /// fall back to a bare hand.
    ///
    /// Shears have no material and parse as iron tier; golden tools parse as
    /// wood tier.
    pub fn parse(token: &str) -> Self {
        let token = token.trim().to_ascii_lowercase();
        if token == "shears" {
            return Self::new(ToolCategory::Shears, ToolTier::Iron);
        }

        let Some((material, category)) = token.rsplit_once('_') else {
            return Self::HAND;
        };

        match (ToolTier::from_token(material), ToolCategory::from_token(category)) {
            (Some(tier), Some(category)) => Self::new(category, tier),
            _ => Self::HAND,
        }
    }

    /// Parse an optional token, letting an explicit tier override the parsed one
    pub fn resolve(token: Option<&str>, tier_override: Option<ToolTier>) -> Self {
        let mut tool = token.map(Self::parse).unwrap_or(Self::HAND);
        if let Some(tier) = tier_override {
            tool.tier = tier;
        }
        tool
    }

    pub fn is_hand(&self) -> bool {
        self.category.is_none()
    }
}

impl fmt::Display for ToolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            None => write!(f, "hand"),
            Some(category) => write!(f, "{:?} {:?}", self.tier, category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_material_and_category() {
        assert_eq!(
            ToolRef::parse("diamond_pickaxe"),
            ToolRef::new(ToolCategory::Pickaxe, ToolTier::Diamond)
        );
        assert_eq!(
            ToolRef::parse("Wooden_Axe"),
            ToolRef::new(ToolCategory::Axe, ToolTier::Wood)
        );
        assert_eq!(
            ToolRef::parse("shears"),
            ToolRef::new(ToolCategory::Shears, ToolTier::Iron)
        );
    }

    #[test]
    fn test_unknown_tokens_are_hand() {
        assert!(ToolRef::parse("").is_hand());
        assert!(ToolRef::parse("stick").is_hand());
        assert!(ToolRef::parse("golden_banana").is_hand());
        assert!(ToolRef::parse("copper_pickaxe").is_hand());
    }

    #[test]
    fn test_golden_tools_mine_like_wood() {
        let pick = ToolRef::parse("golden_pickaxe");
        assert_eq!(pick, ToolRef::new(ToolCategory::Pickaxe, ToolTier::Wood));
        assert_eq!(ToolRef::parse("GOLD_AXE").tier, ToolTier::Wood);
    }

    #[test]
    fn test_tier_override() {
        let tool = ToolRef::resolve(Some("stone_shovel"), Some(ToolTier::Netherite));
        assert_eq!(tool.category, Some(ToolCategory::Shovel));
        assert_eq!(tool.tier, ToolTier::Netherite);
    }

    #[test]
    fn test_tier_speed_is_monotonic() {
        for pair in ToolTier::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].mining_speed() <= pair[1].mining_speed());
        }
    }
}
