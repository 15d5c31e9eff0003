pub mod item_type;
pub mod tool;

pub use item_type::{Item, ItemDrop};
pub use tool::{ToolCategory, ToolRef, ToolTier};
