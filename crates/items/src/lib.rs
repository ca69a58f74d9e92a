//! `railtrace-items` — tracked railway components and their audit trail.

pub mod event;
pub mod item;

pub use event::ItemEvent;
pub use item::{ComponentType, Item, ItemStatus};
