//! `railtrace-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod uid;

pub use error::{DomainError, DomainResult};
pub use id::{EngravingId, EventId, NotificationId, UserId, VendorId};
pub use uid::ItemUid;
