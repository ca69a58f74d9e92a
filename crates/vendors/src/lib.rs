//! `railtrace-vendors` — component manufacturers.

pub mod vendor;

pub use vendor::Vendor;
