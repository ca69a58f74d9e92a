//! `railtrace-infra` — storage and background execution.
//!
//! Two interchangeable backends implement the store traits: an in-memory one
//! for dev/tests and a Postgres one (sqlx). The API layer picks a backend at
//! startup.

pub mod jobs;
pub mod migrations;
pub mod store;
pub mod workers;

pub use jobs::run_lot_job;
pub use store::{DataStore, StoreError};
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
