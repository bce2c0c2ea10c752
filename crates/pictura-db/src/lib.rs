//! Pictura metadata store
//!
//! PostgreSQL persistence for finalized uploads. The worker writes through the
//! [`UploadStore`] trait so tests can substitute an in-memory store.

pub mod error;
pub mod pool;
pub mod upload;

pub use error::DbError;
pub use pool::{run_migrations, setup_database};
pub use upload::{UploadRepository, UploadStore};
