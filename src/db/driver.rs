//! Database drivers.
#[cfg(feature = "pg")]
pub mod pg;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::fmt::Debug;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::types::Result;

/// Trait for database [drivers](super::driver#modules) backing the ledger.
#[async_trait]
pub trait DatabaseDriver: Debug + Sync + Send + 'static {
    /// Return driver name.
    fn name(&self) -> &'static str;
    /// Returns the database connection for the driver.
    fn connection(&self) -> DatabaseConnection;
    /// Configure the database connection parameters. See corresponding driver implementation for details.
    async fn configure(&self) -> Result<()>;
    /// Flush whatever the backend keeps outside of its main storage. Called once on shutdown.
    async fn checkpoint(&self) -> Result<()>;
}
