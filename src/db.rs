//! Persistence: sea-orm entities, migrations, database drivers and the store built on top of them.
pub mod driver;
pub mod entity;
pub mod migrations;

use std::fmt::Debug;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::types::Result;
use driver::DatabaseDriver;
use migrations::Migrator;

pub mod prelude {
    pub use super::entity::*;
    pub use super::SeaStore;
}

/// Anything able to hand out a connection to the database.
pub trait DBProvider: Sync + Send + 'static {
    fn db_connection(&self) -> DatabaseConnection;
}

/// The ledger, user and audit stores over one injected database driver.
///
/// Every operation goes straight to the database: there is no caching and no write buffering. Cloning is cheap and
/// shares the driver.
pub struct SeaStore<D: DatabaseDriver> {
    db: Arc<D>,
}

impl<D: DatabaseDriver> SeaStore<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    /// Configure the driver and bring the schema up to date.
    pub async fn prepare(&self) -> Result<()> {
        self.db.configure().await?;
        Migrator::up(&self.db.connection(), None).await?;
        info!(driver = self.db.name(), "database schema is up to date");
        Ok(())
    }
}

impl<D: DatabaseDriver> Clone for SeaStore<D> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<D: DatabaseDriver> Debug for SeaStore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SeaStore({})", self.db.name())
    }
}

impl<D: DatabaseDriver> DBProvider for SeaStore<D> {
    fn db_connection(&self) -> DatabaseConnection {
        self.db.connection()
    }
}
