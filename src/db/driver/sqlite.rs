use std::path::Path;

use async_trait::async_trait;
use sea_orm::ConnectOptions;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use tracing::debug;
use tracing::error;

use crate::types::Result;

use super::DatabaseDriver;

#[derive(Debug)]
pub struct Sqlite {
    connection: DatabaseConnection,
}

impl Sqlite {
    /// Open (creating if missing) the database file at `db_path`.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        let schema = format!("sqlite://{}?mode=rwc", db_path.display());
        let mut opts = ConnectOptions::new(&schema);
        opts.sqlx_logging(false);

        let db = sea_orm::Database::connect(opts)
            .await
            .inspect_err(|e| error!("Error connecting to database {schema}: {e}"))?;

        debug!("connected to {schema}");

        Ok(Self { connection: db })
    }
}

#[async_trait]
impl DatabaseDriver for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    async fn configure(&self) -> Result<()> {
        let db = &self.connection;

        db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        db.execute_unprepared("PRAGMA synchronous=NORMAL;").await?;
        db.execute_unprepared("PRAGMA busy_timeout=5000;").await?;

        Ok(())
    }

    async fn checkpoint(&self) -> Result<()> {
        self.connection.execute_unprepared("PRAGMA wal_checkpoint;").await?;

        Ok(())
    }
}
