use std::time::Duration;

use async_trait::async_trait;
use sea_orm::ConnectOptions;
use sea_orm::DatabaseConnection;
use tracing::error;

use crate::types::Result;

use super::DatabaseDriver;

/// Connection parameters for [`Pg::connect`].
#[derive(Debug, Clone)]
pub struct PgSettings {
    pub host:     String,
    pub port:     u16,
    pub user:     String,
    pub password: String,
    pub database: String,
}

#[derive(Debug)]
pub struct Pg {
    connection: DatabaseConnection,
}

impl Pg {
    pub async fn connect(settings: &PgSettings) -> Result<Self> {
        let schema = format!(
            "postgres://{}:{}@{}:{}/{}",
            settings.user, settings.password, settings.host, settings.port, settings.database
        );
        let mut opts = ConnectOptions::new(&schema);
        opts.max_connections(20)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(20))
            .max_lifetime(Duration::from_secs(60))
            .test_before_acquire(true)
            .sqlx_logging(false);

        let connection = sea_orm::Database::connect(opts).await.inspect_err(|e| {
            // Never log the password.
            error!(
                "Error connecting to database postgres://{}@{}:{}/{}: {e}",
                settings.user, settings.host, settings.port, settings.database
            )
        })?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl DatabaseDriver for Pg {
    fn name(&self) -> &'static str {
        "pg"
    }

    fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    async fn configure(&self) -> Result<()> {
        Ok(())
    }

    async fn checkpoint(&self) -> Result<()> {
        Ok(())
    }
}
