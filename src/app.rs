//! Application shell: command line, tracing, database bring-up and the server lifecycle.
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::bail;
use anyhow::Context;
use chrono::Duration;
use clap::error::ErrorKind;
use clap::CommandFactory;
use clap::Parser;
use fieldx::fxstruct;
use garde::Validate;
use tokio::net::TcpListener;
use tracing::error;
use tracing::info;

use crate::auth::TokenIssuer;
use crate::db::driver::DatabaseDriver;
use crate::db::SeaStore;
use crate::server;
use crate::server::AppState;
use crate::server::UploadSettings;

#[cfg(feature = "pg")]
use crate::db::driver::pg::Pg;
#[cfg(feature = "pg")]
use crate::db::driver::pg::PgSettings;
#[cfg(feature = "sqlite")]
use crate::db::driver::sqlite::Sqlite;

#[derive(Debug, Clone, clap::Parser, Validate)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, author, name = "rx-ledger")]
pub struct Cli {
    /// Address to listen on.
    #[clap(long, env = "RXLEDGER_ADDRESS", default_value = "127.0.0.1:4000")]
    #[fieldx(get(clone))]
    #[garde(custom(Self::socket_address))]
    address: String,

    /// SQLite database file. Created if missing.
    #[clap(long, env = "RXLEDGER_SQLITE_PATH", default_value = "pharmacy.db")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    sqlite_path: PathBuf,

    /// Use PostgreSQL instead of SQLite.
    #[clap(long, env = "RXLEDGER_PG", default_value_t = false)]
    #[garde(custom(Self::backend_compiled_in))]
    pg: bool,

    // The pg_* options are only read when the pg feature is enabled.
    #[clap(long, env = "RXLEDGER_PG_HOST", default_value = "localhost")]
    #[fieldx(get(clone, attributes_fn(allow(unused))))]
    #[garde(skip)]
    pg_host: String,

    #[clap(long, env = "RXLEDGER_PG_PORT", default_value_t = 5432)]
    #[fieldx(get(attributes_fn(allow(unused))))]
    #[garde(skip)]
    pg_port: u16,

    #[clap(long, env = "RXLEDGER_PG_USER", default_value = "rxledger")]
    #[fieldx(get(clone, attributes_fn(allow(unused))))]
    #[garde(skip)]
    pg_user: String,

    #[clap(long, env = "RXLEDGER_PG_PASSWORD", hide_env_values = true, default_value = "rxledger")]
    #[fieldx(get(clone, attributes_fn(allow(unused))))]
    #[garde(skip)]
    pg_password: String,

    #[clap(long, env = "RXLEDGER_PG_DATABASE", default_value = "rxledger")]
    #[fieldx(get(clone, attributes_fn(allow(unused))))]
    #[garde(skip)]
    pg_database: String,

    /// Secret the session tokens are signed with.
    #[clap(long, env = "RXLEDGER_JWT_SECRET", hide_env_values = true)]
    #[fieldx(get(clone))]
    #[garde(length(min = 8))]
    jwt_secret: String,

    /// How long a session token stays valid.
    #[clap(long, env = "RXLEDGER_TOKEN_TTL_HOURS", default_value_t = 24)]
    #[garde(range(min = 1))]
    token_ttl_hours: u32,

    /// Where uploaded spreadsheets are staged while being parsed. Defaults to the system temporary directory.
    #[clap(long, env = "RXLEDGER_UPLOAD_DIR")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    upload_dir: Option<PathBuf>,

    /// Largest accepted upload, in megabytes.
    #[clap(long, env = "RXLEDGER_MAX_UPLOAD_MB", default_value_t = 16)]
    #[garde(range(min = 1))]
    max_upload_mb: u32,

    /// Keep an audit log of disposition updates.
    #[clap(long, env = "RXLEDGER_AUDIT_DISPOSITIONS", default_value_t = false)]
    #[garde(skip)]
    audit_dispositions: bool,

    /// File to send log into
    #[clap(long, env = "RXLEDGER_LOG_FILE")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Parse the process arguments, exiting with a usage error if they don't validate.
    pub fn load() -> Self {
        let cli = Self::parse();

        if let Err(err) = cli.validate() {
            let mut cmd = Self::command();
            cmd.error(ErrorKind::InvalidValue, err).exit();
        }

        cli
    }

    #[allow(clippy::ptr_arg)]
    fn socket_address(address: &String, _: &()) -> garde::Result {
        address
            .parse::<SocketAddr>()
            .map(|_| ())
            .map_err(|e| garde::Error::new(format!("'{address}' is not a socket address: {e}")))
    }

    fn backend_compiled_in(pg: &bool, _: &()) -> garde::Result {
        let (feature, enabled) = if *pg {
            ("pg", cfg!(feature = "pg"))
        }
        else {
            ("sqlite", cfg!(feature = "sqlite"))
        };

        if enabled {
            Ok(())
        }
        else {
            Err(garde::Error::new(format!("Build feature '{feature}' must be enabled.")))
        }
    }

    #[cfg(feature = "pg")]
    fn pg_settings(&self) -> PgSettings {
        PgSettings {
            host:     self.pg_host(),
            port:     self.pg_port(),
            user:     self.pg_user(),
            password: self.pg_password(),
            database: self.pg_database(),
        }
    }

    fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            dir:       self.upload_dir().unwrap_or_else(std::env::temp_dir),
            max_bytes: self.max_upload_mb() as usize * 1024 * 1024,
        }
    }
}

fn setup_tracing(cli: &Cli) -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_file = cli.log_file();
    let dest_writer = Mutex::new(if let Some(log_file) = &log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("opening log file {}", log_file.display()))?;
        Box::new(file) as Box<dyn io::Write + Send>
    }
    else {
        Box::new(io::stdout()) as Box<dyn io::Write + Send>
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(dest_writer)
                .with_ansi(log_file.is_none()),
        )
        .try_init()?;

    info!("Tracing initialized");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("cannot listen for Ctrl+C: {err}");
    }
    info!("shutdown requested");
}

async fn launch<D: DatabaseDriver>(cli: &Cli, driver: D) -> anyhow::Result<()> {
    let driver = Arc::new(driver);
    let store = Arc::new(SeaStore::new(driver.clone()));
    store.prepare().await.context("preparing the database")?;

    let upload = cli.upload_settings();
    std::fs::create_dir_all(&upload.dir)
        .with_context(|| format!("creating upload directory {}", upload.dir.display()))?;

    let tokens = TokenIssuer::new(&cli.jwt_secret(), Duration::hours(i64::from(cli.token_ttl_hours())));
    let mut state = AppState::new(store.clone(), tokens, upload);
    if cli.audit_dispositions() {
        info!("disposition audit log is enabled");
        state = state.with_audit(store.clone());
    }

    let address = cli.address();
    let listener = TcpListener::bind(address.as_str())
        .await
        .with_context(|| format!("binding {address}"))?;

    server::serve(listener, state, shutdown_signal()).await?;

    driver.checkpoint().await.context("checkpointing the database")?;

    Ok(())
}

/// Run the service with the process arguments until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::load();
    setup_tracing(&cli)?;

    #[cfg(feature = "pg")]
    if cli.pg() {
        let driver = Pg::connect(&cli.pg_settings())
            .await
            .context("connecting to PostgreSQL")?;
        return launch(&cli, driver).await;
    }

    #[cfg(feature = "sqlite")]
    if !cli.pg() {
        let path = cli.sqlite_path();
        let driver = Sqlite::connect(&path)
            .await
            .with_context(|| format!("opening SQLite database {}", path.display()))?;
        return launch(&cli, driver).await;
    }

    bail!("no database backend is compiled in for this configuration")
}
