//! The HTTP surface of the ledger.
mod extract;
mod handler;
mod response;

use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthGate;
use crate::auth::TokenIssuer;
use crate::auth::UserStore;
use crate::disposition::DispositionAudit;
use crate::disposition::DispositionUpdater;
use crate::ledger::LedgerStore;
use crate::report::ReportBuilder;
use crate::types::Result;
use crate::upsert::UpsertEngine;

pub use extract::AuthUser;

/// A store able to back every route.
pub trait AppStore: LedgerStore + UserStore {}

impl<T: LedgerStore + UserStore> AppStore for T {}

/// Where uploaded spreadsheets are staged while they are parsed, and how big they may be.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir:       PathBuf,
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir:       std::env::temp_dir(),
            max_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Shared state of the router: one injected store and the components built over it.
pub struct AppState<S: AppStore> {
    store:        Arc<S>,
    auth:         AuthGate<S>,
    upserts:      Arc<UpsertEngine<S>>,
    dispositions: DispositionUpdater<S>,
    reports:      ReportBuilder<S>,
    upload:       Arc<UploadSettings>,
    audit:        bool,
}

impl<S: AppStore> AppState<S> {
    pub fn new(store: Arc<S>, tokens: TokenIssuer, upload: UploadSettings) -> Self {
        Self {
            auth: AuthGate::new(store.clone(), Arc::new(tokens)),
            upserts: Arc::new(UpsertEngine::new(store.clone())),
            dispositions: DispositionUpdater::new(store.clone()),
            reports: ReportBuilder::new(store.clone()),
            upload: Arc::new(upload),
            audit: false,
            store,
        }
    }

    /// Record every disposition into `audit` and expose the history route.
    pub fn with_audit(mut self, audit: Arc<dyn DispositionAudit>) -> Self {
        self.dispositions = self.dispositions.with_audit(audit);
        self.audit = true;
        self
    }

    pub fn tokens(&self) -> &Arc<TokenIssuer> {
        self.auth.tokens()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: AppStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store:        self.store.clone(),
            auth:         self.auth.clone(),
            upserts:      self.upserts.clone(),
            dispositions: self.dispositions.clone(),
            reports:      self.reports.clone(),
            upload:       self.upload.clone(),
            audit:        self.audit,
        }
    }
}

impl<S: AppStore> Debug for AppState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("upload", &self.upload)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

pub fn router<S: AppStore>(state: AppState<S>) -> Router {
    let mut api = Router::new()
        .route("/register", post(handler::register::<S>))
        .route("/login", post(handler::login::<S>))
        .route("/upload", post(handler::upload::<S>))
        .route("/inventory", get(handler::inventory::<S>))
        .route("/disposition", post(handler::disposition::<S>))
        .route("/report", get(handler::report::<S>));

    if state.audit {
        api = api.route("/inventory/:id/dispositions", get(handler::disposition_history::<S>));
    }

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.upload.max_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<S, F>(listener: TcpListener, state: AppState<S>, shutdown: F) -> Result<()>
where
    S: AppStore,
    F: Future<Output = ()> + Send + 'static,
{
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("server stopped");
    Ok(())
}
