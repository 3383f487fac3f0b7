use std::io::Write;
use std::path::Path as FsPath;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::auth::Credentials;
use crate::auth::Registration;
use crate::auth::Session;
use crate::db::entity::Disposition;
use crate::db::entity::InventoryRecord;
use crate::disposition::DispositionReceipt;
use crate::disposition::DispositionRequest;
use crate::report::ReportRow;
use crate::sheet::parse_workbook;
use crate::sheet::RawRow;
use crate::types::LedgerError;
use crate::types::Result;
use crate::upsert::ReconcileSummary;

use super::response::Success;
use super::AppState;
use super::AppStore;
use super::AuthUser;
use super::UploadSettings;

const UPLOAD_FIELD: &str = "file";

pub(super) async fn register<S: AppStore>(
    State(state): State<AppState<S>>,
    payload: std::result::Result<Json<Registration>, JsonRejection>,
) -> Result<Success<serde_json::Value>> {
    let Json(registration) = payload?;
    let username = state.auth.register(registration).await?;
    Ok(Success::new(json!({ "username": username })))
}

pub(super) async fn login<S: AppStore>(
    State(state): State<AppState<S>>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Session>> {
    let Json(credentials) = payload?;
    Ok(Json(state.auth.login(credentials).await?))
}

pub(super) async fn upload<S: AppStore>(
    State(state): State<AppState<S>>,
    AuthUser(identity): AuthUser,
    mut multipart: Multipart,
) -> Result<Success<ReconcileSummary>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let file_name = field.file_name().map(str::to_owned);
            upload = Some((file_name, field.bytes().await?));
            break;
        }
    }

    let Some((file_name, content)) = upload
    else {
        return Err(LedgerError::validation("No file uploaded"));
    };

    debug!(user_id = identity.id, ?file_name, bytes = content.len(), "received upload");

    let settings = state.upload.clone();
    let rows = tokio::task::spawn_blocking(move || stage_and_parse(&settings, file_name.as_deref(), &content)).await??;

    let summary = state.upserts.reconcile(identity.id, &rows).await?;

    Ok(Success::new(summary))
}

/// Write the upload into a temporary file next to its peers, parse it, and remove the file whatever the outcome.
fn stage_and_parse(settings: &UploadSettings, file_name: Option<&str>, content: &Bytes) -> Result<Vec<RawRow>> {
    let suffix = file_name
        .and_then(|name| FsPath::new(name).extension())
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut staged = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(&settings.dir)?;

    let parsed = staged
        .write_all(content)
        .and_then(|_| staged.flush())
        .map_err(LedgerError::from)
        .and_then(|_| parse_workbook(staged.path()));

    staged.close()?;

    parsed
}

pub(super) async fn inventory<S: AppStore>(
    State(state): State<AppState<S>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<InventoryRecord>>> {
    Ok(Json(state.store.all_for_user(identity.id).await?))
}

#[derive(Debug, Serialize)]
pub(super) struct DispositionUpdated {
    #[serde(flatten)]
    receipt: DispositionReceipt,
    message: &'static str,
}

pub(super) async fn disposition<S: AppStore>(
    State(state): State<AppState<S>>,
    AuthUser(identity): AuthUser,
    payload: std::result::Result<Json<DispositionRequest>, JsonRejection>,
) -> Result<Success<DispositionUpdated>> {
    let Json(request) = payload?;
    let receipt = state.dispositions.update(identity.id, request).await?;

    Ok(Success::new(DispositionUpdated {
        receipt,
        message: "Disposition updated successfully",
    }))
}

pub(super) async fn report<S: AppStore>(
    State(state): State<AppState<S>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<ReportRow>>> {
    Ok(Json(state.reports.build_report(identity.id).await?))
}

pub(super) async fn disposition_history<S: AppStore>(
    State(state): State<AppState<S>>,
    AuthUser(identity): AuthUser,
    Path(inventory_id): Path<i32>,
) -> Result<Json<Vec<Disposition>>> {
    state
        .dispositions
        .history(identity.id, inventory_id)
        .await?
        .map(Json)
        .ok_or_else(|| LedgerError::not_found("Disposition audit is disabled"))
}
