use sea_orm::DbErr;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;
use thiserror::Error;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Everything that can go wrong while serving a ledger operation.
///
/// Variants map one-to-one onto what the caller is told: the HTTP layer picks a status code per variant and hides the
/// details of [`Storage`](LedgerError::Storage), [`Io`](LedgerError::Io) and [`Internal`](LedgerError::Internal)
/// behind a generic message.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] DbErr),

    /// The uploaded payload could not be turned into inventory rows.
    #[error("{0}")]
    Parse(String),

    /// A single spreadsheet cell failed the row schema.
    #[error("line {line}, column '{column}': {reason}")]
    Decode {
        line:   usize,
        column: String,
        reason: String,
    },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl LedgerError {
    pub fn validation<S: ToString>(msg: S) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn not_found<S: ToString>(msg: S) -> Self {
        Self::NotFound(msg.to_string())
    }

    pub fn internal<S: ToString>(msg: S) -> Self {
        Self::Internal(msg.to_string())
    }

    /// True for failures whose details must not leak to the caller.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_) | Self::Internal(_))
    }
}

impl From<tokio::task::JoinError> for LedgerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {err}"))
    }
}

/// Derived per-record status. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum InventoryStatus {
    #[strum(serialize = "normal")]
    #[serde(rename = "normal")]
    Normal,
    #[strum(serialize = "over-disposed")]
    #[serde(rename = "over-disposed")]
    OverDisposed,
}

impl InventoryStatus {
    pub fn derive(quantity_ordered: i64, quantity_disposed: i64) -> Self {
        if quantity_disposed > quantity_ordered {
            Self::OverDisposed
        }
        else {
            Self::Normal
        }
    }
}

/// Whether an upserted row created a record or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The authenticated user every guarded operation is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id:       i32,
    pub username: String,
}
