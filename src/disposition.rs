//! Disposition updates and the optional audit log that goes with them.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::db::entity::Disposition;
use crate::ledger::LedgerStore;
use crate::types::LedgerError;
use crate::types::Result;

/// What gets appended to the audit log after a successful disposition write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionEntry {
    pub inventory_id: i32,
    pub quantity:     i64,
    pub wholesaler:   String,
    pub recorded_at:  String,
}

#[async_trait]
pub trait DispositionAudit: Send + Sync + 'static {
    async fn record(&self, entry: &DispositionEntry) -> Result<()>;

    /// Audit entries of `inventory_id`, oldest first. Empty if the record isn't owned by `user_id`.
    async fn history(&self, user_id: i32, inventory_id: i32) -> Result<Vec<Disposition>>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispositionRequest {
    pub inventory_id: Option<i32>,
    pub quantity:     Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispositionReceipt {
    pub inventory_id: i32,
    pub quantity:     i64,
}

pub struct DispositionUpdater<L: LedgerStore> {
    ledger: Arc<L>,
    audit:  Option<Arc<dyn DispositionAudit>>,
}

impl<L: LedgerStore> DispositionUpdater<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger, audit: None }
    }

    pub fn with_audit(mut self, audit: Arc<dyn DispositionAudit>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Overwrite the disposed quantity of one of the user's records.
    ///
    /// Quantities above the ordered amount are accepted; the report flags them.
    ///
    /// The audit entry is written after the new quantity is stored. A failed audit write is logged and does not fail
    /// the update, since the disposition itself is already committed.
    #[instrument(level = "debug", skip(self))]
    pub async fn update(&self, user_id: i32, request: DispositionRequest) -> Result<DispositionReceipt> {
        let (Some(inventory_id), Some(quantity)) = (request.inventory_id, request.quantity)
        else {
            return Err(LedgerError::validation("Missing required fields"));
        };

        let Some(record) = self.ledger.find_owned(user_id, inventory_id).await?
        else {
            warn!(user_id, inventory_id, "disposition for a foreign or missing record");
            return Err(LedgerError::not_found("Inventory item not found"));
        };

        if quantity < 0 {
            return Err(LedgerError::validation("Disposition quantity cannot be negative"));
        }

        if !self.ledger.set_disposed(user_id, inventory_id, quantity).await? {
            return Err(LedgerError::not_found("Inventory item not found"));
        }

        if let Some(audit) = &self.audit {
            let entry = DispositionEntry {
                inventory_id,
                quantity,
                wholesaler: record.wholesaler,
                recorded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            };
            if let Err(err) = audit.record(&entry).await {
                error!(user_id, inventory_id, quantity, "disposition stored but not audited: {err}");
            }
        }

        info!(user_id, inventory_id, quantity, "disposition updated");

        Ok(DispositionReceipt { inventory_id, quantity })
    }

    /// The audit history of one of the user's records. `None` when the audit log is disabled.
    pub async fn history(&self, user_id: i32, inventory_id: i32) -> Result<Option<Vec<Disposition>>> {
        let Some(audit) = &self.audit
        else {
            return Ok(None);
        };

        if self.ledger.find_owned(user_id, inventory_id).await?.is_none() {
            return Err(LedgerError::not_found("Inventory item not found"));
        }

        Ok(Some(audit.history(user_id, inventory_id).await?))
    }
}

impl<L: LedgerStore> Clone for DispositionUpdater<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            audit:  self.audit.clone(),
        }
    }
}
