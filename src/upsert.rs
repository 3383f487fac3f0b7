//! The upsert engine: reconciles an uploaded batch with a user's ledger.
use std::sync::Arc;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;

use crate::ledger::LedgerStore;
use crate::sheet::decode_rows;
use crate::sheet::RawRow;
use crate::types::Result;
use crate::types::UpsertOutcome;

/// What a reconciled batch did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub inserted:  u64,
    pub updated:   u64,
    /// The upload timestamp stamped on every row of the batch.
    pub timestamp: String,
}

pub struct UpsertEngine<L: LedgerStore> {
    ledger: Arc<L>,
}

impl<L: LedgerStore> UpsertEngine<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Reconcile `rows` for `user_id`, stamping the batch with the current time.
    pub async fn reconcile(&self, user_id: i32, rows: &[RawRow]) -> Result<ReconcileSummary> {
        self.reconcile_at(user_id, rows, Utc::now()).await
    }

    /// Reconcile `rows` for `user_id` with an explicit batch timestamp.
    ///
    /// The whole batch is decoded before anything is written; a malformed row aborts with no change. Rows are then
    /// written one by one in input order. A storage failure stops the batch: rows before it stay committed, rows after
    /// it are not attempted.
    #[instrument(level = "debug", skip(self, rows, received_at), fields(rows = rows.len()))]
    pub async fn reconcile_at(
        &self,
        user_id: i32,
        rows: &[RawRow],
        received_at: DateTime<Utc>,
    ) -> Result<ReconcileSummary> {
        let decoded = decode_rows(rows)?;
        let timestamp = received_at.to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut summary = ReconcileSummary {
            inserted: 0,
            updated: 0,
            timestamp,
        };

        for (idx, row) in decoded.iter().enumerate() {
            let outcome = self
                .ledger
                .upsert(user_id, row, &summary.timestamp)
                .await
                .inspect_err(|err| {
                    error!(
                        user_id,
                        committed = idx,
                        remaining = decoded.len() - idx,
                        "upload aborted: {err}"
                    )
                })?;

            debug!(ndc = %row.ndc, wholesaler = %row.wholesaler, ?outcome, "row reconciled");

            match outcome {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
            }
        }

        info!(
            user_id,
            inserted = summary.inserted,
            updated = summary.updated,
            "upload reconciled"
        );

        Ok(summary)
    }
}
