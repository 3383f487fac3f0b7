use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::instrument;

use crate::db::entity::InventoryRecord;
use crate::ledger::LedgerStore;
use crate::types::InventoryStatus;
use crate::types::Result;

/// One line of the over-disposition report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub id:                i32,
    pub ndc:               String,
    pub drug_name:         String,
    pub manufacturer:      Option<String>,
    pub wholesaler:        String,
    pub quantity_ordered:  i64,
    pub quantity_disposed: i64,
    pub status:            InventoryStatus,
}

impl From<InventoryRecord> for ReportRow {
    fn from(record: InventoryRecord) -> Self {
        Self {
            status:            InventoryStatus::derive(record.quantity_ordered, record.quantity_disposed),
            id:                record.id,
            ndc:               record.ndc,
            drug_name:         record.drug_name,
            manufacturer:      record.manufacturer,
            wholesaler:        record.wholesaler,
            quantity_ordered:  record.quantity_ordered,
            quantity_disposed: record.quantity_disposed,
        }
    }
}

// Missing manufacturer first. The sort using this is stable, so ties keep their input order.
fn report_order(a: &ReportRow, b: &ReportRow) -> Ordering {
    a.manufacturer
        .cmp(&b.manufacturer)
        .then_with(|| a.drug_name.cmp(&b.drug_name))
}

/// Annotate and order records for the report.
pub fn arrange(records: Vec<InventoryRecord>) -> Vec<ReportRow> {
    let mut rows = records.into_iter().map(ReportRow::from).collect::<Vec<_>>();
    rows.sort_by(report_order);
    rows
}

pub struct ReportBuilder<L: LedgerStore> {
    ledger: Arc<L>,
}

impl<L: LedgerStore> ReportBuilder<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn build_report(&self, user_id: i32) -> Result<Vec<ReportRow>> {
        let rows = arrange(self.ledger.all_for_user(user_id).await?);
        debug!(user_id, rows = rows.len(), "report built");
        Ok(rows)
    }
}

impl<L: LedgerStore> Clone for ReportBuilder<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}
