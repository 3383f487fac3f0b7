//! The ledger store contract.
//!
//! Records are addressed three ways: by natural key `(user, ndc, wholesaler)`, by `(user, id)`, and as the full set of
//! a user's records. Every method is scoped to one owner; there is no way to reach another user's records through this
//! trait.
use async_trait::async_trait;

use crate::db::entity::InventoryRecord;
use crate::sheet::InventoryRow;
use crate::types::Result;
use crate::types::UpsertOutcome;

#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Insert `row` for `user_id`, or overwrite the record with the same natural key. `quantity_disposed` of an
    /// existing record is left alone; a new record starts at zero.
    async fn upsert(&self, user_id: i32, row: &InventoryRow, upload_timestamp: &str) -> Result<UpsertOutcome>;

    async fn find_by_natural_key(&self, user_id: i32, ndc: &str, wholesaler: &str) -> Result<Option<InventoryRecord>>;

    /// Find record `id` if, and only if, it belongs to `user_id`.
    async fn find_owned(&self, user_id: i32, id: i32) -> Result<Option<InventoryRecord>>;

    /// Overwrite the disposed quantity. Returns `false` when no owned record matched.
    async fn set_disposed(&self, user_id: i32, id: i32, quantity: i64) -> Result<bool>;

    /// All records of the user in insertion order.
    async fn all_for_user(&self, user_id: i32) -> Result<Vec<InventoryRecord>>;
}
