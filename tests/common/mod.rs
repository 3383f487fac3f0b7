#![allow(dead_code)]

use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use rx_ledger::auth::UserStore;
use rx_ledger::db::driver::sqlite::Sqlite;
use rx_ledger::db::SeaStore;
use rx_ledger::sheet::RawRow;
use tempfile::TempDir;

pub type Store = SeaStore<Sqlite>;

/// A migrated SQLite ledger living in its own temporary directory.
pub struct TestLedger {
    pub store: Arc<Store>,
    pub dir:   TempDir,
}

pub async fn ledger() -> Result<TestLedger, Box<dyn std::error::Error>> {
    let dir = tempfile::Builder::new().prefix("rx-ledger-test").tempdir()?;
    let driver = Sqlite::connect(&dir.path().join("ledger.db")).await?;
    let store = Arc::new(SeaStore::new(Arc::new(driver)));
    store.prepare().await?;

    Ok(TestLedger { store, dir })
}

/// Create a user directly in the store and return its id.
pub async fn user(store: &Store, username: &str) -> Result<i32, Box<dyn std::error::Error>> {
    Ok(store
        .create_user(username, "$argon2id$not-a-real-hash".to_owned(), "PH-001")
        .await?
        .id)
}

pub fn row(line: usize, ndc: &str, drug_name: &str, quantity: i64, manufacturer: &str, wholesaler: &str) -> RawRow {
    RawRow::new(line)
        .with("NDC", ndc)
        .with("Drug Name", drug_name)
        .with("Quantity Ordered", quantity)
        .with("Manufacturer", manufacturer)
        .with("Wholesaler", wholesaler)
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}
