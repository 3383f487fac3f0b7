//! # rx-ledger
//!
//! Per-user pharmacy inventory ledger served over HTTP.
//!
//! A pharmacy uploads a spreadsheet of ordered drug quantities, records how much of each item has been disposed of,
//! and asks for a report flagging every item whose disposed quantity exceeds what was ordered.
//!
//! # The Pipeline
//!
//! - An upload is parsed into header-keyed rows by the [`sheet`] module and decoded against a fixed schema. A single
//!   malformed row rejects the whole upload before anything is written.
//! - The [`UpsertEngine`] reconciles the decoded rows with the user's ledger. Each record is addressed by its natural
//!   key `(user, NDC, wholesaler)`: a known key overwrites the ordered side of the record and keeps the disposed
//!   quantity, an unknown one creates the record.
//! - The [`DispositionUpdater`] overwrites the disposed quantity of a single record. Optionally every such write is
//!   appended to an audit log.
//! - The [`ReportBuilder`] derives the status of each record and orders the result by manufacturer and drug name.
//!
//! Every operation is scoped to the user identified by the bearer token the [`auth`] gate issued at login; no user can
//! see or touch another user's records.
//!
//! # Storage
//!
//! The ledger lives in an SQL database accessed through [SeaORM](https://www.sea-ql.org/SeaORM/). SQLite is the default
//! backend; PostgreSQL is available with the `pg` feature. The natural key is backed by a unique index, so concurrent
//! uploads of the same key produce one insert and one update, never a duplicate.
//!
//! The store is injected: [`SeaStore`](db::SeaStore) wraps whichever [`DatabaseDriver`](db::driver::DatabaseDriver)
//! the application connected to, and every component is generic over the [`LedgerStore`] trait so tests can swap in
//! doubles.

pub mod app;
pub mod auth;
pub mod db;
pub mod disposition;
pub mod ledger;
pub mod report;
pub mod server;
pub mod sheet;
pub mod types;
pub mod upsert;

#[doc(inline)]
pub use disposition::DispositionUpdater;
#[doc(inline)]
pub use ledger::LedgerStore;
#[doc(inline)]
pub use report::ReportBuilder;
#[doc(inline)]
pub use upsert::UpsertEngine;

pub mod prelude {
    pub use crate::auth::AuthGate;
    pub use crate::auth::TokenIssuer;
    pub use crate::auth::UserStore;
    pub use crate::db::driver::DatabaseDriver;
    pub use crate::db::prelude::*;
    pub use crate::disposition::DispositionAudit;
    pub use crate::disposition::DispositionUpdater;
    pub use crate::ledger::LedgerStore;
    pub use crate::report::ReportBuilder;
    pub use crate::sheet::InventoryRow;
    pub use crate::sheet::RawRow;
    pub use crate::types::*;
    pub use crate::upsert::UpsertEngine;
}
