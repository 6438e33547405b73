//! Persistence for the slotd activation ledger.
//!
//! The [`storage::Ledger`] trait is the admission contract. It is implemented
//! by [`storage::sqlite::SqliteLedger`], the durable store used in
//! production, and by [`storage::memory::MemoryLedger`], a volatile variant
//! for tests and degraded operation. Only one of them is ever the source of
//! truth for a running process.

pub mod models;
pub mod schema;
pub mod storage;
