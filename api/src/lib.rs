//! slotd API service.
//!
//! Admits a bounded number of agents into the active set, persists that set
//! and republishes it as an HTTP service-discovery feed for the scraper.
//!
//! # Configuration
//!
//! See [`config::SlotdConfig`] for the available flags and environment
//! variables.
//!
//! # Layout
//!
//! [`registry`] holds the use-case layer and is the only thing the HTTP
//! handlers talk to. Storage is reached through the
//! [`slotd_db::storage::Ledger`] trait.

pub mod config;
pub mod registry;
pub mod server;

pub(crate) mod context;
pub(crate) mod error;
pub(crate) mod handlers;
