//! # crm-bulk
//!
//! Chunked bulk transfer against a page-capped remote record store.
//!
//! The remote API caps every request (ids per lookup, values per OR-search,
//! rows per write, records per page). This library turns one logical call
//! into a sequence of bounded requests and provides:
//!
//! - **Chunk planning** for id lists, value lists, row batches and index windows
//! - **Bounded retry** of a failing chunk, resetting on every success
//! - **Per-operation termination**: queue exhaustion, short page, single page
//! - **Watermark-aware scans** that never split a group of same-timestamp records
//! - **Response normalization** of the remote store's singleton-or-list payloads
//!
//! ## Example
//!
//! ```rust,no_run
//! use crm_bulk::{BulkClient, Config, UpdatedAfterOptions};
//!
//! #[tokio::main]
//! async fn main() -> crm_bulk::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let client = BulkClient::new(config, "auth-token")?;
//!     let leads = client
//!         .fetch_updated_after("Leads", "2016-09-05 14:00:00", &UpdatedAfterOptions::default())
//!         .await?;
//!     println!("Fetched {} leads", leads.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod response;
pub mod transfer;
pub mod transport;

// Re-exports for convenient access
pub use client::{
    BulkClient, FetchOptions, InsertOptions, InsertOutcome, InsertRows, RemoteMethod,
    SearchOptions, UpdateOptions, UpdatedAfterOptions,
};
pub use config::{Config, EndpointConfig, PageSizes, TransferConfig};
pub use core::{FormFields, Record, RowResult, Transport, TransportResponse, Watermark};
pub use error::{BulkError, Result};
pub use transfer::{SessionStats, TerminationPolicy, TransferSession};
pub use transport::HttpTransport;
