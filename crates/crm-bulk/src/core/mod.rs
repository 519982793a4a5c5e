//! Core types shared by every transfer operation.
//!
//! - [`record`]: records, per-row write results and watermarks
//! - [`traits`]: the transport seam every request goes through

pub mod record;
pub mod traits;

pub use record::{Record, RowResult, Watermark, WATERMARK_FORMAT};
pub use traits::{FormFields, Transport, TransportResponse};
