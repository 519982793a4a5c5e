//! Per-operation options passed through to the remote store.

use crate::core::{Record, RowResult};

/// Options for [`fetch_by_id`](super::BulkClient::fetch_by_id).
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Remote `newFormat` (1 omits null fields, 2 includes them).
    pub new_format: Option<u8>,
}

/// Options for [`fetch_updated_after`](super::BulkClient::fetch_updated_after).
#[derive(Debug, Clone, Default)]
pub struct UpdatedAfterOptions {
    /// Soft cap on records fetched. Records sharing the requested watermark
    /// are always fetched in full, so the result may exceed it.
    pub limit: Option<usize>,
    /// Labels to fetch; all columns when unset.
    pub select_columns: Option<Vec<String>>,
    pub new_format: Option<u8>,
}

/// Options for the criteria searches.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Only match records modified after this time (`YYYY-MM-DD HH:MM:SS`).
    pub watermark: Option<String>,
    pub new_format: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Trigger workflow rules (single-row insert only).
    pub wf_trigger: Option<bool>,
    /// 1 rejects duplicates, 2 updates the existing record.
    pub duplicate_check: Option<u8>,
    pub is_approval: Option<bool>,
    /// Lead assignment rule id (single-row insert only).
    pub larid: Option<String>,
    pub new_format: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub wf_trigger: Option<bool>,
    /// Lead assignment rule id (single-row update only).
    pub larid: Option<String>,
    pub new_format: Option<u8>,
}

/// Rows for [`insert`](super::BulkClient::insert): one record or a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertRows {
    One(Record),
    Many(Vec<Record>),
}

impl From<Record> for InsertRows {
    fn from(row: Record) -> Self {
        InsertRows::One(row)
    }
}

impl From<Vec<Record>> for InsertRows {
    fn from(rows: Vec<Record>) -> Self {
        InsertRows::Many(rows)
    }
}

/// Result of [`insert`](super::BulkClient::insert), shaped like its input.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum InsertOutcome {
    Single(Record),
    Bulk(Vec<RowResult>),
}
