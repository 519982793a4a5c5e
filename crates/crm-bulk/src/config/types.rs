//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard page-size ceiling for value-match search (criteria OR-chains).
pub const VALUE_MATCH_CEILING: usize = 5;

/// Hard page-size ceiling for id-list fetches.
pub const BY_ID_CEILING: usize = 100;

/// Hard page-size ceiling for bulk inserts and bulk updates.
pub const WRITE_CEILING: usize = 100;

/// Hard page-size ceiling for the time-ordered scan.
pub const UPDATED_AFTER_CEILING: usize = 200;

/// Hard ceiling for the single criteria-search result window.
pub const CRITERIA_WINDOW_CEILING: usize = 200;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint configuration.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Chunking and retry behavior.
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Remote endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL; requests go to `{base_url}/{module}/{method}`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API scope sent with every request (default: "crmapi").
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Per-request timeout in seconds, enforced by the HTTP transport.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scope: default_scope(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the URL for a remote method on a module.
    pub fn url(&self, module: &str, method: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            module,
            method
        )
    }
}

/// Chunking and retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Consecutive failures of the same chunk tolerated before the session fails.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Label of the ordering field used by the time-ordered scan.
    #[serde(default = "default_watermark_field")]
    pub watermark_field: String,

    /// Per-operation page sizes.
    #[serde(default)]
    pub page_sizes: PageSizes,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: default_max_consecutive_errors(),
            watermark_field: default_watermark_field(),
            page_sizes: PageSizes::default(),
        }
    }
}

/// Per-operation page sizes. Each must stay within the remote API's ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSizes {
    #[serde(default = "default_by_id")]
    pub by_id: usize,

    #[serde(default = "default_value_match")]
    pub value_match: usize,

    #[serde(default = "default_updated_after")]
    pub updated_after: usize,

    #[serde(default = "default_criteria_window")]
    pub criteria_window: usize,

    #[serde(default = "default_write")]
    pub write: usize,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            by_id: BY_ID_CEILING,
            value_match: VALUE_MATCH_CEILING,
            updated_after: UPDATED_AFTER_CEILING,
            criteria_window: CRITERIA_WINDOW_CEILING,
            write: WRITE_CEILING,
        }
    }
}

impl PageSizes {
    /// Each configured size paired with its name and remote ceiling.
    pub fn with_ceilings(&self) -> [(&'static str, usize, usize); 5] {
        [
            ("by_id", self.by_id, BY_ID_CEILING),
            ("value_match", self.value_match, VALUE_MATCH_CEILING),
            ("updated_after", self.updated_after, UPDATED_AFTER_CEILING),
            ("criteria_window", self.criteria_window, CRITERIA_WINDOW_CEILING),
            ("write", self.write, WRITE_CEILING),
        ]
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    "https://crm.zoho.com/crm/private/json".to_string()
}

fn default_scope() -> String {
    "crmapi".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_consecutive_errors() -> u32 {
    3
}

fn default_watermark_field() -> String {
    "Modified Time".to_string()
}

fn default_by_id() -> usize {
    BY_ID_CEILING
}

fn default_value_match() -> usize {
    VALUE_MATCH_CEILING
}

fn default_updated_after() -> usize {
    UPDATED_AFTER_CEILING
}

fn default_criteria_window() -> usize {
    CRITERIA_WINDOW_CEILING
}

fn default_write() -> usize {
    WRITE_CEILING
}
