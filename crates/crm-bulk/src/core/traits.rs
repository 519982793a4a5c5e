//! Core traits for talking to the remote record store.
//!
//! - [`Transport`]: issues one form-encoded POST and returns the raw body
//!
//! The engine never performs IO except through this trait, so sessions
//! can be driven by the HTTP implementation or by a scripted stand-in.

use async_trait::async_trait;

use crate::error::Result;

/// Ordered form fields for one request.
///
/// Fields whose value is `None` are kept in the list but omitted from the
/// submitted form rather than sent as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    fields: Vec<(String, Option<String>)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field that is always submitted.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), Some(value.into())));
        self
    }

    /// Append a field that is submitted only when `value` is set.
    pub fn with_opt<V: ToString>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.fields
            .push((name.into(), value.map(|v| v.to_string())));
        self
    }

    /// Submitted value for a field, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Fields that will actually be submitted, in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(n, v)| v.as_deref().map(|v| (n.as_str(), v)))
    }
}

/// Raw response from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// Issue form-encoded POST requests to the remote store.
///
/// Implementations own connection handling and timeouts. A network failure
/// or non-success status must be reported as [`BulkError::Transport`].
///
/// [`BulkError::Transport`]: crate::error::BulkError::Transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `form` to `url` and return the response body.
    async fn post_form(&self, url: &str, form: &FormFields) -> Result<TransportResponse>;
}
