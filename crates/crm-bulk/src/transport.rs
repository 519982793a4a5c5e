//! HTTP transport over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::core::{FormFields, Transport, TransportResponse};
use crate::error::{BulkError, Result};

/// Form-POST transport backed by a shared `reqwest::Client`.
///
/// The request timeout is the only timeout in the system; the engine
/// itself never times out a chunk.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BulkError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, url: &str, form: &FormFields) -> Result<TransportResponse> {
        let fields: Vec<(&str, &str)> = form.present().collect();
        debug!("POST {} ({} form fields)", url, fields.len());

        let response = self
            .client
            .post(url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| {
                BulkError::transport(
                    format!("POST {} failed: {}", url, e),
                    e.status().map(|s| s.as_u16()),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            BulkError::transport(
                format!("reading response from {} failed: {}", url, e),
                Some(status.as_u16()),
            )
        })?;

        if !status.is_success() {
            return Err(BulkError::transport(
                format!("POST {} returned {}: {}", url, status, first_line(&body)),
                Some(status.as_u16()),
            ));
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn first_line(body: &str) -> &str {
    body.lines().next().unwrap_or_default()
}
