//! Configuration validation.

use super::Config;
use crate::error::{BulkError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.endpoint.base_url.trim().is_empty() {
        return Err(BulkError::Config("endpoint.base_url is required".into()));
    }
    if config.endpoint.scope.is_empty() {
        return Err(BulkError::Config("endpoint.scope is required".into()));
    }
    if config.endpoint.timeout_secs == 0 {
        return Err(BulkError::Config(
            "endpoint.timeout_secs must be at least 1".into(),
        ));
    }

    if config.transfer.watermark_field.is_empty() {
        return Err(BulkError::Config(
            "transfer.watermark_field is required".into(),
        ));
    }

    // Page sizes are remote API ceilings; never clamp, reject.
    for (name, size, ceiling) in config.transfer.page_sizes.with_ceilings() {
        if size == 0 {
            return Err(BulkError::Config(format!(
                "transfer.page_sizes.{} must be at least 1",
                name
            )));
        }
        if size > ceiling {
            return Err(BulkError::Config(format!(
                "transfer.page_sizes.{} is {}, above the remote ceiling of {}",
                name, size, ceiling
            )));
        }
    }

    Ok(())
}
