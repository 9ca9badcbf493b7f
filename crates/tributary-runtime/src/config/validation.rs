//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, TributaryConfig};

/// Validates a loaded configuration.
pub fn validate_config(config: &TributaryConfig) -> ConfigResult<()> {
    let logging = &config.logging;
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output = \"file\"",
        ));
    }
    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "logging.filters contains an empty module name: {module:?}"
        )));
    }

    let callbacks = &config.callbacks;
    if callbacks.completion_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "callbacks.completion_timeout_ms must be greater than zero",
        ));
    }
    if let (Some(warn), Some(timeout)) = (
        callbacks.slow_callback_warn_ms,
        callbacks.completion_timeout_ms,
    ) && warn > timeout
    {
        return Err(ConfigError::validation(format!(
            "callbacks.slow_callback_warn_ms ({warn}) exceeds completion_timeout_ms ({timeout})"
        )));
    }
    Ok(())
}
