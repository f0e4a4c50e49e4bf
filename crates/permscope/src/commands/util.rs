//! Shared helpers for command handlers.

use std::path::Path;

use permscope_core::{AccessClient, FetchPolicy, HttpAccessSource, ServiceConfig};

use crate::error::CliError;

/// Build the fallback-aware access client from runtime configuration.
pub fn connect(config: &ServiceConfig) -> Result<AccessClient<HttpAccessSource>, CliError> {
    let source = HttpAccessSource::connect(config)?;
    Ok(AccessClient::new(source, FetchPolicy::from(config)))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}
