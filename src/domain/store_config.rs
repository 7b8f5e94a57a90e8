//! Store settings resolved from an INI configuration.

use crate::domain::error::StoreError;
use crate::domain::record_codec;
use crate::ports::config_port::ConfigPort;
use csv::StringRecord;
use std::path::PathBuf;

pub const STORE_SECTION: &str = "store";
pub const LOG_SECTION: &str = "log";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// Header row written first on bulk import.
    pub header: Option<StringRecord>,
    /// Create missing parent directories instead of failing on open.
    pub create_dirs: bool,
}

pub fn build_store_config(config: &dyn ConfigPort) -> Result<StoreConfig, StoreError> {
    let path = config
        .get_string(STORE_SECTION, "path")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| StoreError::ConfigMissing {
            section: STORE_SECTION.into(),
            key: "path".into(),
        })?;

    let header = match config.get_string(STORE_SECTION, "header") {
        Some(raw) => Some(parse_header(&raw).map_err(|reason| StoreError::ConfigInvalid {
            section: STORE_SECTION.into(),
            key: "header".into(),
            reason,
        })?),
        None => None,
    };

    Ok(StoreConfig {
        path: PathBuf::from(path.trim()),
        header,
        create_dirs: config.get_bool(STORE_SECTION, "create_dirs", false),
    })
}

/// Parses a comma-separated header line such as `date,open,close`.
pub fn parse_header(raw: &str) -> Result<StringRecord, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("header is empty".into());
    }
    record_codec::parse_line(trimmed)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "header is empty".to_string())
}

/// Log level from `[log] level`, if configured.
pub fn log_level(config: &dyn ConfigPort) -> Option<String> {
    config
        .get_string(LOG_SECTION, "level")
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
}
