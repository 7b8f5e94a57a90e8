//! Domain error types.

/// Top-level error type for recstore.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("resource error: {reason}")]
    Resource { reason: String },

    #[error("position {position} out of range (count {count})")]
    Range { position: usize, count: usize },
}

impl StoreError {
    pub(crate) fn resource(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        StoreError::Resource {
            reason: format!("{context}: {err}"),
        }
    }
}

impl From<&StoreError> for std::process::ExitCode {
    fn from(err: &StoreError) -> Self {
        let code: u8 = match err {
            StoreError::Resource { .. } => 1,
            StoreError::Configuration { .. }
            | StoreError::ConfigParse { .. }
            | StoreError::ConfigMissing { .. }
            | StoreError::ConfigInvalid { .. } => 2,
            StoreError::Range { .. } => 3,
        };
        std::process::ExitCode::from(code)
    }
}
