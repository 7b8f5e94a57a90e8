//! INI configuration for a record store.
//!
//! ```ini
//! [store]
//! path = /var/lib/recstore/prices.csv   ; record file (required unless --file)
//! header = date,open,high,low,close,volume  ; default header for imports
//! create_dirs = true                    ; create missing parent directories
//!
//! [log]
//! level = info                          ; trace, debug, info, warn, error
//! ```

use crate::domain::error::StoreError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    /// Loads an INI file, reporting an unreadable or malformed one as
    /// [`StoreError::ConfigParse`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| StoreError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, StoreError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| StoreError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }
}

/// Accepts the spellings people put in hand-edited INI files.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(default)
    }
}
