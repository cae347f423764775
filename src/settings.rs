use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CACHE_FILE, DEFAULT_PORT, DEFAULT_PROXY_SERVER};

/// User-facing settings, stored as JSON (`config.json` by default).
///
/// Field names are camelCase on disk. The file is written by the
/// configuration front end, which is a separate concern; here it is only
/// read. Missing or malformed files fall back to defaults so the responder
/// can always come up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Remote URL the PAC script is fetched from. Empty disables refreshes.
    pub pac_url: String,
    /// Proxy written into the rewritten script; also the egress proxy for
    /// the fetch itself.
    pub proxy_server: String,
    /// Listening port for the local responder. Changing it requires a
    /// stop/start of the responder.
    pub port: u16,
    /// Path of the on-disk copy of the last rewritten PAC document.
    pub cache_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pac_url: String::new(),
            proxy_server: DEFAULT_PROXY_SERVER.to_string(),
            port: DEFAULT_PORT,
            cache_file: DEFAULT_CACHE_FILE.to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!(
                        "Malformed settings file {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    "Could not read settings file {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}
