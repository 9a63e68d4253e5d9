/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Assistant transport configuration.
//!
//! Loaded from `<config dir>/mindcanvas/assistant.toml`. Every field has a
//! default, so a missing or partial file still yields a working setup. The
//! API key itself never lives in the file — only the name of the
//! environment variable holding it.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

/// Tool rounds one exchange may consume before it is stopped.
pub const DEFAULT_ROUND_BUDGET: u32 = 8;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";
const DEFAULT_API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Base URL of the generateContent API.
    pub endpoint: String,
    /// Model answering canvas exchanges.
    pub model_id: String,
    /// Model answering the secondary component-generation call.
    pub component_model_id: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Tool rounds one exchange may consume.
    pub round_budget: u32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            component_model_id: DEFAULT_MODEL_ID.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            round_budget: DEFAULT_ROUND_BUDGET,
        }
    }
}

impl AssistantConfig {
    /// Default config file location for this platform, when one exists.
    pub fn default_config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("mindcanvas");
        path.push("assistant.toml");
        Some(path)
    }

    /// Load from the default location. Defaults when the platform has no
    /// config directory.
    pub fn load() -> Self {
        match Self::default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file. A missing file is normal first-run state;
    /// a malformed one is reported and ignored.
    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Ignoring malformed assistant config {}: {e}",
                    path.display()
                );
                Self::default()
            },
        }
    }

    /// API key read from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}
