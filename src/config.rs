// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration resolution.
//!
//! Options come from four layers, in increasing precedence:
//!
//! 1. Built-in defaults ([`PartialOptions::defaults`])
//! 2. The YAML config file (`$HOME/.squash/config.yaml` unless `--config` is given)
//! 3. `SQUASH_*` environment variables
//! 4. Explicit command-line flags
//!
//! Each layer is a [`PartialOptions`] whose fields are `None` when the layer
//! does not mention them. [`resolve`] overlays the layers field by field and
//! freezes the result into a [`MergedOptions`]. Fields no layer sets stay
//! empty and are filled later by target resolution.
//!
//! # Example config file
//!
//! ```yaml
//! namespace: shop
//! secureMode: true
//! timeoutSeconds: 120
//! containerRepo: registry.example.com/squash
//! ```

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CONTAINER_REPO, DEFAULT_CONTAINER_VERSION,
    DEFAULT_CRI_SOCK, DEFAULT_TIMEOUT_SECS, ENV_PREFIX,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// One configuration layer. `None` means "this layer does not set the field".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialOptions {
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
    pub debugger: Option<String>,
    pub local_port: Option<u16>,
    pub machine: Option<bool>,
    pub secure_mode: Option<bool>,
    pub timeout_seconds: Option<u64>,
    pub no_clean: Option<bool>,
    pub choose_pod: Option<bool>,
    pub choose_debugger: Option<bool>,
    pub json: Option<bool>,
    pub container_repo: Option<String>,
    pub container_version: Option<String>,
    pub cri_sock: Option<String>,
}

impl PartialOptions {
    /// The built-in defaults layer.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            local_port: Some(0),
            machine: Some(false),
            secure_mode: Some(false),
            timeout_seconds: Some(DEFAULT_TIMEOUT_SECS),
            no_clean: Some(false),
            choose_pod: Some(false),
            choose_debugger: Some(false),
            json: Some(false),
            container_repo: Some(DEFAULT_CONTAINER_REPO.to_string()),
            container_version: Some(DEFAULT_CONTAINER_VERSION.to_string()),
            cri_sock: Some(DEFAULT_CRI_SOCK.to_string()),
            ..Default::default()
        }
    }

    /// Read the environment layer through `lookup`.
    ///
    /// `lookup` receives the full variable name (e.g. `SQUASH_NAMESPACE`).
    /// Empty values are treated as unset; values that fail to parse are
    /// logged and ignored.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        };
        let string = |name: &str| get(name).map(|(_, v)| v);
        let boolean = |name: &str| get(name).and_then(|(key, v)| parse_bool(&key, &v));
        let number = |name: &str| get(name).and_then(|(key, v)| parse_number::<u64>(&key, &v));

        Self {
            namespace: string("NAMESPACE"),
            pod: string("POD"),
            container: string("CONTAINER"),
            debugger: string("DEBUGGER"),
            local_port: get("LOCALPORT").and_then(|(key, v)| parse_number::<u16>(&key, &v)),
            machine: boolean("MACHINE"),
            secure_mode: boolean("SECURE_MODE"),
            timeout_seconds: number("TIMEOUT"),
            no_clean: boolean("NO_CLEAN"),
            choose_pod: None,
            choose_debugger: None,
            json: boolean("JSON"),
            container_repo: string("CONTAINER_REPO"),
            container_version: string("CONTAINER_VERSION"),
            cri_sock: string("CRISOCK"),
        }
    }

    /// Read the environment layer from the process environment.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self::from_env(|key| std::env::var(key).ok())
    }

    /// Overlay `higher` on top of `self`; every field `higher` sets wins.
    #[must_use]
    pub fn overlay(self, higher: PartialOptions) -> PartialOptions {
        PartialOptions {
            namespace: higher.namespace.or(self.namespace),
            pod: higher.pod.or(self.pod),
            container: higher.container.or(self.container),
            debugger: higher.debugger.or(self.debugger),
            local_port: higher.local_port.or(self.local_port),
            machine: higher.machine.or(self.machine),
            secure_mode: higher.secure_mode.or(self.secure_mode),
            timeout_seconds: higher.timeout_seconds.or(self.timeout_seconds),
            no_clean: higher.no_clean.or(self.no_clean),
            choose_pod: higher.choose_pod.or(self.choose_pod),
            choose_debugger: higher.choose_debugger.or(self.choose_debugger),
            json: higher.json.or(self.json),
            container_repo: higher.container_repo.or(self.container_repo),
            container_version: higher.container_version.or(self.container_version),
            cri_sock: higher.cri_sock.or(self.cri_sock),
        }
    }
}

/// The single, immutable view of all options for one invocation.
///
/// `namespace`, `pod`, `container` and `debugger` may be empty: target
/// resolution fills them in on the [`crate::target::DebugTarget`] it produces,
/// never by mutating this value. A `local_port` of `0` means "pick a free port".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedOptions {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub debugger: String,
    pub local_port: u16,
    pub machine: bool,
    pub secure_mode: bool,
    pub timeout: Duration,
    pub no_clean: bool,
    pub choose_pod: bool,
    pub choose_debugger: bool,
    pub json: bool,
    pub container_repo: String,
    pub container_version: String,
    pub cri_sock: String,
}

impl Default for MergedOptions {
    fn default() -> Self {
        resolve(ConfigSources::default())
    }
}

impl From<PartialOptions> for MergedOptions {
    fn from(p: PartialOptions) -> Self {
        MergedOptions {
            namespace: p.namespace.unwrap_or_default(),
            pod: p.pod.unwrap_or_default(),
            container: p.container.unwrap_or_default(),
            debugger: p.debugger.unwrap_or_default(),
            local_port: p.local_port.unwrap_or(0),
            machine: p.machine.unwrap_or(false),
            secure_mode: p.secure_mode.unwrap_or(false),
            timeout: Duration::from_secs(p.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            no_clean: p.no_clean.unwrap_or(false),
            choose_pod: p.choose_pod.unwrap_or(false),
            choose_debugger: p.choose_debugger.unwrap_or(false),
            json: p.json.unwrap_or(false),
            container_repo: p
                .container_repo
                .unwrap_or_else(|| DEFAULT_CONTAINER_REPO.to_string()),
            container_version: p
                .container_version
                .unwrap_or_else(|| DEFAULT_CONTAINER_VERSION.to_string()),
            cri_sock: p.cri_sock.unwrap_or_else(|| DEFAULT_CRI_SOCK.to_string()),
        }
    }
}

/// The non-default layers, lowest precedence first.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources {
    pub file: PartialOptions,
    pub env: PartialOptions,
    pub flags: PartialOptions,
}

/// Merge defaults, config file, environment and flags into [`MergedOptions`].
#[must_use]
pub fn resolve(sources: ConfigSources) -> MergedOptions {
    let merged = PartialOptions::defaults()
        .overlay(sources.file)
        .overlay(sources.env)
        .overlay(sources.flags);

    debug!(?merged, "Resolved configuration layers");
    merged.into()
}

/// Location of the config file when `--config` is not given.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the config-file layer.
///
/// A missing file contributes nothing. A file that cannot be read or parsed
/// is reported with `warn!` and also contributes nothing.
#[must_use]
pub fn load_config_file(path: &Path) -> PartialOptions {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file found, using defaults");
            return PartialOptions::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read config file, ignoring it");
            return PartialOptions::default();
        }
    };

    parse_config(&contents).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Failed to parse config file, ignoring it");
        PartialOptions::default()
    })
}

/// Parse the YAML config-file format. An empty document sets nothing.
///
/// # Errors
///
/// Returns the YAML error if the document is not a valid config.
pub fn parse_config(contents: &str) -> Result<PartialOptions, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(PartialOptions::default());
    }
    serde_yaml::from_str(contents)
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(variable = key, value, "Ignoring non-boolean environment value");
            None
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    value.parse().ok().or_else(|| {
        warn!(variable = key, value, "Ignoring non-numeric environment value");
        None
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
