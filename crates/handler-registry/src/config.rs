//! Manifest of installed handlers and embedder toggles.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use navgate_core_types::NavError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Installed applications plus the embedder answers the classifier asks for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandlerManifest {
    #[serde(default)]
    pub handlers: Vec<HandlerEntry>,
    #[serde(default)]
    pub default_sms_package: Option<String>,
    /// Package of the application that asked the browser to navigate, if any.
    #[serde(default)]
    pub calling_package: Option<String>,
    #[serde(default)]
    pub trusted_packages: Vec<String>,
    /// Package a trusted caller wants outbound activations pinned to.
    #[serde(default)]
    pub trusted_target_package: Option<String>,
    #[serde(default)]
    pub valid_web_app_shells: Vec<String>,
    #[serde(default)]
    pub launch_web_app_shell_on_initial: bool,
    #[serde(default = "default_true")]
    pub foreground: bool,
    #[serde(default)]
    pub incognito: bool,
    #[serde(default = "default_true")]
    pub can_load_in_context: bool,
    /// URL patterns for which a chooser should never be shown.
    #[serde(default)]
    pub avoid_disambiguation: Vec<String>,
    /// URL patterns the embedder never hands off.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl Default for HandlerManifest {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            default_sms_package: None,
            calling_package: None,
            trusted_packages: Vec::new(),
            trusted_target_package: None,
            valid_web_app_shells: Vec::new(),
            launch_web_app_shell_on_initial: false,
            foreground: true,
            incognito: false,
            can_load_in_context: true,
            avoid_disambiguation: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandlerEntry {
    pub package: String,
    /// `scheme:` or `scheme://` matches the bare scheme; anything longer is a prefix,
    /// and a single `*` splits the pattern into prefix and suffix.
    pub patterns: Vec<String>,
    /// Inferred from the patterns when absent.
    #[serde(default)]
    pub specialized: Option<bool>,
    #[serde(default = "default_true")]
    pub exported: bool,
    #[serde(default)]
    pub browser: bool,
    /// The platform would pick this handler without asking.
    #[serde(default)]
    pub default: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize manifest: {0}")]
    Deserialize(String),
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

impl From<ConfigError> for NavError {
    fn from(value: ConfigError) -> Self {
        NavError::new(value.to_string())
    }
}

pub fn load_manifest_from_reader<R: Read>(mut reader: R) -> Result<HandlerManifest, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_manifest_str(&buf)
}

pub fn load_manifest_from_path(path: impl AsRef<Path>) -> Result<HandlerManifest, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_manifest_from_reader(file)
}

/// Accepts JSON or YAML.
pub fn parse_manifest_str(raw: &str) -> Result<HandlerManifest, ConfigError> {
    let manifest: HandlerManifest = match serde_json::from_str(raw) {
        Ok(manifest) => manifest,
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        })?,
    };
    validate_manifest(&manifest)?;
    Ok(manifest)
}

fn validate_manifest(manifest: &HandlerManifest) -> Result<(), ConfigError> {
    for entry in &manifest.handlers {
        if entry.package.trim().is_empty() {
            return Err(ConfigError::Invalid("handler with empty package".into()));
        }
        if entry.patterns.iter().all(|pattern| pattern.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "handler {} has no patterns",
                entry.package
            )));
        }
        if let Some(pattern) = entry
            .patterns
            .iter()
            .find(|pattern| pattern.matches('*').count() > 1)
        {
            return Err(ConfigError::Invalid(format!(
                "pattern {pattern} of {} has more than one wildcard",
                entry.package
            )));
        }
    }
    Ok(())
}

/// Handlers a bare device usually has: a store and a dialer.
pub fn default_manifest() -> HandlerManifest {
    HandlerManifest {
        handlers: vec![
            HandlerEntry {
                package: "com.android.vending".into(),
                patterns: vec!["market:".into()],
                specialized: None,
                exported: true,
                browser: false,
                default: true,
            },
            HandlerEntry {
                package: "com.android.dialer".into(),
                patterns: vec!["tel:".into()],
                specialized: None,
                exported: true,
                browser: false,
                default: true,
            },
        ],
        ..HandlerManifest::default()
    }
}
