//! Layered policy loading: builtin defaults, then YAML files, then the
//! environment, then `path=value` pairs handed down by the CLI.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::api::apply_override_to_snapshot;
use crate::defaults::default_snapshot;
use crate::errors::PolicyError;
use crate::model::{PolicySnapshot, PolicySource};

pub const ENV_PREFIX: &str = "NAVGATE_POLICY__";
pub const ENV_JSON: &str = "NAVGATE_POLICY_OVERRIDE_JSON";
pub const ENV_CLI_OVERRIDES: &str = "NAVGATE_POLICY_CLI_OVERRIDES";

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
    pub include_cli_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
            include_cli_env: true,
        }
    }
}

/// Builtin defaults, then the optional YAML file, then environment overlays.
pub fn load_snapshot(path: Option<&Path>) -> Result<PolicySnapshot, PolicyError> {
    let options = LoadOptions {
        paths: path.map(Path::to_path_buf).into_iter().collect(),
        include_env: true,
        include_cli_env: true,
    };
    load_snapshot_with_options(&options)
}

pub fn load_snapshot_with_options(options: &LoadOptions) -> Result<PolicySnapshot, PolicyError> {
    let mut snapshot = default_snapshot();
    record_builtin_provenance(&mut snapshot)?;

    let mut layers = Vec::new();
    for path in &options.paths {
        match file_layer(path)? {
            Some(layer) => layers.push(layer),
            None => {
                debug!(target: "navgate::policy", path = %path.display(), "policy file missing, skipped")
            }
        }
    }
    if options.include_env {
        layers.push(env_layer(env::vars(), env::var(ENV_JSON).ok().as_deref())?);
    }
    if options.include_cli_env {
        if let Ok(raw) = env::var(ENV_CLI_OVERRIDES) {
            layers.push(cli_layer(&raw));
        }
    }

    for layer in layers {
        layer.apply(&mut snapshot)?;
    }
    Ok(snapshot)
}

/// Dotted paths contributed by one source, applied in insertion order.
struct Layer {
    source: PolicySource,
    entries: Vec<(String, Value)>,
}

impl Layer {
    fn new(source: PolicySource) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    /// Adds every leaf of `value` below `prefix`. Keys are lowercased.
    fn extend_flattened(&mut self, prefix: &str, value: Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let key = key.trim().to_ascii_lowercase();
                    let path = if prefix.is_empty() {
                        key
                    } else {
                        format!("{prefix}.{key}")
                    };
                    self.extend_flattened(&path, child);
                }
            }
            leaf if !prefix.is_empty() => self.entries.push((prefix.to_string(), leaf)),
            _ => {}
        }
    }

    fn apply(self, snapshot: &mut PolicySnapshot) -> Result<(), PolicyError> {
        for (path, value) in &self.entries {
            apply_override_to_snapshot(snapshot, path, value, self.source)?;
        }
        Ok(())
    }
}

fn file_layer(path: &Path) -> Result<Option<Layer>, PolicyError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|err| PolicyError::Io(format!("{}: {}", path.display(), err)))?;
    let document: Value =
        serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(err.to_string()))?;
    let mut layer = Layer::new(PolicySource::File);
    layer.extend_flattened("", document);
    Ok(Some(layer))
}

/// `NAVGATE_POLICY__SECTION__KEY=value` variables, then the JSON blob.
fn env_layer(
    vars: impl Iterator<Item = (String, String)>,
    json_blob: Option<&str>,
) -> Result<Layer, PolicyError> {
    let mut layer = Layer::new(PolicySource::Env);
    for (key, raw) in vars {
        let Some(path) = key.strip_prefix(ENV_PREFIX).and_then(env_key_path) else {
            continue;
        };
        layer.entries.push((path, parse_scalar(&raw)));
    }

    if let Some(blob) = json_blob.map(str::trim).filter(|blob| !blob.is_empty()) {
        let document: Value =
            serde_json::from_str(blob).map_err(|err| PolicyError::Invalid(err.to_string()))?;
        layer.extend_flattened("", document);
    }
    Ok(layer)
}

fn env_key_path(key: &str) -> Option<String> {
    let segments: Vec<String> = key
        .split("__")
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!segments.is_empty()).then(|| segments.join("."))
}

/// Comma separated `path=value` pairs. A bare path sets null.
fn cli_layer(raw: &str) -> Layer {
    let mut layer = Layer::new(PolicySource::Cli);
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let (path, value) = token
            .split_once('=')
            .map_or((token, ""), |(path, value)| (path.trim(), value.trim()));
        if !path.is_empty() {
            layer.entries.push((path.to_string(), parse_scalar(value)));
        }
    }
    layer
}

/// JSON literal when it parses as one, otherwise the raw string.
fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn record_builtin_provenance(snapshot: &mut PolicySnapshot) -> Result<(), PolicyError> {
    let mut layer = Layer::new(PolicySource::Builtin);
    layer.extend_flattened("navigation", section_json(&snapshot.navigation)?);
    layer.extend_flattened("intents", section_json(&snapshot.intents)?);
    layer.extend_flattened("features", section_json(&snapshot.features)?);
    for (path, _) in &layer.entries {
        snapshot.set_provenance(path, layer.source);
    }
    Ok(())
}

fn section_json<T: serde::Serialize>(section: &T) -> Result<Value, PolicyError> {
    serde_json::to_value(section).map_err(|err| PolicyError::Invalid(err.to_string()))
}
