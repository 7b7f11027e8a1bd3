use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use navgate_handler_registry::{default_manifest, load_manifest_from_path, HandlerManifest};
use navgate_policy_center::{load_snapshot, PolicySnapshot};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOCAL_POLICY_PATH: &str = "config/policy.yaml";

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    // Reports go to stdout, so logs stay on stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Builtin policy, overlaid with the given file (or `config/policy.yaml`) and
/// the `NAVGATE_POLICY_*` environment.
pub fn load_policy(policy_path: Option<&Path>) -> Result<PolicySnapshot> {
    let path = match policy_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Policy file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => {
            let local = PathBuf::from(LOCAL_POLICY_PATH);
            local.exists().then_some(local)
        }
    };

    let snapshot = load_snapshot(path.as_deref()).context("Failed to load policy")?;
    match &path {
        Some(path) => info!("Loaded policy from: {}", path.display()),
        None => info!("No policy file, using builtin policy"),
    }
    Ok(snapshot)
}

pub fn load_manifest(manifest_path: Option<&Path>) -> Result<HandlerManifest> {
    match manifest_path {
        Some(path) => {
            let manifest = load_manifest_from_path(path)
                .with_context(|| format!("Failed to load handler manifest {}", path.display()))?;
            info!(
                "Loaded {} handlers from: {}",
                manifest.handlers.len(),
                path.display()
            );
            Ok(manifest)
        }
        None => {
            info!("No handler manifest given, using the builtin handler set");
            Ok(default_manifest())
        }
    }
}
