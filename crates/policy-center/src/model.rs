use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PolicySnapshot {
    pub rev: u64,
    pub navigation: NavigationPolicy,
    pub intents: IntentPolicy,
    pub features: FeatureFlags,
    pub provenance: HashMap<String, PolicyProvenance>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NavigationPolicy {
    /// A chain older than this no longer authorizes an external launch.
    pub chain_timeout_ms: u64,
    pub pairing_code_hosts: Vec<String>,
    pub pairing_code_param: String,
}

impl NavigationPolicy {
    pub fn chain_timeout(&self) -> Duration {
        Duration::from_millis(self.chain_timeout_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IntentPolicy {
    pub self_package: String,
    pub self_scheme: String,
    pub web_app_shell_prefix: String,
    pub store_scheme: String,
    pub store_web_host: String,
    pub sms_schemes: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub block_frame_renavigations: bool,
    pub block_intents_to_self: bool,
    pub keep_incognito_web_links_in_browser: bool,
    pub keep_pdf_downloads_in_browser: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyProvenance {
    pub path: String,
    pub source: PolicySource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicySource {
    Builtin,
    File,
    Env,
    Cli,
    RuntimeOverride,
}

/// Provenance-free projection handed to consumers.
#[derive(Clone, Debug)]
pub struct PolicyView {
    pub rev: u64,
    pub navigation: NavigationPolicy,
    pub intents: IntentPolicy,
    pub features: FeatureFlags,
}

impl From<PolicySnapshot> for PolicyView {
    fn from(snapshot: PolicySnapshot) -> Self {
        Self {
            rev: snapshot.rev,
            navigation: snapshot.navigation,
            intents: snapshot.intents,
            features: snapshot.features,
        }
    }
}

impl PolicySnapshot {
    pub fn set_provenance(&mut self, path: &str, source: PolicySource) {
        self.provenance.insert(
            path.to_string(),
            PolicyProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn source_of(&self, path: &str) -> Option<PolicySource> {
        self.provenance.get(path).map(|entry| entry.source)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeOverrideSpec {
    pub path: String,
    pub value: serde_json::Value,
    pub owner: String,
    pub reason: String,
    pub ttl_seconds: u64,
}
