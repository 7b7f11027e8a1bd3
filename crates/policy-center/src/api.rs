use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::PolicyError;
use crate::model::{PolicySnapshot, PolicySource, RuntimeOverrideSpec};
use crate::override_store::RuntimeOverrideStore;

pub trait PolicyCenter: Send + Sync {
    fn snapshot(&self) -> Arc<PolicySnapshot>;
    fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), PolicyError>;
    fn clear_override(&self, path: &str) -> Result<bool, PolicyError>;
    fn guard(&self) -> PolicyGuard;
}

struct PolicyState {
    base: PolicySnapshot,
    snapshot: PolicySnapshot,
    overrides: RuntimeOverrideStore,
    rev_counter: u64,
}

impl PolicyState {
    fn new(base: PolicySnapshot) -> Self {
        let rev_counter = base.rev;
        Self {
            base: base.clone(),
            snapshot: base,
            overrides: RuntimeOverrideStore::default(),
            rev_counter,
        }
    }

    fn apply_active_overrides(&mut self, now: Instant) -> Result<(), PolicyError> {
        let mut new_snapshot = self.base.clone();
        for (path, value) in self.overrides.active_entries(now) {
            apply_override_to_snapshot(
                &mut new_snapshot,
                &path,
                &value,
                PolicySource::RuntimeOverride,
            )?;
        }
        self.rev_counter = self.rev_counter.saturating_add(1);
        new_snapshot.rev = self.rev_counter;
        self.snapshot = new_snapshot;
        Ok(())
    }
}

/// Policy center backed by an atomically swapped snapshot.
///
/// Overrides with a TTL lapse lazily: the next read after expiry rebuilds the
/// snapshot from the base plus the surviving overrides.
pub struct InMemoryPolicyCenter {
    state: Mutex<PolicyState>,
    current: ArcSwap<PolicySnapshot>,
}

impl InMemoryPolicyCenter {
    pub fn new(snapshot: PolicySnapshot) -> Self {
        let state = PolicyState::new(snapshot);
        let current = ArcSwap::from_pointee(state.snapshot.clone());
        Self {
            state: Mutex::new(state),
            current,
        }
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> Arc<PolicySnapshot> {
        let mut guard = self.state.lock();
        if guard.overrides.has_expired(now) {
            match guard.apply_active_overrides(now) {
                Ok(()) => {
                    debug!(target: "navgate::policy", rev = guard.snapshot.rev, "policy override expired");
                    self.current.store(Arc::new(guard.snapshot.clone()));
                }
                Err(err) => {
                    warn!(target: "navgate::policy", "policy override expiry recompute failed: {err}");
                }
            }
        }
        drop(guard);
        self.current.load_full()
    }

    pub(crate) fn apply_override_at(
        &self,
        override_spec: RuntimeOverrideSpec,
        now: Instant,
    ) -> Result<(), PolicyError> {
        let ttl = if override_spec.ttl_seconds > 0 {
            Some(Duration::from_secs(override_spec.ttl_seconds))
        } else {
            None
        };
        // Validate against a scratch copy so a bad override never lands in the store.
        let mut scratch = self.current.load_full().as_ref().clone();
        apply_override_to_snapshot(
            &mut scratch,
            &override_spec.path,
            &override_spec.value,
            PolicySource::RuntimeOverride,
        )?;

        let mut guard = self.state.lock();
        guard
            .overrides
            .insert(override_spec.path.clone(), override_spec.value, ttl, now);
        guard.apply_active_overrides(now)?;
        debug!(
            target: "navgate::policy",
            path = %override_spec.path,
            owner = %override_spec.owner,
            reason = %override_spec.reason,
            rev = guard.snapshot.rev,
            "runtime override applied"
        );
        self.current.store(Arc::new(guard.snapshot.clone()));
        Ok(())
    }
}

impl PolicyCenter for InMemoryPolicyCenter {
    fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.snapshot_at(Instant::now())
    }

    fn apply_override(&self, override_spec: RuntimeOverrideSpec) -> Result<(), PolicyError> {
        self.apply_override_at(override_spec, Instant::now())
    }

    fn clear_override(&self, path: &str) -> Result<bool, PolicyError> {
        let mut guard = self.state.lock();
        if !guard.overrides.remove(path) {
            return Ok(false);
        }
        guard.apply_active_overrides(Instant::now())?;
        self.current.store(Arc::new(guard.snapshot.clone()));
        Ok(true)
    }

    fn guard(&self) -> PolicyGuard {
        PolicyGuard {
            snapshot: self.snapshot(),
        }
    }
}

/// Pins one policy revision for the duration of a unit of work.
#[derive(Clone, Debug)]
pub struct PolicyGuard {
    snapshot: Arc<PolicySnapshot>,
}

impl PolicyGuard {
    pub fn revision(&self) -> u64 {
        self.snapshot.rev
    }

    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        Arc::clone(&self.snapshot)
    }
}

pub(crate) fn apply_override_to_snapshot(
    snapshot: &mut PolicySnapshot,
    path: &str,
    value: &Value,
    source: PolicySource,
) -> Result<(), PolicyError> {
    let changed = match path {
        "navigation.chain_timeout_ms" => merge_u64(
            &mut snapshot.navigation.chain_timeout_ms,
            to_millis(value)?,
            source,
        ),
        "navigation.pairing_code_hosts" => merge_list(
            &mut snapshot.navigation.pairing_code_hosts,
            to_string_list(value)?,
        ),
        "navigation.pairing_code_param" => merge_string(
            &mut snapshot.navigation.pairing_code_param,
            to_string(value)?,
        ),
        "intents.self_package" => {
            merge_string(&mut snapshot.intents.self_package, to_string(value)?)
        }
        "intents.self_scheme" => merge_string(&mut snapshot.intents.self_scheme, to_string(value)?),
        "intents.web_app_shell_prefix" => merge_string(
            &mut snapshot.intents.web_app_shell_prefix,
            to_string(value)?,
        ),
        "intents.store_scheme" => {
            merge_string(&mut snapshot.intents.store_scheme, to_string(value)?)
        }
        "intents.store_web_host" => {
            merge_string(&mut snapshot.intents.store_web_host, to_string(value)?)
        }
        "intents.sms_schemes" => {
            merge_list(&mut snapshot.intents.sms_schemes, to_string_list(value)?)
        }
        "features.block_frame_renavigations" => merge_bool(
            &mut snapshot.features.block_frame_renavigations,
            to_bool(value)?,
        ),
        "features.block_intents_to_self" => merge_bool(
            &mut snapshot.features.block_intents_to_self,
            to_bool(value)?,
        ),
        "features.keep_incognito_web_links_in_browser" => merge_bool(
            &mut snapshot.features.keep_incognito_web_links_in_browser,
            to_bool(value)?,
        ),
        "features.keep_pdf_downloads_in_browser" => merge_bool(
            &mut snapshot.features.keep_pdf_downloads_in_browser,
            to_bool(value)?,
        ),
        path => return Err(PolicyError::UnsupportedPath(path.to_string())),
    };
    if changed {
        record_provenance(snapshot, path, source);
    }
    Ok(())
}

fn merge_u64(target: &mut u64, candidate: u64, source: PolicySource) -> bool {
    let original = *target;
    if matches!(source, PolicySource::RuntimeOverride | PolicySource::Cli) {
        *target = candidate;
    } else {
        *target = (*target).min(candidate);
    }
    *target != original
}

fn merge_bool(target: &mut bool, candidate: bool) -> bool {
    let original = *target;
    *target = candidate;
    *target != original
}

fn merge_string(target: &mut String, candidate: String) -> bool {
    if *target == candidate {
        return false;
    }
    *target = candidate;
    true
}

fn merge_list(target: &mut Vec<String>, candidate: Vec<String>) -> bool {
    if *target == candidate {
        return false;
    }
    *target = candidate;
    true
}

fn record_provenance(snapshot: &mut PolicySnapshot, path: &str, source: PolicySource) {
    snapshot.set_provenance(path, source);
}

fn to_u64(value: &Value) -> Result<u64, PolicyError> {
    value
        .as_u64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected integer, got {value}")))
}

/// Milliseconds, either as a bare integer or a humantime string such as `"15s"`.
fn to_millis(value: &Value) -> Result<u64, PolicyError> {
    if let Some(raw) = value.as_str() {
        let duration = humantime::parse_duration(raw.trim())
            .map_err(|_| PolicyError::InvalidValue(format!("invalid duration: {raw}")))?;
        return u64::try_from(duration.as_millis())
            .map_err(|_| PolicyError::InvalidValue(format!("duration too large: {raw}")));
    }
    to_u64(value)
}

fn to_bool(value: &Value) -> Result<bool, PolicyError> {
    value
        .as_bool()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected bool, got {value}")))
}

fn to_string(value: &Value) -> Result<String, PolicyError> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => Ok(raw.trim().to_string()),
        other => Err(PolicyError::InvalidValue(format!(
            "expected non-empty string, got {other}"
        ))),
    }
}

fn to_string_list(value: &Value) -> Result<Vec<String>, PolicyError> {
    match value {
        Value::Array(items) => items.iter().map(to_string).collect(),
        // Comma separated lists arrive this way from env and CLI overlays.
        Value::String(raw) => Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()),
        other => Err(PolicyError::InvalidValue(format!(
            "expected list of strings, got {other}"
        ))),
    }
}
