use crate::api::{InMemoryPolicyCenter, PolicyCenter};
use crate::defaults::{default_snapshot, DEFAULT_CHAIN_TIMEOUT_MS};
use crate::errors::PolicyError;
use crate::loader::load_snapshot;
use crate::model::{PolicySource, RuntimeOverrideSpec};
use pretty_assertions::assert_eq;
use std::env;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

fn spec(path: &str, value: serde_json::Value, ttl_seconds: u64) -> RuntimeOverrideSpec {
    RuntimeOverrideSpec {
        path: path.into(),
        value,
        owner: "test".into(),
        reason: "unit test".into(),
        ttl_seconds,
    }
}

#[test]
fn default_snapshot_seeds_interception_policy() {
    let snapshot = default_snapshot();
    assert_eq!(snapshot.navigation.chain_timeout_ms, DEFAULT_CHAIN_TIMEOUT_MS);
    assert_eq!(snapshot.navigation.pairing_code_hosts, vec!["youtube.com"]);
    assert_eq!(snapshot.intents.store_scheme, "market");
    assert!(snapshot.features.block_intents_to_self);
}

#[test]
fn load_snapshot_applies_file_overlay() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("policy.yaml");
    std::fs::write(
        &file_path,
        r#"navigation:
  chain_timeout_ms: 60000
  pairing_code_hosts: [youtube.com, youtu.be]
intents:
  self_package: com.example.browser
features:
  keep_pdf_downloads_in_browser: false
"#,
    )
    .unwrap();

    let snapshot = load_snapshot(Some(&file_path)).unwrap();
    // File values may only tighten the timeout.
    assert_eq!(snapshot.navigation.chain_timeout_ms, DEFAULT_CHAIN_TIMEOUT_MS);
    assert_eq!(
        snapshot.navigation.pairing_code_hosts,
        vec!["youtube.com", "youtu.be"]
    );
    assert_eq!(snapshot.intents.self_package, "com.example.browser");
    assert!(!snapshot.features.keep_pdf_downloads_in_browser);
    assert_eq!(
        snapshot.source_of("intents.self_package"),
        Some(PolicySource::File)
    );
    assert_eq!(
        snapshot.source_of("navigation.chain_timeout_ms"),
        Some(PolicySource::Builtin)
    );
}

#[test]
fn unknown_file_path_is_rejected() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("policy.yaml");
    std::fs::write(&file_path, "navigation:\n  retries: 3\n").unwrap();
    let err = load_snapshot(Some(&file_path)).unwrap_err();
    assert!(matches!(err, PolicyError::UnsupportedPath(path) if path == "navigation.retries"));
}

#[test]
fn override_updates_snapshot_and_revision() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let before = center.snapshot().rev;
    center
        .apply_override(spec(
            "navigation.chain_timeout_ms",
            serde_json::json!("45s"),
            0,
        ))
        .unwrap();
    let snapshot = center.snapshot();
    assert_eq!(snapshot.navigation.chain_timeout_ms, 45_000);
    assert!(snapshot.rev > before);
    assert_eq!(
        snapshot.source_of("navigation.chain_timeout_ms"),
        Some(PolicySource::RuntimeOverride)
    );
}

#[test]
fn invalid_override_leaves_snapshot_untouched() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let before = center.snapshot();
    let err = center
        .apply_override(spec("features.block_intents_to_self", serde_json::json!(3), 0))
        .unwrap_err();
    assert!(matches!(err, PolicyError::InvalidValue(_)));
    assert_eq!(center.snapshot().rev, before.rev);
}

#[test]
fn ttl_override_lapses_on_next_read() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let start = Instant::now();
    center
        .apply_override_at(
            spec("intents.self_package", serde_json::json!("com.tmp"), 5),
            start,
        )
        .unwrap();
    assert_eq!(center.snapshot_at(start).intents.self_package, "com.tmp");
    let later = start + Duration::from_secs(6);
    assert_eq!(
        center.snapshot_at(later).intents.self_package,
        default_snapshot().intents.self_package
    );
}

#[test]
fn clear_override_restores_base() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    center
        .apply_override(spec(
            "features.block_frame_renavigations",
            serde_json::json!(false),
            0,
        ))
        .unwrap();
    assert!(!center.snapshot().features.block_frame_renavigations);
    assert!(center
        .clear_override("features.block_frame_renavigations")
        .unwrap());
    assert!(center.snapshot().features.block_frame_renavigations);
    assert!(!center.clear_override("features.block_frame_renavigations").unwrap());
}

#[test]
fn guard_provides_sticky_view() {
    let center = InMemoryPolicyCenter::new(default_snapshot());
    let guard = center.guard();
    center
        .apply_override(spec("intents.self_scheme", serde_json::json!("other"), 0))
        .unwrap();
    assert_eq!(guard.snapshot().intents.self_scheme, "navgate");
    assert_ne!(guard.revision(), center.snapshot().rev);
}

#[test]
fn env_cascade_prefers_stricter_value() {
    let _guard = env_guard().lock().unwrap();
    let key = "NAVGATE_POLICY__NAVIGATION__CHAIN_TIMEOUT_MS";
    env::set_var(key, "5s");
    let snapshot = load_snapshot(None).expect("load snapshot");
    env::remove_var(key);
    assert_eq!(snapshot.navigation.chain_timeout_ms, 5_000);
    assert_eq!(
        snapshot.source_of("navigation.chain_timeout_ms"),
        Some(PolicySource::Env)
    );
}

#[test]
fn cli_overrides_replace_and_record_provenance() {
    let _guard = env_guard().lock().unwrap();
    env::set_var(
        "NAVGATE_POLICY_CLI_OVERRIDES",
        "navigation.chain_timeout_ms=30000,features.block_intents_to_self=false",
    );
    let snapshot = load_snapshot(None).expect("load snapshot with cli");
    env::remove_var("NAVGATE_POLICY_CLI_OVERRIDES");
    assert_eq!(snapshot.navigation.chain_timeout_ms, 30_000);
    assert!(!snapshot.features.block_intents_to_self);
    assert_eq!(
        snapshot.source_of("navigation.chain_timeout_ms"),
        Some(PolicySource::Cli)
    );
}

fn env_guard() -> &'static Mutex<()> {
    static ENV_GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_GUARD.get_or_init(|| Mutex::new(()))
}
