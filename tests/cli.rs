use assert_cmd::prelude::*;
use serde_json::Value;
use std::process::Command;

fn navgate() -> Command {
    let mut cmd = Command::cargo_bin("navgate").expect("navgate binary");
    cmd.env_remove("RUST_LOG")
        .env_remove("NAVGATE_POLICY_OVERRIDE_JSON")
        .env_remove("NAVGATE_POLICY_CLI_OVERRIDES");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let assert = cmd.assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output");
    serde_json::from_str(extract_json(&stdout)).expect("valid json")
}

fn extract_json(output: &str) -> &str {
    let start = output.find(['{', '[']).expect("json start");
    let end = output.rfind(['}', ']']).expect("json end");
    &output[start..=end]
}

#[test]
fn classify_reports_store_launch() {
    let value = stdout_json(navgate().args([
        "classify",
        "--gesture",
        "--json",
        "market://details?id=com.example",
    ]));
    let steps = value.as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["kind"].as_str(), Some("external_handler"));
    assert_eq!(steps[0]["class"].as_str(), Some("store"));
    assert_eq!(steps[0]["requires_chooser"].as_bool(), Some(false));
}

#[test]
fn classify_replays_a_redirect_chain() {
    let value = stdout_json(navgate().args([
        "--output",
        "json",
        "classify",
        "--gesture",
        "https://example.com/start",
        "intent://scan#Intent;scheme=zxing;S.browser_fallback_url=https%3A%2F%2Fexample.com%2Ffallback;end",
    ]));
    let steps = value.as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["kind"].as_str(), Some("no_override"));
    assert_eq!(steps[1]["kind"].as_str(), Some("fallback_navigation"));
    assert_eq!(
        steps[1]["fallback_url"].as_str(),
        Some("https://example.com/fallback")
    );
}

#[test]
fn classify_uses_handler_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("handlers.yaml");
    std::fs::write(
        &manifest,
        "handlers:\n  - package: com.google.android.youtube\n    patterns: ['https://www.youtube.com/']\n",
    )
    .unwrap();

    let value = stdout_json(navgate().args([
        "--handlers",
        manifest.to_str().unwrap(),
        "classify",
        "--gesture",
        "--json",
        "https://www.youtube.com/watch?v=1",
    ]));
    assert_eq!(value[0]["kind"].as_str(), Some("external_handler"));
}

#[test]
fn classify_applies_policy_assignments() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("handlers.yaml");
    std::fs::write(
        &manifest,
        "handlers:\n  - package: com.google.android.youtube\n    patterns: ['https://www.youtube.com/']\n",
    )
    .unwrap();
    let classify = |extra: &[&str]| {
        let mut cmd = navgate();
        cmd.args(["--handlers", manifest.to_str().unwrap()])
            .args(["classify", "--gesture", "--incognito", "--json"])
            .args(extra)
            .arg("https://www.youtube.com/watch?v=1");
        stdout_json(&mut cmd)
    };

    assert_eq!(classify(&[])[0]["kind"].as_str(), Some("no_override"));
    let relaxed = classify(&["--set", "features.keep_incognito_web_links_in_browser=false"]);
    assert_eq!(relaxed[0]["kind"].as_str(), Some("async_action"));

    navgate()
        .args(["classify", "--set", "navigation.teleport=1", "https://example.com/"])
        .assert()
        .failure();
}

#[test]
fn missing_manifest_fails() {
    navgate()
        .args(["--handlers", "does/not/exist.yaml", "classify", "https://example.com/"])
        .assert()
        .failure();
}

#[test]
fn parse_intent_prints_sanitized_uri() {
    let value = stdout_json(navgate().args([
        "parse-intent",
        "--json",
        "intent://scan/#Intent;scheme=zxing;package=com.google.zxing;S.browser_fallback_url=https%3A%2F%2Fexample.com;end",
    ]));
    assert_eq!(value["class"].as_str(), Some("intent"));
    assert_eq!(
        value["activation"]["package"].as_str(),
        Some("com.google.zxing")
    );
    let intent_uri = value["intent_uri"].as_str().unwrap();
    assert!(intent_uri.starts_with("intent://scan/#Intent;scheme=zxing;"));
    assert!(!intent_uri.contains("browser_fallback_url"));
}

#[test]
fn parse_intent_rejects_malformed_input() {
    navgate()
        .args(["parse-intent", "intent://scan#Intent;package=a"])
        .assert()
        .failure();
}

#[test]
fn policy_show_reads_policy_file() {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.yaml");
    std::fs::write(&policy, "navigation:\n  chain_timeout_ms: 8000\n").unwrap();

    let value = stdout_json(navgate().args([
        "--policy",
        policy.to_str().unwrap(),
        "policy",
        "show",
        "--json",
    ]));
    assert_eq!(value["navigation"]["chain_timeout_ms"].as_u64(), Some(8000));
    assert_eq!(
        value["intents"]["self_package"].as_str(),
        Some("org.navgate.browser")
    );
}

#[test]
fn policy_override_accepts_ttl() {
    let assert = navgate()
        .args([
            "policy",
            "override",
            "features.block_intents_to_self",
            "false",
            "--ttl",
            "30s",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("Override applied. Current revision:"));
}

#[test]
fn policy_override_rejects_unknown_path() {
    navgate()
        .args(["policy", "override", "navigation.teleport", "1"])
        .assert()
        .failure();
}
