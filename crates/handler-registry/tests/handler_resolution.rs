use navgate_external_nav::{
    ActivationDescriptor, ClassificationResult, ClassifierConfig, ExternalNavigationClassifier,
    HandlerDescriptor, NavigationDelegate, NavigationRequest, RedirectChainTracker, ResultKind,
};
use navgate_handler_registry::{
    load_manifest_from_path, parse_manifest_str, ConfigError, HandlerRegistry,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

const MANIFEST: &str = r#"
handlers:
  - package: com.android.vending
    patterns: ["market:"]
    default: true
  - package: com.google.android.youtube
    patterns: ["https://www.youtube.com/", "https://m.youtube.com/"]
  - package: com.example.maps
    patterns: ["geo:", "https://maps.example.com/*"]
  - package: com.internal.service
    patterns: ["geo:"]
    exported: false
  - package: com.a.messages
    patterns: ["sms:"]
  - package: com.b.sms
    patterns: ["sms:"]
  - package: com.shop.one
    patterns: ["https://shop.example.com/"]
  - package: com.shop.two
    patterns: ["https://shop.example.com/"]
default_sms_package: com.b.sms
avoid_disambiguation: ["https://shop.example.com/*"]
"#;

fn registry() -> HandlerRegistry {
    HandlerRegistry::new(parse_manifest_str(MANIFEST).unwrap())
}

#[test]
fn scheme_patterns_are_generic_and_longer_patterns_specialized() {
    let registry = registry();
    assert_eq!(
        registry.resolve(&ActivationDescriptor::view("market://details?id=a")),
        vec![HandlerDescriptor::generic("com.android.vending")]
    );
    assert_eq!(
        registry.resolve(&ActivationDescriptor::view("https://www.youtube.com/watch?v=1")),
        vec![HandlerDescriptor::specialized("com.google.android.youtube")]
    );
    assert_eq!(
        registry.resolve(&ActivationDescriptor::view("https://maps.example.com/place/1")),
        vec![HandlerDescriptor::specialized("com.example.maps")]
    );
}

#[test]
fn explicit_package_restricts_resolution() {
    let registry = registry();
    let mut activation = ActivationDescriptor::view("geo:37.7,-122.4");
    assert_eq!(registry.resolve(&activation).len(), 2);

    activation.package = Some("com.example.maps".into());
    assert_eq!(
        registry.resolve(&activation),
        vec![HandlerDescriptor::generic("com.example.maps")]
    );

    activation.package = Some("com.not.installed".into());
    assert!(registry.resolve(&activation).is_empty());
}

#[test]
fn unexported_handlers_are_reported_as_such() {
    let handlers = registry().resolve(&ActivationDescriptor::view("geo:0,0"));
    let internal = handlers
        .iter()
        .find(|handler| handler.package_id == "com.internal.service")
        .unwrap();
    assert!(!internal.is_exported);
}

#[test]
fn default_handler_comes_from_manifest_flag() {
    let registry = registry();
    assert_eq!(
        registry
            .resolve_default_handler(&ActivationDescriptor::view("market://details?id=a"))
            .map(|handler| handler.package_id),
        Some("com.android.vending".to_string())
    );
    assert!(registry
        .resolve_default_handler(&ActivationDescriptor::view("geo:0,0"))
        .is_none());
}

#[test]
fn json_manifest_is_accepted() {
    let manifest = parse_manifest_str(
        r#"{"handlers":[{"package":"com.dialer","patterns":["tel:"]}],"incognito":true,"foreground":false}"#,
    )
    .unwrap();
    let registry = HandlerRegistry::new(manifest);
    assert!(registry.is_incognito_context());
    assert!(!registry.is_application_in_foreground());
    assert!(registry.can_load_url_in_current_context());
    assert_eq!(
        registry.resolve(&ActivationDescriptor::view("tel:123")),
        vec![HandlerDescriptor::generic("com.dialer")]
    );
}

#[test]
fn invalid_manifests_are_rejected() {
    let err = parse_manifest_str("handlers:\n  - package: ''\n    patterns: ['tel:']\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = parse_manifest_str("handlers:\n  - package: a.b\n    patterns: []\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = parse_manifest_str("handlers: [not, a, table").unwrap_err();
    assert!(matches!(err, ConfigError::Deserialize(_)));
}

#[test]
fn manifest_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handlers.yaml");
    std::fs::write(&path, MANIFEST).unwrap();
    let manifest = load_manifest_from_path(&path).unwrap();
    assert_eq!(manifest.handlers.len(), 8);
    assert!(matches!(
        load_manifest_from_path(dir.path().join("missing.yaml")),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn trust_requires_listed_calling_package() {
    let manifest = parse_manifest_str(
        "calling_package: com.partner\ntrusted_packages: [com.partner]\ntrusted_target_package: com.partner.viewer\n",
    )
    .unwrap();
    let registry = HandlerRegistry::new(manifest);
    assert!(registry.is_calling_context_trusted(&[]));
    assert_eq!(registry.trusted_target_package().as_deref(), Some("com.partner.viewer"));

    let untrusted = HandlerRegistry::new(parse_manifest_str("calling_package: com.partner\n").unwrap());
    assert!(!untrusted.is_calling_context_trusted(&[]));
}

fn classify(registry: HandlerRegistry, request: NavigationRequest) -> ClassificationResult {
    let classifier = ExternalNavigationClassifier::new(ClassifierConfig::default(), registry);
    let mut chain = RedirectChainTracker::new(Duration::from_secs(15));
    classifier.classify(&request, &mut chain)
}

#[test]
fn registry_drives_the_classifier() {
    let click = |url: &str| NavigationRequest::new(url).user_gesture(true);

    let youtube = classify(registry(), click("https://www.youtube.com/watch?v=1"));
    assert_eq!(
        youtube.activation().and_then(|a| a.package.as_deref()),
        None
    );
    assert_eq!(youtube.kind(), ResultKind::ExternalHandler);
    assert!(!youtube.requires_chooser());

    let sms = classify(registry(), click("sms:+15550100"));
    assert_eq!(sms.activation().and_then(|a| a.package.as_deref()), Some("com.b.sms"));

    let shop = classify(registry(), click("https://shop.example.com/item"));
    assert!(shop.is_no_override());

    let missing = classify(
        registry(),
        click("intent://scan#Intent;scheme=zxing;package=com.google.zxing;end"),
    );
    assert_eq!(
        missing.activation().and_then(|a| a.data.as_deref()),
        Some("market://details?id=com.google.zxing&referrer=org.navgate.browser")
    );
}

#[test]
fn disabled_urls_never_leave_the_browser() {
    let manifest = parse_manifest_str(
        "handlers:\n  - package: com.android.vending\n    patterns: ['market:']\ndisabled: ['market://details?id=blocked*']\n",
    )
    .unwrap();
    let request = NavigationRequest::new("market://details?id=blocked.app").user_gesture(true);
    assert!(classify(HandlerRegistry::new(manifest), request).is_no_override());
}
