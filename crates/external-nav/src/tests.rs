use crate::config::ClassifierConfig;
use crate::errors::IntentParseError;
use crate::intent::{
    parse_intent_uri, store_details_activation, ActivationDescriptor, ActivationFlags,
    ComponentName, ExtraValue, CATEGORY_BROWSABLE, EXTRA_BROWSER_FALLBACK_URL,
};
use crate::redirect::{
    Clock, ManualClock, NavigationStep, RedirectChainTracker, NO_COMMITTED_ENTRY_INDEX,
};
use crate::uri::{self, UriClass};
use navgate_core_types::{HandlerDescriptor, PageTransition};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn tracker() -> (RedirectChainTracker, ManualClock) {
    let clock = ManualClock::starting_at(1_000);
    let tracker = RedirectChainTracker::with_clock(Duration::from_secs(15), Arc::new(clock.clone()));
    (tracker, clock)
}

fn link_with_gesture(clock: &ManualClock) -> NavigationStep {
    NavigationStep::new(PageTransition::LINK).with_user_gesture(clock.now_millis())
}

#[test]
fn classify_uri_covers_every_class() {
    let config = ClassifierConfig::default();
    let cases = [
        ("about:blank", UriClass::Internal),
        ("chrome-native://newtab", UriClass::Internal),
        ("intent://x#Intent;end", UriClass::Intent),
        ("https://example.com", UriClass::Web),
        ("http://m.youtube.com/watch?v=1&pairingCode=2", UriClass::PairingCode),
        ("market://details?id=a.b", UriClass::Store),
        ("navgate://navigate?url=https%3A%2F%2Fa.com", UriClass::SelfScheme),
        ("file:///sdcard/a.html", UriClass::File),
        ("javascript:alert(1)", UriClass::Javascript),
        ("tel:0123", UriClass::External),
        ("no scheme here", UriClass::External),
    ];
    for (raw, expected) in cases {
        assert_eq!(uri::classify_uri(raw, &config), expected, "{raw}");
    }
}

#[test]
fn pairing_code_requires_query_on_known_host() {
    let hosts = vec!["youtube.com".to_string()];
    assert!(uri::is_pairing_code(
        "http://m.youtube.com/watch?v=1234&pairingCode=5678",
        &hosts,
        "pairingCode"
    ));
    assert!(uri::is_pairing_code(
        "http://youtube.com?pairingCode=xyz",
        &hosts,
        "pairingCode"
    ));
    assert!(!uri::is_pairing_code(
        "http://youtube.com.foo.com?pairingCode=xyz",
        &hosts,
        "pairingCode"
    ));
    assert!(!uri::is_pairing_code(
        "http://youtube.com/watch?v=1234#pairingCode=xyz",
        &hosts,
        "pairingCode"
    ));
    assert!(!uri::is_pairing_code(
        "http://notyoutube.com?pairingCode=xyz",
        &hosts,
        "pairingCode"
    ));
}

#[test]
fn wtai_only_exposes_make_call() {
    assert_eq!(uri::wtai_make_call_number("wtai://wp/mc;0123456789"), Some("0123456789"));
    assert_eq!(uri::wtai_make_call_number("wtai://wp/sd;0123456789"), None);
    assert_eq!(uri::wtai_make_call_number("wtai://wp/mc;"), None);
    assert!(uri::is_wtai("WTAI://wp/ap;0123"));
}

#[test]
fn fallback_urls_must_be_web() {
    assert!(uri::parse_fallback_url("https://example.com/page").is_some());
    assert!(uri::parse_fallback_url("javascript:alert(1)").is_none());
    assert!(uri::parse_fallback_url("intent://x#Intent;end").is_none());
    assert!(uri::parse_fallback_url("not a url").is_none());
}

#[test]
fn store_fallbacks_distinguish_listing_from_search() {
    let listing = url::Url::parse("https://play.google.com/store/apps/details?id=com.imdb.mobile&referrer=abc")
        .unwrap();
    let parsed = uri::store_listing(&listing, "play.google.com").unwrap();
    assert_eq!(parsed.package, "com.imdb.mobile");
    assert_eq!(parsed.referrer.as_deref(), Some("abc"));

    let search = url::Url::parse("https://play.google.com/store/search?q=imdb").unwrap();
    assert!(uri::is_store_search(&search, "play.google.com"));
    assert!(uri::store_listing(&search, "play.google.com").is_none());
}

#[test]
fn self_scheme_navigate_decodes_embedded_url() {
    let target =
        uri::self_scheme_navigate_target("navgate://navigate?url=https%3A%2F%2Fexample.com%2Fa", "navgate")
            .unwrap();
    assert_eq!(target.as_str(), "https://example.com/a");
    assert!(uri::self_scheme_navigate_target("navgate://navigate?url=javascript%3Aalert(1)", "navgate").is_none());
}

#[test]
fn parse_intent_folds_scheme_into_data() {
    let activation = parse_intent_uri(
        "intent:///name/nm0000158#Intent;scheme=imdb;package=com.imdb.mobile;S.browser_fallback_url=https%3A%2F%2Fm.imdb.com%2Fname%2Fnm0000158;end",
    )
    .unwrap();
    assert_eq!(activation.data.as_deref(), Some("imdb:///name/nm0000158"));
    assert_eq!(activation.scheme.as_deref(), Some("imdb"));
    assert_eq!(activation.package.as_deref(), Some("com.imdb.mobile"));
    assert_eq!(
        activation.fallback_url(),
        Some("https://m.imdb.com/name/nm0000158")
    );
}

#[test]
fn parse_intent_reads_typed_extras_component_and_selector() {
    let activation = parse_intent_uri(
        "intent://scan/#Intent;scheme=zxing;component=com.google.zxing/.Scanner;i.count=3;B.flag=true;c.initial=x;SEL;scheme=evil;package=com.evil;end",
    )
    .unwrap();
    assert_eq!(
        activation.component,
        Some(ComponentName {
            package: "com.google.zxing".into(),
            class: "com.google.zxing.Scanner".into(),
        })
    );
    assert_eq!(activation.extras.get("count"), Some(&ExtraValue::Int(3)));
    assert_eq!(activation.extras.get("flag"), Some(&ExtraValue::Bool(true)));
    assert_eq!(activation.extras.get("initial"), Some(&ExtraValue::Char('x')));
    let selector = activation.selector.as_deref().unwrap();
    assert_eq!(selector.package.as_deref(), Some("com.evil"));
    assert_eq!(activation.target_package(), Some("com.google.zxing"));
}

#[test]
fn malformed_intents_report_their_error_class() {
    assert!(matches!(
        parse_intent_uri("intent://x#Intent;i.count=abc;end"),
        Err(IntentParseError::NumberFormat(_))
    ));
    assert!(matches!(
        parse_intent_uri("intent://x#Intent;launchFlags=0xZZ;end"),
        Err(IntentParseError::NumberFormat(_))
    ));
    assert!(matches!(
        parse_intent_uri("intent://x#Intent;Q.thing=1;end"),
        Err(IntentParseError::UriSyntax(_))
    ));
    assert!(matches!(
        parse_intent_uri("intent://x#Intent;package;end"),
        Err(IntentParseError::IndexOutOfBounds(_))
    ));
    assert!(matches!(
        parse_intent_uri("intent://x#Intent;package=a.b"),
        Err(IntentParseError::MissingTerminator)
    ));
}

#[test]
fn sanitize_keeps_only_allowed_flags_and_drops_selector() {
    let mut activation = parse_intent_uri(
        "intent://x#Intent;scheme=custom;launchFlags=0x7FFFFFFF;component=a.b/.C;S.browser_fallback_url=https%3A%2F%2Fa.com;SEL;package=c.d;end",
    )
    .unwrap();
    assert_eq!(activation.flags.bits(), 0x7FFF_FFFF);

    activation.sanitize_for_launch();
    assert_eq!(activation.flags, ActivationFlags::ALLOWED_ON_LAUNCH);
    assert_eq!(activation.flags.bits(), 0x3C08_3010);
    assert!(activation.selector.is_none());
    assert!(activation.component.is_none());
    assert!(!activation.has_extra(EXTRA_BROWSER_FALLBACK_URL));
    assert!(activation.categories.contains(CATEGORY_BROWSABLE));
}

#[test]
fn to_intent_uri_never_writes_selector() {
    let mut activation = parse_intent_uri(
        "intent://host/path#Intent;scheme=custom;package=a.b;S.key=some%20value;SEL;package=c.d;end",
    )
    .unwrap();
    let rendered = activation.to_intent_uri();
    assert!(!rendered.contains("SEL"));
    assert!(!rendered.contains("c.d"));

    activation.selector = None;
    let reparsed = parse_intent_uri(&rendered).unwrap();
    assert_eq!(reparsed, activation);
}

#[test]
fn store_details_encode_package_and_referrer() {
    let activation = store_details_activation("market", "com.imdb.mobile", "utm_source=a&b");
    assert_eq!(
        activation.data.as_deref(),
        Some("market://details?id=com.imdb.mobile&referrer=utm_source%3Da%26b")
    );
    assert_eq!(activation.scheme.as_deref(), Some("market"));
}

#[test]
fn chain_counts_effective_redirects_without_fresh_gesture() {
    let (mut chain, clock) = tracker();
    assert!(!chain.is_on_navigation());
    chain.update_activation(
        ActivationDescriptor::view("https://example.com"),
        false,
        false,
        false,
    );
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK | PageTransition::FROM_API));
    assert!(chain.is_on_navigation());
    assert!(chain.is_from_external_activation());
    assert!(!chain.is_on_non_initial_external_step());

    clock.advance(Duration::from_millis(100));
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK));
    assert!(chain.is_on_non_initial_external_step());

    clock.advance(Duration::from_millis(100));
    chain.update_new_url_loading(link_with_gesture(&clock));
    assert!(!chain.is_from_external_activation());
    assert!(!chain.is_on_non_initial_external_step());
}

#[test]
fn stale_gesture_does_not_start_a_new_chain() {
    let (mut chain, clock) = tracker();
    chain.update_new_url_loading(link_with_gesture(&clock));
    let stale = clock.now_millis();
    clock.advance(Duration::from_millis(50));
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK).with_user_gesture(stale));
    assert_eq!(chain.current_step().map(|step| step.user_gesture_timestamp_ms), Some(stale));
    chain.set_should_not_override_for_remainder_of_chain();

    clock.advance(Duration::from_millis(50));
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK).redirect());
    assert!(chain.should_not_override());

    clock.advance(Duration::from_millis(50));
    chain.update_new_url_loading(link_with_gesture(&clock));
    assert!(!chain.should_not_override());
}

#[test]
fn gestures_stamped_with_tracker_clock_start_new_chains() {
    let (chain, clock) = tracker();
    assert_eq!(chain.now_millis(), clock.now_millis());

    let mut chain = RedirectChainTracker::new(Duration::from_secs(15));
    let first = chain.now_millis();
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK).with_user_gesture(first));
    chain.set_should_not_override_for_remainder_of_chain();

    std::thread::sleep(Duration::from_millis(5));
    let clicked = chain.now_millis();
    assert!(clicked > first);
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK).with_user_gesture(clicked));
    assert!(!chain.should_not_override());
}

#[test]
fn chain_expires_after_timeout() {
    let (mut chain, clock) = tracker();
    chain.update_new_url_loading(link_with_gesture(&clock));
    clock.advance(Duration::from_secs(15));
    assert!(!chain.is_navigation_chain_expired());
    clock.advance(Duration::from_millis(1));
    assert!(chain.is_navigation_chain_expired());
}

#[test]
fn typed_chain_ends_at_first_real_click() {
    let (mut chain, clock) = tracker();
    chain.update_new_url_loading(NavigationStep::new(PageTransition::TYPED));
    assert!(chain.is_navigation_from_user_typing());

    clock.advance(Duration::from_millis(10));
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK).redirect());
    assert!(chain.is_navigation_from_user_typing());

    clock.advance(Duration::from_millis(10));
    chain.update_new_url_loading(link_with_gesture(&clock));
    assert!(!chain.is_navigation_from_user_typing());
}

#[test]
fn has_new_handler_compares_against_initiating_activation() {
    let (mut chain, _clock) = tracker();
    let candidates = vec![HandlerDescriptor::specialized("com.youtube")];
    assert!(chain.has_new_handler(&candidates, |_| Vec::new()));
    assert!(!chain.has_new_handler(&[], |_| Vec::new()));

    chain.update_activation(
        ActivationDescriptor::view("https://youtube.com/watch"),
        false,
        false,
        false,
    );
    let mut resolved = 0;
    assert!(!chain.has_new_handler(&candidates, |_| {
        resolved += 1;
        vec![HandlerDescriptor::specialized("com.youtube")]
    }));
    assert!(chain.has_new_handler(
        &[HandlerDescriptor::specialized("com.other")],
        |_| unreachable!("initiating handlers are resolved once"),
    ));
    assert_eq!(resolved, 1);

    chain.update_activation(
        ActivationDescriptor::view("https://maps.example.com"),
        false,
        false,
        false,
    );
    assert!(chain.has_new_handler(&candidates, |_| vec![HandlerDescriptor::specialized("com.maps")]));
}

#[test]
fn clear_keeps_committed_entry_index() {
    let (mut chain, clock) = tracker();
    assert_eq!(chain.last_committed_entry_index_before_chain_start(), NO_COMMITTED_ENTRY_INDEX);
    chain.update_new_url_loading(link_with_gesture(&clock).committed_entry_index(4));
    assert_eq!(chain.last_committed_entry_index_before_chain_start(), 4);
    chain.set_should_not_override_for_remainder_of_chain();

    chain.clear();
    assert!(!chain.is_on_navigation());
    assert!(!chain.should_not_override());
    assert!(chain.initiating_activation().is_none());
    assert_eq!(chain.last_committed_entry_index_before_chain_start(), 4);
}

#[test]
fn forward_back_always_starts_a_chain() {
    let (mut chain, clock) = tracker();
    chain.update_new_url_loading(link_with_gesture(&clock));
    clock.advance(Duration::from_millis(10));
    chain.update_new_url_loading(NavigationStep::new(PageTransition::LINK | PageTransition::FORWARD_BACK));
    assert!(chain.started_by_forward_back());
}
