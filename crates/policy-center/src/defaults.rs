use crate::model::{FeatureFlags, IntentPolicy, NavigationPolicy, PolicySnapshot};

pub const DEFAULT_CHAIN_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SELF_PACKAGE: &str = "org.navgate.browser";
pub const DEFAULT_WEB_APP_SHELL_PREFIX: &str = "org.chromium.webapk";

pub fn default_snapshot() -> PolicySnapshot {
    PolicySnapshot {
        rev: 1,
        navigation: NavigationPolicy {
            chain_timeout_ms: DEFAULT_CHAIN_TIMEOUT_MS,
            pairing_code_hosts: vec!["youtube.com".into()],
            pairing_code_param: "pairingCode".into(),
        },
        intents: IntentPolicy {
            self_package: DEFAULT_SELF_PACKAGE.into(),
            self_scheme: "navgate".into(),
            web_app_shell_prefix: DEFAULT_WEB_APP_SHELL_PREFIX.into(),
            store_scheme: "market".into(),
            store_web_host: "play.google.com".into(),
            sms_schemes: vec!["sms".into(), "smsto".into(), "mms".into(), "mmsto".into()],
        },
        features: FeatureFlags {
            block_frame_renavigations: true,
            block_intents_to_self: true,
            keep_incognito_web_links_in_browser: true,
            keep_pdf_downloads_in_browser: true,
        },
        provenance: Default::default(),
    }
}
