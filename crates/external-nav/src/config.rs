use std::time::Duration;

use navgate_policy_center::{default_snapshot, PolicySnapshot};

/// The slice of interception policy the classifier reads on every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub self_package: String,
    pub self_scheme: String,
    pub web_app_shell_prefix: String,
    pub store_scheme: String,
    pub store_web_host: String,
    pub sms_schemes: Vec<String>,
    pub pairing_code_hosts: Vec<String>,
    pub pairing_code_param: String,
    pub chain_timeout: Duration,
    pub block_frame_renavigations: bool,
    pub block_intents_to_self: bool,
    pub keep_incognito_web_links_in_browser: bool,
    pub keep_pdf_downloads_in_browser: bool,
}

impl ClassifierConfig {
    pub fn from_policy(snapshot: &PolicySnapshot) -> Self {
        Self {
            self_package: snapshot.intents.self_package.clone(),
            self_scheme: snapshot.intents.self_scheme.clone(),
            web_app_shell_prefix: snapshot.intents.web_app_shell_prefix.clone(),
            store_scheme: snapshot.intents.store_scheme.clone(),
            store_web_host: snapshot.intents.store_web_host.clone(),
            sms_schemes: snapshot.intents.sms_schemes.clone(),
            pairing_code_hosts: snapshot.navigation.pairing_code_hosts.clone(),
            pairing_code_param: snapshot.navigation.pairing_code_param.clone(),
            chain_timeout: snapshot.navigation.chain_timeout(),
            block_frame_renavigations: snapshot.features.block_frame_renavigations,
            block_intents_to_self: snapshot.features.block_intents_to_self,
            keep_incognito_web_links_in_browser: snapshot
                .features
                .keep_incognito_web_links_in_browser,
            keep_pdf_downloads_in_browser: snapshot.features.keep_pdf_downloads_in_browser,
        }
    }

    pub fn with_self_package(mut self, package: impl Into<String>) -> Self {
        self.self_package = package.into();
        self
    }

    pub fn is_sms_scheme(&self, scheme: &str) -> bool {
        self.sms_schemes
            .iter()
            .any(|known| known.eq_ignore_ascii_case(scheme))
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::from_policy(&default_snapshot())
    }
}
