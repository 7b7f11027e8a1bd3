//! Handler resolution backed by a static manifest.
//!
//! [`HandlerRegistry`] answers every [`NavigationDelegate`] query from a
//! [`HandlerManifest`], which makes the classifier usable from the command line
//! and from tests without a platform package manager.

pub mod config;

pub use crate::config::{
    default_manifest, load_manifest_from_path, load_manifest_from_reader, parse_manifest_str,
    ConfigError, HandlerEntry, HandlerManifest,
};

use std::path::Path;

use navgate_core_types::HandlerDescriptor;
use navgate_external_nav::{ActivationDescriptor, NavigationDelegate, ResolveError};
use tracing::debug;

pub struct HandlerRegistry {
    manifest: HandlerManifest,
}

impl HandlerRegistry {
    pub fn new(manifest: HandlerManifest) -> Self {
        debug!(
            target: "navgate::registry",
            handlers = manifest.handlers.len(),
            "handler manifest loaded"
        );
        Self { manifest }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(load_manifest_from_path(path)?))
    }

    pub fn manifest(&self) -> &HandlerManifest {
        &self.manifest
    }

    /// Handlers for `activation`, restricted to its explicit package when one is set.
    pub fn resolve(&self, activation: &ActivationDescriptor) -> Vec<HandlerDescriptor> {
        let Some(target) = match_target(activation) else {
            return Vec::new();
        };
        let package = activation.target_package();
        self.manifest
            .handlers
            .iter()
            .filter(|entry| package.map_or(true, |package| entry.package == package))
            .filter_map(|entry| {
                let matched: Vec<&String> = entry
                    .patterns
                    .iter()
                    .filter(|pattern| pattern_matches(pattern, &target))
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                let specialized = entry
                    .specialized
                    .unwrap_or_else(|| matched.iter().any(|pattern| !is_scheme_only(pattern)));
                Some(HandlerDescriptor {
                    package_id: entry.package.clone(),
                    is_specialized: specialized,
                    is_exported: entry.exported,
                    is_browser: entry.browser,
                })
            })
            .collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(default_manifest())
    }
}

impl NavigationDelegate for HandlerRegistry {
    fn query_handlers(
        &self,
        activation: &ActivationDescriptor,
    ) -> Result<Vec<HandlerDescriptor>, ResolveError> {
        Ok(self.resolve(activation))
    }

    fn resolve_default_handler(&self, activation: &ActivationDescriptor) -> Option<HandlerDescriptor> {
        let defaults: Vec<&str> = self
            .manifest
            .handlers
            .iter()
            .filter(|entry| entry.default)
            .map(|entry| entry.package.as_str())
            .collect();
        self.resolve(activation)
            .into_iter()
            .find(|handler| defaults.contains(&handler.package_id.as_str()))
    }

    fn is_application_in_foreground(&self) -> bool {
        self.manifest.foreground
    }

    fn is_incognito_context(&self) -> bool {
        self.manifest.incognito
    }

    fn can_load_url_in_current_context(&self) -> bool {
        self.manifest.can_load_in_context
    }

    fn is_calling_context_trusted(&self, _candidates: &[HandlerDescriptor]) -> bool {
        self.manifest
            .calling_package
            .as_ref()
            .is_some_and(|caller| self.manifest.trusted_packages.contains(caller))
    }

    fn trusted_target_package(&self) -> Option<String> {
        self.manifest.trusted_target_package.clone()
    }

    fn should_disable_activation_for_url(&self, url: &str) -> bool {
        self.manifest
            .disabled
            .iter()
            .any(|pattern| pattern_matches(pattern, url))
    }

    fn default_sms_handler_package(&self) -> Option<String> {
        self.manifest.default_sms_package.clone()
    }

    fn is_valid_web_app_shell_package(&self, package: &str) -> bool {
        self.manifest
            .valid_web_app_shells
            .iter()
            .any(|shell| shell == package)
    }

    fn should_launch_web_app_shell_on_initial_activation(&self) -> bool {
        self.manifest.launch_web_app_shell_on_initial
    }

    fn should_avoid_disambiguation(&self, url: &str) -> bool {
        self.manifest
            .avoid_disambiguation
            .iter()
            .any(|pattern| pattern_matches(pattern, url))
    }
}

// Activations without data still match on their scheme.
fn match_target(activation: &ActivationDescriptor) -> Option<String> {
    match (&activation.data, &activation.scheme) {
        (Some(data), _) => Some(data.clone()),
        (None, Some(scheme)) => Some(format!("{scheme}:")),
        (None, None) => None,
    }
}

fn is_scheme_only(pattern: &str) -> bool {
    let body = pattern.strip_suffix("//").unwrap_or(pattern);
    let Some(scheme) = body.strip_suffix(':') else {
        return pattern == "*";
    };
    !scheme.is_empty() && !scheme.contains([':', '/', '*'])
}

fn pattern_matches(pattern: &str, target: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some((prefix, suffix)) = pattern.split_once('*') {
        return starts_with_ignore_case(target, prefix) && target.ends_with(suffix);
    }
    if is_scheme_only(pattern) {
        let scheme = pattern.trim_end_matches('/');
        return starts_with_ignore_case(target, scheme);
    }
    target.starts_with(pattern)
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
