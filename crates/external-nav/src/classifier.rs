//! The ordered rule cascade that turns a navigation request into a decision.

use navgate_core_types::HandlerDescriptor;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClassifierConfig;
use crate::delegate::NavigationDelegate;
use crate::errors::IntentParseError;
use crate::intent::{
    self, ActivationDescriptor, EXTRA_CREATE_NEW_TAB, EXTRA_CUSTOM_TAB_SESSION,
    EXTRA_MARKET_REFERRER,
};
use crate::redirect::{NavigationStep, RedirectChainTracker};
use crate::request::NavigationRequest;
use crate::result::{
    AsyncAction, AsyncActionKind, AsyncActionTaken, AsyncContinuation, ClassificationResult,
};
use crate::uri;

const TARGET: &str = "navgate::classifier";

enum Verdict {
    /// Terminal; a fallback URL is not consulted.
    Ignore(&'static str),
    /// Nothing to launch, but a fallback URL may still be navigated to.
    Decline(&'static str),
    Decided(ClassificationResult),
}

/// A parsed destination.
struct Target {
    activation: ActivationDescriptor,
    is_intent: bool,
    is_external_protocol: bool,
    fallback_url: Option<Url>,
}

impl Target {
    fn plain(activation: ActivationDescriptor) -> Self {
        let is_external_protocol = !activation
            .scheme
            .as_deref()
            .is_some_and(uri::is_web_scheme_name);
        Self {
            activation,
            is_intent: false,
            is_external_protocol,
            fallback_url: None,
        }
    }
}

pub struct ExternalNavigationClassifier<D> {
    config: ClassifierConfig,
    delegate: D,
}

impl<D: NavigationDelegate> ExternalNavigationClassifier<D> {
    pub fn new(config: ClassifierConfig, delegate: D) -> Self {
        Self { config, delegate }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Decides what to do with `request`. Never fails: malformed input and
    /// resolution errors end in [`ClassificationResult::NoOverride`].
    pub fn classify(
        &self,
        request: &NavigationRequest,
        chain: &mut RedirectChainTracker,
    ) -> ClassificationResult {
        if !chain.is_on_navigation() {
            debug!(target: TARGET, "no chain update before classify, starting implicit chain");
            chain.update_new_url_loading(NavigationStep::from_request(request));
        }
        if let Some(rule) = self.pre_parse_ignore(request) {
            return no_override(rule);
        }
        let target = match self.parse_target(&request.url) {
            Ok(target) => target,
            Err(err) => {
                debug!(target: TARGET, url = %request.url, %err, "malformed intent uri");
                return no_override("malformed-intent");
            }
        };
        if target.is_intent && self.targets_internal_scheme(&target.activation) {
            return no_override("intent-to-internal-scheme");
        }

        let handlers = self.query_handlers(&target.activation);
        let trusted = self.delegate.is_calling_context_trusted(&handlers);
        if chain.should_not_override() && !trusted {
            return no_override("chain-suppressed");
        }

        match self.evaluate(request, chain, &target, &handlers, trusted) {
            Verdict::Ignore(rule) => no_override(rule),
            Verdict::Decline(rule) => match &target.fallback_url {
                Some(fallback) => self.handle_fallback(request, chain, fallback),
                None => no_override(rule),
            },
            Verdict::Decided(result) => {
                debug!(target: TARGET, url = %request.url, result = %result.kind(), "override");
                result
            }
        }
    }

    /// Whether some application other than this one could open `url`.
    pub fn can_external_app_handle_url(&self, url: &str) -> bool {
        if uri::is_internal_scheme(url) {
            return false;
        }
        let Ok(target) = self.parse_target(url) else {
            return false;
        };
        if target.is_intent
            && target
                .activation
                .target_package()
                .is_some_and(|package| package != self.config.self_package)
        {
            return true;
        }
        self.query_handlers(&target.activation)
            .iter()
            .any(|handler| handler.package_id != self.config.self_package)
    }

    fn pre_parse_ignore(&self, request: &NavigationRequest) -> Option<&'static str> {
        let url = request.url.as_str();
        if uri::is_internal_scheme(url) {
            return Some("internal-scheme");
        }
        if uri::is_wtai(url) && uri::wtai_make_call_number(url).is_none() {
            return Some("unsupported-wtai");
        }
        if self.config.block_frame_renavigations
            && request.is_hidden_cross_frame_navigation
            && !request.is_initial_navigation_in_frame
        {
            return Some("hidden-cross-frame");
        }
        if self.delegate.should_disable_activation_for_url(url) {
            return Some("disabled-by-embedder");
        }
        if uri::is_pairing_code(
            url,
            &self.config.pairing_code_hosts,
            &self.config.pairing_code_param,
        ) {
            return Some("pairing-code");
        }
        None
    }

    fn parse_target(&self, url: &str) -> Result<Target, IntentParseError> {
        if uri::is_intent_uri(url) {
            let activation = intent::parse_intent_uri(url)?;
            let fallback_url = activation.fallback_url().and_then(uri::parse_fallback_url);
            return Ok(Target {
                activation,
                is_intent: true,
                is_external_protocol: true,
                fallback_url,
            });
        }
        if let Some(number) = uri::wtai_make_call_number(url) {
            return Ok(Target::plain(ActivationDescriptor::view(&format!(
                "tel:{number}"
            ))));
        }
        Ok(Target::plain(ActivationDescriptor::view(url.trim())))
    }

    fn targets_internal_scheme(&self, activation: &ActivationDescriptor) -> bool {
        activation.scheme.as_deref().is_some_and(|scheme| {
            uri::is_internal_scheme_name(scheme)
                || scheme.eq_ignore_ascii_case("file")
                || scheme.eq_ignore_ascii_case("javascript")
        })
    }

    fn query_handlers(&self, activation: &ActivationDescriptor) -> Vec<HandlerDescriptor> {
        match self.delegate.query_handlers(activation) {
            Ok(handlers) => handlers,
            Err(err) => {
                warn!(target: TARGET, %err, "handler resolution failed, treating as no handlers");
                Vec::new()
            }
        }
    }

    fn evaluate(
        &self,
        request: &NavigationRequest,
        chain: &mut RedirectChainTracker,
        target: &Target,
        handlers: &[HandlerDescriptor],
        trusted: bool,
    ) -> Verdict {
        let transition = request.transition;
        let incoming = transition.is_from_external_activation();
        let is_web = !target.is_external_protocol;
        let incognito = request.is_incognito || self.delegate.is_incognito_context();

        // Transition gate.
        if transition.is_forward_back() || chain.started_by_forward_back() {
            return Verdict::Ignore("forward-back");
        }
        if request.application_must_be_foreground
            && !self.delegate.is_application_in_foreground()
            && !(incoming && request.is_redirect)
        {
            return Verdict::Ignore("application-backgrounded");
        }
        if (transition.is_typed() || transition.is_reload()) && !request.is_redirect {
            if transition.is_typed() && target.is_external_protocol && !handlers.is_empty() {
                return Verdict::Decided(self.confirm_launch(
                    AsyncActionKind::UiGatingBrowserNavigation,
                    request,
                    target,
                    handlers,
                    trusted,
                ));
            }
            return Verdict::Ignore("typed-or-reload");
        }
        if transition.is_embedder_initiated()
            && !request.is_redirect
            && self
                .delegate
                .should_embedder_initiated_navigations_stay_in_browser()
        {
            return Verdict::Ignore("embedder-initiated");
        }
        if incoming && !request.is_redirect {
            if self.delegate.should_launch_web_app_shell_on_initial_activation()
                && self.single_web_app_shell(handlers).is_some()
            {
                return Verdict::Decided(self.launch(request, target, handlers, trusted));
            }
            return Verdict::Ignore("initial-external-load");
        }

        // Form submission gate.
        if transition.is_form_submit() && !request.is_redirect {
            return Verdict::Ignore("bare-form-submit");
        }

        // Background and gesture gate.
        if request.is_background_tab && !request.allow_activation_from_background_tab {
            return Verdict::Ignore("background-tab");
        }
        let continuing_external =
            chain.is_on_non_initial_external_step() || (incoming && request.is_redirect);
        let has_gesture = request.has_user_gesture || chain.chain_has_user_gesture();
        if !has_gesture && !continuing_external && !trusted {
            if target.fallback_url.is_none() && target.is_external_protocol && !handlers.is_empty()
            {
                return Verdict::Decided(self.confirm_launch(
                    AsyncActionKind::UiGatingActivation,
                    request,
                    target,
                    handlers,
                    trusted,
                ));
            }
            return Verdict::Decline("no-user-gesture");
        }

        // Chain expiry.
        if chain.is_navigation_chain_expired() && !trusted {
            return Verdict::Ignore("chain-expired");
        }

        // Chain provenance.
        if is_web && !trusted && chain.is_navigation_from_user_typing() {
            return Verdict::Ignore("user-typed-chain");
        }
        if is_web && !trusted && chain.is_on_non_initial_external_step() {
            let initiating = chain
                .initiating_activation()
                .map(|origin| {
                    (
                        origin.sent_to_external_handlers,
                        origin.heads_to(&self.config.self_package) || origin.is_isolated_view,
                    )
                });
            if let Some((sent_to_external, stays_in_app)) = initiating {
                if !sent_to_external {
                    if stays_in_app {
                        return Verdict::Ignore("external-chain-stays-in-app");
                    }
                    if !chain.has_new_handler(handlers, |activation| {
                        self.query_handlers(activation)
                    }) {
                        return Verdict::Ignore("no-new-handler");
                    }
                }
            }
        }

        if let Some(url) = uri::self_scheme_navigate_target(&request.url, &self.config.self_scheme)
        {
            return Verdict::Decided(ClassificationResult::OverrideWithFallbackNavigation {
                target_url: url.to_string(),
                referrer_url: request.referrer_url.clone(),
            });
        }

        // Content filters for web destinations.
        if is_web
            && self.config.keep_pdf_downloads_in_browser
            && uri::is_pdf_download(&request.url)
        {
            return Verdict::Ignore("pdf-download");
        }
        if is_web && incognito && self.config.keep_incognito_web_links_in_browser {
            return Verdict::Ignore("incognito-web-link");
        }
        if is_web
            && request
                .referrer_url
                .as_deref()
                .is_some_and(uri::is_internal_scheme)
        {
            return Verdict::Ignore("internal-referrer");
        }

        // Same-app filters.
        let specialized = self.specialized(handlers);
        if is_web {
            if specialized.is_empty() && !trusted {
                return Verdict::Decline("no-specialized-handler");
            }
            if !trusted && self.shares_handler_with_origin(request, &specialized) {
                return Verdict::Ignore("same-app-as-referrer");
            }
            if let Some(native) = &request.native_client_package {
                if specialized.iter().any(|handler| handler.package_id == *native) {
                    return Verdict::Ignore("native-client-scope");
                }
            }
        }

        // Self-targeting intents.
        if target.is_intent
            && self.config.block_intents_to_self
            && self.targets_self(&target.activation, handlers)
        {
            let cannot_load_here = incognito && !self.delegate.can_load_url_in_current_context();
            let custom_tab_session = target.activation.has_extra(EXTRA_CUSTOM_TAB_SESSION);
            if custom_tab_session && !cannot_load_here {
                return Verdict::Decided(self.launch(request, target, handlers, trusted));
            }
            return match self.self_target_url(target) {
                Some(url) => Verdict::Decided(ClassificationResult::OverrideWithFallbackNavigation {
                    target_url: url,
                    referrer_url: request.referrer_url.clone(),
                }),
                None => Verdict::Ignore("intent-to-self"),
            };
        }

        // Resolution.
        if handlers.is_empty() {
            return self.unresolved(request, target);
        }
        let eligible = self.eligible(handlers);
        if eligible.is_empty() && !trusted {
            return Verdict::Decline("only-self-handles");
        }
        if target.fallback_url.is_some() && specialized.is_empty() && eligible.len() > 1 {
            return Verdict::Decline("ambiguous-generic-handlers");
        }
        let default_handler = self.delegate.resolve_default_handler(&target.activation);
        let would_show_chooser = default_handler.is_none() && handlers.len() > 1;
        if would_show_chooser
            && target.fallback_url.is_none()
            && self.delegate.should_avoid_disambiguation(&request.url)
        {
            return Verdict::Ignore("avoid-disambiguation");
        }

        Verdict::Decided(self.launch(request, target, handlers, trusted))
    }

    /// Nothing can handle the destination: try the store, else stay.
    fn unresolved(&self, request: &NavigationRequest, target: &Target) -> Verdict {
        if target.fallback_url.is_some() {
            return Verdict::Decline("unresolved");
        }
        let package = target
            .activation
            .package
            .as_deref()
            .filter(|package| target.is_intent && *package != self.config.self_package);
        let Some(package) = package else {
            return Verdict::Ignore("unresolved");
        };
        let referrer = target
            .activation
            .string_extra(EXTRA_MARKET_REFERRER)
            .filter(|referrer| !referrer.is_empty())
            .unwrap_or(&self.config.self_package);
        let store = intent::store_details_activation(&self.config.store_scheme, package, referrer);
        let store_handlers = self.query_handlers(&store);
        if store_handlers.is_empty() {
            return Verdict::Ignore("store-unavailable");
        }
        debug!(target: TARGET, package, "package missing, sending to store listing");
        Verdict::Decided(self.launch(request, &Target::plain(store), &store_handlers, false))
    }

    fn handle_fallback(
        &self,
        request: &NavigationRequest,
        chain: &mut RedirectChainTracker,
        fallback: &Url,
    ) -> ClassificationResult {
        let store_host = &self.config.store_web_host;
        if uri::is_store_search(fallback, store_host) {
            return no_override("store-search-fallback");
        }
        if let Some(listing) = uri::store_listing(fallback, store_host) {
            let referrer = listing
                .referrer
                .as_deref()
                .unwrap_or(&self.config.self_package);
            let store =
                intent::store_details_activation(&self.config.store_scheme, &listing.package, referrer);
            let store_handlers = self.query_handlers(&store);
            if !store_handlers.is_empty() {
                return self.launch(request, &Target::plain(store), &store_handlers, false);
            }
        }
        let fallback_target = Target::plain(ActivationDescriptor::view(fallback.as_str()));
        let fallback_handlers = self.query_handlers(&fallback_target.activation);
        if self.single_web_app_shell(&fallback_handlers).is_some() {
            return self.launch(request, &fallback_target, &fallback_handlers, false);
        }
        chain.set_should_not_override_for_remainder_of_chain();
        debug!(target: TARGET, fallback = %fallback, "navigating to fallback url");
        ClassificationResult::OverrideWithFallbackNavigation {
            target_url: fallback.to_string(),
            referrer_url: request.referrer_url.clone(),
        }
    }

    fn launch(
        &self,
        request: &NavigationRequest,
        target: &Target,
        handlers: &[HandlerDescriptor],
        trusted: bool,
    ) -> ClassificationResult {
        let (activation, requires_disambiguation_chooser) =
            self.prepare_activation(request, target, handlers, trusted);
        if self.leaves_private_mode(request, &activation) {
            let on_decline = AsyncActionTaken::Navigate {
                target_url: target
                    .fallback_url
                    .as_ref()
                    .map(Url::to_string)
                    .unwrap_or_else(|| request.url.clone()),
                referrer_url: request.referrer_url.clone(),
            };
            return self.gate_leaving_private_mode(activation, on_decline);
        }
        ClassificationResult::OverrideWithExternalHandler {
            activation,
            requires_disambiguation_chooser,
        }
    }

    /// Launch only after the user agrees. In private mode the leaving-private-mode
    /// confirmation replaces the `kind` prompt so a single answer covers both.
    fn confirm_launch(
        &self,
        kind: AsyncActionKind,
        request: &NavigationRequest,
        target: &Target,
        handlers: &[HandlerDescriptor],
        trusted: bool,
    ) -> ClassificationResult {
        let (activation, _) = self.prepare_activation(request, target, handlers, trusted);
        if self.leaves_private_mode(request, &activation) {
            return self.gate_leaving_private_mode(activation, AsyncActionTaken::NoAction);
        }
        gated(
            kind,
            Box::new(move |accepted| {
                if accepted {
                    AsyncActionTaken::Launch(activation)
                } else {
                    AsyncActionTaken::NoAction
                }
            }),
        )
    }

    fn leaves_private_mode(
        &self,
        request: &NavigationRequest,
        activation: &ActivationDescriptor,
    ) -> bool {
        let incognito = request.is_incognito || self.delegate.is_incognito_context();
        incognito && !activation.targets_package(&self.config.self_package)
    }

    fn gate_leaving_private_mode(
        &self,
        activation: ActivationDescriptor,
        on_decline: AsyncActionTaken,
    ) -> ClassificationResult {
        let continuation: AsyncContinuation = Box::new(move |accepted| {
            if accepted {
                AsyncActionTaken::Launch(activation)
            } else {
                on_decline
            }
        });
        if self.delegate.owns_leaving_private_mode_dialog() {
            self.delegate
                .present_leaving_private_mode_confirmation(continuation);
            return ClassificationResult::OverrideWithAsyncAction(AsyncAction::delegated(
                AsyncActionKind::UiGatingActivation,
            ));
        }
        gated(AsyncActionKind::UiGatingActivation, continuation)
    }

    /// Builds the outbound activation and decides whether a chooser is needed.
    fn prepare_activation(
        &self,
        request: &NavigationRequest,
        target: &Target,
        handlers: &[HandlerDescriptor],
        trusted: bool,
    ) -> (ActivationDescriptor, bool) {
        let mut activation = target.activation.clone();
        if let Some(shell) = self.single_web_app_shell(handlers) {
            activation.package = Some(shell);
        } else if self.is_sms(&activation) {
            if let Some(default_sms) = self.delegate.default_sms_handler_package() {
                if handlers.iter().any(|handler| handler.package_id == default_sms) {
                    activation.package = Some(default_sms);
                }
            }
        }
        if trusted {
            if let Some(package) = self.delegate.trusted_target_package() {
                activation.package = Some(package);
            }
        }
        if request.open_in_new_tab {
            activation.put_bool_extra(EXTRA_CREATE_NEW_TAB, true);
        }

        activation.sanitize_for_launch();
        if let Some(referrer) = &request.referrer_url {
            self.delegate.attach_pending_referrer(&mut activation, referrer);
        }
        self.delegate.attach_request_metadata(
            &mut activation,
            request.has_user_gesture,
            request.is_renderer_initiated,
        );

        let eligible = self.eligible(handlers);
        let resolves_to_other_browser = self
            .delegate
            .resolve_default_handler(&target.activation)
            .is_some_and(|handler| {
                handler.is_browser && handler.package_id != self.config.self_package
            })
            || (!eligible.is_empty() && eligible.iter().all(|handler| handler.is_browser));
        let requires_chooser = activation.package.is_none()
            && !trusted
            && (eligible.len() > 1 || resolves_to_other_browser);
        (activation, requires_chooser)
    }

    fn targets_self(&self, activation: &ActivationDescriptor, handlers: &[HandlerDescriptor]) -> bool {
        let self_package = &self.config.self_package;
        if activation.targets_package(self_package) {
            return true;
        }
        if !handlers.is_empty() && handlers.iter().all(|handler| handler.package_id == *self_package)
        {
            return true;
        }
        self.delegate
            .resolve_default_handler(activation)
            .is_some_and(|handler| handler.package_id == *self_package)
    }

    fn self_target_url(&self, target: &Target) -> Option<String> {
        target
            .activation
            .data
            .as_deref()
            .and_then(uri::parse_fallback_url)
            .or_else(|| target.fallback_url.clone())
            .map(|url| url.to_string())
    }

    fn shares_handler_with_origin(
        &self,
        request: &NavigationRequest,
        specialized: &[&HandlerDescriptor],
    ) -> bool {
        let origin = request
            .referrer_url
            .as_deref()
            .or(request.last_committed_url.as_deref());
        let Some(origin) = origin else {
            return false;
        };
        if !uri::same_scheme_and_host(origin, &request.url) {
            return false;
        }
        self.query_handlers(&ActivationDescriptor::view(origin))
            .iter()
            .filter(|handler| handler.is_specialized)
            .any(|handler| {
                specialized
                    .iter()
                    .any(|candidate| candidate.package_id == handler.package_id)
            })
    }

    fn single_web_app_shell(&self, handlers: &[HandlerDescriptor]) -> Option<String> {
        let specialized = self.specialized(handlers);
        let [only] = specialized.as_slice() else {
            return None;
        };
        let package = &only.package_id;
        (package.starts_with(&self.config.web_app_shell_prefix)
            && self.delegate.is_valid_web_app_shell_package(package))
        .then(|| package.clone())
    }

    fn is_sms(&self, activation: &ActivationDescriptor) -> bool {
        activation
            .scheme
            .as_deref()
            .is_some_and(|scheme| self.config.is_sms_scheme(scheme))
    }

    /// Exported handlers other than this application.
    fn eligible<'a>(&self, handlers: &'a [HandlerDescriptor]) -> Vec<&'a HandlerDescriptor> {
        handlers
            .iter()
            .filter(|handler| handler.is_exported && handler.package_id != self.config.self_package)
            .collect()
    }

    fn specialized<'a>(&self, handlers: &'a [HandlerDescriptor]) -> Vec<&'a HandlerDescriptor> {
        self.eligible(handlers)
            .into_iter()
            .filter(|handler| handler.is_specialized)
            .collect()
    }
}

fn gated(kind: AsyncActionKind, continuation: AsyncContinuation) -> ClassificationResult {
    ClassificationResult::OverrideWithAsyncAction(AsyncAction::new(kind, continuation))
}

fn no_override(rule: &'static str) -> ClassificationResult {
    debug!(target: TARGET, rule, "no override");
    ClassificationResult::NoOverride
}
