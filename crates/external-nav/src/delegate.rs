use navgate_core_types::HandlerDescriptor;

use crate::errors::ResolveError;
use crate::intent::{ActivationDescriptor, EXTRA_REFERRER, EXTRA_USER_GESTURE};
use crate::result::AsyncContinuation;

/// Embedder capabilities the classifier consults. Every hook except handler
/// resolution has a conservative default.
pub trait NavigationDelegate {
    /// Installed handlers able to receive `activation`.
    fn query_handlers(
        &self,
        activation: &ActivationDescriptor,
    ) -> Result<Vec<HandlerDescriptor>, ResolveError>;

    /// The handler the platform would pick without asking, if any.
    fn resolve_default_handler(
        &self,
        _activation: &ActivationDescriptor,
    ) -> Option<HandlerDescriptor> {
        None
    }

    fn is_application_in_foreground(&self) -> bool {
        true
    }

    fn is_incognito_context(&self) -> bool {
        false
    }

    fn can_load_url_in_current_context(&self) -> bool {
        true
    }

    fn is_calling_context_trusted(&self, _candidates: &[HandlerDescriptor]) -> bool {
        false
    }

    /// Package a trusted caller wants outbound activations pinned to.
    fn trusted_target_package(&self) -> Option<String> {
        None
    }

    fn should_disable_activation_for_url(&self, _url: &str) -> bool {
        false
    }

    fn owns_leaving_private_mode_dialog(&self) -> bool {
        false
    }

    fn present_leaving_private_mode_confirmation(&self, _on_user_decision: AsyncContinuation) {}

    fn default_sms_handler_package(&self) -> Option<String> {
        None
    }

    fn is_valid_web_app_shell_package(&self, _package: &str) -> bool {
        false
    }

    fn should_launch_web_app_shell_on_initial_activation(&self) -> bool {
        false
    }

    fn should_avoid_disambiguation(&self, _url: &str) -> bool {
        false
    }

    fn should_embedder_initiated_navigations_stay_in_browser(&self) -> bool {
        true
    }

    fn attach_pending_referrer(&self, activation: &mut ActivationDescriptor, referrer: &str) {
        activation.put_string_extra(EXTRA_REFERRER, referrer);
    }

    fn attach_request_metadata(
        &self,
        activation: &mut ActivationDescriptor,
        has_user_gesture: bool,
        _is_renderer_initiated: bool,
    ) {
        if has_user_gesture {
            activation.put_bool_extra(EXTRA_USER_GESTURE, true);
        }
    }
}

/// Delegate for embedders without any installed-application database.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessDelegate;

impl NavigationDelegate for HeadlessDelegate {
    fn query_handlers(
        &self,
        _activation: &ActivationDescriptor,
    ) -> Result<Vec<HandlerDescriptor>, ResolveError> {
        Ok(Vec::new())
    }
}
