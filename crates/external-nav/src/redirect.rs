//! Per-tab navigation chain state.
//!
//! A chain is one logical navigation attempt: the step that started it plus
//! every redirect and effective redirect that followed without a fresh user
//! action.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use navgate_core_types::{HandlerDescriptor, PageTransition};
use tracing::debug;

use crate::intent::{ActivationDescriptor, EXTRA_APPLICATION_ID};
use crate::request::NavigationRequest;

pub const NO_COMMITTED_ENTRY_INDEX: i32 = -1;

/// Monotonic millisecond source.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn starting_at(millis: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(millis)),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// One navigation or redirect step as reported by the embedder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationStep {
    pub transition: PageTransition,
    pub is_redirect: bool,
    pub has_user_gesture: bool,
    pub user_gesture_timestamp_ms: u64,
    pub committed_entry_index: i32,
    pub is_initial_navigation: bool,
    pub is_renderer_initiated: bool,
}

impl NavigationStep {
    pub fn new(transition: PageTransition) -> Self {
        Self {
            transition,
            is_redirect: false,
            has_user_gesture: false,
            user_gesture_timestamp_ms: 0,
            committed_entry_index: NO_COMMITTED_ENTRY_INDEX,
            is_initial_navigation: false,
            is_renderer_initiated: true,
        }
    }

    pub fn from_request(request: &NavigationRequest) -> Self {
        Self {
            is_redirect: request.is_redirect,
            has_user_gesture: request.has_user_gesture,
            is_renderer_initiated: request.is_renderer_initiated,
            ..Self::new(request.transition)
        }
    }

    pub fn redirect(mut self) -> Self {
        self.is_redirect = true;
        self
    }

    /// `timestamp_ms` must come from the tracker's clock, see
    /// [`RedirectChainTracker::now_millis`].
    pub fn with_user_gesture(mut self, timestamp_ms: u64) -> Self {
        self.has_user_gesture = true;
        self.user_gesture_timestamp_ms = timestamp_ms;
        self
    }

    pub fn committed_entry_index(mut self, index: i32) -> Self {
        self.committed_entry_index = index;
        self
    }

    pub fn initial_navigation(mut self) -> Self {
        self.is_initial_navigation = true;
        self
    }

    pub fn browser_initiated(mut self) -> Self {
        self.is_renderer_initiated = false;
        self
    }
}

/// The activation that brought the browser to the foreground for this chain.
#[derive(Clone, Debug)]
pub struct InitiatingActivation {
    pub activation: ActivationDescriptor,
    pub is_isolated_view: bool,
    pub sent_to_external_handlers: bool,
    pub started_new_task: bool,
    resolved_handlers: Option<Vec<HandlerDescriptor>>,
}

impl InitiatingActivation {
    /// Whether the activation was aimed at `package`, directly or by application id.
    pub fn heads_to(&self, package: &str) -> bool {
        self.activation.targets_package(package)
            || self.activation.string_extra(EXTRA_APPLICATION_ID) == Some(package)
    }
}

#[derive(Clone, Debug)]
struct ChainState {
    start_millis: u64,
    initial_transition: PageTransition,
    initial_has_user_gesture: bool,
    from_external_activation: bool,
    user_typed: bool,
    step_count: u32,
    current: NavigationStep,
}

pub struct RedirectChainTracker {
    clock: Arc<dyn Clock>,
    timeout: Duration,
    initiating: Option<InitiatingActivation>,
    chain: Option<ChainState>,
    last_loading_millis: Option<u64>,
    last_user_gesture_millis: Option<u64>,
    suppress_override: bool,
    last_committed_entry_index_before_chain: i32,
}

impl fmt::Debug for RedirectChainTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectChainTracker")
            .field("timeout", &self.timeout)
            .field("initiating", &self.initiating)
            .field("chain", &self.chain)
            .field("suppress_override", &self.suppress_override)
            .finish_non_exhaustive()
    }
}

impl RedirectChainTracker {
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(MonotonicClock::default()))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timeout,
            initiating: None,
            chain: None,
            last_loading_millis: None,
            last_user_gesture_millis: None,
            suppress_override: false,
            last_committed_entry_index_before_chain: NO_COMMITTED_ENTRY_INDEX,
        }
    }

    /// Records the activation that opened this tab. Any in-flight chain is
    /// abandoned so the next step starts a chain rooted at `activation`.
    pub fn update_activation(
        &mut self,
        activation: ActivationDescriptor,
        is_isolated_view: bool,
        sent_to_external_handlers: bool,
        started_new_task: bool,
    ) {
        debug!(
            target: "navgate::chain",
            package = activation.target_package().unwrap_or("-"),
            is_isolated_view,
            sent_to_external_handlers,
            "initiating activation recorded"
        );
        self.initiating = Some(InitiatingActivation {
            activation,
            is_isolated_view,
            sent_to_external_handlers,
            started_new_task,
            resolved_handlers: None,
        });
        self.chain = None;
        self.suppress_override = false;
    }

    /// Advances the chain by one step.
    pub fn update_new_url_loading(&mut self, step: NavigationStep) {
        let now = self.clock.now_millis();
        let previous_loading = self.last_loading_millis.replace(now);
        let starts_chain = match &self.chain {
            None => true,
            Some(_) => !step.is_redirect && self.is_new_user_navigation(&step, previous_loading),
        };

        if starts_chain {
            let from_external_activation =
                step.transition.is_from_external_activation() && self.initiating.is_some();
            debug!(
                target: "navgate::chain",
                transition = ?step.transition,
                from_external_activation,
                "navigation chain started"
            );
            self.suppress_override = false;
            self.last_committed_entry_index_before_chain = step.committed_entry_index;
            self.chain = Some(ChainState {
                start_millis: now,
                initial_transition: step.transition,
                initial_has_user_gesture: step.has_user_gesture,
                from_external_activation,
                user_typed: step.transition.is_typed(),
                step_count: 1,
                current: step,
            });
        } else if let Some(chain) = self.chain.as_mut() {
            chain.step_count = chain.step_count.saturating_add(1);
            if step.has_user_gesture && !step.is_redirect {
                chain.user_typed = false;
            }
            chain.current = step;
        }

        if step.has_user_gesture && !step.is_redirect {
            self.last_user_gesture_millis = Some(now);
        }
    }

    // A non-redirect step continues the chain only when it looks script driven:
    // a link-like transition with no gesture newer than the previous step.
    fn is_new_user_navigation(&self, step: &NavigationStep, previous_loading: Option<u64>) -> bool {
        let transition = step.transition;
        if transition.is_forward_back() || transition.is_from_external_activation() {
            return true;
        }
        if !transition.is_redirect_eligible() {
            return true;
        }
        if !step.has_user_gesture {
            return false;
        }
        let fresh_gesture = previous_loading
            .map_or(true, |previous| step.user_gesture_timestamp_ms > previous);
        let advanced_entry = step.committed_entry_index != NO_COMMITTED_ENTRY_INDEX
            && step.committed_entry_index > self.last_committed_entry_index_before_chain;
        fresh_gesture || advanced_entry
    }

    /// True when compared to the handlers of the initiating activation, `candidates`
    /// brings at least one package that could not handle the original activation.
    pub fn has_new_handler<F>(&mut self, candidates: &[HandlerDescriptor], resolve: F) -> bool
    where
        F: FnOnce(&ActivationDescriptor) -> Vec<HandlerDescriptor>,
    {
        if candidates.is_empty() {
            return false;
        }
        let Some(initiating) = self.initiating.as_mut() else {
            return true;
        };
        if initiating.resolved_handlers.is_none() {
            let resolved = resolve(&initiating.activation);
            initiating.resolved_handlers = Some(resolved);
        }
        let original = initiating.resolved_handlers.as_deref().unwrap_or_default();
        candidates.iter().any(|candidate| {
            !original
                .iter()
                .any(|known| known.package_id == candidate.package_id)
        })
    }

    pub fn is_on_navigation(&self) -> bool {
        self.chain.is_some()
    }

    pub fn is_navigation_chain_expired(&self) -> bool {
        let Some(chain) = &self.chain else {
            return false;
        };
        let timeout = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        self.clock.now_millis().saturating_sub(chain.start_millis) > timeout
    }

    pub fn is_navigation_from_user_typing(&self) -> bool {
        self.chain.as_ref().is_some_and(|chain| chain.user_typed)
    }

    /// A redirect or effective redirect inside a chain opened by another application.
    pub fn is_on_non_initial_external_step(&self) -> bool {
        self.chain
            .as_ref()
            .is_some_and(|chain| chain.from_external_activation && chain.step_count > 1)
    }

    pub fn is_from_external_activation(&self) -> bool {
        self.chain
            .as_ref()
            .is_some_and(|chain| chain.from_external_activation)
    }

    /// Whether the step that started the chain carried a user gesture.
    pub fn chain_has_user_gesture(&self) -> bool {
        self.chain
            .as_ref()
            .is_some_and(|chain| chain.initial_has_user_gesture)
    }

    pub fn started_by_forward_back(&self) -> bool {
        self.chain
            .as_ref()
            .is_some_and(|chain| chain.initial_transition.is_forward_back())
    }

    pub fn current_step(&self) -> Option<&NavigationStep> {
        self.chain.as_ref().map(|chain| &chain.current)
    }

    pub fn initiating_activation(&self) -> Option<&InitiatingActivation> {
        self.initiating.as_ref()
    }

    /// Current time on the clock used for expiry and gesture freshness.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    pub fn last_user_gesture_millis(&self) -> Option<u64> {
        self.last_user_gesture_millis
    }

    pub fn set_should_not_override_for_remainder_of_chain(&mut self) {
        debug!(target: "navgate::chain", "override suppressed for remainder of chain");
        self.suppress_override = true;
    }

    pub fn should_not_override(&self) -> bool {
        self.suppress_override
    }

    pub fn last_committed_entry_index_before_chain_start(&self) -> i32 {
        self.last_committed_entry_index_before_chain
    }

    /// Resets per-chain state. The committed entry index survives.
    pub fn clear(&mut self) {
        self.initiating = None;
        self.chain = None;
        self.last_loading_millis = None;
        self.last_user_gesture_millis = None;
        self.suppress_override = false;
    }
}
