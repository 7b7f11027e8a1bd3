use std::fmt;

use serde::Serialize;

use crate::intent::ActivationDescriptor;

/// Single-use continuation for a gated decision. `true` means the user accepted.
pub type AsyncContinuation = Box<dyn FnOnce(bool) -> AsyncActionTaken>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncActionKind {
    /// Confirm before launching another application.
    UiGatingActivation,
    /// Confirm before leaving the browser for a typed external scheme.
    UiGatingBrowserNavigation,
}

/// What the embedder should do once a gated decision resolves.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AsyncActionTaken {
    NoAction,
    Navigate {
        target_url: String,
        referrer_url: Option<String>,
    },
    Launch(ActivationDescriptor),
}

pub struct AsyncAction {
    kind: AsyncActionKind,
    continuation: Option<AsyncContinuation>,
}

impl AsyncAction {
    pub fn new(kind: AsyncActionKind, continuation: AsyncContinuation) -> Self {
        Self {
            kind,
            continuation: Some(continuation),
        }
    }

    /// The continuation was already handed to an embedder-owned dialog.
    pub fn delegated(kind: AsyncActionKind) -> Self {
        Self {
            kind,
            continuation: None,
        }
    }

    pub fn kind(&self) -> AsyncActionKind {
        self.kind
    }

    pub fn is_delegated(&self) -> bool {
        self.continuation.is_none()
    }

    /// Runs the continuation. Consuming `self` keeps it single-use.
    pub fn resolve(self, accepted: bool) -> AsyncActionTaken {
        match self.continuation {
            Some(continuation) => continuation(accepted),
            None => AsyncActionTaken::NoAction,
        }
    }
}

impl fmt::Debug for AsyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAction")
            .field("kind", &self.kind)
            .field("delegated", &self.is_delegated())
            .finish()
    }
}

#[derive(Debug)]
pub enum ClassificationResult {
    NoOverride,
    OverrideWithExternalHandler {
        activation: ActivationDescriptor,
        requires_disambiguation_chooser: bool,
    },
    OverrideWithFallbackNavigation {
        target_url: String,
        referrer_url: Option<String>,
    },
    OverrideWithAsyncAction(AsyncAction),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    NoOverride,
    ExternalHandler,
    FallbackNavigation,
    AsyncAction,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultKind::NoOverride => "no_override",
            ResultKind::ExternalHandler => "override_with_external_handler",
            ResultKind::FallbackNavigation => "override_with_fallback_navigation",
            ResultKind::AsyncAction => "override_with_async_action",
        };
        f.write_str(name)
    }
}

impl ClassificationResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            ClassificationResult::NoOverride => ResultKind::NoOverride,
            ClassificationResult::OverrideWithExternalHandler { .. } => ResultKind::ExternalHandler,
            ClassificationResult::OverrideWithFallbackNavigation { .. } => {
                ResultKind::FallbackNavigation
            }
            ClassificationResult::OverrideWithAsyncAction(_) => ResultKind::AsyncAction,
        }
    }

    pub fn is_no_override(&self) -> bool {
        matches!(self, ClassificationResult::NoOverride)
    }

    pub fn activation(&self) -> Option<&ActivationDescriptor> {
        match self {
            ClassificationResult::OverrideWithExternalHandler { activation, .. } => Some(activation),
            _ => None,
        }
    }

    pub fn requires_chooser(&self) -> bool {
        matches!(
            self,
            ClassificationResult::OverrideWithExternalHandler {
                requires_disambiguation_chooser: true,
                ..
            }
        )
    }

    pub fn fallback_url(&self) -> Option<&str> {
        match self {
            ClassificationResult::OverrideWithFallbackNavigation { target_url, .. } => {
                Some(target_url)
            }
            _ => None,
        }
    }

    pub fn async_kind(&self) -> Option<AsyncActionKind> {
        match self {
            ClassificationResult::OverrideWithAsyncAction(action) => Some(action.kind()),
            _ => None,
        }
    }

    pub fn into_async_action(self) -> Option<AsyncAction> {
        match self {
            ClassificationResult::OverrideWithAsyncAction(action) => Some(action),
            _ => None,
        }
    }
}
