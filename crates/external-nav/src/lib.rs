//! Decides whether a navigation stays in the browser or is handed to another
//! application.
//!
//! The embedder owns one [`RedirectChainTracker`] per tab, feeds it every
//! navigation step, and asks the [`ExternalNavigationClassifier`] for a
//! [`ClassificationResult`] before committing each step.

pub mod classifier;
pub mod config;
pub mod delegate;
pub mod errors;
pub mod intent;
pub mod redirect;
pub mod request;
pub mod result;
pub mod uri;

pub use classifier::ExternalNavigationClassifier;
pub use config::ClassifierConfig;
pub use delegate::{HeadlessDelegate, NavigationDelegate};
pub use errors::{IntentParseError, ResolveError};
pub use intent::{parse_intent_uri, ActivationDescriptor, ActivationFlags, ExtraValue};
pub use navgate_core_types::{HandlerDescriptor, PageTransition};
pub use redirect::{
    Clock, ManualClock, MonotonicClock, NavigationStep, RedirectChainTracker,
    NO_COMMITTED_ENTRY_INDEX,
};
pub use request::NavigationRequest;
pub use result::{
    AsyncAction, AsyncActionKind, AsyncActionTaken, AsyncContinuation, ClassificationResult,
    ResultKind,
};
pub use uri::UriClass;

#[cfg(test)]
mod tests;
