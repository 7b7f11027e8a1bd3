use navgate_core_types::NavError;
use thiserror::Error;

/// Malformed `intent:` input. Page content is untrusted, so these are expected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentParseError {
    #[error("number format: {0}")]
    NumberFormat(String),
    #[error("uri syntax: {0}")]
    UriSyntax(String),
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),
    #[error("missing `end` terminator")]
    MissingTerminator,
    #[error("percent decoding failed: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error)]
pub enum ResolveError {
    #[error("handler resolution unavailable: {0}")]
    Unavailable(String),
    #[error("handler resolution failed: {0}")]
    Failed(String),
}

impl From<IntentParseError> for NavError {
    fn from(value: IntentParseError) -> Self {
        NavError::InvalidInput(value.to_string())
    }
}

impl From<ResolveError> for NavError {
    fn from(value: ResolveError) -> Self {
        NavError::new(value.to_string())
    }
}
