use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

/// Shared error type for the navgate crates.
#[derive(Debug, Error, Clone)]
pub enum NavError {
    #[error("{message}")]
    Message { message: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl NavError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

pub type NavResult<T> = Result<T, NavError>;

bitflags! {
    /// Page transition bits reported with every navigation step.
    ///
    /// Bits are orthogonal; a client redirect that is also a link carries both
    /// `LINK` and `CLIENT_REDIRECT`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PageTransition: u32 {
        const LINK = 1 << 0;
        const TYPED = 1 << 1;
        const AUTO_BOOKMARK = 1 << 2;
        const AUTO_SUBFRAME = 1 << 3;
        const AUTO_TOPLEVEL = 1 << 4;
        const FORM_SUBMIT = 1 << 5;
        const RELOAD = 1 << 6;
        const FORWARD_BACK = 1 << 8;
        const FROM_ADDRESS_BAR = 1 << 9;
        /// The navigation was handed to the browser by another application.
        const FROM_API = 1 << 10;
        const CLIENT_REDIRECT = 1 << 11;
    }
}

impl Default for PageTransition {
    fn default() -> Self {
        PageTransition::LINK
    }
}

impl PageTransition {
    pub fn is_link(self) -> bool {
        self.contains(Self::LINK)
    }

    /// Typed into the omnibox, either directly or through the address bar.
    pub fn is_typed(self) -> bool {
        self.intersects(Self::TYPED | Self::FROM_ADDRESS_BAR)
    }

    pub fn is_reload(self) -> bool {
        self.contains(Self::RELOAD)
    }

    pub fn is_form_submit(self) -> bool {
        self.contains(Self::FORM_SUBMIT)
    }

    pub fn is_forward_back(self) -> bool {
        self.contains(Self::FORWARD_BACK)
    }

    pub fn is_from_external_activation(self) -> bool {
        self.contains(Self::FROM_API)
    }

    pub fn is_client_redirect(self) -> bool {
        self.contains(Self::CLIENT_REDIRECT)
    }

    pub fn is_auto_subframe(self) -> bool {
        self.contains(Self::AUTO_SUBFRAME)
    }

    pub fn is_embedder_initiated(self) -> bool {
        self.contains(Self::AUTO_BOOKMARK)
    }

    /// Transitions that may continue an existing chain without a fresh user action.
    pub fn is_redirect_eligible(self) -> bool {
        self.intersects(Self::LINK | Self::FORM_SUBMIT | Self::CLIENT_REDIRECT)
            && !self.intersects(
                Self::TYPED
                    | Self::FROM_ADDRESS_BAR
                    | Self::RELOAD
                    | Self::AUTO_BOOKMARK
                    | Self::AUTO_TOPLEVEL,
            )
    }

    /// Parses a comma or `|` separated list of flag names, e.g. `link,client_redirect`.
    pub fn parse_list(raw: &str) -> NavResult<Self> {
        let mut flags = PageTransition::empty();
        for name in raw.split([',', '|']) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let flag = PageTransition::from_name(&name.to_ascii_uppercase())
                .ok_or_else(|| NavError::InvalidInput(format!("unknown transition: {name}")))?;
            flags |= flag;
        }
        if flags.is_empty() {
            return Err(NavError::InvalidInput("empty transition list".into()));
        }
        Ok(flags)
    }
}

/// A platform application component that can receive an activation.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct HandlerDescriptor {
    pub package_id: String,
    /// Registered for more than a bare scheme (host and/or path).
    pub is_specialized: bool,
    pub is_exported: bool,
    /// A general purpose web browser.
    pub is_browser: bool,
}

impl HandlerDescriptor {
    pub fn specialized(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            is_specialized: true,
            is_exported: true,
            is_browser: false,
        }
    }

    pub fn generic(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            is_specialized: false,
            is_exported: true,
            is_browser: false,
        }
    }

    pub fn browser(package_id: impl Into<String>) -> Self {
        Self {
            is_browser: true,
            ..Self::generic(package_id)
        }
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_specialized {
            "specialized"
        } else {
            "generic"
        };
        write!(f, "{} ({kind})", self.package_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_predicates_follow_bits() {
        let t = PageTransition::LINK | PageTransition::FORWARD_BACK;
        assert!(t.is_forward_back());
        assert!(t.is_link());
        assert!(!t.is_typed());
        assert!(PageTransition::FROM_ADDRESS_BAR.is_typed());
        assert!((PageTransition::LINK | PageTransition::CLIENT_REDIRECT).is_redirect_eligible());
        assert!(!PageTransition::TYPED.is_redirect_eligible());
    }

    #[test]
    fn parse_list_accepts_mixed_separators() {
        let parsed = PageTransition::parse_list("link | from_api,client_redirect").unwrap();
        assert_eq!(
            parsed,
            PageTransition::LINK | PageTransition::FROM_API | PageTransition::CLIENT_REDIRECT
        );
        assert!(PageTransition::parse_list("bogus").is_err());
        assert!(PageTransition::parse_list(" , ").is_err());
    }
}
