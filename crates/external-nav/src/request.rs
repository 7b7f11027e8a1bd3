use navgate_core_types::PageTransition;

/// One navigation step awaiting a decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationRequest {
    pub url: String,
    pub referrer_url: Option<String>,
    /// Stand-in for the referrer when the page supplied none.
    pub last_committed_url: Option<String>,
    pub transition: PageTransition,
    pub is_redirect: bool,
    pub has_user_gesture: bool,
    pub is_renderer_initiated: bool,
    pub is_main_frame: bool,
    pub is_incognito: bool,
    pub is_background_tab: bool,
    pub allow_activation_from_background_tab: bool,
    pub application_must_be_foreground: bool,
    pub is_initial_navigation_in_frame: bool,
    pub is_hidden_cross_frame_navigation: bool,
    /// Set when the navigation happens inside a first-party web-app shell.
    pub native_client_package: Option<String>,
    pub open_in_new_tab: bool,
}

impl NavigationRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer_url: None,
            last_committed_url: None,
            transition: PageTransition::LINK,
            is_redirect: false,
            has_user_gesture: false,
            is_renderer_initiated: true,
            is_main_frame: true,
            is_incognito: false,
            is_background_tab: false,
            allow_activation_from_background_tab: false,
            application_must_be_foreground: true,
            is_initial_navigation_in_frame: false,
            is_hidden_cross_frame_navigation: false,
            native_client_package: None,
            open_in_new_tab: false,
        }
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer_url = Some(referrer.into());
        self
    }

    pub fn with_last_committed_url(mut self, url: impl Into<String>) -> Self {
        self.last_committed_url = Some(url.into());
        self
    }

    pub fn with_transition(mut self, transition: PageTransition) -> Self {
        self.transition = transition;
        self
    }

    pub fn redirect(mut self, is_redirect: bool) -> Self {
        self.is_redirect = is_redirect;
        self
    }

    pub fn user_gesture(mut self, has_user_gesture: bool) -> Self {
        self.has_user_gesture = has_user_gesture;
        self
    }

    pub fn renderer_initiated(mut self, is_renderer_initiated: bool) -> Self {
        self.is_renderer_initiated = is_renderer_initiated;
        self
    }

    pub fn main_frame(mut self, is_main_frame: bool) -> Self {
        self.is_main_frame = is_main_frame;
        self
    }

    pub fn incognito(mut self, is_incognito: bool) -> Self {
        self.is_incognito = is_incognito;
        self
    }

    pub fn background_tab(mut self, allow_activation: bool) -> Self {
        self.is_background_tab = true;
        self.allow_activation_from_background_tab = allow_activation;
        self
    }

    pub fn foreground_required(mut self, required: bool) -> Self {
        self.application_must_be_foreground = required;
        self
    }

    pub fn initial_navigation_in_frame(mut self, initial: bool) -> Self {
        self.is_initial_navigation_in_frame = initial;
        self
    }

    pub fn hidden_cross_frame(mut self, hidden: bool) -> Self {
        self.is_hidden_cross_frame_navigation = hidden;
        self
    }

    pub fn with_native_client_package(mut self, package: impl Into<String>) -> Self {
        self.native_client_package = Some(package.into());
        self
    }

    pub fn open_in_new_tab(mut self, open: bool) -> Self {
        self.open_in_new_tab = open;
        self
    }
}
