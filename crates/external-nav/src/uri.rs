//! Stateless classification of navigation targets.

use std::fmt;

use url::Url;

use crate::config::ClassifierConfig;

pub const INTENT_SCHEME: &str = "intent";
pub const WTAI_MAKE_CALL_PREFIX: &str = "wtai://wp/mc;";

const INTERNAL_SCHEMES: &[&str] = &["about", "chrome", "chrome-native", "content", "devtools"];

/// Coarse class of a target URI, independent of installed handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UriClass {
    Internal,
    Intent,
    Web,
    PairingCode,
    Store,
    SelfScheme,
    File,
    Javascript,
    External,
}

impl fmt::Display for UriClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UriClass::Internal => "internal",
            UriClass::Intent => "intent",
            UriClass::Web => "web",
            UriClass::PairingCode => "pairing_code",
            UriClass::Store => "store",
            UriClass::SelfScheme => "self_scheme",
            UriClass::File => "file",
            UriClass::Javascript => "javascript",
            UriClass::External => "external",
        };
        f.write_str(name)
    }
}

pub fn classify_uri(raw: &str, config: &ClassifierConfig) -> UriClass {
    let Some(scheme) = scheme_of(raw) else {
        return UriClass::External;
    };
    if is_internal_scheme_name(scheme) {
        UriClass::Internal
    } else if scheme.eq_ignore_ascii_case(INTENT_SCHEME) {
        UriClass::Intent
    } else if is_web_scheme_name(scheme) {
        if is_pairing_code(raw, &config.pairing_code_hosts, &config.pairing_code_param) {
            UriClass::PairingCode
        } else {
            UriClass::Web
        }
    } else if scheme.eq_ignore_ascii_case(&config.store_scheme) {
        UriClass::Store
    } else if scheme.eq_ignore_ascii_case(&config.self_scheme) {
        UriClass::SelfScheme
    } else if scheme.eq_ignore_ascii_case("file") {
        UriClass::File
    } else if scheme.eq_ignore_ascii_case("javascript") {
        UriClass::Javascript
    } else {
        UriClass::External
    }
}

/// The text before the first `:` when it is a syntactically valid scheme.
pub fn scheme_of(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.trim_start().split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(scheme)
}

pub fn is_internal_scheme_name(scheme: &str) -> bool {
    INTERNAL_SCHEMES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(scheme))
}

pub fn is_web_scheme_name(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

pub fn is_internal_scheme(raw: &str) -> bool {
    scheme_of(raw).is_some_and(is_internal_scheme_name)
}

pub fn is_intent_uri(raw: &str) -> bool {
    scheme_of(raw).is_some_and(|scheme| scheme.eq_ignore_ascii_case(INTENT_SCHEME))
}

pub fn is_web_scheme(raw: &str) -> bool {
    scheme_of(raw).is_some_and(is_web_scheme_name)
}

pub fn is_wtai(raw: &str) -> bool {
    scheme_of(raw).is_some_and(|scheme| scheme.eq_ignore_ascii_case("wtai"))
}

/// Phone number of a legacy `wtai://wp/mc;<number>` make-call link.
pub fn wtai_make_call_number(raw: &str) -> Option<&str> {
    let trimmed = raw.trim_start();
    let head = trimmed.get(..WTAI_MAKE_CALL_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(WTAI_MAKE_CALL_PREFIX) {
        return None;
    }
    let number = &trimmed[WTAI_MAKE_CALL_PREFIX.len()..];
    (!number.is_empty()).then_some(number)
}

/// Pairing-code links carry the code in the query of a known host or subdomain.
pub fn is_pairing_code(raw: &str, hosts: &[String], param: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if !is_web_scheme_name(url.scheme()) {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host_matches = hosts.iter().any(|known| {
        host.eq_ignore_ascii_case(known)
            || host
                .strip_suffix(known.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    });
    host_matches && url.query_pairs().any(|(key, _)| key == param)
}

pub fn is_pdf_download(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) if is_web_scheme_name(url.scheme()) => {
            url.path().to_ascii_lowercase().ends_with(".pdf")
        }
        _ => false,
    }
}

/// Parses a fallback URL; only http(s) targets may be navigated to.
pub fn parse_fallback_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    is_web_scheme_name(url.scheme()).then_some(url)
}

pub fn same_scheme_and_host(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme() && a.host_str().is_some() && a.host_str() == b.host_str()
        }
        _ => false,
    }
}

/// `<self_scheme>://navigate?url=<target>` asks the browser to open `target` itself.
pub fn self_scheme_navigate_target(raw: &str, self_scheme: &str) -> Option<Url> {
    let prefix = format!("{self_scheme}://navigate?url=");
    let head = raw.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(&prefix) {
        return None;
    }
    let encoded = &raw[prefix.len()..];
    let decoded = urlencoding::decode(encoded).ok()?;
    parse_fallback_url(&decoded)
}

/// A package listing on the web storefront.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreListing {
    pub package: String,
    pub referrer: Option<String>,
}

pub fn store_listing(url: &Url, store_web_host: &str) -> Option<StoreListing> {
    if url.host_str() != Some(store_web_host) || url.path() != "/store/apps/details" {
        return None;
    }
    let mut package = None;
    let mut referrer = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "id" => package = Some(value.into_owned()),
            "referrer" => referrer = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(StoreListing {
        package: package.filter(|id| !id.is_empty())?,
        referrer: referrer.filter(|value| !value.is_empty()),
    })
}

pub fn is_store_search(url: &Url, store_web_host: &str) -> bool {
    url.host_str() == Some(store_web_host) && url.path().starts_with("/store/search")
}
