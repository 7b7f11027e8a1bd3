//! Parsing, sanitizing and re-serializing `intent:` activation URIs.
//!
//! Grammar: `intent:<data>#Intent;key=value;...;end`. Keys before a bare `SEL`
//! segment describe the activation, keys after it describe the selector.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::Serialize;

use crate::errors::IntentParseError;
use crate::uri;

pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const CATEGORY_BROWSABLE: &str = "android.intent.category.BROWSABLE";
pub const EXTRA_BROWSER_FALLBACK_URL: &str = "browser_fallback_url";
pub const EXTRA_MARKET_REFERRER: &str = "market_referrer";
pub const EXTRA_REFERRER: &str = "android.intent.extra.REFERRER";
pub const EXTRA_APPLICATION_ID: &str = "com.android.browser.application_id";
pub const EXTRA_CREATE_NEW_TAB: &str = "com.android.browser.create_new_tab";
pub const EXTRA_CUSTOM_TAB_SESSION: &str = "android.support.customtabs.extra.SESSION";
pub const EXTRA_USER_GESTURE: &str = "org.navgate.extra.HAS_USER_GESTURE";

const FRAGMENT_MARKER: &str = "#Intent;";

bitflags! {
    /// Launch flags carried by `launchFlags=`. Unknown bits are retained until sanitized.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct ActivationFlags: u32 {
        const GRANT_READ_URI_PERMISSION = 0x0000_0001;
        const GRANT_WRITE_URI_PERMISSION = 0x0000_0002;
        const EXCLUDE_STOPPED_PACKAGES = 0x0000_0010;
        const GRANT_PERSISTABLE_URI_PERMISSION = 0x0000_0040;
        const GRANT_PREFIX_URI_PERMISSION = 0x0000_0080;
        const ACTIVITY_LAUNCH_ADJACENT = 0x0000_1000;
        const ACTIVITY_RETAIN_IN_RECENTS = 0x0000_2000;
        const ACTIVITY_CLEAR_TASK = 0x0000_8000;
        const ACTIVITY_NEW_DOCUMENT = 0x0008_0000;
        const ACTIVITY_FORWARD_RESULT = 0x0200_0000;
        const ACTIVITY_CLEAR_TOP = 0x0400_0000;
        const ACTIVITY_MULTIPLE_TASK = 0x0800_0000;
        const ACTIVITY_NEW_TASK = 0x1000_0000;
        const ACTIVITY_SINGLE_TOP = 0x2000_0000;
        const ACTIVITY_NO_HISTORY = 0x4000_0000;
    }
}

impl ActivationFlags {
    /// The only flags a page may request on an outbound activation.
    pub const ALLOWED_ON_LAUNCH: Self = Self::EXCLUDE_STOPPED_PACKAGES
        .union(Self::ACTIVITY_LAUNCH_ADJACENT)
        .union(Self::ACTIVITY_RETAIN_IN_RECENTS)
        .union(Self::ACTIVITY_NEW_DOCUMENT)
        .union(Self::ACTIVITY_CLEAR_TOP)
        .union(Self::ACTIVITY_MULTIPLE_TASK)
        .union(Self::ACTIVITY_NEW_TASK)
        .union(Self::ACTIVITY_SINGLE_TOP);
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    /// `pkg/cls`, where a leading `.` makes `cls` relative to `pkg`.
    pub fn unflatten(raw: &str) -> Option<Self> {
        let (package, class) = raw.split_once('/')?;
        if package.is_empty() || class.is_empty() {
            return None;
        }
        let class = if class.starts_with('.') {
            format!("{package}{class}")
        } else {
            class.to_string()
        };
        Some(Self {
            package: package.to_string(),
            class,
        })
    }

    pub fn flatten(&self) -> String {
        format!("{}/{}", self.package, self.class)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtraValue {
    String(String),
    Bool(bool),
    Byte(i8),
    Char(char),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
}

impl ExtraValue {
    fn prefix(&self) -> &'static str {
        match self {
            ExtraValue::String(_) => "S",
            ExtraValue::Bool(_) => "B",
            ExtraValue::Byte(_) => "b",
            ExtraValue::Char(_) => "c",
            ExtraValue::Double(_) => "d",
            ExtraValue::Float(_) => "f",
            ExtraValue::Int(_) => "i",
            ExtraValue::Long(_) => "l",
            ExtraValue::Short(_) => "s",
        }
    }
}

impl fmt::Display for ExtraValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtraValue::String(value) => f.write_str(value),
            ExtraValue::Bool(value) => write!(f, "{value}"),
            ExtraValue::Byte(value) => write!(f, "{value}"),
            ExtraValue::Char(value) => write!(f, "{value}"),
            ExtraValue::Double(value) => write!(f, "{value}"),
            ExtraValue::Float(value) => write!(f, "{value}"),
            ExtraValue::Int(value) => write!(f, "{value}"),
            ExtraValue::Long(value) => write!(f, "{value}"),
            ExtraValue::Short(value) => write!(f, "{value}"),
        }
    }
}

/// Structured form of an activation request.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActivationDescriptor {
    pub action: Option<String>,
    /// Target URI after the `scheme=` key has been folded in.
    pub data: Option<String>,
    /// Target scheme, case preserved.
    pub scheme: Option<String>,
    pub mime_type: Option<String>,
    pub package: Option<String>,
    pub component: Option<ComponentName>,
    pub categories: BTreeSet<String>,
    pub flags: ActivationFlags,
    pub extras: BTreeMap<String, ExtraValue>,
    pub source_bounds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<Box<ActivationDescriptor>>,
}

impl ActivationDescriptor {
    /// A plain view activation for `uri`.
    pub fn view(uri: &str) -> Self {
        Self {
            action: Some(ACTION_VIEW.to_string()),
            data: Some(uri.to_string()),
            scheme: uri::scheme_of(uri).map(str::to_string),
            ..Default::default()
        }
    }

    pub fn string_extra(&self, key: &str) -> Option<&str> {
        match self.extras.get(key) {
            Some(ExtraValue::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn has_extra(&self, key: &str) -> bool {
        self.extras.contains_key(key)
    }

    pub fn put_string_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extras
            .insert(key.into(), ExtraValue::String(value.into()));
    }

    pub fn put_bool_extra(&mut self, key: impl Into<String>, value: bool) {
        self.extras.insert(key.into(), ExtraValue::Bool(value));
    }

    pub fn fallback_url(&self) -> Option<&str> {
        self.string_extra(EXTRA_BROWSER_FALLBACK_URL)
    }

    /// Explicit package, or the package of an explicit component.
    pub fn target_package(&self) -> Option<&str> {
        self.package
            .as_deref()
            .or_else(|| self.component.as_ref().map(|c| c.package.as_str()))
    }

    pub fn targets_package(&self, package: &str) -> bool {
        self.target_package() == Some(package)
    }

    /// Reduces the descriptor to what may leave the browser.
    pub fn sanitize_for_launch(&mut self) {
        self.flags &= ActivationFlags::ALLOWED_ON_LAUNCH;
        self.selector = None;
        self.component = None;
        self.extras.remove(EXTRA_BROWSER_FALLBACK_URL);
        self.categories.insert(CATEGORY_BROWSABLE.to_string());
    }

    /// Renders the descriptor back into `intent:` form. The selector is never written.
    pub fn to_intent_uri(&self) -> String {
        let mut out = String::from("intent:");
        if let Some(data) = &self.data {
            let rest = self
                .scheme
                .as_deref()
                .and_then(|scheme| data.strip_prefix(scheme))
                .and_then(|rest| rest.strip_prefix(':'))
                .unwrap_or(data);
            out.push_str(rest);
        }
        out.push_str(FRAGMENT_MARKER);
        if let Some(scheme) = &self.scheme {
            push_segment(&mut out, "scheme", scheme);
        }
        if let Some(action) = self.action.as_deref().filter(|a| *a != ACTION_VIEW) {
            push_segment(&mut out, "action", action);
        }
        for category in &self.categories {
            push_segment(&mut out, "category", category);
        }
        if let Some(mime_type) = &self.mime_type {
            push_segment(&mut out, "type", mime_type);
        }
        if !self.flags.is_empty() {
            out.push_str(&format!("launchFlags=0x{:x};", self.flags.bits()));
        }
        if let Some(package) = &self.package {
            push_segment(&mut out, "package", package);
        }
        if let Some(component) = &self.component {
            push_segment(&mut out, "component", &component.flatten());
        }
        if let Some(bounds) = &self.source_bounds {
            push_segment(&mut out, "sourceBounds", bounds);
        }
        for (key, value) in &self.extras {
            out.push_str(value.prefix());
            out.push('.');
            out.push_str(&urlencoding::encode(key));
            out.push('=');
            out.push_str(&urlencoding::encode(&value.to_string()));
            out.push(';');
        }
        out.push_str("end");
        out
    }
}

fn push_segment(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    out.push_str(&urlencoding::encode(value));
    out.push(';');
}

/// Parses an `intent:` URI. Input without a `#Intent;` fragment becomes a view of itself.
pub fn parse_intent_uri(raw: &str) -> Result<ActivationDescriptor, IntentParseError> {
    let raw = raw.trim();
    let Some(marker) = raw.find(FRAGMENT_MARKER) else {
        return Ok(ActivationDescriptor::view(raw));
    };
    let head = &raw[..marker];
    let body = &raw[marker + FRAGMENT_MARKER.len()..];

    let mut descriptor = ActivationDescriptor {
        action: Some(ACTION_VIEW.to_string()),
        ..Default::default()
    };
    let mut selector: Option<ActivationDescriptor> = None;
    let mut explicit_scheme: Option<String> = None;
    let mut terminated = false;

    for segment in body.split(';') {
        if segment.starts_with("end") {
            terminated = true;
            break;
        }
        if segment == "SEL" {
            selector = Some(ActivationDescriptor::default());
            continue;
        }
        let (key, raw_value) = segment
            .split_once('=')
            .ok_or_else(|| IntentParseError::IndexOutOfBounds(segment.to_string()))?;
        let value = decode(raw_value)?;
        let in_selector = selector.is_some();
        let target = match selector.as_mut() {
            Some(sel) => sel,
            None => &mut descriptor,
        };
        match key {
            "action" => target.action = Some(value),
            "category" => {
                target.categories.insert(value);
            }
            "type" => target.mime_type = Some(value),
            "launchFlags" => target.flags = ActivationFlags::from_bits_retain(parse_flags(&value)?),
            "package" => target.package = Some(value),
            "component" => target.component = ComponentName::unflatten(&value),
            "sourceBounds" => target.source_bounds = Some(value),
            "scheme" if in_selector => {
                target.scheme = Some(value.clone());
                target.data = Some(format!("{value}:"));
            }
            "scheme" => explicit_scheme = Some(value),
            _ => parse_extra(target, key, value)?,
        }
    }
    if !terminated {
        return Err(IntentParseError::MissingTerminator);
    }

    let explicit_scheme = explicit_scheme.filter(|scheme| !scheme.is_empty());
    match strip_intent_prefix(head) {
        Some(rest) => {
            if !rest.is_empty() {
                descriptor.data = Some(match &explicit_scheme {
                    Some(scheme) => format!("{scheme}:{rest}"),
                    None => rest.to_string(),
                });
            }
            descriptor.scheme = explicit_scheme
                .or_else(|| uri::scheme_of(rest).map(str::to_string));
        }
        None => {
            if !head.is_empty() {
                descriptor.data = Some(head.to_string());
            }
            descriptor.scheme = explicit_scheme.or_else(|| uri::scheme_of(head).map(str::to_string));
        }
    }
    descriptor.selector = selector.map(Box::new);
    Ok(descriptor)
}

/// `market://details?id=<package>&referrer=<referrer>` for a package missing on device.
pub fn store_details_activation(
    store_scheme: &str,
    package: &str,
    referrer: &str,
) -> ActivationDescriptor {
    let uri = format!(
        "{store_scheme}://details?id={}&referrer={}",
        urlencoding::encode(package),
        urlencoding::encode(referrer)
    );
    ActivationDescriptor::view(&uri)
}

fn strip_intent_prefix(head: &str) -> Option<&str> {
    let prefix = head.get(..uri::INTENT_SCHEME.len() + 1)?;
    if prefix.eq_ignore_ascii_case("intent:") {
        Some(&head[prefix.len()..])
    } else {
        None
    }
}

fn decode(raw: &str) -> Result<String, IntentParseError> {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .map_err(|err| IntentParseError::Decode(err.to_string()))
}

fn parse_flags(raw: &str) -> Result<u32, IntentParseError> {
    let parsed = match raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .or_else(|| raw.strip_prefix('#'))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<i32>().map(|value| value as u32),
    };
    parsed.map_err(|_| IntentParseError::NumberFormat(raw.to_string()))
}

fn parse_extra(
    target: &mut ActivationDescriptor,
    key: &str,
    value: String,
) -> Result<(), IntentParseError> {
    let Some((prefix, name)) = key.split_once('.') else {
        return Err(IntentParseError::UriSyntax(format!("unknown key: {key}")));
    };
    let extra = match prefix {
        "S" => ExtraValue::String(value),
        "B" => ExtraValue::Bool(value.eq_ignore_ascii_case("true")),
        "b" => ExtraValue::Byte(number(key, &value)?),
        "c" => ExtraValue::Char(
            value
                .chars()
                .next()
                .ok_or_else(|| IntentParseError::IndexOutOfBounds(key.to_string()))?,
        ),
        "d" => ExtraValue::Double(number(key, &value)?),
        "f" => ExtraValue::Float(number(key, &value)?),
        "i" => ExtraValue::Int(number(key, &value)?),
        "l" => ExtraValue::Long(number(key, &value)?),
        "s" => ExtraValue::Short(number(key, &value)?),
        _ => return Err(IntentParseError::UriSyntax(format!("unknown key: {key}"))),
    };
    target.extras.insert(decode(name)?, extra);
    Ok(())
}

fn number<T: FromStr>(key: &str, value: &str) -> Result<T, IntentParseError> {
    value
        .parse()
        .map_err(|_| IntentParseError::NumberFormat(format!("{key}={value}")))
}
