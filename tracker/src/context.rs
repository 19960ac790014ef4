//! Locale and timezone of the device sending events.
//!
//! Both values are optional on the wire. They are detected from the POSIX
//! locale variables and `TZ`, falling back to the `/etc/localtime` symlink for
//! the timezone, and can be overridden by embedders that know better.

use std::env;
use std::fs;
use std::path::Path;

/// Locale variables in precedence order.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Path component preceding an IANA identifier in zoneinfo paths.
const ZONEINFO_MARKER: &str = "zoneinfo/";

/// System timezone symlink.
const LOCALTIME_PATH: &str = "/etc/localtime";

/// Language and timezone attached to each event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceContext {
    /// Locale identifier such as `en_US`.
    pub language: Option<String>,
    /// IANA timezone identifier such as `Europe/Amsterdam`.
    pub timezone: Option<String>,
}

impl DeviceContext {
    /// Detects the context from the process environment.
    #[must_use]
    pub fn detect() -> Self {
        let mut context = Self::from_vars(|key| env::var(key).ok());
        if context.timezone.is_none() {
            context.timezone = fs::read_link(LOCALTIME_PATH)
                .ok()
                .and_then(|target| zone_from_path(&target));
        }
        context
    }

    /// Builds the context from a variable lookup, without touching the filesystem.
    ///
    /// ```
    /// use simpleanalytics::context::DeviceContext;
    ///
    /// let context = DeviceContext::from_vars(|key| match key {
    ///     "LANG" => Some("nl_NL.UTF-8".to_string()),
    ///     "TZ" => Some("Europe/Amsterdam".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(context.language.as_deref(), Some("nl_NL"));
    /// assert_eq!(context.timezone.as_deref(), Some("Europe/Amsterdam"));
    /// ```
    #[must_use]
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let language = LOCALE_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.is_empty())
            .and_then(|value| parse_locale(&value));

        let timezone = lookup("TZ").and_then(|value| parse_timezone(&value));

        Self { language, timezone }
    }

    /// Overrides the language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Overrides the timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Strips encoding and modifier from a POSIX locale (`en_US.UTF-8@euro` → `en_US`).
fn parse_locale(value: &str) -> Option<String> {
    let locale = value.split(['.', '@']).next().unwrap_or_default().trim();
    match locale {
        "" | "C" | "POSIX" => None,
        locale => Some(locale.to_string()),
    }
}

/// Accepts `Europe/Amsterdam`, `:Europe/Amsterdam` or a zoneinfo file path.
fn parse_timezone(value: &str) -> Option<String> {
    let value = value.trim().trim_start_matches(':');
    if value.is_empty() {
        return None;
    }
    if value.starts_with('/') {
        return zone_from_path(Path::new(value));
    }
    Some(value.to_string())
}

fn zone_from_path(path: &Path) -> Option<String> {
    let path = path.to_str()?;
    let (_, zone) = path.split_once(ZONEINFO_MARKER)?;
    (!zone.is_empty()).then(|| zone.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn context_from(vars: &[(&str, &str)]) -> DeviceContext {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeviceContext::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_empty_context() {
        assert_eq!(context_from(&[]), DeviceContext::default());
    }

    #[test]
    fn lang_is_stripped_of_encoding() {
        let context = context_from(&[("LANG", "en_US.UTF-8")]);
        assert_eq!(context.language.as_deref(), Some("en_US"));
    }

    #[test]
    fn lc_all_takes_precedence_over_lang() {
        let context = context_from(&[("LANG", "en_US.UTF-8"), ("LC_ALL", "de_DE@euro")]);
        assert_eq!(context.language.as_deref(), Some("de_DE"));
    }

    #[test]
    fn empty_variables_are_skipped() {
        let context = context_from(&[("LC_ALL", ""), ("LANG", "fr_FR.UTF-8")]);
        assert_eq!(context.language.as_deref(), Some("fr_FR"));
    }

    #[test]
    fn c_locale_is_treated_as_unknown() {
        assert_eq!(context_from(&[("LANG", "C.UTF-8")]).language, None);
        assert_eq!(context_from(&[("LANG", "POSIX")]).language, None);
    }

    #[test]
    fn timezone_accepts_plain_and_colon_forms() {
        assert_eq!(
            context_from(&[("TZ", "Europe/Amsterdam")]).timezone.as_deref(),
            Some("Europe/Amsterdam")
        );
        assert_eq!(
            context_from(&[("TZ", ":America/New_York")]).timezone.as_deref(),
            Some("America/New_York")
        );
    }

    #[test]
    fn timezone_is_extracted_from_zoneinfo_path() {
        let context = context_from(&[("TZ", "/usr/share/zoneinfo/Asia/Tokyo")]);
        assert_eq!(context.timezone.as_deref(), Some("Asia/Tokyo"));
    }

    #[test]
    fn timezone_path_without_zoneinfo_is_ignored() {
        assert_eq!(context_from(&[("TZ", "/etc/custom")]).timezone, None);
    }

    #[test]
    fn overrides_replace_detected_values() {
        let context = context_from(&[("LANG", "en_US.UTF-8")])
            .with_language("nl_NL")
            .with_timezone("Europe/Amsterdam");

        assert_eq!(context.language.as_deref(), Some("nl_NL"));
        assert_eq!(context.timezone.as_deref(), Some("Europe/Amsterdam"));
    }
}
