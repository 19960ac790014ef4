//! Event types sent to the collection endpoint.
//!
//! This module defines the wire record and the builder that assembles it. All
//! fields serialize to snake_case JSON and absent optional fields are omitted
//! from the body entirely.

use serde::{Deserialize, Serialize};

/// Event name used for pageviews.
pub const PAGEVIEW_EVENT_NAME: &str = "pageview";

/// Type classification for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Pageview,
    Event,
}

/// A pageview or named event as posted to the collection endpoint.
///
/// `metadata` is a JSON document carried as a string; the endpoint stores it in
/// a text column and does not accept a nested object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Classification of the event.
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Site or app identifier the event belongs to.
    pub hostname: String,

    /// Event name; `pageview` for pageviews.
    pub event: String,

    /// User-agent string of the sending device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ua: Option<String>,

    /// Slug path, always starting with `/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Locale identifier, e.g. `en_US`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// IANA timezone identifier, e.g. `Europe/Amsterdam`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,

    /// True for the first event of the device-local day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,

    /// JSON-encoded metadata object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Assembles an [`Event`] from its parts.
///
/// No validation happens here; the slug path and metadata string are expected
/// to come from [`crate::slug`] and [`crate::metadata`].
///
/// # Examples
///
/// ```
/// use simpleanalytics::types::{EventBuilder, EventKind};
///
/// let event = EventBuilder::new(EventKind::Pageview, "example.com")
///     .path("/home")
///     .unique(true)
///     .build();
///
/// assert_eq!(event.event, "pageview");
/// assert_eq!(event.path.as_deref(), Some("/home"));
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct EventBuilder {
    kind: EventKind,
    hostname: String,
    name: Option<String>,
    user_agent: Option<String>,
    path: Option<String>,
    language: Option<String>,
    timezone: Option<String>,
    unique: Option<bool>,
    metadata: Option<String>,
}

impl EventBuilder {
    /// Starts an event of `kind` for `hostname`.
    pub fn new(kind: EventKind, hostname: impl Into<String>) -> Self {
        Self {
            kind,
            hostname: hostname.into(),
            name: None,
            user_agent: None,
            path: None,
            language: None,
            timezone: None,
            unique: None,
            metadata: None,
        }
    }

    /// Sets the event name. Without one the name is `pageview`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn metadata(mut self, metadata: Option<String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            kind: self.kind,
            hostname: self.hostname,
            event: self
                .name
                .unwrap_or_else(|| PAGEVIEW_EVENT_NAME.to_string()),
            ua: self.user_agent,
            path: self.path,
            language: self.language,
            timezone: self.timezone,
            viewport_width: None,
            viewport_height: None,
            screen_width: None,
            screen_height: None,
            unique: self.unique,
            metadata: self.metadata,
        }
    }
}
