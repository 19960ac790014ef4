//! Simple Analytics tracker - privacy-friendly pageview and event reporting.
//!
//! This crate records pageviews and named events for an app or site and sends
//! them to the Simple Analytics collection endpoint.
//!
//! # Overview
//!
//! A [`Tracker`] is created for one hostname. Each tracking call slugs the
//! given path segments, serializes optional metadata, flags the first visit of
//! the device-local day as unique, and posts the event. No cookies or user
//! identifiers are involved; the only persisted state is the last-visit date
//! and an opt-out flag.
//!
//! # Modules
//!
//! - [`slug`]: Path segment to URL slug formatting
//! - [`metadata`]: Event metadata and its JSON serialization
//! - [`visit`]: First-visit-of-the-day detection
//! - [`types`]: Wire event type and builder
//! - [`sender`]: HTTP transport for delivering events
//! - [`tracker`]: The tracking facade
//! - [`storage`]: Key-value persistence for settings and visit state
//! - [`user_agent`]: User-agent resolution and caching
//! - [`context`]: Device language and timezone
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for tracker operations

pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod sender;
pub mod slug;
pub mod storage;
pub mod tracker;
pub mod types;
pub mod user_agent;
pub mod visit;

pub use config::{ConfigError, TrackerConfig};
pub use context::DeviceContext;
pub use error::{Result, TrackerError};
pub use metadata::Metadata;
pub use sender::{HttpTransport, Transport, TransportConfig, TransportError};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageScope};
pub use tracker::{Tracker, TrackerBuilder};
pub use types::{Event, EventBuilder, EventKind};
pub use user_agent::{DefaultUserAgent, StaticUserAgent, UserAgentError, UserAgentProvider};
pub use visit::VisitRecorder;
