//! The tracker facade.
//!
//! [`Tracker`] turns a pageview or event call into a delivered [`Event`]:
//!
//! 1. Return early if the user opted out
//! 2. Slug the path and serialize the metadata
//! 3. Resolve the user agent (cached after the first success)
//! 4. Ask the [`VisitRecorder`] whether this is the first visit today
//! 5. Build the event and hand it to the [`Transport`]
//!
//! [`Tracker::track`] runs this on a detached task and only logs failures.
//! [`Tracker::track_raw`] runs it inline and returns the error. Storage access
//! in steps 1 and 4 runs on tokio's blocking pool.
//!
//! # Example
//!
//! ```no_run
//! use simpleanalytics::{Metadata, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> simpleanalytics::Result<()> {
//!     let tracker = Tracker::new("example.com", None)?;
//!
//!     tracker.track_pageview(["Settings", "Privacy"], None);
//!     tracker
//!         .track_event_raw("signup", ["onboarding"], Some(&Metadata::from([("plan", "premium")])))
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::context::DeviceContext;
use crate::error::Result;
use crate::metadata::{self, Metadata};
use crate::sender::{HttpTransport, Transport, TransportConfig};
use crate::slug;
use crate::storage::{self, FileStorage, Storage, StorageScope};
use crate::types::{Event, EventBuilder, EventKind};
use crate::user_agent::{CachedUserAgent, DefaultUserAgent, UserAgentProvider};
use crate::visit::VisitRecorder;

/// Storage key of the opt-out flag, always in the default scope.
pub const OPT_OUT_KEY: &str = "simpleanalytics.isoptedout";

/// Records pageviews and events for one hostname.
///
/// Cloning is cheap and clones share all state, including the cached user
/// agent and the visit recorder.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<Inner>,
}

struct Inner {
    hostname: String,
    storage: Arc<dyn Storage>,
    transport: Arc<dyn Transport>,
    user_agent: CachedUserAgent,
    visits: VisitRecorder,
    context: DeviceContext,
}

impl Tracker {
    /// Creates a tracker with the default collaborators: file storage in the
    /// platform data directory, the HTTPS transport and the library user agent.
    ///
    /// `shared_scope` names a storage scope shared with cooperating processes
    /// for the last-visit date. The opt-out flag is never shared.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if no data directory is available, or
    /// `TrackerError::Client` if the HTTP client cannot be created.
    pub fn new(hostname: impl Into<String>, shared_scope: Option<&str>) -> Result<Self> {
        let mut builder = Self::builder(hostname);
        if let Some(scope) = shared_scope {
            builder = builder.shared_scope(scope);
        }
        builder.build()
    }

    /// Creates a tracker from a [`TrackerConfig`].
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::InvalidEndpoint` for a malformed endpoint, or any
    /// error [`Tracker::new`] can return.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        let mut builder = Self::builder(config.hostname.clone())
            .transport_config(config.transport_config());
        if let Some(scope) = &config.shared_scope {
            builder = builder.shared_scope(scope.clone());
        }
        if let Some(dir) = &config.storage_dir {
            builder = builder.storage_dir(dir.clone());
        }
        builder.build()
    }

    /// Starts building a tracker with custom collaborators.
    pub fn builder(hostname: impl Into<String>) -> TrackerBuilder {
        TrackerBuilder::new(hostname)
    }

    /// Returns the hostname events are recorded under.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.inner.hostname
    }

    /// Returns true if tracking is disabled.
    ///
    /// An unreadable flag is logged and reported as not opted out. This reads
    /// storage synchronously.
    #[must_use]
    pub fn is_opted_out(&self) -> bool {
        self.inner.is_opted_out()
    }

    /// Enables or disables tracking for this process and every tracker in it.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if the flag cannot be persisted.
    pub fn set_opted_out(&self, opted_out: bool) -> Result<()> {
        storage::write(
            self.inner.storage.as_ref(),
            &StorageScope::Default,
            OPT_OUT_KEY,
            &opted_out,
        )?;
        debug!(opted_out, "Updated opt-out flag");
        Ok(())
    }

    /// Returns the cached last-visit instant.
    #[must_use]
    pub fn last_visit(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.inner.visits.last_visit()
    }

    /// Tracks a pageview (`event` is `None`) or a named event without waiting.
    ///
    /// The pipeline runs on a spawned tokio task. Failures are logged and never
    /// returned; with no runtime available the event is dropped with a warning.
    pub fn track<I, S>(&self, event: Option<&str>, path: I, metadata: Option<Metadata>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime available, dropping event");
            return;
        };

        let tracker = self.clone();
        let event = event.map(str::to_string);
        let path: Vec<String> = path.into_iter().map(|s| s.as_ref().to_string()).collect();

        handle.spawn(async move {
            if let Err(e) = tracker
                .track_raw(event.as_deref(), path, metadata.as_ref())
                .await
            {
                warn!(error = %e, event = ?event, "Failed to track event");
            }
        });
    }

    /// Tracks a pageview without waiting. See [`track`](Self::track).
    pub fn track_pageview<I, S>(&self, path: I, metadata: Option<Metadata>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.track(None, path, metadata);
    }

    /// Tracks a named event without waiting. See [`track`](Self::track).
    pub fn track_event<I, S>(&self, name: &str, path: I, metadata: Option<Metadata>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.track(Some(name), path, metadata);
    }

    /// Tracks a pageview (`event` is `None`) or a named event and waits for delivery.
    ///
    /// Opted-out calls return `Ok(())` without side effects. Metadata that
    /// cannot be serialized is dropped, and storage failures are logged.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the user agent cannot be resolved or the
    /// transport reports a failure.
    pub async fn track_raw<I, S>(
        &self,
        event: Option<&str>,
        path: I,
        metadata: Option<&Metadata>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.blocking_flag(Inner::is_opted_out).await {
            debug!(event = ?event, "Opted out, not tracking");
            return Ok(());
        }

        let path = slug::format_path(path);
        let metadata = metadata::serialize(metadata);
        let user_agent = self.inner.user_agent.get().await?;
        let unique = self.blocking_flag(|inner| inner.visits.is_unique()).await;

        let event = self.build_event(event, path, user_agent, unique, metadata);
        self.inner.transport.send(&event).await?;

        Ok(())
    }

    /// Tracks a pageview and waits for delivery. See [`track_raw`](Self::track_raw).
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`track_raw`](Self::track_raw).
    pub async fn track_pageview_raw<I, S>(&self, path: I, metadata: Option<&Metadata>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.track_raw(None, path, metadata).await
    }

    /// Tracks a named event and waits for delivery. See [`track_raw`](Self::track_raw).
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`track_raw`](Self::track_raw).
    pub async fn track_event_raw<I, S>(
        &self,
        name: &str,
        path: I,
        metadata: Option<&Metadata>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.track_raw(Some(name), path, metadata).await
    }

    /// Runs a storage-bound check on the blocking pool. A panicked check is
    /// logged and yields `false`.
    async fn blocking_flag<F>(&self, check: F) -> bool
    where
        F: FnOnce(&Inner) -> bool + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || check(&inner))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Storage task failed");
                false
            })
    }

    fn build_event(
        &self,
        name: Option<&str>,
        path: String,
        user_agent: String,
        unique: bool,
        metadata: Option<String>,
    ) -> Event {
        let kind = match name {
            Some(_) => EventKind::Event,
            None => EventKind::Pageview,
        };

        let mut builder = EventBuilder::new(kind, self.inner.hostname.as_str())
            .user_agent(user_agent)
            .path(path)
            .language(self.inner.context.language.clone())
            .timezone(self.inner.context.timezone.clone())
            .unique(unique)
            .metadata(metadata);
        if let Some(name) = name {
            builder = builder.name(name);
        }
        builder.build()
    }
}

impl Inner {
    fn is_opted_out(&self) -> bool {
        let flag = storage::read::<bool>(
            self.storage.as_ref(),
            &StorageScope::Default,
            OPT_OUT_KEY,
        );
        match flag {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "Failed to read opt-out flag, tracking stays enabled");
                false
            }
        }
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("hostname", &self.inner.hostname)
            .field("context", &self.inner.context)
            .field("last_visit", &self.inner.visits.last_visit())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Tracker`] with injectable collaborators.
///
/// Anything not set falls back to the defaults used by [`Tracker::new`].
#[must_use]
pub struct TrackerBuilder {
    hostname: String,
    shared_scope: Option<String>,
    storage: Option<Arc<dyn Storage>>,
    storage_dir: Option<PathBuf>,
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
    user_agent: Option<Arc<dyn UserAgentProvider>>,
    context: Option<DeviceContext>,
}

impl TrackerBuilder {
    fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            shared_scope: None,
            storage: None,
            storage_dir: None,
            transport: None,
            transport_config: TransportConfig::default(),
            user_agent: None,
            context: None,
        }
    }

    /// Stores the last-visit date in a scope shared with other processes.
    pub fn shared_scope(mut self, name: impl Into<String>) -> Self {
        self.shared_scope = Some(name.into());
        self
    }

    /// Uses a custom store for persisted settings.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Uses a [`FileStorage`] rooted at `dir` instead of the platform default.
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Uses a custom transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configures the default HTTP transport. Ignored when a custom transport is set.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Uses a custom user-agent source.
    pub fn user_agent(mut self, provider: Arc<dyn UserAgentProvider>) -> Self {
        self.user_agent = Some(provider);
        self
    }

    /// Uses a fixed device context instead of detecting it.
    pub fn context(mut self, context: DeviceContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Builds the tracker, reading the persisted last-visit date once.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if a default collaborator cannot be created.
    pub fn build(self) -> Result<Tracker> {
        let storage: Arc<dyn Storage> = match (self.storage, self.storage_dir) {
            (Some(storage), _) => storage,
            (None, Some(dir)) => Arc::new(FileStorage::new(dir)),
            (None, None) => Arc::new(FileStorage::open_default()?),
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.transport_config)?),
        };

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| Arc::new(DefaultUserAgent));
        let context = self.context.unwrap_or_else(DeviceContext::detect);

        let scope = StorageScope::from_name(self.shared_scope.as_deref());
        let visits = VisitRecorder::load(Arc::clone(&storage), scope);

        debug!(hostname = %self.hostname, ?context, "Tracker created");

        Ok(Tracker {
            inner: Arc::new(Inner {
                hostname: self.hostname,
                storage,
                transport,
                user_agent: CachedUserAgent::new(user_agent),
                visits,
                context,
            }),
        })
    }
}
