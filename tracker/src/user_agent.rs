//! User-agent resolution.
//!
//! The collection endpoint derives browser and device information from the
//! `ua` field. How that string is obtained depends on the host (an embedded
//! browser engine, a platform API, a fixed string), so it is abstracted behind
//! [`UserAgentProvider`]. [`CachedUserAgent`] resolves it once per process.

use std::env::consts;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while resolving the user agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserAgentError {
    /// The underlying lookup failed.
    #[error("user agent lookup failed: {0}")]
    Lookup(String),

    /// The lookup succeeded but produced an empty string.
    #[error("user agent lookup returned an empty value")]
    Empty,
}

/// Source of the user-agent string.
#[async_trait]
pub trait UserAgentProvider: Send + Sync {
    /// Looks up the user-agent string.
    ///
    /// # Errors
    ///
    /// Returns `UserAgentError` if the lookup fails.
    async fn resolve(&self) -> Result<String, UserAgentError>;
}

/// Describes this library and the host platform, e.g.
/// `SimpleAnalytics/0.1.0 (linux; x86_64)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultUserAgent;

#[async_trait]
impl UserAgentProvider for DefaultUserAgent {
    async fn resolve(&self) -> Result<String, UserAgentError> {
        Ok(format!(
            "SimpleAnalytics/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            consts::OS,
            consts::ARCH
        ))
    }
}

/// A fixed user-agent string.
#[derive(Debug, Clone)]
pub struct StaticUserAgent(String);

impl StaticUserAgent {
    /// Wraps a fixed user-agent string.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self(user_agent.into())
    }
}

#[async_trait]
impl UserAgentProvider for StaticUserAgent {
    async fn resolve(&self) -> Result<String, UserAgentError> {
        Ok(self.0.clone())
    }
}

/// Resolves the user agent on first use and caches it for the process lifetime.
///
/// Failed lookups are not cached; the next call tries again. Callers racing
/// before the first lookup completes may each resolve; the last result wins.
pub struct CachedUserAgent {
    provider: Arc<dyn UserAgentProvider>,
    cached: RwLock<Option<String>>,
}

impl CachedUserAgent {
    /// Wraps a provider with an empty cache.
    #[must_use]
    pub fn new(provider: Arc<dyn UserAgentProvider>) -> Self {
        Self {
            provider,
            cached: RwLock::new(None),
        }
    }

    /// Returns the cached user agent without resolving.
    #[must_use]
    pub fn cached(&self) -> Option<String> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the user agent, resolving it if it is not cached yet.
    ///
    /// # Errors
    ///
    /// Returns `UserAgentError` if the lookup fails or yields an empty string.
    pub async fn get(&self) -> Result<String, UserAgentError> {
        if let Some(user_agent) = self.cached() {
            return Ok(user_agent);
        }

        let user_agent = self.provider.resolve().await?;
        if user_agent.trim().is_empty() {
            return Err(UserAgentError::Empty);
        }

        debug!(user_agent = %user_agent, "Resolved user agent");
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(user_agent.clone());

        Ok(user_agent)
    }
}
