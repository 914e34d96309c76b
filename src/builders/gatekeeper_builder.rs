//! Builder for [`Gatekeeper`] instances.

use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::{GatekeeperConfig, GatekeeperSettings};
use crate::core::{CallExecutor, CallOutcome, Gatekeeper, RequestContext};
use crate::runtime::TokioSpawner;

/// Step-by-step construction of a [`Gatekeeper`].
///
/// Unset values fall back to [`GatekeeperConfig::default`]; out-of-range
/// values are normalized at [`GatekeeperBuilder::build`] time.
///
/// ```rust
/// use std::time::Duration;
/// use prometheus_gatekeeper::builders::GatekeeperBuilder;
/// use prometheus_gatekeeper::core::{BoxError, StatusResponse};
///
/// # #[tokio::main]
/// # async fn main() {
/// let gate = GatekeeperBuilder::new()
///     .pacing_interval(Duration::from_millis(5))
///     .max_retries(3)
///     .concurrency(2)
///     .build_with(|_: &u32| -> Result<StatusResponse, BoxError> { Ok(StatusResponse::new(200)) });
/// assert_eq!(gate.settings().concurrency, 2);
/// # }
/// ```
pub struct GatekeeperBuilder<E> {
    config: GatekeeperConfig,
    pacing_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    root: Option<RequestContext>,
    executor: Option<E>,
    handle: Option<Handle>,
}

impl<E> GatekeeperBuilder<E> {
    /// Builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(GatekeeperConfig::default())
    }

    /// Builder seeded from a configuration value.
    #[must_use]
    pub const fn from_config(config: GatekeeperConfig) -> Self {
        Self {
            config,
            pacing_interval: None,
            request_timeout: None,
            root: None,
            executor: None,
            handle: None,
        }
    }

    /// Minimum interval between dispatches.
    #[must_use]
    pub const fn pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = Some(interval);
        self
    }

    /// Retry budget per request.
    #[must_use]
    pub const fn max_retries(mut self, retries: i64) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Maximum concurrently executing calls.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: i64) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Root context; cancelling it shuts the gatekeeper down.
    #[must_use]
    pub fn root(mut self, root: RequestContext) -> Self {
        self.root = Some(root);
        self
    }

    /// The wrapped executor.
    #[must_use]
    pub fn executor(mut self, executor: E) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Runtime to spawn on instead of the current one.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// The configuration as it stands.
    #[must_use]
    pub const fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Normalized settings the built gatekeeper will use.
    #[must_use]
    pub fn settings(&self) -> GatekeeperSettings {
        let base = self.config.normalize();
        GatekeeperSettings::normalize(
            self.pacing_interval.unwrap_or(base.pacing_interval),
            self.config.max_retries,
            self.config.concurrency,
            self.request_timeout.unwrap_or(base.request_timeout),
        )
    }

    /// Build with an explicit executor, ignoring any set earlier.
    ///
    /// # Panics
    ///
    /// Panics if no runtime handle was given and this is called outside a
    /// tokio runtime.
    pub fn build_with<P, R>(self, executor: E) -> Gatekeeper<P, R, E>
    where
        P: Send + 'static,
        R: CallOutcome,
        E: CallExecutor<P, R>,
    {
        let settings = self.settings();
        let spawner = self
            .handle
            .map_or_else(TokioSpawner::current, TokioSpawner::new);
        Gatekeeper::with_settings(self.root, executor, settings, spawner)
    }

    /// Build, falling back to `E::default()` when no executor was set.
    ///
    /// # Panics
    ///
    /// Panics if no runtime handle was given and this is called outside a
    /// tokio runtime.
    pub fn build<P, R>(mut self) -> Gatekeeper<P, R, E>
    where
        P: Send + 'static,
        R: CallOutcome,
        E: CallExecutor<P, R> + Default,
    {
        let executor = self.executor.take().unwrap_or_default();
        self.build_with(executor)
    }
}

impl<E> Default for GatekeeperBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R, E> Gatekeeper<P, R, E>
where
    P: Send + 'static,
    R: CallOutcome,
    E: CallExecutor<P, R>,
{
    /// Create a gatekeeper on the current runtime from configuration.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn from_config(root: Option<RequestContext>, executor: E, config: &GatekeeperConfig) -> Self {
        Self::with_settings(root, executor, config.normalize(), TokioSpawner::current())
    }
}
