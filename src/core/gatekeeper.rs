//! The gatekeeper: pacing, concurrency limits and hint-driven retries around
//! a blocking executor.
//!
//! # Flow
//!
//! ```text
//! caller ──► submit_async ──► inbound queue ──► dispatch loop ──► worker ──► reply
//!                                   ▲            (tick, token)      │
//!                                   └──────── resend (backoff) ◄────┘ retryable
//! ```
//!
//! One dispatch loop serializes admission: it waits for a pacing tick, then a
//! concurrency token, then pulls the next request and spawns a worker for it.
//! Workers run the executor on the blocking pool, classify the response and
//! either reply or hand the request to a resend task that sleeps out the
//! server's backoff hint before re-queueing it. Once the gatekeeper is shut
//! down every new call bypasses the queue and goes straight to the executor.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, trace};

use crate::config::GatekeeperSettings;
use crate::core::backoff::retry_backoff;
use crate::core::request::PendingRequest;
use crate::core::{
    AdmissionGate, BoxError, CallError, CallExecutor, CallOutcome, CallRequest, GateError, Reply,
    RequestContext,
};
use crate::runtime::TokioSpawner;

/// Client-side admission control around a [`CallExecutor`].
///
/// Cloning is cheap; all clones share one scheduler. The scheduler shuts
/// down when [`Gatekeeper::shutdown`] is called, when the root context given
/// at construction ends, or when the last clone is dropped.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use prometheus_gatekeeper::core::{BoxError, Gatekeeper, StatusResponse};
///
/// # #[tokio::main]
/// # async fn main() {
/// let gate = Gatekeeper::new(
///     None,
///     |_: &String| -> Result<StatusResponse, BoxError> { Ok(StatusResponse::new(200)) },
///     Duration::from_millis(10),
///     3,
///     4,
///     Duration::from_secs(5),
/// );
/// let response = gate.call_async("ping".to_string()).await;
/// assert_eq!(response.map(|r| r.status).ok(), Some(200));
/// # }
/// ```
pub struct Gatekeeper<P, R, E> {
    inner: Arc<Inner<P, R, E>>,
}

struct Inner<P, R, E> {
    settings: GatekeeperSettings,
    root: RequestContext,
    executor: Arc<E>,
    requests: UnboundedSender<PendingRequest<P, R>>,
    tokens: Arc<Semaphore>,
    spawner: TokioSpawner,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl<P, R, E> Drop for Inner<P, R, E> {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

impl<P, R, E> Clone for Gatekeeper<P, R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, R, E> Gatekeeper<P, R, E>
where
    P: Send + 'static,
    R: CallOutcome,
    E: CallExecutor<P, R>,
{
    /// Create a gatekeeper on the current tokio runtime.
    ///
    /// Never fails: invalid inputs are normalized (see
    /// [`GatekeeperSettings::normalize`]). Without a root context the
    /// gatekeeper runs until shut down or dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(
        root: Option<RequestContext>,
        executor: E,
        delay: Duration,
        retries: i64,
        concurrency: i64,
        request_timeout: Duration,
    ) -> Self {
        let settings = GatekeeperSettings::normalize(delay, retries, concurrency, request_timeout);
        Self::with_settings(root, executor, settings, TokioSpawner::current())
    }

    /// Create a gatekeeper from already normalized settings on the runtime
    /// behind `spawner`.
    pub fn with_settings(
        root: Option<RequestContext>,
        executor: E,
        settings: GatekeeperSettings,
        spawner: TokioSpawner,
    ) -> Self {
        let _runtime = spawner.handle().enter();

        let root = root.unwrap_or_else(RequestContext::background).child();
        let gate = AdmissionGate::new(settings.pacing_interval, settings.concurrency);
        let tokens = gate.tokens();
        let executor = Arc::new(executor);
        let (requests, inbound) = mpsc::unbounded_channel();

        let dispatcher = Dispatcher {
            gate,
            inbound,
            worker: Worker {
                executor: Arc::clone(&executor),
                resubmit: requests.clone(),
                max_retries: settings.max_retries,
                spawner: spawner.clone(),
            },
            root: root.clone(),
        };
        let supervisor = spawner.spawn(supervise(spawner.spawn(dispatcher.run()), root.clone()));

        debug!(
            pacing_interval = ?settings.pacing_interval,
            max_retries = settings.max_retries,
            concurrency = settings.concurrency,
            request_timeout = ?settings.request_timeout,
            "gatekeeper started"
        );

        Self {
            inner: Arc::new(Inner {
                settings,
                root,
                executor,
                requests,
                tokens,
                spawner,
                supervisor: Mutex::new(Some(supervisor)),
            }),
        }
    }

    /// Submit a request and wait for its reply.
    ///
    /// `None` is rejected with [`CallError::EmptyRequest`]. After shutdown
    /// the executor is called directly and its response returned as is,
    /// without classification or retries, even when it is not a success.
    /// An executor error on that path comes back as
    /// [`CallError::NullResponse`] with the error as its source.
    ///
    /// Otherwise the request runs under its own context (or the gatekeeper's
    /// root when it has none), narrowed by the per-request timeout.
    pub async fn submit_async(&self, request: Option<CallRequest<P>>) -> Reply<R> {
        let Some(CallRequest { payload, context }) = request else {
            return Err(CallError::EmptyRequest);
        };

        if self.inner.root.is_done() {
            return self.fail_open(payload).await;
        }

        let scope = match context {
            Some(ctx) if !ctx.is_background() => ctx,
            _ => self.inner.root.clone(),
        };
        let ctx = scope.with_timeout(self.inner.settings.request_timeout);
        // Ends the request's scope on every return path so that pending
        // resends give up once nobody is waiting.
        let _scope_guard = ctx.token().clone().drop_guard();

        let (pending, mut reply) = PendingRequest::new(ctx.clone(), payload);
        let request_id = pending.id;
        trace!(%request_id, "request queued");
        if !ctx.is_done() && self.inner.requests.send(pending).is_err() {
            trace!(%request_id, "inbound queue closed");
        }

        tokio::select! {
            biased;
            delivered = &mut reply => match delivered {
                Ok(reply) => reply,
                Err(_) => Err(self.closed_reply(&ctx)),
            },
            err = ctx.done() => {
                trace!(%request_id, error = %err, "caller stopped waiting");
                Err(CallError::Context(err))
            }
        }
    }

    /// Submit a payload without a caller context.
    pub async fn call_async(&self, payload: P) -> Reply<R> {
        self.submit_async(Some(CallRequest::new(payload))).await
    }

    /// Blocking form of [`Gatekeeper::submit_async`].
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context;
    /// use the async form there.
    pub fn submit(&self, request: Option<CallRequest<P>>) -> Reply<R> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let this = self.clone();
        self.inner.spawner.spawn(async move {
            let _ = tx.send(this.submit_async(request).await);
        });
        rx.blocking_recv().unwrap_or(Err(CallError::ClosedPrematurely))
    }

    /// Blocking form of [`Gatekeeper::call_async`].
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn call(&self, payload: P) -> Reply<R> {
        self.submit(Some(CallRequest::new(payload)))
    }

    async fn fail_open(&self, payload: P) -> Reply<R> {
        debug!("gatekeeper shut down; calling executor directly");
        let (_, outcome) = invoke(&self.inner.spawner, &self.inner.executor, payload).await;
        outcome.map_err(|source| CallError::NullResponse {
            source: Some(source),
        })
    }

    /// Error for a reply channel that closed without a value.
    fn closed_reply(&self, ctx: &RequestContext) -> CallError<R> {
        if let Some(err) = ctx.error() {
            return CallError::Context(err);
        }
        // Requests still queued when the dispatch loop stops are dropped.
        if self.inner.root.is_done() {
            return CallError::Context(GateError::Cancelled);
        }
        CallError::ClosedPrematurely
    }
}

impl<P, R, E> Gatekeeper<P, R, E> {
    /// Stop admitting work. In-flight calls finish; later calls fail open.
    pub fn shutdown(&self) {
        debug!("gatekeeper shutting down");
        self.inner.root.cancel();
    }

    /// Shut down and wait for the dispatch loop to exit.
    pub async fn shutdown_and_wait(&self) {
        self.shutdown();
        let supervisor = self.inner.supervisor.lock().take();
        if let Some(handle) = supervisor {
            let _ = handle.await;
        }
    }

    /// Whether the gatekeeper has been shut down.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_done()
    }

    /// The normalized settings in effect.
    #[must_use]
    pub fn settings(&self) -> GatekeeperSettings {
        self.inner.settings
    }

    /// Concurrency tokens not currently held by a worker or by the dispatch
    /// loop.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.tokens.available_permits()
    }
}

/// Cancel the gatekeeper if the dispatch loop dies.
async fn supervise(dispatch: JoinHandle<()>, root: RequestContext) {
    if let Err(err) = dispatch.await {
        if err.is_panic() {
            error!(panic = %panic_message(err), "dispatch loop panicked; shutting gatekeeper down");
        }
        root.cancel();
    }
}

/// Single coordinator that turns admission permits into running workers.
struct Dispatcher<P, R, E> {
    gate: AdmissionGate,
    inbound: UnboundedReceiver<PendingRequest<P, R>>,
    worker: Worker<P, R, E>,
    root: RequestContext,
}

impl<P, R, E> Dispatcher<P, R, E>
where
    P: Send + 'static,
    R: CallOutcome,
    E: CallExecutor<P, R>,
{
    async fn run(mut self) {
        trace!("dispatch loop started");
        while let Some(permit) = self.gate.admit(&self.root).await {
            let request = tokio::select! {
                biased;
                _ = self.root.done() => break,
                next = self.inbound.recv() => match next {
                    Some(request) => request,
                    None => break,
                },
            };

            if let Some(err) = request.context.error() {
                trace!(request_id = %request.id, error = %err, "skipping abandoned request");
                continue;
            }

            trace!(request_id = %request.id, attempts = request.attempts(), "dispatching");
            let worker = self.worker.clone();
            self.worker.spawner.spawn(worker.run(request, permit));
        }
        debug!("dispatch loop stopped");
    }
}

/// Executes one attempt of a request and decides what happens next.
struct Worker<P, R, E> {
    executor: Arc<E>,
    resubmit: UnboundedSender<PendingRequest<P, R>>,
    max_retries: u32,
    spawner: TokioSpawner,
}

impl<P, R, E> Clone for Worker<P, R, E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            resubmit: self.resubmit.clone(),
            max_retries: self.max_retries,
            spawner: self.spawner.clone(),
        }
    }
}

impl<P, R, E> Worker<P, R, E>
where
    P: Send + 'static,
    R: CallOutcome,
    E: CallExecutor<P, R>,
{
    /// The permit is held only for the executor call. It is dropped on
    /// every path out of this future, unwinding included.
    async fn run(self, mut request: PendingRequest<P, R>, permit: OwnedSemaphorePermit) {
        let Some(payload) = request.payload.take() else {
            request.deliver(Err(CallError::ClosedPrematurely));
            return;
        };
        let attempts = request.begin_attempt();
        let (payload, outcome) = invoke(&self.spawner, &self.executor, payload).await;
        request.payload = payload;
        drop(permit);

        match classify(outcome, attempts, self.max_retries) {
            Verdict::Reply(reply) => {
                if !request.deliver(reply) {
                    trace!(request_id = %request.id, "reply dropped; caller is gone");
                }
            }
            Verdict::Retry(mut response) => {
                let hint = response.retry_hint();
                // Draining may block on I/O.
                let released = self.spawner.spawn_blocking(move || response.release());
                if let Err(err) = released.await {
                    trace!(request_id = %request.id, error = %err, "releasing response failed");
                }
                let backoff = retry_backoff(hint.as_deref());
                trace!(
                    request_id = %request.id,
                    attempts,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "scheduling retry"
                );
                self.spawner.spawn(resend(request, backoff, self.resubmit));
            }
        }
    }
}

/// Wait out the backoff, then put the request back in the inbound queue.
async fn resend<P, R>(
    request: PendingRequest<P, R>,
    backoff: Duration,
    resubmit: UnboundedSender<PendingRequest<P, R>>,
) {
    tokio::select! {
        biased;
        err = request.context.done() => {
            trace!(request_id = %request.id, error = %err, "retry abandoned");
            return;
        }
        () = tokio::time::sleep(backoff) => {}
    }

    if request.context.is_done() {
        return;
    }
    if let Err(returned) = resubmit.send(request) {
        trace!(request_id = %returned.0.id, "inbound queue closed; retry dropped");
    }
}

/// Next step for a request after one executor attempt.
enum Verdict<R> {
    Reply(Reply<R>),
    Retry(R),
}

/// Classification precedence: no response, success, non-retryable, retry.
fn classify<R: CallOutcome>(
    outcome: Result<R, BoxError>,
    attempts: u32,
    max_retries: u32,
) -> Verdict<R> {
    let response = match outcome {
        Ok(response) => response,
        Err(source) => {
            return Verdict::Reply(Err(CallError::NullResponse {
                source: Some(source),
            }))
        }
    };

    if response.is_success() {
        return Verdict::Reply(Ok(response));
    }

    if response.is_not_found() || max_retries == 0 || attempts >= max_retries {
        return Verdict::Reply(Err(CallError::RetriesExceeded { attempts, response }));
    }

    Verdict::Retry(response)
}

/// Run one executor call on the blocking pool.
///
/// A panic inside the executor becomes an ordinary error and the payload is
/// handed back either way. The payload is lost only if the blocking task
/// itself is cancelled, which happens when the runtime shuts down.
async fn invoke<P, R, E>(
    spawner: &TokioSpawner,
    executor: &Arc<E>,
    payload: P,
) -> (Option<P>, Result<R, BoxError>)
where
    P: Send + 'static,
    R: Send + 'static,
    E: CallExecutor<P, R>,
{
    let executor = Arc::clone(executor);
    let call = spawner.spawn_blocking(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor.call(&payload)))
            .unwrap_or_else(|panic| {
                Err(Box::new(GateError::ExecutorPanicked(describe_panic(panic.as_ref()))) as BoxError)
            });
        (payload, outcome)
    });

    match call.await {
        Ok((payload, outcome)) => (Some(payload), outcome),
        Err(err) => (None, Err(Box::new(GateError::Backend(err.to_string())))),
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => describe_panic(payload.as_ref()),
        Err(err) => err.to_string(),
    }
}

fn describe_panic(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
