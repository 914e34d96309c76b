//! Request and reply types carried through the gatekeeper.

use tokio::sync::oneshot;
use uuid::Uuid;

use super::{CallError, RequestContext};

/// Outcome delivered to a waiting caller.
pub type Reply<R> = Result<R, CallError<R>>;

/// A call submitted by a caller.
#[derive(Debug, Clone)]
pub struct CallRequest<P> {
    /// Opaque call input handed to the executor.
    pub payload: P,
    /// Caller-supplied scope. `None` or a background context means the
    /// gatekeeper's root context is used instead.
    pub context: Option<RequestContext>,
}

impl<P> CallRequest<P> {
    /// Request without its own context.
    pub const fn new(payload: P) -> Self {
        Self {
            payload,
            context: None,
        }
    }

    /// Attach a caller context.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }
}

impl<P> From<P> for CallRequest<P> {
    fn from(payload: P) -> Self {
        Self::new(payload)
    }
}

/// One admitted unit of work, owned by the scheduler while queued or running.
pub(crate) struct PendingRequest<P, R> {
    pub id: Uuid,
    pub context: RequestContext,
    /// Taken while the executor runs and put back afterwards.
    pub payload: Option<P>,
    reply: Option<oneshot::Sender<Reply<R>>>,
    attempts: u32,
}

impl<P, R> PendingRequest<P, R> {
    pub fn new(context: RequestContext, payload: P) -> (Self, oneshot::Receiver<Reply<R>>) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            id: Uuid::new_v4(),
            context,
            payload: Some(payload),
            reply: Some(tx),
            attempts: 0,
        };
        (request, rx)
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record an executor invocation that is about to start.
    pub const fn begin_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    /// Deliver the reply unless the caller has already stopped waiting.
    ///
    /// Returns true if the reply was handed over. A second call is a no-op.
    pub fn deliver(&mut self, reply: Reply<R>) -> bool {
        if self.context.is_done() {
            self.reply = None;
            return false;
        }
        self.reply
            .take()
            .is_some_and(|tx| tx.send(reply).is_ok())
    }
}
