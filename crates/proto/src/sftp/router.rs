//! Request/reply correlation.
//!
//! SFTP multiplexes many outstanding requests over one link; replies come
//! back in whatever order the server pleases and are matched to callers via
//! the request id. The router hands out unused ids together with single-shot
//! reply slots, and delivers each incoming reply to exactly one waiter.

use crate::sftp::message::{Message, MessageType};
use fxp_platform::{FxpError, FxpResult};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

/// A single-shot receiver for one protocol reply.
pub type ReplySlot = oneshot::Receiver<FxpResult<Message>>;

/// Failure modes of [`Router::resolve`].
///
/// The two cases have different severities for the connection: a reply with
/// no id at all is a protocol violation (the peer sent a handshake-shaped
/// message mid-session), while a reply for an unknown id is merely orphaned
/// and gets logged and dropped.
#[derive(Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// The message carries no request id; fatal to the connection.
    MissingId(MessageType),
    /// No waiter is registered for the id; logged, never fatal.
    Orphan(u32),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::MissingId(ty) => {
                write!(f, "reply of type {:?} carries no request id", ty)
            }
            ResolveError::Orphan(id) => write!(f, "no pending request with id {}", id),
        }
    }
}

impl std::error::Error for ResolveError {}

struct Inner {
    pending: HashMap<u32, oneshot::Sender<FxpResult<Message>>>,
    next_id: u32,
}

/// Correlates replies to pending requests by id.
///
/// The slot map is guarded by a single mutex which is held only for map
/// access; delivery happens after the lock is released and cannot block,
/// since every slot is a one-shot channel.
pub struct Router {
    inner: Mutex<Inner>,
}

impl Router {
    /// Creates an empty router. Ids start at 0.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Allocates an unused request id and installs a reply slot for it.
    ///
    /// The counter is monotonically increasing with wrap-around; a candidate
    /// id still registered by an in-flight request is skipped.
    pub async fn reserve(&self) -> (u32, ReplySlot) {
        let mut inner = self.inner.lock().await;

        let id = loop {
            let candidate = inner.next_id;
            inner.next_id = inner.next_id.wrapping_add(1);
            if !inner.pending.contains_key(&candidate) {
                break candidate;
            }
        };

        let (tx, rx) = oneshot::channel();
        inner.pending.insert(id, tx);

        (id, rx)
    }

    /// Delivers an incoming reply to the waiter registered for its id.
    ///
    /// The two failure modes are distinguished so the caller can treat them
    /// with different severities; see [`ResolveError`]. A reply for a waiter
    /// that has gone away is dropped silently; abandoning a reply slot is
    /// how callers implement timeouts.
    pub async fn resolve(&self, message: Message) -> Result<(), ResolveError> {
        let id = match message.request_id() {
            Some(id) => id,
            None => return Err(ResolveError::MissingId(message.message_type())),
        };

        let slot = {
            let mut inner = self.inner.lock().await;
            inner.pending.remove(&id)
        };

        match slot {
            Some(tx) => {
                if tx.send(Ok(message)).is_err() {
                    debug!(id, "reply for abandoned request dropped");
                }
                Ok(())
            }
            None => Err(ResolveError::Orphan(id)),
        }
    }

    /// Removes a reply slot without delivering anything.
    ///
    /// Used when a request could not be sent after its id was reserved.
    pub async fn forget(&self, id: u32) {
        let mut inner = self.inner.lock().await;
        inner.pending.remove(&id);
    }

    /// Fails every pending request with a connection-closed error.
    ///
    /// After this returns no reply slot remains registered, so no caller is
    /// left waiting forever.
    pub async fn shutdown(&self, cause: &str) {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock().await;
            inner.pending.drain().collect()
        };

        if !drained.is_empty() {
            debug!(waiters = drained.len(), cause, "failing pending requests");
        }

        for (_, tx) in drained {
            let _ = tx.send(Err(FxpError::Closed(cause.to_string())));
        }
    }

    /// Number of requests currently awaiting a reply.
    pub async fn pending(&self) -> usize {
        self.inner.lock().await.pending.len()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
