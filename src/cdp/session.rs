//! Target-scoped CDP session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::debug;

use super::connection::{EventRoutes, Wire};
use super::error::CdpError;
use crate::diag;

/// The session surface the DOM layer consumes.
///
/// Owned by browser-control code; this crate borrows it. [`CdpSession`] is
/// the live implementation; tests substitute scripted fakes.
#[async_trait]
pub trait ProtocolSession: Send + Sync {
    /// Send a command on this session and wait for its result.
    async fn send(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError>;

    /// Whether `detach` has run.
    fn is_detached(&self) -> bool;

    /// Detach from the target. Idempotent; errors during detach are logged
    /// and swallowed, never returned.
    async fn detach(&self);
}

/// A session attached to a single page/target in flat mode.
///
/// Shares the owning connection's wire, so its requests are correlated on
/// the same socket with a `sessionId` stamped on each envelope.
pub struct CdpSession {
    /// Target ID.
    target_id: String,
    /// Session ID for this target.
    session_id: String,
    /// Outbound state (shared with the connection).
    wire: Arc<Wire>,
    /// Event subscriptions (shared with the connection).
    events: EventRoutes,
    /// Set once by `detach`; sends check it first.
    detached: AtomicBool,
}

impl CdpSession {
    /// Create a new session.
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        wire: Arc<Wire>,
        events: EventRoutes,
    ) -> Self {
        Self {
            target_id,
            session_id,
            wire,
            events,
            detached: AtomicBool::new(false),
        }
    }

    /// Get target ID.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Get session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subscribe to an event method on this session.
    ///
    /// Replaces any prior subscription for the same method. Event params
    /// arrive on the returned channel until `off`, `detach`, or the
    /// connection going away.
    pub async fn on(&self, method: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events
            .write()
            .await
            .insert((Some(self.session_id.clone()), method.to_string()), tx);
        rx
    }

    /// Drop the subscription for an event method.
    pub async fn off(&self, method: &str) {
        self.events
            .write()
            .await
            .remove(&(Some(self.session_id.clone()), method.to_string()));
    }
}

#[async_trait]
impl ProtocolSession for CdpSession {
    async fn send(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        if self.is_detached() {
            return Err(CdpError::Detached);
        }
        self.wire.call(method, params, Some(&self.session_id)).await
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    async fn detach(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }

        // Stop event flow before telling the browser, so nothing lands on a
        // session the caller already considers gone.
        {
            let mut routes = self.events.write().await;
            routes.retain(|(sid, _), _| sid.as_deref() != Some(self.session_id.as_str()));
        }

        let result = self
            .wire
            .call(
                "Target.detachFromTarget",
                Some(json!({"sessionId": self.session_id})),
                None,
            )
            .await;
        match result {
            Ok(_) => debug!("Detached session {}", self.session_id),
            Err(e) => debug!(
                "Detach of session {} reported: {}",
                self.session_id,
                diag::describe_error(&e)
            ),
        }
    }
}
