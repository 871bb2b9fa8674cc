//! Request cancellation: shared abort tokens and a registry of in-flight
//! logical requests.
//!
//! When the pipeline runs with a `RequestControl`, each logical request is
//! registered under its request id for as long as it runs. Anyone holding the
//! control (e.g. a UI "cancel" action) can abort it by id; the pipeline stops
//! the in-flight attempt or backoff sleep and dispatches nothing further.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AbortState {
    aborted: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation flag; all clones observe the same abort.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    inner: Arc<AbortState>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once `abort` has been called (immediately if it already was).
    pub async fn aborted(&self) {
        loop {
            // Register before checking the flag so a concurrent abort is not missed.
            let notified = self.inner.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// Registry of request id -> abort token.
#[derive(Debug, Default)]
pub struct RequestControl {
    requests: RwLock<HashMap<String, AbortToken>>,
}

impl RequestControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a logical request; returns the token the pipeline races against.
    pub fn register(&self, request_id: &str) -> AbortToken {
        let token = AbortToken::new();
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id.to_string(), token.clone());
        token
    }

    /// Call when the logical request terminates (success or failure).
    pub fn unregister(&self, request_id: &str) {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(request_id);
    }

    /// Abort a running request. Returns false if no such request is registered.
    pub fn request_abort(&self, request_id: &str) -> bool {
        match self
            .requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request_id)
        {
            Some(token) => {
                token.abort();
                true
            }
            None => false,
        }
    }

    /// Ids of logical requests currently in flight.
    pub fn in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

/// Unregisters a request from its control when dropped.
pub(crate) struct ControlGuard<'a> {
    control: &'a RequestControl,
    request_id: String,
    pub(crate) token: AbortToken,
}

impl<'a> ControlGuard<'a> {
    pub(crate) fn register(control: &'a RequestControl, request_id: &str) -> Self {
        let token = control.register(request_id);
        Self {
            control,
            request_id: request_id.to_string(),
            token,
        }
    }
}

impl Drop for ControlGuard<'_> {
    fn drop(&mut self) {
        self.control.unregister(&self.request_id);
    }
}
