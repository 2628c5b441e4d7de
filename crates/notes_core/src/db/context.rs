//! Request-scoped context threaded into every store call.
//!
//! # Invariants
//! - Once cancelled, a context stays cancelled.
//! - Cancelling interrupts the statement currently running on the attached
//!   connection; the owning unit of work then rolls back.

use rusqlite::InterruptHandle;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Cloneable handle identifying one request and its cancellation state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    request_id: String,
    cancelled: AtomicBool,
    active: Mutex<Option<InterruptHandle>>,
}

impl Context {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                request_id: request_id.into(),
                cancelled: AtomicBool::new(false),
                active: Mutex::new(None),
            }),
        }
    }

    /// Context with a generated request id and no caller to cancel it.
    pub fn background() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Marks the context cancelled and interrupts any running statement.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        if let Ok(active) = self.inner.active.lock() {
            if let Some(handle) = active.as_ref() {
                handle.interrupt();
            }
        }
    }

    /// Registers the connection executing on behalf of this context until the
    /// returned guard is dropped.
    pub(crate) fn attach(&self, handle: InterruptHandle) -> Attached<'_> {
        if let Ok(mut active) = self.inner.active.lock() {
            *active = Some(handle);
        }
        // Cancellation may have raced with the registration above.
        if self.is_cancelled() {
            self.cancel();
        }
        Attached { ctx: self }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.inner.request_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Clears the registered connection on drop.
pub(crate) struct Attached<'a> {
    ctx: &'a Context,
}

impl Drop for Attached<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.ctx.inner.active.lock() {
            *active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Context;

    #[test]
    fn cancel_is_sticky_and_shared_between_clones() {
        let ctx = Context::new("req-1");
        let clone = ctx.clone();
        assert!(!ctx.is_cancelled());

        clone.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.request_id(), "req-1");
    }

    #[test]
    fn background_contexts_get_distinct_ids() {
        assert_ne!(
            Context::background().request_id(),
            Context::background().request_id()
        );
    }
}
