// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Context - explicit process-validity signal and entity factory.
//!
//! The context replaces the ambient "is the process still up" global with
//! shared, injectable state: executors and blocking futures receive a
//! context handle and consult `ok()` as their universal termination
//! condition. `shutdown()` is idempotent; the first call triggers the
//! shutdown guard condition (waking blocked waitsets) and notifies every
//! registered shutdown listener (waking blocked futures).
//!
//! The context also owns the intra-process router and the handle allocator
//! shared by every node created from it.

use crate::condition::GuardCondition;
use crate::endpoint::Handle;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::router::Router;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Listener invoked once when the owning context shuts down.
pub trait ShutdownListener: Send + Sync {
    fn on_shutdown(&self);
}

struct ContextShared {
    valid: AtomicBool,
    shutdown_guard: Arc<GuardCondition>,
    listeners: Mutex<Vec<Weak<dyn ShutdownListener>>>,
    router: Arc<Router>,
    next_handle: AtomicU64,
}

/// Process-validity signal plus node factory. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    shared: Arc<ContextShared>,
}

impl Context {
    /// Create a valid context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ContextShared {
                valid: AtomicBool::new(true),
                shutdown_guard: Arc::new(GuardCondition::new()),
                listeners: Mutex::new(Vec::new()),
                router: Arc::new(Router::new()),
                next_handle: AtomicU64::new(1),
            }),
        }
    }

    /// Non-blocking validity poll.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.shared.valid.load(Ordering::Acquire)
    }

    /// Invalidate the context. Idempotent; only the first call triggers the
    /// guard and notifies listeners.
    pub fn shutdown(&self) {
        if !self.shared.valid.swap(false, Ordering::AcqRel) {
            return;
        }
        log::debug!("[context] shutdown");
        self.shared.shutdown_guard.set_trigger_value(true);

        let mut listeners = self.shared.listeners.lock();
        for listener in listeners.drain(..) {
            if let Some(listener) = listener.upgrade() {
                listener.on_shutdown();
            }
        }
    }

    /// Guard condition triggered on shutdown; executors attach it to every
    /// per-cycle waitset so a blocked wait wakes immediately.
    #[must_use]
    pub fn shutdown_guard(&self) -> Arc<GuardCondition> {
        Arc::clone(&self.shared.shutdown_guard)
    }

    /// Create a node attached to this context.
    pub fn create_node(&self, name: &str) -> Result<Arc<Node>> {
        if !self.ok() {
            return Err(Error::InvalidContext);
        }
        log::debug!("[context] create node '{}'", name);
        Ok(Arc::new(Node::new(name, self)))
    }

    pub(crate) fn add_shutdown_listener(&self, listener: &Arc<dyn ShutdownListener>) {
        if !self.ok() {
            // context already invalid: fire immediately instead of storing
            listener.on_shutdown();
            return;
        }
        let mut listeners = self.shared.listeners.lock();
        listeners.retain(|listener| listener.upgrade().is_some());
        listeners.push(Arc::downgrade(listener));
    }

    pub(crate) fn router(&self) -> &Arc<Router> {
        &self.shared.router
    }

    /// Allocate a fresh endpoint handle. Never zero, never reused.
    pub(crate) fn next_handle(&self) -> Handle {
        self.shared.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn starts_valid_shutdown_is_sticky() {
        let context = Context::new();
        assert!(context.ok());
        context.shutdown();
        assert!(!context.ok());
        context.shutdown();
        assert!(!context.ok());
    }

    #[test]
    fn shutdown_triggers_guard_once() {
        let context = Context::new();
        let guard = context.shutdown_guard();
        assert!(!guard.is_triggered());
        context.shutdown();
        assert!(guard.is_triggered());
    }

    struct CountingListener {
        calls: AtomicUsize,
    }

    impl ShutdownListener for CountingListener {
        fn on_shutdown(&self) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn listeners_notified_exactly_once() {
        let context = Context::new();
        let listener = Arc::new(CountingListener {
            calls: AtomicUsize::new(0),
        });
        let erased: Arc<dyn ShutdownListener> = listener.clone();
        context.add_shutdown_listener(&erased);

        context.shutdown();
        context.shutdown();
        assert_eq!(listener.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn listener_on_dead_context_fires_immediately() {
        let context = Context::new();
        context.shutdown();

        let listener = Arc::new(CountingListener {
            calls: AtomicUsize::new(0),
        });
        let erased: Arc<dyn ShutdownListener> = listener.clone();
        context.add_shutdown_listener(&erased);
        assert_eq!(listener.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn create_node_fails_after_shutdown() {
        let context = Context::new();
        context.shutdown();
        assert!(matches!(
            context.create_node("late"),
            Err(Error::InvalidContext)
        ));
    }

    #[test]
    fn handles_are_unique_and_nonzero() {
        let context = Context::new();
        let a = context.next_handle();
        let b = context.next_handle();
        assert_ne!(a, 0);
        assert_ne!(a, b);
    }
}
