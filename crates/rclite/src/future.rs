// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Blocking future - single-slot, single-producer/multi-consumer cell.
//!
//! Used both as the RPC result holder and as the termination condition for
//! [`crate::SingleThreadedExecutor::spin_until_complete`]. `set` broadcasts
//! to every blocked getter; waiters re-check the done flag after every wake,
//! which also guards against spurious wakeups. Cancellation is permanently
//! unsupported.

use crate::context::{Context, ShutdownListener};
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Single-slot blocking future.
///
/// The value slot may be overwritten by a later `set`; the done flag flips
/// to `true` exactly once and stays true (last write wins, done is sticky).
pub struct RclFuture<V> {
    done: AtomicBool,
    value: Mutex<Option<V>>,
    cvar: Condvar,
    context: Context,
}

impl<V: Send + 'static> RclFuture<V> {
    /// Create an incomplete future bound to a context; shutting the context
    /// down wakes every blocked getter.
    pub fn new(context: &Context) -> Arc<Self> {
        let future = Arc::new(Self {
            done: AtomicBool::new(false),
            value: Mutex::new(None),
            cvar: Condvar::new(),
            context: context.clone(),
        });
        let listener: Arc<dyn ShutdownListener> = Arc::clone(&future) as Arc<dyn ShutdownListener>;
        context.add_shutdown_listener(&listener);
        future
    }

    /// Store the value, mark the future done and wake all blocked getters.
    pub fn set(&self, value: V) {
        let mut slot = self.value.lock();
        *slot = Some(value);
        self.done.store(true, Ordering::Release);
        self.cvar.notify_all();
    }

    /// Non-blocking completion poll.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Cancellation is permanently unsupported; always returns `false`.
    pub fn cancel(&self) -> bool {
        false
    }

    /// Always `false`; see [`RclFuture::cancel`].
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        false
    }
}

impl<V: Clone + Send + 'static> RclFuture<V> {
    /// Block until the value is set or the context shuts down.
    ///
    /// Returns `None` only in the shutdown case.
    pub fn get(&self) -> Option<V> {
        let mut slot = self.value.lock();
        loop {
            if self.is_done() {
                return slot.clone();
            }
            if !self.context.ok() {
                return slot.clone();
            }
            self.cvar.wait(&mut slot);
        }
    }

    /// Block with a deadline, distinguishing completion from timeout and
    /// from shutdown interruption.
    pub fn get_timeout(&self, timeout: Duration) -> Result<V> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.value.lock();
        loop {
            if self.is_done() {
                // set() always stores a value before flipping done
                return slot.clone().ok_or(Error::Interrupted);
            }
            if !self.context.ok() {
                return Err(Error::Interrupted);
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }
            let result = self.cvar.wait_until(&mut slot, deadline);
            if result.timed_out() && !self.is_done() {
                return Err(Error::Timeout);
            }
        }
    }
}

impl<V: Send + 'static> ShutdownListener for RclFuture<V> {
    fn on_shutdown(&self) {
        // lock to serialize with getters between their done-check and wait
        let _slot = self.value.lock();
        self.cvar.notify_all();
    }
}
