// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conditions - readiness predicates for WaitSets.
//!
//! A Condition is a boolean-valued predicate that can be attached to a
//! [`crate::WaitSet`] to enable event-driven blocking waits. Two flavours
//! exist: [`GuardCondition`] is triggered manually (shutdown notification),
//! [`ReadyCondition`] is backed by a pending-work counter and is owned by
//! every queue-backed endpoint, which raises it on enqueue and lowers it on
//! a successful take.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Wake hook registered by a waitset while a condition is attached.
///
/// `signal()` must be cheap and callable from any thread; it wakes every
/// waiter currently blocked on the owning waitset.
pub trait WaitSignal: Send + Sync {
    /// Unique identifier of this signal registration.
    fn id(&self) -> u64;

    /// Wake blocked waiters.
    fn signal(&self);
}

/// Condition trait - base interface for everything a waitset can block on.
pub trait Condition: Send + Sync {
    /// Returns `true` if the condition is currently satisfied.
    fn is_triggered(&self) -> bool;

    /// Unique identifier for this condition (stable across clones).
    fn condition_id(&self) -> u64;

    /// Register a waitset signal so this condition can wake blocked waiters.
    fn add_wait_signal(&self, signal: Arc<dyn WaitSignal>);

    /// Remove a previously registered waitset signal.
    fn remove_wait_signal(&self, signal_id: u64);
}

static NEXT_CONDITION_ID: AtomicU64 = AtomicU64::new(1);

fn next_condition_id() -> u64 {
    NEXT_CONDITION_ID.fetch_add(1, Ordering::Relaxed)
}

struct WaitHook {
    id: u64,
    signal: Weak<dyn WaitSignal>,
}

/// Shared hook-list behaviour for both condition flavours.
struct HookList {
    hooks: Mutex<Vec<WaitHook>>,
}

impl HookList {
    fn new() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, signal: Arc<dyn WaitSignal>, trigger_now: bool) {
        let mut hooks = self.hooks.lock();
        hooks.retain(|hook| hook.signal.upgrade().is_some());
        hooks.push(WaitHook {
            id: signal.id(),
            signal: Arc::downgrade(&signal),
        });
        drop(hooks);

        if trigger_now {
            signal.signal();
        }
    }

    fn remove(&self, signal_id: u64) {
        self.hooks.lock().retain(|hook| hook.id != signal_id);
    }

    fn notify(&self) {
        self.hooks.lock().retain(|hook| {
            if let Some(signal) = hook.signal.upgrade() {
                signal.signal();
                true
            } else {
                false
            }
        });
    }
}

/// GuardCondition - manually-triggered condition.
///
/// Used by [`crate::Context`] to wake blocked waitsets on shutdown; a
/// triggered guard stays triggered until explicitly lowered.
pub struct GuardCondition {
    id: u64,
    trigger_value: AtomicBool,
    hooks: HookList,
}

impl GuardCondition {
    /// Create a new GuardCondition with `trigger_value == false`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_condition_id(),
            trigger_value: AtomicBool::new(false),
            hooks: HookList::new(),
        }
    }

    /// Set the trigger value. Setting `true` wakes every attached waitset.
    pub fn set_trigger_value(&self, value: bool) {
        self.trigger_value.store(value, Ordering::Release);
        if value {
            self.hooks.notify();
        }
    }
}

impl Condition for GuardCondition {
    fn is_triggered(&self) -> bool {
        self.trigger_value.load(Ordering::Acquire)
    }

    fn condition_id(&self) -> u64 {
        self.id
    }

    fn add_wait_signal(&self, signal: Arc<dyn WaitSignal>) {
        self.hooks.add(signal, self.is_triggered());
    }

    fn remove_wait_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }
}

impl Default for GuardCondition {
    fn default() -> Self {
        Self::new()
    }
}

/// ReadyCondition - pending-work-counter condition.
///
/// Triggered while the pending count is nonzero. Producers call
/// [`ReadyCondition::add_work`] after enqueuing one unit; consumers call
/// [`ReadyCondition::consume_work`] after a successful take. The count may
/// race against concurrent takers; the executor treats a take that finds
/// nothing as a silent miss.
pub struct ReadyCondition {
    id: u64,
    pending: AtomicUsize,
    hooks: HookList,
}

impl ReadyCondition {
    /// Create a condition with no pending work.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_condition_id(),
            pending: AtomicUsize::new(0),
            hooks: HookList::new(),
        }
    }

    /// Record one enqueued unit of work and wake attached waitsets.
    pub fn add_work(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.hooks.notify();
    }

    /// Record one taken unit of work. Saturates at zero.
    pub fn consume_work(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            });
    }

    /// Current pending-work count.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Condition for ReadyCondition {
    fn is_triggered(&self) -> bool {
        self.pending() > 0
    }

    fn condition_id(&self) -> u64 {
        self.id
    }

    fn add_wait_signal(&self, signal: Arc<dyn WaitSignal>) {
        self.hooks.add(signal, self.is_triggered());
    }

    fn remove_wait_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }
}

impl Default for ReadyCondition {
    fn default() -> Self {
        Self::new()
    }
}
