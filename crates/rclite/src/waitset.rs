// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitSet - blocking wait for Condition triggers.
//!
//! Conditions register a wake signal when attached so they can wake blocked
//! waiters the moment their trigger flips to `true`. The driver is a single
//! mutex+condvar wake flag; an in-process waitset needs no file descriptors.
//!
//! The executor builds one WaitSet per scheduling cycle and drops it before
//! returning, which detaches every signal on every exit path.

use crate::condition::{Condition, WaitSignal};
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct WakeState {
    woken: Mutex<bool>,
    cvar: Condvar,
}

struct CvarSignal {
    id: u64,
    state: Arc<WakeState>,
}

impl WaitSignal for CvarSignal {
    fn id(&self) -> u64 {
        self.id
    }

    fn signal(&self) {
        let mut woken = self.state.woken.lock();
        *woken = true;
        self.state.cvar.notify_all();
    }
}

struct WaitEntry {
    condition: Arc<dyn Condition>,
    // Keeps the signal alive; conditions only hold a Weak to it.
    signal: Arc<CvarSignal>,
}

/// WaitSet - wait for multiple conditions.
///
/// Blocks until at least one attached [`Condition`] is triggered or the
/// timeout elapses (`None` = block indefinitely, `Some(ZERO)` = poll).
pub struct WaitSet {
    state: Arc<WakeState>,
    entries: Mutex<Vec<WaitEntry>>,
    next_signal_id: AtomicU64,
}

impl WaitSet {
    /// Create a new WaitSet with no attached conditions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(WakeState {
                woken: Mutex::new(false),
                cvar: Condvar::new(),
            }),
            entries: Mutex::new(Vec::new()),
            next_signal_id: AtomicU64::new(1),
        }
    }

    /// Attach a Condition to this WaitSet.
    pub fn attach_condition(&self, condition: Arc<dyn Condition>) -> Result<()> {
        let condition_id = condition.condition_id();

        let mut entries = self.entries.lock();
        if entries
            .iter()
            .any(|entry| entry.condition.condition_id() == condition_id)
        {
            return Err(Error::AlreadyAttached);
        }

        let signal = Arc::new(CvarSignal {
            id: self.next_signal_id.fetch_add(1, Ordering::Relaxed),
            state: Arc::clone(&self.state),
        });

        condition.add_wait_signal(Arc::clone(&signal) as Arc<dyn WaitSignal>);
        entries.push(WaitEntry { condition, signal });
        Ok(())
    }

    /// Detach a Condition from this WaitSet.
    pub fn detach_condition(&self, condition: &Arc<dyn Condition>) -> Result<()> {
        let condition_id = condition.condition_id();

        let mut entries = self.entries.lock();
        let Some(position) = entries
            .iter()
            .position(|entry| entry.condition.condition_id() == condition_id)
        else {
            return Err(Error::NotAttached);
        };

        let entry = entries.remove(position);
        entry.condition.remove_wait_signal(entry.signal.id);
        Ok(())
    }

    /// Number of attached conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if no conditions are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Wait until at least one attached condition triggers.
    ///
    /// Returns the triggered conditions, or [`Error::Timeout`] when a
    /// bounded wait elapses with nothing triggered. A `Some(ZERO)` timeout
    /// polls without blocking.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Vec<Arc<dyn Condition>>> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let triggered = self.collect_triggered();
            if !triggered.is_empty() {
                return Ok(triggered);
            }

            let mut woken = self.state.woken.lock();
            if !*woken {
                match deadline {
                    Some(deadline) => {
                        if Instant::now() >= deadline {
                            return Err(Error::Timeout);
                        }
                        let result = self.state.cvar.wait_until(&mut woken, deadline);
                        if result.timed_out() && !*woken {
                            *woken = false;
                            drop(woken);
                            // last chance: a trigger may have landed between
                            // the snapshot above and the deadline
                            let triggered = self.collect_triggered();
                            if triggered.is_empty() {
                                return Err(Error::Timeout);
                            }
                            return Ok(triggered);
                        }
                    }
                    None => self.state.cvar.wait(&mut woken),
                }
            }
            *woken = false;
        }
    }

    fn collect_triggered(&self) -> Vec<Arc<dyn Condition>> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.condition.is_triggered())
            .map(|entry| Arc::clone(&entry.condition))
            .collect()
    }
}

impl Default for WaitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitSet {
    fn drop(&mut self) {
        let mut entries = self.entries.lock();
        for entry in entries.drain(..) {
            entry.condition.remove_wait_signal(entry.signal.id);
        }
    }
}
