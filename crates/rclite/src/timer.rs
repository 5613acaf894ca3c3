// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wall-clock timers.
//!
//! A timer is ready once its period has elapsed since the last call and it
//! is not canceled. Dispatch first advances the due time past now, then
//! runs the zero-argument callback; a timer that fell far behind fires once
//! per dispatch, not once per missed period.

use crate::endpoint::{Handle, TimerBase};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Periodic wall-clock timer endpoint.
pub struct WallTimer {
    handle: Handle,
    period: Duration,
    next_call: Mutex<Instant>,
    canceled: AtomicBool,
    callback: Mutex<Box<dyn FnMut() + Send>>,
}

impl WallTimer {
    pub(crate) fn new<F>(handle: Handle, period: Duration, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self {
            handle,
            period,
            next_call: Mutex::new(Instant::now() + period),
            canceled: AtomicBool::new(false),
            callback: Mutex::new(Box::new(callback)),
        }
    }

    /// Timer period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer. A canceled timer is never ready and never selected.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    /// Re-arm the timer one full period from now, clearing cancellation.
    pub fn reset(&self) {
        *self.next_call.lock() = Instant::now() + self.period;
        self.canceled.store(false, Ordering::Release);
    }
}

impl TimerBase for WallTimer {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn is_ready(&self) -> bool {
        !self.is_canceled() && Instant::now() >= *self.next_call.lock()
    }

    fn time_until_next_call(&self) -> Option<Duration> {
        if self.is_canceled() {
            return None;
        }
        let next_call = *self.next_call.lock();
        Some(next_call.saturating_duration_since(Instant::now()))
    }

    fn advance(&self) {
        let now = Instant::now();
        let mut next_call = self.next_call.lock();
        while *next_call <= now {
            *next_call += self.period;
        }
    }

    fn execute_callback(&self) {
        (self.callback.lock())();
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}
