// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Status-event endpoints.
//!
//! An [`EventHandler`] carries pre-extracted status values in a queue; its
//! dispatch pops one value and invokes the callback, with no decode step.
//! The built-in producer is the subscription overflow path, which raises a
//! [`MessageLostStatus`] each time the inbox drops its oldest message.

use crate::condition::ReadyCondition;
use crate::endpoint::{EventBase, Handle};
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use std::sync::Arc;

/// Status payload for lost-message events on a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLostStatus {
    /// Messages lost since the last event on this handler.
    pub number_lost: u64,
    /// Total messages lost over the subscription's lifetime.
    pub total_count: u64,
}

/// Queued status-event handler.
pub struct EventHandler<S: Send + 'static> {
    handle: Handle,
    ready: Arc<ReadyCondition>,
    queue: SegQueue<S>,
    callback: Mutex<Box<dyn FnMut(S) + Send>>,
}

impl<S: Send + 'static> EventHandler<S> {
    pub(crate) fn new<F>(handle: Handle, callback: F) -> Self
    where
        F: FnMut(S) + Send + 'static,
    {
        Self {
            handle,
            ready: Arc::new(ReadyCondition::new()),
            queue: SegQueue::new(),
            callback: Mutex::new(Box::new(callback)),
        }
    }

    /// Queue one status value and mark the handler ready.
    ///
    /// Called by the endpoint that owns this handler when the corresponding
    /// status change occurs.
    pub fn push(&self, status: S) {
        self.queue.push(status);
        self.ready.add_work();
    }

    /// Number of queued, undispatched status values.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<S: Send + 'static> EventBase for EventHandler<S> {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn ready_condition(&self) -> Arc<ReadyCondition> {
        Arc::clone(&self.ready)
    }

    fn execute(&self) {
        let Some(status) = self.queue.pop() else {
            log::trace!("[event] take race on handler {}, skipping", self.handle);
            return;
        };
        self.ready.consume_work();
        (self.callback.lock())(status);
    }
}
