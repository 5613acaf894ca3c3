// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed message subscription.
//!
//! A subscription owns a bounded inbox fed by the intra-process router and
//! a user callback invoked once per taken message. The depth bound is a
//! watermark: when the inbox is full the oldest message is dropped and a
//! message-lost status event is raised on the attached handler, if any.

use crate::condition::ReadyCondition;
use crate::context::Context;
use crate::endpoint::{EventBase, Handle, SubscriptionBase};
use crate::event::{EventHandler, MessageLostStatus};
use crate::router::MessageSink;
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default inbox depth for new subscriptions.
pub const DEFAULT_DEPTH: usize = 10;

/// Typed message subscription endpoint.
pub struct Subscription<M: Clone + Send + 'static> {
    handle: Handle,
    topic: String,
    depth: usize,
    context: Context,
    inbox: SegQueue<M>,
    ready: Arc<ReadyCondition>,
    callback: Mutex<Box<dyn FnMut(M) + Send>>,
    events: Mutex<Vec<Arc<dyn EventBase>>>,
    lost_handler: Mutex<Option<Arc<EventHandler<MessageLostStatus>>>>,
    total_lost: AtomicU64,
}

impl<M: Clone + Send + 'static> Subscription<M> {
    pub(crate) fn new<F>(
        handle: Handle,
        topic: &str,
        depth: usize,
        context: &Context,
        callback: F,
    ) -> Self
    where
        F: FnMut(M) + Send + 'static,
    {
        Self {
            handle,
            topic: topic.to_string(),
            depth: depth.max(1),
            context: context.clone(),
            inbox: SegQueue::new(),
            ready: Arc::new(ReadyCondition::new()),
            callback: Mutex::new(Box::new(callback)),
            events: Mutex::new(Vec::new()),
            lost_handler: Mutex::new(None),
            total_lost: AtomicU64::new(0),
        }
    }

    /// Attach a message-lost status-event handler.
    ///
    /// At most one handler is active; attaching again replaces the producer
    /// slot but both handlers remain enumerable until the subscription is
    /// dropped.
    pub fn on_message_lost<F>(&self, callback: F) -> Arc<EventHandler<MessageLostStatus>>
    where
        F: FnMut(MessageLostStatus) + Send + 'static,
    {
        let handler = Arc::new(EventHandler::new(self.context.next_handle(), callback));
        self.events
            .lock()
            .push(Arc::clone(&handler) as Arc<dyn EventBase>);
        *self.lost_handler.lock() = Some(Arc::clone(&handler));
        handler
    }

    /// Take one message without invoking the callback.
    pub fn take(&self) -> Option<M> {
        let message = self.inbox.pop()?;
        self.ready.consume_work();
        Some(message)
    }

    /// Number of queued, untaken messages.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Total messages dropped due to inbox overflow.
    #[must_use]
    pub fn messages_lost(&self) -> u64 {
        self.total_lost.load(Ordering::Relaxed)
    }

    fn record_lost(&self) {
        let total = self.total_lost.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(handler) = self.lost_handler.lock().as_ref() {
            handler.push(MessageLostStatus {
                number_lost: 1,
                total_count: total,
            });
        }
    }
}

impl<M: Clone + Send + 'static> MessageSink for Subscription<M> {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn push_erased(&self, message: Box<dyn Any + Send>) -> bool {
        let Ok(message) = message.downcast::<M>() else {
            return false;
        };

        // depth is a watermark, not a hard bound: concurrent publishers may
        // briefly overshoot it
        if self.inbox.len() >= self.depth {
            if self.inbox.pop().is_some() {
                self.ready.consume_work();
                self.record_lost();
            }
        }

        self.inbox.push(*message);
        self.ready.add_work();
        true
    }
}

impl<M: Clone + Send + 'static> SubscriptionBase for Subscription<M> {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn ready_condition(&self) -> Arc<ReadyCondition> {
        Arc::clone(&self.ready)
    }

    fn execute(&self) {
        let Some(message) = self.take() else {
            log::trace!(
                "[subscription] take race on '{}' ({}), skipping",
                self.topic,
                self.handle
            );
            return;
        };
        (self.callback.lock())(message);
    }

    fn event_handlers(&self) -> Vec<Arc<dyn EventBase>> {
        self.events.lock().clone()
    }
}
