// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed message publisher.
//!
//! Publishing clones the message into every live, type-matching subscription
//! inbox on the topic via the context router. There is no transport, no
//! retry and no backpressure beyond the subscription's own depth watermark.

use crate::context::Context;
use crate::endpoint::{EventBase, Handle, PublisherBase};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed message publisher.
pub struct Publisher<M: Clone + Send + 'static> {
    handle: Handle,
    topic: String,
    context: Context,
    events: Mutex<Vec<Arc<dyn EventBase>>>,
    _payload: PhantomData<fn(M)>,
}

impl<M: Clone + Send + 'static> Publisher<M> {
    pub(crate) fn new(handle: Handle, topic: &str, context: &Context) -> Self {
        Self {
            handle,
            topic: topic.to_string(),
            context: context.clone(),
            events: Mutex::new(Vec::new()),
            _payload: PhantomData,
        }
    }

    /// Publish one message. Returns the number of subscriptions it reached.
    pub fn publish(&self, message: &M) -> usize {
        let delivered = self.context.router().deliver(&self.topic, message);
        log::trace!(
            "[publisher] '{}' ({}) delivered to {} subscription(s)",
            self.topic,
            self.handle,
            delivered
        );
        delivered
    }
}

impl<M: Clone + Send + 'static> PublisherBase for Publisher<M> {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn event_handlers(&self) -> Vec<Arc<dyn EventBase>> {
        self.events.lock().clone()
    }
}
