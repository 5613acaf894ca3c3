// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Intra-process router: binds publishers to subscription inboxes by topic
//! name and clients to service inboxes by service name.
//!
//! Delivery is type-checked at the sink: a publisher and a subscription that
//! share a topic name but not a payload type simply never match (logged at
//! warn level, not an error). Sinks are held weakly; dead entries are pruned
//! on the next delivery or registration touching them.

use crate::endpoint::{Handle, RequestId};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::any::Any;
use std::sync::Weak;

/// Receiving side of a topic: a subscription inbox.
pub(crate) trait MessageSink: Send + Sync {
    fn handle(&self) -> Handle;

    /// Accept one type-erased message. Returns `false` on payload type
    /// mismatch (message dropped).
    fn push_erased(&self, message: Box<dyn Any + Send>) -> bool;
}

/// Receiving side of a service: a request inbox.
pub(crate) trait RequestSink: Send + Sync {
    fn handle(&self) -> Handle;

    /// Accept one type-erased request with its reply address. Returns
    /// `false` on payload type mismatch (request dropped).
    fn push_erased(
        &self,
        request_id: RequestId,
        request: Box<dyn Any + Send>,
        reply_to: Weak<dyn ResponseSink>,
    ) -> bool;
}

/// Receiving side of a client: a response inbox.
pub(crate) trait ResponseSink: Send + Sync {
    /// Accept one type-erased response tagged with the original request id.
    fn push_response(&self, request_id: RequestId, response: Box<dyn Any + Send>);
}

pub(crate) struct Router {
    topics: DashMap<String, Vec<(Handle, Weak<dyn MessageSink>)>>,
    services: DashMap<String, (Handle, Weak<dyn RequestSink>)>,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self {
            topics: DashMap::new(),
            services: DashMap::new(),
        }
    }

    pub(crate) fn add_subscription(
        &self,
        topic: &str,
        handle: Handle,
        sink: Weak<dyn MessageSink>,
    ) {
        let mut sinks = self.topics.entry(topic.to_string()).or_default();
        sinks.retain(|(_, sink)| sink.upgrade().is_some());
        sinks.push((handle, sink));
    }

    pub(crate) fn remove_subscription(&self, topic: &str, handle: Handle) {
        if let Some(mut sinks) = self.topics.get_mut(topic) {
            sinks.retain(|(sink_handle, sink)| {
                *sink_handle != handle && sink.upgrade().is_some()
            });
        }
    }

    /// Deliver one message to every live, type-matching subscription on the
    /// topic. Returns the number of deliveries.
    pub(crate) fn deliver<M: Clone + Send + 'static>(&self, topic: &str, message: &M) -> usize {
        let Some(mut sinks) = self.topics.get_mut(topic) else {
            return 0;
        };

        let mut delivered = 0;
        sinks.retain(|(_, sink)| {
            let Some(sink) = sink.upgrade() else {
                return false;
            };
            if sink.push_erased(Box::new(message.clone())) {
                delivered += 1;
            } else {
                log::warn!(
                    "[router] payload type mismatch on topic '{}', subscription {} skipped",
                    topic,
                    sink.handle()
                );
            }
            true
        });
        delivered
    }

    pub(crate) fn register_service(
        &self,
        name: &str,
        handle: Handle,
        sink: Weak<dyn RequestSink>,
    ) -> Result<()> {
        if let Some(existing) = self.services.get(name) {
            if existing.1.upgrade().is_some() {
                return Err(Error::ServiceNameInUse(name.to_string()));
            }
        }
        self.services.insert(name.to_string(), (handle, sink));
        Ok(())
    }

    /// Remove a service registration, but only if it still belongs to the
    /// given handle (a newer service may have reclaimed the name).
    pub(crate) fn unregister_service(&self, name: &str, handle: Handle) {
        self.services
            .remove_if(name, |_, (owner, _)| *owner == handle);
    }

    /// True if a live service is registered under the name.
    pub(crate) fn service_is_ready(&self, name: &str) -> bool {
        self.services
            .get(name)
            .is_some_and(|entry| entry.1.upgrade().is_some())
    }

    /// Hand one request to the named service's inbox.
    pub(crate) fn route_request(
        &self,
        name: &str,
        request_id: RequestId,
        request: Box<dyn Any + Send>,
        reply_to: Weak<dyn ResponseSink>,
    ) -> Result<()> {
        let sink = self
            .services
            .get(name)
            .and_then(|entry| entry.1.upgrade());

        let Some(sink) = sink else {
            self.services.remove_if(name, |_, (_, sink)| sink.upgrade().is_none());
            return Err(Error::ServiceUnavailable(name.to_string()));
        };

        if sink.push_erased(request_id, request, reply_to) {
            Ok(())
        } else {
            Err(Error::TypeMismatch(name.to_string()))
        }
    }
}
