// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed RPC client endpoint.
//!
//! `call_async` records a pending request keyed by sequence number (with its
//! send timestamp) and returns an [`RclFuture`] that completes when the
//! executor dispatches the matching response. Responses with no pending
//! record - typically after pruning - are dropped with a debug log.

use crate::condition::ReadyCondition;
use crate::context::Context;
use crate::endpoint::{ClientBase, Handle, RequestId};
use crate::future::RclFuture;
use crate::router::ResponseSink;
use dashmap::DashMap;
use crossbeam::queue::SegQueue;
use std::any::Any;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

struct PendingRequest<Resp> {
    future: Arc<RclFuture<Resp>>,
    sent_at: Instant,
}

/// Typed RPC client endpoint.
pub struct Client<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    handle: Handle,
    service_name: String,
    context: Context,
    weak_self: Weak<Self>,
    sequence: AtomicI64,
    pending: DashMap<i64, PendingRequest<Resp>>,
    inbox: SegQueue<(RequestId, Resp)>,
    ready: Arc<ReadyCondition>,
    _request: std::marker::PhantomData<fn(Req)>,
}

impl<Req, Resp> Client<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    pub(crate) fn new(handle: Handle, service_name: &str, context: &Context) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            handle,
            service_name: service_name.to_string(),
            context: context.clone(),
            weak_self: weak_self.clone(),
            sequence: AtomicI64::new(1),
            pending: DashMap::new(),
            inbox: SegQueue::new(),
            ready: Arc::new(ReadyCondition::new()),
            _request: std::marker::PhantomData,
        })
    }

    /// Send a request; the returned future completes once the response has
    /// been taken and dispatched by a spinning executor.
    pub fn call_async(&self, request: &Req) -> crate::Result<Arc<RclFuture<Resp>>> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let request_id = RequestId {
            client_id: self.handle,
            sequence,
        };

        let future = RclFuture::new(&self.context);
        self.pending.insert(
            sequence,
            PendingRequest {
                future: Arc::clone(&future),
                sent_at: Instant::now(),
            },
        );

        let reply_to: Weak<dyn ResponseSink> = self.weak_self.clone();
        let routed = self.context.router().route_request(
            &self.service_name,
            request_id,
            Box::new(request.clone()),
            reply_to,
        );

        if let Err(err) = routed {
            self.pending.remove(&sequence);
            return Err(err);
        }

        log::trace!(
            "[client] '{}' ({}) sent request seq={}",
            self.service_name,
            self.handle,
            sequence
        );
        Ok(future)
    }

    /// True if a live service is currently registered under this client's
    /// service name.
    #[must_use]
    pub fn service_is_ready(&self) -> bool {
        self.context.router().service_is_ready(&self.service_name)
    }

    /// Number of requests still awaiting a response.
    #[must_use]
    pub fn pending_request_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop pending requests older than `age`. Returns how many were
    /// removed; their futures never complete.
    pub fn prune_requests_older_than(&self, age: Duration) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, pending| pending.sent_at.elapsed() <= age);
        before - self.pending.len()
    }
}

impl<Req, Resp> ResponseSink for Client<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    fn push_response(&self, request_id: RequestId, response: Box<dyn Any + Send>) {
        let Ok(response) = response.downcast::<Resp>() else {
            log::warn!(
                "[client] '{}' ({}) received response of wrong type for {:?}",
                self.service_name,
                self.handle,
                request_id
            );
            return;
        };
        self.inbox.push((request_id, *response));
        self.ready.add_work();
    }
}

impl<Req, Resp> ClientBase for Client<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    fn handle(&self) -> Handle {
        self.handle
    }

    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn ready_condition(&self) -> Arc<ReadyCondition> {
        Arc::clone(&self.ready)
    }

    fn execute(&self) {
        let Some((request_id, response)) = self.inbox.pop() else {
            log::trace!(
                "[client] take race on '{}' ({}), skipping",
                self.service_name,
                self.handle
            );
            return;
        };
        self.ready.consume_work();

        match self.pending.remove(&request_id.sequence) {
            Some((_, pending)) => pending.future.set(response),
            None => log::debug!(
                "[client] no pending request for {:?} on '{}', response dropped",
                request_id,
                self.service_name
            ),
        }
    }
}
