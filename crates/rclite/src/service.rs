// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed RPC service endpoint.
//!
//! A service owns an inbox of pending requests, each carrying its
//! [`RequestId`] and the reply address of the issuing client. Dispatch takes
//! one request, runs the handler against a default-initialized response,
//! then sends the filled response back tagged with the same request id.

use crate::condition::ReadyCondition;
use crate::endpoint::{Handle, RequestId, ServiceBase};
use crate::router::{RequestSink, ResponseSink};
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::{Arc, Weak};

struct IncomingRequest<Req> {
    id: RequestId,
    request: Req,
    reply_to: Weak<dyn ResponseSink>,
}

/// Typed RPC service endpoint.
pub struct Service<Req, Resp>
where
    Req: Send + 'static,
    Resp: Default + Send + 'static,
{
    handle: Handle,
    name: String,
    ready: Arc<ReadyCondition>,
    inbox: SegQueue<IncomingRequest<Req>>,
    #[allow(clippy::type_complexity)]
    handler: Mutex<Box<dyn FnMut(&RequestId, &Req, &mut Resp) + Send>>,
}

impl<Req, Resp> Service<Req, Resp>
where
    Req: Send + 'static,
    Resp: Default + Send + 'static,
{
    pub(crate) fn new<F>(handle: Handle, name: &str, handler: F) -> Self
    where
        F: FnMut(&RequestId, &Req, &mut Resp) + Send + 'static,
    {
        Self {
            handle,
            name: name.to_string(),
            ready: Arc::new(ReadyCondition::new()),
            inbox: SegQueue::new(),
            handler: Mutex::new(Box::new(handler)),
        }
    }

    /// Number of queued, unhandled requests.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

impl<Req, Resp> RequestSink for Service<Req, Resp>
where
    Req: Send + 'static,
    Resp: Default + Send + 'static,
{
    fn handle(&self) -> Handle {
        self.handle
    }

    fn push_erased(
        &self,
        request_id: RequestId,
        request: Box<dyn Any + Send>,
        reply_to: Weak<dyn ResponseSink>,
    ) -> bool {
        let Ok(request) = request.downcast::<Req>() else {
            return false;
        };
        self.inbox.push(IncomingRequest {
            id: request_id,
            request: *request,
            reply_to,
        });
        self.ready.add_work();
        true
    }
}

impl<Req, Resp> ServiceBase for Service<Req, Resp>
where
    Req: Send + 'static,
    Resp: Default + Send + 'static,
{
    fn handle(&self) -> Handle {
        self.handle
    }

    fn service_name(&self) -> &str {
        &self.name
    }

    fn ready_condition(&self) -> Arc<ReadyCondition> {
        Arc::clone(&self.ready)
    }

    fn execute(&self) {
        let Some(incoming) = self.inbox.pop() else {
            log::trace!(
                "[service] take race on '{}' ({}), skipping",
                self.name,
                self.handle
            );
            return;
        };
        self.ready.consume_work();

        let mut response = Resp::default();
        (self.handler.lock())(&incoming.id, &incoming.request, &mut response);

        if let Some(reply_to) = incoming.reply_to.upgrade() {
            reply_to.push_response(incoming.id, Box::new(response));
        } else {
            log::debug!(
                "[service] client for request {:?} on '{}' is gone, response dropped",
                incoming.id,
                self.name
            );
        }
    }
}
