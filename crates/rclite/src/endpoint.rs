// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-erased endpoint categories consumed by the executor.
//!
//! Every schedulable communication primitive falls into exactly one of six
//! categories: timer, subscription, service, client, status event, action
//! server. The executor only ever sees these trait objects; the typed
//! structures live in their own modules.
//!
//! Queue-backed endpoints expose the [`ReadyCondition`] they raise on
//! enqueue; timers are purely time-driven and instead report how long until
//! they are next due so the wait can be capped accordingly.

use crate::condition::ReadyCondition;
use std::sync::Arc;
use std::time::Duration;

/// Stable endpoint identifier, allocated by the [`crate::Context`].
/// Never zero, never reused.
pub type Handle = u64;

/// Correlation key for one outstanding RPC request: the issuing client's
/// handle plus a per-client sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId {
    /// Handle of the client that issued the request.
    pub client_id: Handle,
    /// Per-client monotonically increasing sequence number.
    pub sequence: i64,
}

/// Timer endpoint: time-driven, no take step.
pub trait TimerBase: Send + Sync {
    fn handle(&self) -> Handle;

    /// Period elapsed and not canceled.
    fn is_ready(&self) -> bool;

    /// Time until the timer is next due; `None` when canceled.
    fn time_until_next_call(&self) -> Option<Duration>;

    /// Advance the due time past now (the pre-callback hook).
    fn advance(&self);

    /// Run the user callback.
    fn execute_callback(&self);

    fn is_canceled(&self) -> bool;
}

/// Message subscription endpoint.
pub trait SubscriptionBase: Send + Sync {
    fn handle(&self) -> Handle;

    fn topic(&self) -> &str;

    fn ready_condition(&self) -> Arc<ReadyCondition>;

    /// Take one message and invoke the callback. A take that finds nothing
    /// (readiness/take race) is a silent no-op.
    fn execute(&self);

    /// Status-event handlers attached to this subscription.
    fn event_handlers(&self) -> Vec<Arc<dyn EventBase>>;
}

/// RPC service endpoint.
pub trait ServiceBase: Send + Sync {
    fn handle(&self) -> Handle;

    fn service_name(&self) -> &str;

    fn ready_condition(&self) -> Arc<ReadyCondition>;

    /// Take one pending request, run the handler, send the response tagged
    /// with the request id. Absence of a request is a silent no-op.
    fn execute(&self);
}

/// RPC client endpoint (response side).
pub trait ClientBase: Send + Sync {
    fn handle(&self) -> Handle;

    fn service_name(&self) -> &str;

    fn ready_condition(&self) -> Arc<ReadyCondition>;

    /// Take one response and resolve the matching pending request, removing
    /// it from the pending table. Absence is a silent no-op.
    fn execute(&self);
}

/// Status-event endpoint: pre-extracted status data, callback only.
pub trait EventBase: Send + Sync {
    fn handle(&self) -> Handle;

    fn ready_condition(&self) -> Arc<ReadyCondition>;

    /// Take one status value and invoke the callback.
    fn execute(&self);
}

/// Composite action-server endpoint. Manages its internal sub-endpoints'
/// take/dispatch itself; the executor only sees the aggregate.
pub trait ActionServerBase: Send + Sync {
    fn handle(&self) -> Handle;

    fn action_name(&self) -> &str;

    /// Ready conditions of the internal sub-endpoints, for waitset
    /// registration.
    fn ready_conditions(&self) -> Vec<Arc<ReadyCondition>>;

    /// Any internal sub-endpoint has pending work.
    fn is_ready(&self) -> bool;

    /// Drain every ready internal sub-endpoint.
    fn execute(&self);

    /// Number of internal sub-endpoints contributing to the wait count.
    fn waitable_count(&self) -> usize;
}

/// Publisher surface the node needs for status-event collection.
pub trait PublisherBase: Send + Sync {
    fn handle(&self) -> Handle;

    fn topic(&self) -> &str;

    /// Status-event handlers attached to this publisher.
    fn event_handlers(&self) -> Vec<Arc<dyn EventBase>>;
}
