// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ready-work snapshot and priority selection.
//!
//! One snapshot is (re)filled per wait cycle. Selection pops from the
//! snapshot, so an endpoint is dispatched at most once per cycle no matter
//! how much work it has queued; category priority is fixed: timers first,
//! then subscriptions, services, clients, status events, action servers.

use crate::endpoint::{
    ActionServerBase, ClientBase, EventBase, ServiceBase, SubscriptionBase, TimerBase,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// One schedulable unit picked out of the ready-work snapshot.
pub enum SelectedExecutable {
    Timer(Arc<dyn TimerBase>),
    Subscription(Arc<dyn SubscriptionBase>),
    Service(Arc<dyn ServiceBase>),
    Client(Arc<dyn ClientBase>),
    Event(Arc<dyn EventBase>),
    ActionServer(Arc<dyn ActionServerBase>),
}

impl SelectedExecutable {
    /// Category name, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timer(_) => "timer",
            Self::Subscription(_) => "subscription",
            Self::Service(_) => "service",
            Self::Client(_) => "client",
            Self::Event(_) => "event",
            Self::ActionServer(_) => "action_server",
        }
    }
}

/// Per-cycle snapshot of ready endpoints, one queue per category.
#[derive(Default)]
pub(crate) struct ReadyWork {
    pub(crate) timers: VecDeque<Arc<dyn TimerBase>>,
    pub(crate) subscriptions: VecDeque<Arc<dyn SubscriptionBase>>,
    pub(crate) services: VecDeque<Arc<dyn ServiceBase>>,
    pub(crate) clients: VecDeque<Arc<dyn ClientBase>>,
    pub(crate) events: VecDeque<Arc<dyn EventBase>>,
    pub(crate) action_servers: VecDeque<Arc<dyn ActionServerBase>>,
}

impl ReadyWork {
    pub(crate) fn clear(&mut self) {
        self.timers.clear();
        self.subscriptions.clear();
        self.services.clear();
        self.clients.clear();
        self.events.clear();
        self.action_servers.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.timers.is_empty()
            && self.subscriptions.is_empty()
            && self.services.is_empty()
            && self.clients.is_empty()
            && self.events.is_empty()
            && self.action_servers.is_empty()
    }

    /// Pop the highest-priority ready executable, or `None` when the
    /// snapshot is exhausted.
    ///
    /// Time-driven entries are re-checked on the way out; a timer canceled
    /// or advanced since the snapshot was taken is skipped, as is an action
    /// server whose sub-endpoints were drained meanwhile.
    pub(crate) fn select_next(&mut self) -> Option<SelectedExecutable> {
        while let Some(timer) = self.timers.pop_front() {
            if timer.is_ready() {
                return Some(SelectedExecutable::Timer(timer));
            }
        }
        if let Some(subscription) = self.subscriptions.pop_front() {
            return Some(SelectedExecutable::Subscription(subscription));
        }
        if let Some(service) = self.services.pop_front() {
            return Some(SelectedExecutable::Service(service));
        }
        if let Some(client) = self.clients.pop_front() {
            return Some(SelectedExecutable::Client(client));
        }
        if let Some(event) = self.events.pop_front() {
            return Some(SelectedExecutable::Event(event));
        }
        while let Some(server) = self.action_servers.pop_front() {
            if server.is_ready() {
                return Some(SelectedExecutable::ActionServer(server));
            }
        }
        None
    }
}
