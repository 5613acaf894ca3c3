// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-threaded cooperative executor.
//!
//! Every spin variant follows the same cycle: rebuild the endpoint lists
//! from the attached nodes, block on a fresh [`WaitSet`] holding every
//! queue-backed ready condition plus the context's shutdown guard (capped at
//! the earliest timer deadline), confirm readiness after the wake, then
//! dispatch from the snapshot in fixed category priority order. The snapshot
//! is cleared at the start of each cycle, so an endpoint runs at most one
//! callback per cycle.
//!
//! Timeouts are nanosecond-valued: negative blocks indefinitely, zero polls,
//! positive bounds the wait.

mod select;
#[cfg(test)]
mod tests;

pub use select::SelectedExecutable;

use crate::condition::Condition;
use crate::context::Context;
use crate::endpoint::{
    ActionServerBase, ClientBase, EventBase, ServiceBase, SubscriptionBase, TimerBase,
};
use crate::error::{Error, Result};
use crate::future::RclFuture;
use crate::node::Node;
use crate::waitset::WaitSet;
use parking_lot::Mutex;
use select::ReadyWork;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Throttle slice for [`SingleThreadedExecutor::spin_until_complete`]: the
/// future is re-checked at least every 10ms.
const SPIN_THROTTLE_NS: i64 = 10_000_000;

fn timeout_from_ns(timeout_ns: i64) -> Option<Duration> {
    if timeout_ns < 0 {
        None
    } else {
        Some(Duration::from_nanos(timeout_ns as u64))
    }
}

/// Single-threaded cooperative executor over a set of nodes.
///
/// All dispatch happens on the thread calling a spin method; callbacks never
/// overlap.
pub struct SingleThreadedExecutor {
    context: Context,
    nodes: Mutex<Vec<Arc<Node>>>,
    work: Mutex<ReadyWork>,
}

impl SingleThreadedExecutor {
    #[must_use]
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            nodes: Mutex::new(Vec::new()),
            work: Mutex::new(ReadyWork::default()),
        }
    }

    /// Attach a node. Attaching the same node again is a no-op.
    pub fn add_node(&self, node: &Arc<Node>) {
        let mut nodes = self.nodes.lock();
        if nodes.iter().any(|existing| Arc::ptr_eq(existing, node)) {
            return;
        }
        log::debug!("[executor] node '{}' attached", node.name());
        nodes.push(Arc::clone(node));
    }

    /// Detach a node. Returns `false` if it was not attached.
    pub fn remove_node(&self, node: &Arc<Node>) -> bool {
        let mut nodes = self.nodes.lock();
        let Some(position) = nodes.iter().position(|existing| Arc::ptr_eq(existing, node))
        else {
            return false;
        };
        nodes.remove(position);
        log::debug!("[executor] node '{}' detached", node.name());
        true
    }

    /// Attached node count.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Rebuild the ready-work snapshot, blocking up to `timeout_ns` for
    /// something to become ready. An elapsed timeout leaves an empty
    /// snapshot and is not an error; context shutdown is.
    fn wait_for_work(&self, timeout_ns: i64) -> Result<()> {
        self.work.lock().clear();
        if !self.context.ok() {
            return Err(Error::InvalidContext);
        }

        let nodes: Vec<Arc<Node>> = self.nodes.lock().clone();
        let mut timers: Vec<Arc<dyn TimerBase>> = Vec::new();
        let mut subscriptions: Vec<Arc<dyn SubscriptionBase>> = Vec::new();
        let mut services: Vec<Arc<dyn ServiceBase>> = Vec::new();
        let mut clients: Vec<Arc<dyn ClientBase>> = Vec::new();
        let mut events: Vec<Arc<dyn EventBase>> = Vec::new();
        let mut action_servers: Vec<Arc<dyn ActionServerBase>> = Vec::new();
        for node in &nodes {
            timers.extend(node.timers().into_iter().filter(|t| !t.is_canceled()));
            subscriptions.extend(node.subscriptions());
            services.extend(node.services());
            clients.extend(node.clients());
            events.extend(node.events());
            action_servers.extend(node.action_servers());
        }

        // status events ride on their owning endpoint and do not count on
        // their own
        let wait_count = timers.len()
            + subscriptions.len()
            + services.len()
            + clients.len()
            + action_servers
                .iter()
                .map(|server| server.waitable_count())
                .sum::<usize>();
        if wait_count == 0 {
            log::trace!("[executor] nothing to wait on");
            return Ok(());
        }

        let waitset = WaitSet::new();
        let shutdown_guard: Arc<dyn Condition> = self.context.shutdown_guard();
        if let Err(err) = waitset.attach_condition(shutdown_guard) {
            log::warn!("[executor] shutdown guard attach failed: {}", err);
        }
        for node in &nodes {
            for condition in node.ready_conditions() {
                let condition: Arc<dyn Condition> = condition;
                if let Err(err) = waitset.attach_condition(condition) {
                    log::warn!("[executor] condition attach failed: {}", err);
                }
            }
        }

        // cap the wait at the earliest timer deadline
        let mut timeout = timeout_from_ns(timeout_ns);
        for timer in &timers {
            if let Some(due) = timer.time_until_next_call() {
                timeout = Some(timeout.map_or(due, |t| t.min(due)));
            }
        }

        match waitset.wait(timeout) {
            Ok(_) | Err(Error::Timeout) => {}
            Err(err) => return Err(err),
        }
        drop(waitset);

        if !self.context.ok() {
            return Err(Error::InvalidContext);
        }

        // confirm readiness after the wake; the snapshot only ever holds
        // endpoints that were ready at this point
        let mut work = self.work.lock();
        work.timers.extend(timers.into_iter().filter(|t| t.is_ready()));
        work.subscriptions.extend(
            subscriptions
                .into_iter()
                .filter(|s| s.ready_condition().is_triggered()),
        );
        work.services.extend(
            services
                .into_iter()
                .filter(|s| s.ready_condition().is_triggered()),
        );
        work.clients.extend(
            clients
                .into_iter()
                .filter(|c| c.ready_condition().is_triggered()),
        );
        work.events.extend(
            events
                .into_iter()
                .filter(|e| e.ready_condition().is_triggered()),
        );
        work.action_servers
            .extend(action_servers.into_iter().filter(|a| a.is_ready()));
        Ok(())
    }

    fn dispatch(&self, executable: &SelectedExecutable) {
        log::trace!("[executor] dispatch {}", executable.kind());
        match executable {
            SelectedExecutable::Timer(timer) => {
                timer.advance();
                timer.execute_callback();
            }
            SelectedExecutable::Subscription(subscription) => subscription.execute(),
            SelectedExecutable::Service(service) => service.execute(),
            SelectedExecutable::Client(client) => client.execute(),
            SelectedExecutable::Event(event) => event.execute(),
            SelectedExecutable::ActionServer(server) => server.execute(),
        }
    }

    /// Wait up to `timeout_ns` for work and dispatch at most one callback.
    ///
    /// Doing nothing because the timeout elapsed is `Ok`; shutdown while
    /// waiting is [`Error::InvalidContext`].
    pub fn spin_once(&self, timeout_ns: i64) -> Result<()> {
        self.wait_for_work(timeout_ns)?;
        let next = self.work.lock().select_next();
        if let Some(executable) = next {
            self.dispatch(&executable);
        }
        Ok(())
    }

    /// Dispatch everything ready at the time of the call, without blocking,
    /// then return. Work arriving during the pass is left for the next spin.
    ///
    /// `max_duration_ns <= 0` means no duration bound.
    pub fn spin_some(&self, max_duration_ns: i64) -> Result<()> {
        self.spin_some_impl(max_duration_ns, false)
    }

    /// Like [`SingleThreadedExecutor::spin_some`], but keeps collecting
    /// until no endpoint is ready, including work produced by the callbacks
    /// of this very pass.
    pub fn spin_all(&self, max_duration_ns: i64) -> Result<()> {
        self.spin_some_impl(max_duration_ns, true)
    }

    fn spin_some_impl(&self, max_duration_ns: i64, exhaustive: bool) -> Result<()> {
        fn within_budget(start: Instant, max_duration_ns: i64) -> bool {
            max_duration_ns <= 0 || (start.elapsed().as_nanos() as i64) < max_duration_ns
        }

        let start = Instant::now();
        self.wait_for_work(0)?;
        while self.context.ok() && within_budget(start, max_duration_ns) {
            let next = self.work.lock().select_next();
            match next {
                Some(executable) => self.dispatch(&executable),
                None if exhaustive => {
                    self.wait_for_work(0)?;
                    if self.work.lock().is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Spin until the context is shut down.
    pub fn spin(&self) {
        while self.context.ok() {
            if self.spin_once(-1).is_err() {
                break;
            }
        }
    }

    /// Spin until `future` completes, `max_duration_ns` elapses
    /// ([`Error::Timeout`]) or the context shuts down
    /// ([`Error::InvalidContext`]). `max_duration_ns <= 0` means no bound.
    ///
    /// Spins in bounded slices so completion is observed within 10ms even
    /// when no further work arrives.
    pub fn spin_until_complete<V: Send + 'static>(
        &self,
        future: &RclFuture<V>,
        max_duration_ns: i64,
    ) -> Result<()> {
        if future.is_done() {
            return Ok(());
        }

        let slice_ns = if max_duration_ns > 0 {
            (max_duration_ns / 10).clamp(1, SPIN_THROTTLE_NS)
        } else {
            SPIN_THROTTLE_NS
        };

        let start = Instant::now();
        loop {
            if !self.context.ok() {
                return Err(Error::InvalidContext);
            }
            if max_duration_ns > 0 && (start.elapsed().as_nanos() as i64) >= max_duration_ns {
                return Err(Error::Timeout);
            }
            self.spin_once(slice_ns)?;
            if future.is_done() {
                return Ok(());
            }
        }
    }
}
