// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node - named endpoint container.
//!
//! A node owns one arena per endpoint category and hands the executor fresh
//! snapshots of each on every wait cycle; the executor never holds a lock
//! across a wait. Factories allocate the handle, wire the endpoint into the
//! context router where the category needs it, then record the endpoint in
//! its arena. Removal detaches the router side under the same handle.

use crate::action::{ActionServer, ActionTypes};
use crate::client::Client;
use crate::condition::ReadyCondition;
use crate::context::Context;
use crate::endpoint::{
    ActionServerBase, ClientBase, EventBase, Handle, PublisherBase, RequestId, ServiceBase,
    SubscriptionBase, TimerBase,
};
use crate::publisher::Publisher;
use crate::registry::HandleArena;
use crate::service::Service;
use crate::subscription::Subscription;
use crate::timer::WallTimer;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Named endpoint container bound to one [`Context`].
pub struct Node {
    name: String,
    context: Context,
    timers: RwLock<HandleArena<dyn TimerBase>>,
    subscriptions: RwLock<HandleArena<dyn SubscriptionBase>>,
    services: RwLock<HandleArena<dyn ServiceBase>>,
    clients: RwLock<HandleArena<dyn ClientBase>>,
    publishers: RwLock<HandleArena<dyn PublisherBase>>,
    action_servers: RwLock<HandleArena<dyn ActionServerBase>>,
}

impl Node {
    pub(crate) fn new(name: &str, context: &Context) -> Self {
        Self {
            name: name.to_string(),
            context: context.clone(),
            timers: RwLock::new(HandleArena::new()),
            subscriptions: RwLock::new(HandleArena::new()),
            services: RwLock::new(HandleArena::new()),
            clients: RwLock::new(HandleArena::new()),
            publishers: RwLock::new(HandleArena::new()),
            action_servers: RwLock::new(HandleArena::new()),
        }
    }

    /// Node name, as given at creation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context this node was created from.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    fn check_valid(&self) -> crate::Result<()> {
        if self.context.ok() {
            Ok(())
        } else {
            Err(crate::Error::InvalidContext)
        }
    }

    /// Create a publisher on `topic`.
    pub fn create_publisher<M: Clone + Send + 'static>(
        &self,
        topic: &str,
    ) -> crate::Result<Arc<Publisher<M>>> {
        self.check_valid()?;
        let handle = self.context.next_handle();
        let publisher = Arc::new(Publisher::new(handle, topic, &self.context));
        self.publishers
            .write()
            .insert(handle, Arc::clone(&publisher) as Arc<dyn PublisherBase>);
        log::debug!("[node] '{}' publisher on '{}' ({})", self.name, topic, handle);
        Ok(publisher)
    }

    /// Create a subscription on `topic` with a bounded inbox of `depth`
    /// messages (clamped to at least one).
    pub fn create_subscription<M, F>(
        &self,
        topic: &str,
        depth: usize,
        callback: F,
    ) -> crate::Result<Arc<Subscription<M>>>
    where
        M: Clone + Send + 'static,
        F: FnMut(M) + Send + 'static,
    {
        self.check_valid()?;
        let handle = self.context.next_handle();
        let subscription = Arc::new(Subscription::new(
            handle,
            topic,
            depth,
            &self.context,
            callback,
        ));
        let sink = Arc::downgrade(&subscription);
        self.context.router().add_subscription(topic, handle, sink);
        self.subscriptions
            .write()
            .insert(handle, Arc::clone(&subscription) as Arc<dyn SubscriptionBase>);
        log::debug!(
            "[node] '{}' subscription on '{}' ({}, depth {})",
            self.name,
            topic,
            handle,
            depth.max(1)
        );
        Ok(subscription)
    }

    /// Create a service under `name`. Fails while a live service already
    /// holds the name anywhere in the context.
    pub fn create_service<Req, Resp, F>(
        &self,
        name: &str,
        handler: F,
    ) -> crate::Result<Arc<Service<Req, Resp>>>
    where
        Req: Send + 'static,
        Resp: Default + Send + 'static,
        F: FnMut(&RequestId, &Req, &mut Resp) + Send + 'static,
    {
        self.check_valid()?;
        let handle = self.context.next_handle();
        let service = Arc::new(Service::new(handle, name, handler));
        let sink = Arc::downgrade(&service);
        self.context.router().register_service(name, handle, sink)?;
        self.services
            .write()
            .insert(handle, Arc::clone(&service) as Arc<dyn ServiceBase>);
        log::debug!("[node] '{}' service '{}' ({})", self.name, name, handle);
        Ok(service)
    }

    /// Create a client for the service under `name`. The service does not
    /// have to exist yet; see [`Client::service_is_ready`].
    pub fn create_client<Req, Resp>(&self, name: &str) -> crate::Result<Arc<Client<Req, Resp>>>
    where
        Req: Clone + Send + 'static,
        Resp: Send + 'static,
    {
        self.check_valid()?;
        let handle = self.context.next_handle();
        let client = Client::new(handle, name, &self.context);
        self.clients
            .write()
            .insert(handle, Arc::clone(&client) as Arc<dyn ClientBase>);
        log::debug!("[node] '{}' client for '{}' ({})", self.name, name, handle);
        Ok(client)
    }

    /// Create a periodic wall-clock timer. The first firing is one full
    /// period after creation.
    pub fn create_wall_timer<F>(
        &self,
        period: Duration,
        callback: F,
    ) -> crate::Result<Arc<WallTimer>>
    where
        F: FnMut() + Send + 'static,
    {
        self.check_valid()?;
        let handle = self.context.next_handle();
        let timer = Arc::new(WallTimer::new(handle, period, callback));
        self.timers
            .write()
            .insert(handle, Arc::clone(&timer) as Arc<dyn TimerBase>);
        log::debug!(
            "[node] '{}' timer every {:?} ({})",
            self.name,
            period,
            handle
        );
        Ok(timer)
    }

    /// Create an action server under `action_name`; `goal_callback` runs once
    /// per accepted goal with its [`crate::ServerGoalHandle`].
    pub fn create_action_server<A, F>(
        &self,
        action_name: &str,
        goal_callback: F,
    ) -> crate::Result<Arc<ActionServer<A>>>
    where
        A: ActionTypes,
        F: FnMut(crate::ServerGoalHandle<A>) + Send + 'static,
    {
        self.check_valid()?;
        let handle = self.context.next_handle();
        let server = ActionServer::new(handle, action_name, &self.context, goal_callback)?;
        self.action_servers
            .write()
            .insert(handle, Arc::clone(&server) as Arc<dyn ActionServerBase>);
        log::debug!(
            "[node] '{}' action server '{}' ({})",
            self.name,
            action_name,
            handle
        );
        Ok(server)
    }

    /// Remove a publisher by handle.
    pub fn remove_publisher(&self, handle: Handle) -> bool {
        self.publishers.write().remove(handle).is_some()
    }

    /// Remove a subscription by handle, detaching it from its topic.
    pub fn remove_subscription(&self, handle: Handle) -> bool {
        let Some(subscription) = self.subscriptions.write().remove(handle) else {
            return false;
        };
        self.context
            .router()
            .remove_subscription(subscription.topic(), handle);
        true
    }

    /// Remove a service by handle, releasing its name.
    pub fn remove_service(&self, handle: Handle) -> bool {
        let Some(service) = self.services.write().remove(handle) else {
            return false;
        };
        self.context
            .router()
            .unregister_service(service.service_name(), handle);
        true
    }

    /// Remove a client by handle. Outstanding futures never complete.
    pub fn remove_client(&self, handle: Handle) -> bool {
        self.clients.write().remove(handle).is_some()
    }

    /// Remove a timer by handle.
    pub fn remove_timer(&self, handle: Handle) -> bool {
        self.timers.write().remove(handle).is_some()
    }

    /// Remove an action server by handle; its mangled service names are
    /// released once the last reference drops.
    pub fn remove_action_server(&self, handle: Handle) -> bool {
        self.action_servers.write().remove(handle).is_some()
    }

    /// Live timers in creation order.
    #[must_use]
    pub fn timers(&self) -> Vec<Arc<dyn TimerBase>> {
        self.timers.read().snapshot()
    }

    /// Live subscriptions in creation order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Arc<dyn SubscriptionBase>> {
        self.subscriptions.read().snapshot()
    }

    /// Live services in creation order.
    #[must_use]
    pub fn services(&self) -> Vec<Arc<dyn ServiceBase>> {
        self.services.read().snapshot()
    }

    /// Live clients in creation order.
    #[must_use]
    pub fn clients(&self) -> Vec<Arc<dyn ClientBase>> {
        self.clients.read().snapshot()
    }

    /// Live action servers in creation order.
    #[must_use]
    pub fn action_servers(&self) -> Vec<Arc<dyn ActionServerBase>> {
        self.action_servers.read().snapshot()
    }

    /// Status-event handlers of every live subscription and publisher, in
    /// owner creation order.
    #[must_use]
    pub fn events(&self) -> Vec<Arc<dyn EventBase>> {
        let mut events = Vec::new();
        for subscription in self.subscriptions.read().snapshot() {
            events.extend(subscription.event_handlers());
        }
        for publisher in self.publishers.read().snapshot() {
            events.extend(publisher.event_handlers());
        }
        events
    }

    /// Ready conditions of every queue-backed endpoint on this node, for
    /// waitset registration. Timers are excluded (time-driven).
    #[must_use]
    pub(crate) fn ready_conditions(&self) -> Vec<Arc<ReadyCondition>> {
        let mut conditions = Vec::new();
        for subscription in self.subscriptions.read().snapshot() {
            conditions.push(subscription.ready_condition());
        }
        for service in self.services.read().snapshot() {
            conditions.push(service.ready_condition());
        }
        for client in self.clients.read().snapshot() {
            conditions.push(client.ready_condition());
        }
        for event in self.events() {
            conditions.push(event.ready_condition());
        }
        for server in self.action_servers.read().snapshot() {
            conditions.extend(server.ready_conditions());
        }
        conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    #[test]
    fn factories_record_endpoints_in_creation_order() {
        let context = Context::new();
        let node = context.create_node("order").expect("node");

        let _t1 = node
            .create_wall_timer(Duration::from_millis(10), || {})
            .expect("timer");
        let _t2 = node
            .create_wall_timer(Duration::from_millis(20), || {})
            .expect("timer");
        let subscription = node
            .create_subscription("chatter", 5, |_: u32| {})
            .expect("subscription");

        let timers = node.timers();
        assert_eq!(timers.len(), 2);
        assert!(timers[0].handle() < timers[1].handle());
        assert_eq!(node.subscriptions().len(), 1);
        assert_eq!(subscription.pending(), 0);
    }

    #[test]
    fn publish_reaches_subscription_on_same_context() {
        let context = Context::new();
        let node = context.create_node("wiring").expect("node");
        let subscription = node
            .create_subscription("chatter", 5, |_: String| {})
            .expect("subscription");
        let publisher = node.create_publisher::<String>("chatter").expect("publisher");

        assert_eq!(publisher.publish(&"hi".to_string()), 1);
        assert_eq!(subscription.pending(), 1);
        assert!(subscription.ready_condition().is_triggered());
    }

    #[test]
    fn duplicate_service_name_rejected_across_nodes() {
        let context = Context::new();
        let a = context.create_node("a").expect("node");
        let b = context.create_node("b").expect("node");

        let service = a
            .create_service::<u64, u64, _>("add", |_, _, _| {})
            .expect("service");
        assert!(matches!(
            b.create_service::<u64, u64, _>("add", |_, _, _| {}),
            Err(crate::Error::ServiceNameInUse(_))
        ));

        assert!(a.remove_service(crate::endpoint::ServiceBase::handle(&*service)));
        assert!(b.create_service::<u64, u64, _>("add", |_, _, _| {}).is_ok());
    }

    #[test]
    fn removed_subscription_no_longer_receives() {
        let context = Context::new();
        let node = context.create_node("removal").expect("node");
        let subscription = node
            .create_subscription("chatter", 5, |_: u32| {})
            .expect("subscription");
        let publisher = node.create_publisher::<u32>("chatter").expect("publisher");

        let handle = SubscriptionBase::handle(&*subscription);
        assert_eq!(publisher.publish(&1), 1);
        assert!(node.remove_subscription(handle));
        assert_eq!(publisher.publish(&2), 0);
        assert_eq!(node.subscriptions().len(), 0);

        // second removal is a no-op
        assert!(!node.remove_subscription(handle));
    }

    #[test]
    fn events_collects_handlers_from_subscriptions() {
        let context = Context::new();
        let node = context.create_node("events").expect("node");
        let subscription = node
            .create_subscription("chatter", 1, |_: u32| {})
            .expect("subscription");
        assert!(node.events().is_empty());

        let _handler = subscription.on_message_lost(|_| {});
        assert_eq!(node.events().len(), 1);
    }

    #[test]
    fn factories_fail_after_shutdown() {
        let context = Context::new();
        let node = context.create_node("late").expect("node");
        context.shutdown();

        assert!(node.create_publisher::<u32>("chatter").is_err());
        assert!(node.create_subscription("chatter", 1, |_: u32| {}).is_err());
        assert!(node
            .create_wall_timer(Duration::from_millis(1), || {})
            .is_err());
    }
}
