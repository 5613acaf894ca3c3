// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Action servers - long-running, feedback-bearing RPC.
//!
//! An action server is a composite endpoint built from three internal
//! services (goal submission, cancellation, result retrieval) and one
//! feedback publisher, all on mangled names under the action name. The
//! internal services are routed like any other service but are owned by the
//! action server and never appear in the node's service list; the executor
//! schedules the aggregate as a single unit and its dispatch drains every
//! ready sub-endpoint.
//!
//! Clients interact through the mangled names with plain [`crate::Client`]
//! and [`crate::Subscription`] endpoints; there is no dedicated action
//! client type.

use crate::condition::{Condition, ReadyCondition};
use crate::context::Context;
use crate::endpoint::{ActionServerBase, Handle};
use crate::publisher::Publisher;
use crate::router::RequestSink;
use crate::service::Service;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Message family of one action: goal in, result out, feedback along the way.
pub trait ActionTypes: Send + 'static {
    type Goal: Clone + Send + 'static;
    type Result: Clone + Default + Send + Sync + 'static;
    type Feedback: Clone + Send + 'static;
}

/// Server-side goal identifier, unique per action server.
pub type GoalId = u64;

/// Lifecycle state of one goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GoalStatus {
    /// No such goal (or not yet accepted).
    #[default]
    Unknown,
    Accepted,
    Executing,
    Succeeded,
    Aborted,
    Canceled,
}

impl GoalStatus {
    /// Succeeded, aborted or canceled: no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Aborted | Self::Canceled)
    }
}

/// Request payload of the goal-submission service.
#[derive(Clone)]
pub struct SendGoalRequest<G> {
    pub goal: G,
}

/// Response payload of the goal-submission service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendGoalResponse {
    pub accepted: bool,
    pub goal_id: GoalId,
}

/// Request payload of the cancellation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelGoalRequest {
    pub goal_id: GoalId,
}

/// Response payload of the cancellation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelGoalResponse {
    pub accepted: bool,
}

/// Request payload of the result-retrieval service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetResultRequest {
    pub goal_id: GoalId,
}

/// Response payload of the result-retrieval service: the goal's current
/// status plus its result (default-initialized while non-terminal).
#[derive(Clone, Default)]
pub struct GetResultResponse<R> {
    pub status: GoalStatus,
    pub result: R,
}

struct GoalRecord<R> {
    status: GoalStatus,
    result: Option<R>,
}

struct ActionShared<A: ActionTypes> {
    action_name: String,
    goals: DashMap<GoalId, GoalRecord<A::Result>>,
    next_goal: AtomicU64,
    feedback: Publisher<A::Feedback>,
}

impl<A: ActionTypes> ActionShared<A> {
    /// Transition a goal to a terminal state, storing its result. Terminal
    /// states are sticky; a late transition is ignored.
    fn finish(&self, goal_id: GoalId, status: GoalStatus, result: A::Result) {
        let Some(mut record) = self.goals.get_mut(&goal_id) else {
            log::debug!(
                "[action] '{}' finish on unknown goal {}, ignored",
                self.action_name,
                goal_id
            );
            return;
        };
        if record.status.is_terminal() {
            log::debug!(
                "[action] '{}' goal {} already {:?}, {:?} ignored",
                self.action_name,
                goal_id,
                record.status,
                status
            );
            return;
        }
        record.status = status;
        record.result = Some(result);
    }
}

/// Handed to the goal callback for each accepted goal; the server-side
/// interface for finishing the goal and streaming feedback.
pub struct ServerGoalHandle<A: ActionTypes> {
    goal_id: GoalId,
    goal: A::Goal,
    shared: Arc<ActionShared<A>>,
}

impl<A: ActionTypes> ServerGoalHandle<A> {
    #[must_use]
    pub fn goal_id(&self) -> GoalId {
        self.goal_id
    }

    #[must_use]
    pub fn goal(&self) -> &A::Goal {
        &self.goal
    }

    /// True once a cancel request for this goal has been accepted.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.shared
            .goals
            .get(&self.goal_id)
            .is_some_and(|record| record.status == GoalStatus::Canceled)
    }

    /// Publish one feedback message. Returns the number of subscriptions
    /// reached on the feedback topic.
    pub fn publish_feedback(&self, feedback: &A::Feedback) -> usize {
        self.shared.feedback.publish(feedback)
    }

    /// Finish the goal successfully with its result.
    pub fn succeed(&self, result: A::Result) {
        self.shared.finish(self.goal_id, GoalStatus::Succeeded, result);
    }

    /// Finish the goal as aborted; `result` carries whatever partial result
    /// applies.
    pub fn abort(&self, result: A::Result) {
        self.shared.finish(self.goal_id, GoalStatus::Aborted, result);
    }
}

/// Composite action-server endpoint.
pub struct ActionServer<A: ActionTypes> {
    handle: Handle,
    context: Context,
    shared: Arc<ActionShared<A>>,
    send_goal: Arc<Service<SendGoalRequest<A::Goal>, SendGoalResponse>>,
    cancel: Arc<Service<CancelGoalRequest, CancelGoalResponse>>,
    get_result: Arc<Service<GetResultRequest, GetResultResponse<A::Result>>>,
}

/// Mangled sub-endpoint names for an action.
#[must_use]
pub fn send_goal_service_name(action_name: &str) -> String {
    format!("{action_name}/_action/send_goal")
}

#[must_use]
pub fn cancel_service_name(action_name: &str) -> String {
    format!("{action_name}/_action/cancel_goal")
}

#[must_use]
pub fn result_service_name(action_name: &str) -> String {
    format!("{action_name}/_action/get_result")
}

#[must_use]
pub fn feedback_topic(action_name: &str) -> String {
    format!("{action_name}/_action/feedback")
}

impl<A: ActionTypes> ActionServer<A> {
    pub(crate) fn new<F>(
        handle: Handle,
        action_name: &str,
        context: &Context,
        goal_callback: F,
    ) -> crate::Result<Arc<Self>>
    where
        F: FnMut(ServerGoalHandle<A>) + Send + 'static,
    {
        let shared = Arc::new(ActionShared::<A> {
            action_name: action_name.to_string(),
            goals: DashMap::new(),
            next_goal: AtomicU64::new(1),
            feedback: Publisher::new(context.next_handle(), &feedback_topic(action_name), context),
        });

        let goal_callback: Mutex<Box<dyn FnMut(ServerGoalHandle<A>) + Send>> =
            Mutex::new(Box::new(goal_callback));
        let goal_shared = Arc::clone(&shared);
        let send_goal = Arc::new(Service::new(
            context.next_handle(),
            &send_goal_service_name(action_name),
            move |_id, request: &SendGoalRequest<A::Goal>, response: &mut SendGoalResponse| {
                let goal_id = goal_shared.next_goal.fetch_add(1, Ordering::Relaxed);
                goal_shared.goals.insert(
                    goal_id,
                    GoalRecord {
                        status: GoalStatus::Executing,
                        result: None,
                    },
                );
                response.accepted = true;
                response.goal_id = goal_id;
                log::debug!(
                    "[action] '{}' accepted goal {}",
                    goal_shared.action_name,
                    goal_id
                );
                (goal_callback.lock())(ServerGoalHandle {
                    goal_id,
                    goal: request.goal.clone(),
                    shared: Arc::clone(&goal_shared),
                });
            },
        ));

        let cancel_shared = Arc::clone(&shared);
        let cancel = Arc::new(Service::new(
            context.next_handle(),
            &cancel_service_name(action_name),
            move |_id, request: &CancelGoalRequest, response: &mut CancelGoalResponse| {
                let Some(mut record) = cancel_shared.goals.get_mut(&request.goal_id) else {
                    response.accepted = false;
                    return;
                };
                if record.status.is_terminal() {
                    response.accepted = false;
                    return;
                }
                record.status = GoalStatus::Canceled;
                response.accepted = true;
                log::debug!(
                    "[action] '{}' canceled goal {}",
                    cancel_shared.action_name,
                    request.goal_id
                );
            },
        ));

        let result_shared = Arc::clone(&shared);
        let get_result = Arc::new(Service::new(
            context.next_handle(),
            &result_service_name(action_name),
            move |_id,
                  request: &GetResultRequest,
                  response: &mut GetResultResponse<A::Result>| {
                let Some(record) = result_shared.goals.get(&request.goal_id) else {
                    response.status = GoalStatus::Unknown;
                    return;
                };
                response.status = record.status;
                if let Some(result) = &record.result {
                    response.result = result.clone();
                }
            },
        ));

        let router = context.router();
        let send_goal_sink = Arc::downgrade(&send_goal);
        router.register_service(
            &send_goal_service_name(action_name),
            RequestSink::handle(&*send_goal),
            send_goal_sink,
        )?;
        let cancel_sink = Arc::downgrade(&cancel);
        if let Err(err) = router.register_service(
            &cancel_service_name(action_name),
            RequestSink::handle(&*cancel),
            cancel_sink,
        ) {
            router.unregister_service(
                &send_goal_service_name(action_name),
                RequestSink::handle(&*send_goal),
            );
            return Err(err);
        }
        let result_sink = Arc::downgrade(&get_result);
        if let Err(err) = router.register_service(
            &result_service_name(action_name),
            RequestSink::handle(&*get_result),
            result_sink,
        ) {
            router.unregister_service(
                &send_goal_service_name(action_name),
                RequestSink::handle(&*send_goal),
            );
            router.unregister_service(
                &cancel_service_name(action_name),
                RequestSink::handle(&*cancel),
            );
            return Err(err);
        }

        Ok(Arc::new(Self {
            handle,
            context: context.clone(),
            shared,
            send_goal,
            cancel,
            get_result,
        }))
    }

    /// Current status of a goal; `None` if the goal was never accepted.
    #[must_use]
    pub fn goal_status(&self, goal_id: GoalId) -> Option<GoalStatus> {
        self.shared.goals.get(&goal_id).map(|record| record.status)
    }

    /// Number of accepted goals still in a non-terminal state.
    #[must_use]
    pub fn active_goal_count(&self) -> usize {
        self.shared
            .goals
            .iter()
            .filter(|record| !record.status.is_terminal())
            .count()
    }
}

impl<A: ActionTypes> Drop for ActionServer<A> {
    fn drop(&mut self) {
        let router = self.context.router();
        let name = &self.shared.action_name;
        router.unregister_service(
            &send_goal_service_name(name),
            RequestSink::handle(&*self.send_goal),
        );
        router.unregister_service(
            &cancel_service_name(name),
            RequestSink::handle(&*self.cancel),
        );
        router.unregister_service(
            &result_service_name(name),
            RequestSink::handle(&*self.get_result),
        );
    }
}

impl<A: ActionTypes> ActionServerBase for ActionServer<A> {
    fn handle(&self) -> Handle {
        self.handle
    }

    fn action_name(&self) -> &str {
        &self.shared.action_name
    }

    fn ready_conditions(&self) -> Vec<Arc<ReadyCondition>> {
        use crate::endpoint::ServiceBase;
        vec![
            self.send_goal.ready_condition(),
            self.cancel.ready_condition(),
            self.get_result.ready_condition(),
        ]
    }

    fn is_ready(&self) -> bool {
        self.ready_conditions()
            .iter()
            .any(|condition| condition.is_triggered())
    }

    fn execute(&self) {
        use crate::endpoint::ServiceBase;
        while self.send_goal.ready_condition().is_triggered() {
            self.send_goal.execute();
        }
        while self.cancel.ready_condition().is_triggered() {
            self.cancel.execute();
        }
        while self.get_result.ready_condition().is_triggered() {
            self.get_result.execute();
        }
    }

    fn waitable_count(&self) -> usize {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::endpoint::ClientBase;

    struct Fibonacci;

    impl ActionTypes for Fibonacci {
        type Goal = u32;
        type Result = Vec<u64>;
        type Feedback = u64;
    }

    fn drain_client<Req, Resp>(client: &Client<Req, Resp>)
    where
        Req: Clone + Send + 'static,
        Resp: Send + 'static,
    {
        client.execute();
    }

    #[test]
    fn goal_round_trip_through_mangled_services() {
        let context = Context::new();
        let server = ActionServer::<Fibonacci>::new(
            context.next_handle(),
            "fibonacci",
            &context,
            |goal| {
                let order = *goal.goal() as usize;
                let mut sequence = vec![0_u64, 1];
                while sequence.len() < order {
                    let next = sequence[sequence.len() - 1] + sequence[sequence.len() - 2];
                    goal.publish_feedback(&next);
                    sequence.push(next);
                }
                goal.succeed(sequence);
            },
        )
        .expect("action server");

        let goal_client: Arc<Client<SendGoalRequest<u32>, SendGoalResponse>> = Client::new(
            context.next_handle(),
            &send_goal_service_name("fibonacci"),
            &context,
        );
        let goal_future = goal_client
            .call_async(&SendGoalRequest { goal: 6 })
            .expect("routed");

        assert!(server.is_ready());
        server.execute();
        drain_client(&goal_client);

        let accepted = goal_future.get().expect("goal response");
        assert!(accepted.accepted);
        assert_eq!(
            server.goal_status(accepted.goal_id),
            Some(GoalStatus::Succeeded)
        );

        let result_client: Arc<Client<GetResultRequest, GetResultResponse<Vec<u64>>>> =
            Client::new(
                context.next_handle(),
                &result_service_name("fibonacci"),
                &context,
            );
        let result_future = result_client
            .call_async(&GetResultRequest {
                goal_id: accepted.goal_id,
            })
            .expect("routed");
        server.execute();
        drain_client(&result_client);

        let result = result_future.get().expect("result response");
        assert_eq!(result.status, GoalStatus::Succeeded);
        assert_eq!(result.result, vec![0, 1, 1, 2, 3, 5]);
    }

    #[test]
    fn cancel_accepted_only_while_active() {
        let context = Context::new();
        let server = ActionServer::<Fibonacci>::new(
            context.next_handle(),
            "fibonacci",
            &context,
            |_goal| {},
        )
        .expect("action server");

        let goal_client: Arc<Client<SendGoalRequest<u32>, SendGoalResponse>> = Client::new(
            context.next_handle(),
            &send_goal_service_name("fibonacci"),
            &context,
        );
        let goal_future = goal_client
            .call_async(&SendGoalRequest { goal: 3 })
            .expect("routed");
        server.execute();
        drain_client(&goal_client);
        let goal_id = goal_future.get().expect("goal response").goal_id;
        assert_eq!(server.goal_status(goal_id), Some(GoalStatus::Executing));
        assert_eq!(server.active_goal_count(), 1);

        let cancel_client: Arc<Client<CancelGoalRequest, CancelGoalResponse>> = Client::new(
            context.next_handle(),
            &cancel_service_name("fibonacci"),
            &context,
        );
        let cancel_future = cancel_client
            .call_async(&CancelGoalRequest { goal_id })
            .expect("routed");
        server.execute();
        drain_client(&cancel_client);
        assert!(cancel_future.get().expect("cancel response").accepted);
        assert_eq!(server.goal_status(goal_id), Some(GoalStatus::Canceled));

        // terminal goals reject further cancels
        let second = cancel_client
            .call_async(&CancelGoalRequest { goal_id })
            .expect("routed");
        server.execute();
        drain_client(&cancel_client);
        assert!(!second.get().expect("cancel response").accepted);

        // unknown goals too
        let unknown = cancel_client
            .call_async(&CancelGoalRequest { goal_id: 999 })
            .expect("routed");
        server.execute();
        drain_client(&cancel_client);
        assert!(!unknown.get().expect("cancel response").accepted);
    }

    #[test]
    fn terminal_status_is_sticky() {
        let context = Context::new();
        let handles: Arc<Mutex<Vec<ServerGoalHandle<Fibonacci>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let stash = Arc::clone(&handles);
        let server = ActionServer::<Fibonacci>::new(
            context.next_handle(),
            "fibonacci",
            &context,
            move |goal| stash.lock().push(goal),
        )
        .expect("action server");

        let goal_client: Arc<Client<SendGoalRequest<u32>, SendGoalResponse>> = Client::new(
            context.next_handle(),
            &send_goal_service_name("fibonacci"),
            &context,
        );
        let goal_future = goal_client
            .call_async(&SendGoalRequest { goal: 1 })
            .expect("routed");
        server.execute();
        drain_client(&goal_client);
        let goal_id = goal_future.get().expect("goal response").goal_id;

        let handle = handles.lock().pop().expect("stashed handle");
        handle.abort(vec![]);
        assert_eq!(server.goal_status(goal_id), Some(GoalStatus::Aborted));

        handle.succeed(vec![1]);
        assert_eq!(server.goal_status(goal_id), Some(GoalStatus::Aborted));
    }

    #[test]
    fn dropping_server_frees_the_mangled_names() {
        let context = Context::new();
        let server = ActionServer::<Fibonacci>::new(
            context.next_handle(),
            "fibonacci",
            &context,
            |_goal| {},
        )
        .expect("action server");

        assert!(ActionServer::<Fibonacci>::new(
            context.next_handle(),
            "fibonacci",
            &context,
            |_goal| {},
        )
        .is_err());

        drop(server);
        assert!(ActionServer::<Fibonacci>::new(
            context.next_handle(),
            "fibonacci",
            &context,
            |_goal| {},
        )
        .is_ok());
    }
}
