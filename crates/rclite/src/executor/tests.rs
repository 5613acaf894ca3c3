// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use parking_lot::Mutex as PlMutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

const MS: i64 = 1_000_000;

fn setup() -> (Context, Arc<Node>, SingleThreadedExecutor) {
    let context = Context::new();
    let node = context.create_node("test").expect("node");
    let executor = SingleThreadedExecutor::new(&context);
    executor.add_node(&node);
    (context, node, executor)
}

#[test]
fn add_node_is_idempotent_remove_detaches() {
    let (_context, node, executor) = setup();
    executor.add_node(&node);
    assert_eq!(executor.node_count(), 1);
    assert!(executor.remove_node(&node));
    assert!(!executor.remove_node(&node));
    assert_eq!(executor.node_count(), 0);
}

#[test]
fn timer_fires_once_per_blocking_spin() {
    let (_context, node, executor) = setup();
    let fired = Arc::new(AtomicU32::new(0));
    let fired_clone = Arc::clone(&fired);
    let _timer = node
        .create_wall_timer(Duration::from_millis(20), move || {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        })
        .expect("timer");

    for _ in 0..3 {
        executor.spin_once(-1).expect("spin");
    }
    assert_eq!(fired.load(Ordering::Relaxed), 3);
}

#[test]
fn timers_win_over_subscriptions() {
    let (_context, node, executor) = setup();
    let order: Arc<PlMutex<Vec<&'static str>>> = Arc::new(PlMutex::new(Vec::new()));

    let timer_order = Arc::clone(&order);
    let _timer = node
        .create_wall_timer(Duration::from_millis(50), move || {
            timer_order.lock().push("timer");
        })
        .expect("timer");
    let sub_order = Arc::clone(&order);
    let _subscription = node
        .create_subscription("chatter", 10, move |_: u32| {
            sub_order.lock().push("subscription");
        })
        .expect("subscription");
    let publisher = node.create_publisher::<u32>("chatter").expect("publisher");

    publisher.publish(&1);
    thread::sleep(Duration::from_millis(60));

    // both ready: the timer is selected first
    executor.spin_once(0).expect("spin");
    executor.spin_once(0).expect("spin");
    assert_eq!(*order.lock(), vec!["timer", "subscription"]);
}

#[test]
fn canceled_timer_is_never_dispatched() {
    let (_context, node, executor) = setup();
    let fired = Arc::new(AtomicU32::new(0));
    let fired_clone = Arc::clone(&fired);
    let timer = node
        .create_wall_timer(Duration::from_millis(1), move || {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        })
        .expect("timer");

    thread::sleep(Duration::from_millis(5));
    timer.cancel();
    executor.spin_once(10 * MS).expect("spin");
    assert_eq!(fired.load(Ordering::Relaxed), 0);
}

#[test]
fn spin_once_timeout_elapses_without_work() {
    let (_context, node, executor) = setup();
    let _client = node.create_client::<u64, u64>("add").expect("client");

    let start = Instant::now();
    executor.spin_once(50 * MS).expect("spin");
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_secs(2));
}

#[test]
fn spin_some_takes_one_message_per_call() {
    let (_context, node, executor) = setup();
    let seen = Arc::new(AtomicU32::new(0));
    let seen_clone = Arc::clone(&seen);
    let subscription = node
        .create_subscription("chatter", 10, move |_: u32| {
            seen_clone.fetch_add(1, Ordering::Relaxed);
        })
        .expect("subscription");
    let publisher = node.create_publisher::<u32>("chatter").expect("publisher");
    for m in 0..3_u32 {
        publisher.publish(&m);
    }

    // one snapshot entry per endpoint per pass
    executor.spin_some(0).expect("spin");
    assert_eq!(seen.load(Ordering::Relaxed), 1);
    assert_eq!(subscription.pending(), 2);

    executor.spin_all(0).expect("spin");
    assert_eq!(seen.load(Ordering::Relaxed), 3);
    assert_eq!(subscription.pending(), 0);
}

#[test]
fn spin_some_without_work_returns_immediately() {
    let (_context, node, executor) = setup();
    let _client = node.create_client::<u64, u64>("add").expect("client");

    let start = Instant::now();
    executor.spin_some(0).expect("spin");
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[test]
fn rpc_round_trip_with_spin_until_complete() {
    let (_context, node, executor) = setup();
    let _service = node
        .create_service::<u64, u64, _>("add_one", |_id, request, response| {
            *response = request + 1;
        })
        .expect("service");
    let client = node.create_client::<u64, u64>("add_one").expect("client");

    let future = client.call_async(&41).expect("routed");
    executor
        .spin_until_complete(&future, 2_000 * MS)
        .expect("complete");
    assert_eq!(future.get(), Some(42));
    assert_eq!(client.pending_request_count(), 0);
}

#[test]
fn spin_until_complete_times_out() {
    let (context, node, executor) = setup();
    // the client never sends anything, so no work ever arrives
    let _client = node.create_client::<u64, u64>("void").expect("client");
    let future: Arc<RclFuture<u64>> = RclFuture::new(&context);

    let start = Instant::now();
    let result = executor.spin_until_complete(&future, 100 * MS);
    assert!(matches!(result, Err(Error::Timeout)));
    assert!(start.elapsed() >= Duration::from_millis(80));
}

#[test]
fn shutdown_interrupts_blocking_spin() {
    let (context, node, executor) = setup();
    let _client = node.create_client::<u64, u64>("add").expect("client");

    let remote = context.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.shutdown();
    });

    let start = Instant::now();
    executor.spin();
    let elapsed = start.elapsed();
    stopper.join().expect("stopper thread");

    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_secs(5));
    assert!(matches!(
        executor.spin_once(0),
        Err(Error::InvalidContext)
    ));
}

#[test]
fn overflow_event_dispatched_after_subscription() {
    let (_context, node, executor) = setup();
    let order: Arc<PlMutex<Vec<&'static str>>> = Arc::new(PlMutex::new(Vec::new()));

    let sub_order = Arc::clone(&order);
    let subscription = node
        .create_subscription("chatter", 1, move |_: u32| {
            sub_order.lock().push("message");
        })
        .expect("subscription");
    let event_order = Arc::clone(&order);
    let _handler = subscription.on_message_lost(move |status| {
        assert_eq!(status.total_count, 1);
        event_order.lock().push("lost");
    });
    let publisher = node.create_publisher::<u32>("chatter").expect("publisher");

    publisher.publish(&1);
    publisher.publish(&2);
    assert_eq!(subscription.messages_lost(), 1);

    executor.spin_all(0).expect("spin");
    assert_eq!(*order.lock(), vec!["message", "lost"]);
}

#[test]
fn action_goal_completes_through_spin() {
    use crate::action::{
        send_goal_service_name, ActionTypes, GoalStatus, SendGoalRequest, SendGoalResponse,
    };

    struct Doubler;
    impl ActionTypes for Doubler {
        type Goal = u32;
        type Result = u64;
        type Feedback = u32;
    }

    let (_context, node, executor) = setup();
    let server = node
        .create_action_server::<Doubler, _>("double", |goal| {
            let result = u64::from(*goal.goal()) * 2;
            goal.succeed(result);
        })
        .expect("action server");
    let goal_client = node
        .create_client::<SendGoalRequest<u32>, SendGoalResponse>(&send_goal_service_name(
            "double",
        ))
        .expect("client");

    let future = goal_client
        .call_async(&SendGoalRequest { goal: 21 })
        .expect("routed");
    executor
        .spin_until_complete(&future, 2_000 * MS)
        .expect("complete");

    let response = future.get().expect("goal response");
    assert!(response.accepted);
    assert_eq!(
        server.goal_status(response.goal_id),
        Some(GoalStatus::Succeeded)
    );
    assert_eq!(server.active_goal_count(), 0);
}
