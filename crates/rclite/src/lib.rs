// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rclite - single-threaded cooperative robotics executor
//!
//! An in-process client library for robotics-style nodes: publish/subscribe
//! topics, request/reply services, periodic timers, status events and
//! feedback-bearing action servers, all dispatched cooperatively from one
//! spinning thread.
//!
//! ## Quick Start
//!
//! ```rust
//! use rclite::{Context, SingleThreadedExecutor};
//!
//! fn main() -> rclite::Result<()> {
//!     let context = Context::new();
//!     let node = context.create_node("talker")?;
//!     let publisher = node.create_publisher::<String>("chatter")?;
//!     let _subscription = node.create_subscription("chatter", 10, |msg: String| {
//!         println!("heard: {}", msg);
//!     })?;
//!
//!     publisher.publish(&"hello".to_string());
//!
//!     let executor = SingleThreadedExecutor::new(&context);
//!     executor.add_node(&node);
//!     executor.spin_some(0)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                      Application Layer                       |
//! |    Context -> Node -> Publisher/Subscription/Service/...     |
//! +--------------------------------------------------------------+
//! |                       Executor Layer                         |
//! |  SingleThreadedExecutor | ReadyWork snapshot | priority pick |
//! +--------------------------------------------------------------+
//! |                         Wait Layer                           |
//! |    WaitSet | GuardCondition | ReadyCondition | WaitSignal    |
//! +--------------------------------------------------------------+
//! |                        Routing Layer                         |
//! |     intra-process Router: topics by name, services by name   |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Context`] | Process-validity signal, node factory, shutdown fan-out |
//! | [`Node`] | Named container owning one arena per endpoint category |
//! | [`SingleThreadedExecutor`] | Cooperative scheduler; all spin variants |
//! | [`RclFuture`] | Single-slot blocking future resolved by the executor |
//! | [`WaitSet`] | Blocking wait over [`Condition`] triggers |

pub mod action;
pub mod client;
pub mod condition;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod executor;
pub mod future;
pub mod node;
pub mod publisher;
mod registry;
mod router;
pub mod service;
pub mod subscription;
pub mod timer;
pub mod waitset;

pub use action::{
    cancel_service_name, feedback_topic, result_service_name, send_goal_service_name,
    ActionServer, ActionTypes, CancelGoalRequest, CancelGoalResponse, GetResultRequest,
    GetResultResponse, GoalId, GoalStatus, SendGoalRequest, SendGoalResponse, ServerGoalHandle,
};
pub use client::Client;
pub use condition::{Condition, GuardCondition, ReadyCondition, WaitSignal};
pub use context::{Context, ShutdownListener};
pub use endpoint::{
    ActionServerBase, ClientBase, EventBase, Handle, PublisherBase, RequestId, ServiceBase,
    SubscriptionBase, TimerBase,
};
pub use error::{Error, Result};
pub use event::{EventHandler, MessageLostStatus};
pub use executor::{SelectedExecutable, SingleThreadedExecutor};
pub use future::RclFuture;
pub use node::Node;
pub use publisher::Publisher;
pub use service::Service;
pub use subscription::{Subscription, DEFAULT_DEPTH};
pub use timer::WallTimer;
pub use waitset::WaitSet;
