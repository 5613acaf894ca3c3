// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by rclite operations.

/// Errors returned by rclite operations.
///
/// Covers context lifecycle, intra-process routing and blocking-wait
/// conditions. Dispatch itself is infallible by design: user callbacks that
/// panic propagate out of the spin call, and readiness/take races are
/// silent no-ops rather than errors.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Context Errors
    // ========================================================================
    /// The context has been shut down and cannot create new entities.
    InvalidContext,

    // ========================================================================
    // Routing Errors
    // ========================================================================
    /// No live service is registered under the given name.
    ServiceUnavailable(String),
    /// A live service is already registered under the given name.
    ServiceNameInUse(String),
    /// Request or response payload type does not match the remote endpoint.
    TypeMismatch(String),

    // ========================================================================
    // Wait Errors
    // ========================================================================
    /// Condition is already attached to the waitset.
    AlreadyAttached,
    /// Condition is not attached to the waitset.
    NotAttached,
    /// A bounded wait elapsed before the awaited event occurred.
    Timeout,
    /// The wait was interrupted by context shutdown.
    Interrupted,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Context
            Error::InvalidContext => write!(f, "Context has been shut down"),
            // Routing
            Error::ServiceUnavailable(name) => write!(f, "Service unavailable: {}", name),
            Error::ServiceNameInUse(name) => write!(f, "Service name already in use: {}", name),
            Error::TypeMismatch(name) => write!(f, "Payload type mismatch for: {}", name),
            // Wait
            Error::AlreadyAttached => write!(f, "Condition already attached to waitset"),
            Error::NotAttached => write!(f, "Condition not attached to waitset"),
            Error::Timeout => write!(f, "Wait timed out"),
            Error::Interrupted => write!(f, "Wait interrupted by shutdown"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for rclite operations.
pub type Result<T> = std::result::Result<T, Error>;
