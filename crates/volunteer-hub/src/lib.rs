//! Volunteer lifecycle and authorization engine.
//!
//! Tracks a user's participation in an opportunity (task) from application
//! through assignment, selection, completion, and withdrawal. Every transition
//! is gated by [`volunteers::policy::AuthorizationPolicy`] and produces at most
//! one notification per actual state change.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod volunteers;
