//! Blocking HTTP driver for a goal-accepting execution service.
//!
//! The service accepts one goal at a time, reports its status while it runs,
//! and can be asked to cancel everything in flight.
//!
//! # Protocol
//!
//! ```text
//! POST {server}/goals              {"goal_id", "goal": GoalSpec}  → 2xx
//! GET  {server}/goals/{goal_id}    → {"goal_id", "status"}        (404 = lost)
//! POST {server}/goals/cancel       → 2xx
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use goal_client::{GoalClient, GoalSpec};
//! use std::time::Duration;
//!
//! let client = GoalClient::new("http://localhost:8090", Duration::from_secs(5))?;
//! client.submit(&goal)?;
//! while !client.status()?.is_terminal() {
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;


pub use client::GoalClient;
pub use error::GoalClientError;
pub use types::{GoalSpec, GoalStatus, Motion, PreemptionMode, Step};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GoalClientError>;
