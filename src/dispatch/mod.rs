// src/dispatch/mod.rs

//! Run intake and execution.
//!
//! - [`intake`] holds the on-demand and periodic queues and the
//!   [`RunRequests`] facade that registers runs and feeds them.
//! - [`dispatcher`] is the single consumer that executes queued jobs one at
//!   a time.
//! - [`periodic`] is the ticking scheduler that requests periodic runs,
//!   gated by the operator lock and maintenance windows.

pub mod dispatcher;
pub mod intake;
pub mod periodic;

pub use dispatcher::{spawn_dispatcher, Dispatcher};
pub use intake::{intake_channels, IntakeReceivers, IntakeSenders, RunRequests};
pub use periodic::{spawn_periodic_scheduler, time_to_run, PeriodicScheduler};
