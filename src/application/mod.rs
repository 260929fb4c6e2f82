//! Application layer - Scheduling and orchestration
//!
//! This layer drives the interpreter: it owns running instances, routes
//! inbound responses and signals, and flushes shared state.

pub mod api;
pub mod persistence;
pub mod scheduler;

pub use scheduler::{EventScheduler, TickReport};
