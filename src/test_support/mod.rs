//! Test utilities shared across crate-level unit tests.

pub mod scheduler;

pub use scheduler::ManualScheduler;
