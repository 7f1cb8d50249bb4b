//! Retry support for transient source failures.

pub mod policy;

pub use policy::{RetryExecutor, RetryPolicy};
