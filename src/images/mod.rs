//! Image acquisition and normalization.

pub mod cache;
pub mod handler;
pub mod resolver;

pub use handler::{CacheStats, ImageHandler};
pub use resolver::{QualitySteps, SizeConstraintResolver};
