//! Observability infrastructure for the edge experiment router.
//!
//! This crate provides:
//! - `StructuredLogger` - JSON or human log lines bound to one request
//! - `DecisionRecord` - Serializable summary of one routing decision

mod decision;
mod logging;

pub use decision::*;
pub use logging::*;

// Re-export RequestId from edge-core for convenience
pub use edge_core::RequestId;
