//! Experiment assignment at the edge.
//!
//! Every viewer request passes through [`ExperimentRouter::route`], which
//! either redirects the client (assigning a variant and setting the
//! experiment cookie when needed) or lets the request continue to its
//! origin untouched. The variant lives in the client cookie; the router
//! keeps no state between requests.
//!
//! # Example
//!
//! ```ignore
//! use edge_core::EdgeRequest;
//! use edge_experiment::{ExperimentConfig, ExperimentRouter};
//!
//! let router = ExperimentRouter::new(ExperimentConfig::default())?;
//! let decision = router.route(EdgeRequest::new("/").with_cookie("X-Experiment-Name", "B"));
//! assert_eq!(decision.location(), Some("/blue/index.html"));
//! ```

pub mod cloudfront;
mod config;
mod decision;
mod policy;
mod router;
mod variant;

pub use config::*;
pub use decision::*;
pub use policy::*;
pub use router::*;
pub use variant::*;
