//! Core abstractions for the edge experiment router.
//!
//! This crate provides the fundamental types:
//! - `EdgeRequest` - One viewer request as observed at the edge
//! - `Cookie` / `SetCookie` - Cookie header parsing and rendering
//! - `OriginMap` - Path-based origin resolution (green `/`, blue `/blue/*`)
//! - `RequestId` - Correlation identifier for logs

mod config;
mod context;
mod cookie;

pub use config::*;
pub use context::*;
pub use cookie::*;
