//! ClassSight observability.
//!
//! Tracing subscriber setup, request logging middleware for actix-web and
//! trace id propagation between the gateway and the analytics API.

pub mod init;
pub mod macros;
pub mod middleware;
pub mod trace_context;

pub use init::*;
pub use middleware::*;
pub use trace_context::*;

pub use tracing::{debug, error, info, instrument, warn, Instrument};
