//! Message routing.
//!
//! Re-exports the router and handler types so consumers can depend on this
//! module directly.

pub mod router;

pub use router::{handler, same_handler, DispatchOutcome, Handler, MessageRouter};
