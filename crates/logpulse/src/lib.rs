//! Top-level facade crate for logpulse.
//!
//! Re-exports core types and the realtime client so users can depend on a single crate.

pub mod core {
    pub use logpulse_core::*;
}

pub mod client {
    pub use logpulse_client::*;
}
