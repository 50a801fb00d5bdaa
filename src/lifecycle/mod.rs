//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber's receiver fires → server stops accepting → drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Registration is closed before the listener starts
//! - Ordered shutdown: stop accept, drain in-flight requests, exit

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
