//! netfwd - IPv4 forwarding plane
//!
//! ARP-resolving network interfaces driven by an external clock, plus a
//! static longest-prefix-match router that moves datagrams between them.
//! Everything is single-threaded and synchronous: callers feed frames in,
//! call `tick`/`route`, and drain outbound frames.

pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
