//! Tunrelay - userspace packet views for a TUN-to-SOCKS5 relay
//!
//! IPv4/IPv6 packets captured from a TUN device are inspected and rewritten
//! in place; UDP datagrams are carried over SOCKS5 UDP-associate frames and
//! replies are rebuilt from the captured headers.

pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
