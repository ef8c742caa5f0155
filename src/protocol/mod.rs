//! Packet views and wire formats
//!
//! IP and transport headers are zero-copy views over a caller buffer; the
//! SOCKS5 relay frame is an owned value encoded with `bytes`.

pub mod checksum;
pub mod field;
pub mod icmp;
pub mod icmpv6;
pub mod ip;
pub mod ipv4;
pub mod ipv6;
pub mod socks5;
pub mod tcp;
pub mod transport;
pub mod types;
pub mod udp;

pub use ip::IpHeader;
pub use socks5::{Address, AddressType, Socks5UdpDatagram};
pub use transport::{PseudoHeader, Transport};
pub use types::*;
