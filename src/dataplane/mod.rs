//! Data plane components
//!
//! Packet handling between the TUN device and the SOCKS5 relay: protocol
//! dispatch, UDP encapsulation in both directions, the TCP redirect to the
//! forward server, and local answers to echo requests.

mod dispatch;
mod icmp_echo;
mod tcp_redirect;
mod udp_relay;

pub use dispatch::{classify, Verdict};
pub use icmp_echo::{handle_echo, EchoAction, EchoResponder, EchoStrategy};
pub use tcp_redirect::{RedirectResult, TcpRedirect, TcpSession};
pub use udp_relay::{ReplyTemplate, UdpRelay};
