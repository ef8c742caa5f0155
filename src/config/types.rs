//! Configuration types

use crate::telemetry::LogConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Default MTU of the TUN interface replies are written back to
pub const DEFAULT_MTU: usize = 1500;

/// User-defined configuration (config.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub icmp: IcmpConfig,
    #[serde(default)]
    pub tcp: TcpConfig,
    #[serde(default)]
    pub ip: IpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Largest reply packet written back to the TUN device
    #[serde(default = "default_mtu")]
    pub mtu: usize,
    /// What to do with relay frames whose FRAG byte is non-zero
    #[serde(default)]
    pub fragments: FragmentPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            fragments: FragmentPolicy::default(),
        }
    }
}

fn default_mtu() -> usize {
    DEFAULT_MTU
}

/// Handling of fragmented SOCKS5 UDP frames. Reassembly is not supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentPolicy {
    #[default]
    Drop,
    /// Deliver the fragment's payload as if it were a whole datagram
    Accept,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IcmpConfig {
    #[serde(default)]
    pub echo: EchoStrategy,
    /// Base delay before a local echo reply is written; 0 answers at once
    #[serde(default)]
    pub reply_delay_ms: u64,
}

/// How intercepted ICMP/ICMPv6 echo requests are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoStrategy {
    /// Pass the request through untouched
    Direct,
    /// Discard the request
    Drop,
    /// Answer locally with an echo reply
    #[default]
    Reply,
}

/// Handling of packets no other path claims: unknown protocols and ICMP
/// messages other than echo requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OtherStrategy {
    /// Write the packet back unchanged
    #[default]
    Direct,
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IpConfig {
    #[serde(default)]
    pub other: OtherStrategy,
}

/// Default TUN-side address of the local client (IPv4)
pub const DEFAULT_TUN_V4: Ipv4Addr = Ipv4Addr::new(172, 19, 0, 1);

/// Default TUN-side address of the local client (IPv6)
pub const DEFAULT_TUN_V6: Ipv6Addr = Ipv6Addr::new(0xfdfe, 0xdcba, 0x9876, 0, 0, 0, 0, 1);

/// Default idle time before a TCP redirect session is forgotten
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 300;

/// TCP redirect to the local forward server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TcpConfig {
    /// Address the forward server listens on for IPv4 sessions
    #[serde(default = "default_tun_v4")]
    pub tun_v4: Ipv4Addr,
    /// Address the forward server listens on for IPv6 sessions
    #[serde(default = "default_tun_v6")]
    pub tun_v6: Ipv6Addr,
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            tun_v4: DEFAULT_TUN_V4,
            tun_v6: DEFAULT_TUN_V6,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        }
    }
}

fn default_tun_v4() -> Ipv4Addr {
    DEFAULT_TUN_V4
}

fn default_tun_v6() -> Ipv6Addr {
    DEFAULT_TUN_V6
}

fn default_session_timeout() -> u64 {
    DEFAULT_SESSION_TIMEOUT_SECS
}
