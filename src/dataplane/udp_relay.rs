//! UDP relay over a SOCKS5 UDP-associate channel
//!
//! Outbound: a captured IP/UDP packet becomes a relay frame addressed to the
//! original destination, plus a reply template (the captured headers with
//! addresses and ports reverted). Inbound: each relay frame's payload is
//! appended to the template and lengths and checksums are fixed up.

use crate::config::{FragmentPolicy, RelayConfig};
use crate::protocol::ip::IpHeader;
use crate::protocol::socks5::{Address, Socks5UdpDatagram};
use crate::protocol::ipv6;
use crate::protocol::types::IpVersion;
use crate::telemetry::RelayStats;
use crate::{Error, Result};
use bytes::Bytes;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest datagram whose lengths fit the 16-bit header fields
const MAX_PACKET: usize = u16::MAX as usize;

/// Captured IP + UDP headers with source and destination swapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTemplate {
    header: Vec<u8>,
    version: IpVersion,
}

impl ReplyTemplate {
    /// Detached template for replies to `ip`, which must carry UDP.
    pub fn from_request<T: AsRef<[u8]>>(ip: &IpHeader<T>) -> Result<Self> {
        let mut header = ip.udp()?.header().to_vec();
        let len = header.len();

        let mut template = IpHeader::parse(&mut header[..], len)?;
        template.revert_address();
        template.udp_mut()?.revert_port();
        let version = template.version();

        Ok(Self { header, version })
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    /// Template followed by `payload`, with the IP total length (and IPv4
    /// header checksum) or IPv6 payload length, the UDP length and the UDP
    /// checksum all recomputed.
    pub fn build(&self, payload: &[u8], mtu: usize) -> Result<Vec<u8>> {
        let size = self.header.len() + payload.len();
        let limit = mtu.min(MAX_PACKET);
        if size > limit {
            return Err(Error::PacketTooLarge { size, mtu: limit });
        }

        let mut packet = Vec::with_capacity(size);
        packet.extend_from_slice(&self.header);
        packet.extend_from_slice(payload);

        let mut ip = IpHeader::parse(&mut packet[..], size)?;
        match &mut ip {
            IpHeader::V4(h) => {
                h.set_total_length(size as u16);
                h.update_checksum();
            }
            IpHeader::V6(h) => h.set_payload_length((size - ipv6::HEADER_SIZE) as u16),
        }

        let udp_len = size - ip.header_len();
        let mut udp = ip.udp_mut()?;
        udp.set_length(udp_len as u16);
        udp.update_checksum()?;

        Ok(packet)
    }
}

/// One relay direction pair sharing config and counters
#[derive(Debug, Clone)]
pub struct UdpRelay {
    config: RelayConfig,
    stats: Arc<RelayStats>,
}

impl UdpRelay {
    pub fn new(config: RelayConfig, stats: Arc<RelayStats>) -> Self {
        Self { config, stats }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Relay frame for a captured UDP packet, and the template its replies
    /// are built from.
    pub fn encapsulate<T: AsRef<[u8]>>(
        &self,
        ip: &IpHeader<T>,
    ) -> Result<(Socks5UdpDatagram, ReplyTemplate)> {
        let udp = ip.udp()?;
        let datagram = Socks5UdpDatagram::new(
            Address::from(ip.dst_addr()),
            udp.dst_port(),
            Bytes::copy_from_slice(udp.data()?),
        );
        let template = ReplyTemplate::from_request(ip)?;

        self.stats.frames_encoded.inc();
        debug!(
            "UDP relay: {} -> {}:{} ({} bytes)",
            SocketFmt(ip.src_addr(), udp.src_port()),
            datagram.address,
            datagram.port,
            datagram.data.len()
        );
        Ok((datagram, template))
    }

    /// Turn a frame received from the relay into a packet for the TUN
    /// device. `Ok(None)` means the frame was dropped by policy.
    pub fn handle_inbound(&self, frame: &[u8], template: &ReplyTemplate) -> Result<Option<Vec<u8>>> {
        let datagram = match Socks5UdpDatagram::decode(frame) {
            Ok(d) => d,
            Err(e) => {
                self.stats.framing_errors.inc();
                warn!("UDP relay: dropping malformed frame of {} bytes: {}", frame.len(), e);
                return Err(e);
            }
        };
        self.stats.frames_decoded.inc();

        if datagram.frag != 0 && self.config.fragments == FragmentPolicy::Drop {
            self.stats.fragmented_dropped.inc();
            debug!("UDP relay: dropping fragment {} from {}", datagram.frag, datagram.address);
            return Ok(None);
        }

        match template.build(&datagram.data, self.config.mtu) {
            Ok(packet) => Ok(Some(packet)),
            Err(Error::PacketTooLarge { size, mtu }) => {
                self.stats.oversize_dropped.inc();
                warn!("UDP relay: reply of {} bytes exceeds MTU {}", size, mtu);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// `addr:port`, bracketing IPv6
struct SocketFmt(IpAddr, u16);

impl std::fmt::Display for SocketFmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            IpAddr::V4(a) => write!(f, "{}:{}", a, self.1),
            IpAddr::V6(a) => write!(f, "[{}]:{}", a, self.1),
        }
    }
}
