//! Transport-layer dispatch and the plumbing shared by TCP, UDP, ICMP and ICMPv6
//!
//! A transport view borrows the owning IP packet and remembers where its
//! header starts plus the pseudo-header terms resolved from the IP layer.
//! Checksums always span `offset..offset + data_len` of the packet.

use super::checksum;
use super::field;
use super::icmp::IcmpHeader;
use super::icmpv6::Icmpv6Header;
use super::tcp::TcpHeader;
use super::types::{IpVersion, Protocol};
use super::udp::UdpHeader;
use crate::Result;

/// Pseudo-header terms contributed by the IP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    pub version: IpVersion,
    /// Unfolded sum of the source and destination address words
    pub address_sum: u64,
    pub protocol: u8,
    /// Transport header + payload length as declared by the IP header
    pub data_len: usize,
}

impl PseudoHeader {
    /// Starting value for an upper-layer checksum
    pub fn seed(&self) -> u64 {
        self.address_sum + self.protocol as u64 + self.data_len as u64
    }
}

/// A transport header located `offset` bytes into an IP packet
#[derive(Debug, Clone)]
pub(crate) struct Segment<T> {
    packet: T,
    offset: usize,
    pseudo: PseudoHeader,
}

impl<T: AsRef<[u8]>> Segment<T> {
    /// `min_len` bytes of fixed header must be present at `offset`.
    pub(crate) fn new(packet: T, offset: usize, pseudo: PseudoHeader, min_len: usize) -> Result<Self> {
        field::read_bytes(packet.as_ref(), offset, min_len)?;
        Ok(Self {
            packet,
            offset,
            pseudo,
        })
    }

    pub(crate) fn packet(&self) -> &[u8] {
        self.packet.as_ref()
    }

    /// Bytes from the start of the transport header to the end of the packet
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.packet.as_ref()[self.offset..]
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn pseudo(&self) -> PseudoHeader {
        self.pseudo
    }

    /// 16-bit field at `at` bytes into the fixed header
    pub(crate) fn u16_at(&self, at: usize) -> u16 {
        let b = self.bytes();
        u16::from_be_bytes([b[at], b[at + 1]])
    }

    pub(crate) fn u32_at(&self, at: usize) -> u32 {
        let b = self.bytes();
        u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    /// Transport bytes after a header of `header_len`, bounded by `data_len`
    pub(crate) fn payload(&self, header_len: usize) -> Result<&[u8]> {
        let len = self.pseudo.data_len.saturating_sub(header_len);
        field::read_bytes(self.packet(), self.offset + header_len, len)
    }

    fn message_sum(&self) -> Result<u64> {
        field::sum_words(self.packet(), self.offset, self.pseudo.data_len)
    }

    fn seed(&self, with_pseudo: bool) -> u64 {
        if with_pseudo {
            self.pseudo.seed()
        } else {
            0
        }
    }

    /// Sum including the on-wire checksum folds to all ones.
    pub(crate) fn verify_checksum(&self, with_pseudo: bool) -> Result<bool> {
        Ok(checksum::finish(self.seed(with_pseudo) + self.message_sum()?) == 0)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Segment<T> {
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        let offset = self.offset;
        &mut self.packet.as_mut()[offset..]
    }

    pub(crate) fn set_u16_at(&mut self, at: usize, value: u16) {
        self.bytes_mut()[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Zero the checksum field at `at`, recompute, write back.
    pub(crate) fn update_checksum(&mut self, at: usize, with_pseudo: bool) -> Result<u16> {
        // Bounds first so a short packet is left untouched.
        field::read_bytes(self.packet(), self.offset, self.pseudo.data_len)?;
        field::write_u16(self.bytes_mut(), at, 0)?;
        let sum = checksum::finish(self.seed(with_pseudo) + self.message_sum()?);
        field::write_u16(self.bytes_mut(), at, sum)?;
        Ok(sum)
    }

    /// Overwrite the word at `word_at` and patch the checksum at `at`
    /// (RFC 1624 eqn. 3).
    ///
    /// The incremental form yields `0x0000` where a full pass over an all-zero
    /// message yields `0xFFFF`, so a zero result is recomputed in full.
    pub(crate) fn replace_word(&mut self, at: usize, word_at: usize, new: u16, with_pseudo: bool) -> u16 {
        let old = self.u16_at(word_at);
        let sum = checksum::incremental_update(self.u16_at(at), old, new);
        self.set_u16_at(word_at, new);
        self.set_u16_at(at, sum);

        if sum == 0 {
            if let Ok(full) = self.update_checksum(at, with_pseudo) {
                return full;
            }
        }
        sum
    }
}

/// Transport view selected by the resolved protocol number
#[derive(Debug)]
pub enum Transport<T> {
    Tcp(TcpHeader<T>),
    Udp(UdpHeader<T>),
    Icmp(IcmpHeader<T>),
    Icmpv6(Icmpv6Header<T>),
    /// No view for this protocol; not an error
    Other(u8),
}

impl<T: AsRef<[u8]>> Transport<T> {
    pub(crate) fn dispatch(packet: T, offset: usize, pseudo: PseudoHeader) -> Result<Self> {
        let view = match (Protocol::from_u8(pseudo.protocol), pseudo.version) {
            (Some(Protocol::Tcp), _) => Transport::Tcp(TcpHeader::new(packet, offset, pseudo)?),
            (Some(Protocol::Udp), _) => Transport::Udp(UdpHeader::new(packet, offset, pseudo)?),
            (Some(Protocol::Icmp), IpVersion::V4) => {
                Transport::Icmp(IcmpHeader::new(packet, offset, pseudo)?)
            }
            (Some(Protocol::Icmpv6), IpVersion::V6) => {
                Transport::Icmpv6(Icmpv6Header::new(packet, offset, pseudo)?)
            }
            _ => Transport::Other(pseudo.protocol),
        };
        Ok(view)
    }

    pub fn protocol(&self) -> u8 {
        match self {
            Transport::Tcp(_) => Protocol::Tcp as u8,
            Transport::Udp(_) => Protocol::Udp as u8,
            Transport::Icmp(_) => Protocol::Icmp as u8,
            Transport::Icmpv6(_) => Protocol::Icmpv6 as u8,
            Transport::Other(protocol) => *protocol,
        }
    }

    /// Verify the checksum of a known transport; `None` for `Other`.
    pub fn verify_checksum(&self) -> Option<Result<bool>> {
        match self {
            Transport::Tcp(h) => Some(h.verify_checksum()),
            Transport::Udp(h) => Some(h.verify_checksum()),
            Transport::Icmp(h) => Some(h.verify_checksum()),
            Transport::Icmpv6(h) => Some(h.verify_checksum()),
            Transport::Other(_) => None,
        }
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Transport<T> {
    /// Recompute the checksum of a known transport; `None` for `Other`.
    pub fn update_checksum(&mut self) -> Option<Result<u16>> {
        match self {
            Transport::Tcp(h) => Some(h.update_checksum()),
            Transport::Udp(h) => Some(h.update_checksum()),
            Transport::Icmp(h) => Some(h.update_checksum()),
            Transport::Icmpv6(h) => Some(h.update_checksum()),
            Transport::Other(_) => None,
        }
    }
}
