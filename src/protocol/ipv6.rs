//! IPv6 protocol - RFC 8200

use super::field;
use super::types::Protocol;
use crate::{Error, Result};
use std::net::Ipv6Addr;

/// IPv6 base header size (fixed, unlike IPv4)
pub const HEADER_SIZE: usize = 40;

const OFFSET_PAYLOAD_LEN: usize = 4;
const OFFSET_NEXT_HEADER: usize = 6;
const OFFSET_SRC: usize = 8;
const OFFSET_DST: usize = 24;

/// Extension headers that may sit between the base header and the
/// upper-layer protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtensionHeader {
    HopByHop = 0,
    Routing = 43,
    Fragment = 44,
    Authentication = 51,
    DestinationOptions = 60,
    Mobility = 135,
    HostIdentity = 139,
    Shim6 = 140,
}

impl ExtensionHeader {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ExtensionHeader::HopByHop),
            43 => Some(ExtensionHeader::Routing),
            44 => Some(ExtensionHeader::Fragment),
            51 => Some(ExtensionHeader::Authentication),
            60 => Some(ExtensionHeader::DestinationOptions),
            135 => Some(ExtensionHeader::Mobility),
            139 => Some(ExtensionHeader::HostIdentity),
            140 => Some(ExtensionHeader::Shim6),
            _ => None,
        }
    }

    /// Total header size given its length byte
    pub fn size(self, length: u8) -> usize {
        match self {
            // AH counts 4-octet units, minus 2
            ExtensionHeader::Authentication => (length as usize + 2) * 4,
            // Fragment carries a reserved byte; the header is always 8 bytes
            ExtensionHeader::Fragment => 8,
            _ => (length as usize + 1) * 8,
        }
    }
}

/// Result of walking the extension-header chain, resolved once per packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionChain {
    /// Upper-layer protocol, or the last next-header value seen when the
    /// walk stopped early
    pub protocol: u8,
    /// Offset of the upper-layer header (40 + extension headers)
    pub header_len: usize,
}

impl ExtensionChain {
    /// Walk the chain starting at the base header's next-header field.
    ///
    /// The declared payload length bounds the walk, and so does the
    /// captured length: a lying payload length never moves the cursor
    /// past the bytes actually present.
    pub fn resolve(packet: &[u8]) -> Self {
        let payload_len = field::read_u16(packet, OFFSET_PAYLOAD_LEN).unwrap_or(0) as usize;
        let limit = (HEADER_SIZE + payload_len).min(packet.len());

        let mut protocol = field::read_u8(packet, OFFSET_NEXT_HEADER).unwrap_or(0);
        let mut offset = HEADER_SIZE;

        while offset < limit && !Protocol::is_upper_layer_v6(protocol) {
            let Some(ext) = ExtensionHeader::from_u8(protocol) else {
                break;
            };
            let (Ok(next), Ok(length)) = (
                field::read_u8(packet, offset),
                field::read_u8(packet, offset + 1),
            ) else {
                break;
            };
            protocol = next;
            offset += ext.size(length);
        }

        Self {
            protocol,
            header_len: offset,
        }
    }
}

/// IPv6 header view over the first `len` bytes of `buffer`
#[derive(Debug, Clone)]
pub struct Ipv6Header<T> {
    buffer: T,
    len: usize,
    chain: ExtensionChain,
}

impl<T: AsRef<[u8]>> Ipv6Header<T> {
    pub fn parse(buffer: T, len: usize) -> Result<Self> {
        let bytes = field::read_bytes(buffer.as_ref(), 0, len)?;
        field::read_bytes(bytes, 0, HEADER_SIZE)?;

        let version = field::read_nibble(bytes, 0, true)?;
        if version != 6 {
            return Err(Error::UnsupportedVersion(version));
        }

        let chain = ExtensionChain::resolve(bytes);
        Ok(Self { buffer, len, chain })
    }

    /// Valid bytes of the packet
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.len]
    }

    /// Number of valid bytes captured
    pub fn packet_len(&self) -> usize {
        self.len
    }

    /// Traffic Class (4 bits from byte 0, 4 bits from byte 1)
    pub fn traffic_class(&self) -> u8 {
        let b = self.as_bytes();
        ((b[0] & 0x0F) << 4) | (b[1] >> 4)
    }

    /// Flow Label (20 bits)
    pub fn flow_label(&self) -> u32 {
        let b = self.as_bytes();
        ((b[1] as u32 & 0x0F) << 16) | ((b[2] as u32) << 8) | b[3] as u32
    }

    /// Payload Length (does not include the base header)
    pub fn payload_length(&self) -> u16 {
        let b = self.as_bytes();
        u16::from_be_bytes([b[4], b[5]])
    }

    /// Next Header of the base header
    pub fn next_header(&self) -> u8 {
        self.as_bytes()[OFFSET_NEXT_HEADER]
    }

    pub fn hop_limit(&self) -> u8 {
        self.as_bytes()[7]
    }

    pub fn src_addr(&self) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.as_bytes()[OFFSET_SRC..OFFSET_SRC + 16]);
        Ipv6Addr::from(octets)
    }

    pub fn dst_addr(&self) -> Ipv6Addr {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.as_bytes()[OFFSET_DST..OFFSET_DST + 16]);
        Ipv6Addr::from(octets)
    }

    pub fn chain(&self) -> ExtensionChain {
        self.chain
    }

    /// Upper-layer protocol after the extension headers
    pub fn protocol(&self) -> u8 {
        self.chain.protocol
    }

    /// Base header plus extension headers
    pub fn header_len(&self) -> usize {
        self.chain.header_len
    }

    /// Base header plus declared payload
    pub fn total_length(&self) -> usize {
        HEADER_SIZE + self.payload_length() as usize
    }

    /// Upper-layer bytes according to the payload length field
    pub fn data_len(&self) -> usize {
        self.total_length().saturating_sub(self.header_len())
    }

    /// Source + destination address words. IPv6 has no header checksum, so
    /// every upper-layer checksum folds this in.
    pub fn pseudo_header_sum(&self) -> u64 {
        field::word_sum(&self.as_bytes()[OFFSET_SRC..OFFSET_DST + 16])
    }

    /// Bytes past the extension-header chain
    pub fn payload(&self) -> &[u8] {
        self.as_bytes().get(self.header_len()..).unwrap_or(&[])
    }

    /// Detach from the borrowed buffer.
    pub fn copy_of(&self) -> Ipv6Header<Vec<u8>> {
        Ipv6Header {
            buffer: self.as_bytes().to_vec(),
            len: self.len,
            chain: self.chain,
        }
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Ipv6Header<T> {
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.buffer.as_mut()[..len]
    }

    pub fn set_src_addr(&mut self, addr: Ipv6Addr) {
        self.as_bytes_mut()[OFFSET_SRC..OFFSET_SRC + 16].copy_from_slice(&addr.octets());
    }

    pub fn set_dst_addr(&mut self, addr: Ipv6Addr) {
        self.as_bytes_mut()[OFFSET_DST..OFFSET_DST + 16].copy_from_slice(&addr.octets());
    }

    /// Swap source and destination addresses in place.
    pub fn revert_address(&mut self) {
        let (src, dst) = self.as_bytes_mut()[OFFSET_SRC..OFFSET_DST + 16].split_at_mut(16);
        src.swap_with_slice(dst);
    }

    /// Set payload length. The extension chain is not re-walked: the
    /// headers themselves have not moved.
    pub fn set_payload_length(&mut self, payload_length: u16) {
        self.as_bytes_mut()[OFFSET_PAYLOAD_LEN..OFFSET_PAYLOAD_LEN + 2]
            .copy_from_slice(&payload_length.to_be_bytes());
    }

    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.as_bytes_mut()[7] = hop_limit;
    }

    /// IPv6 carries no header checksum; nothing to update.
    pub fn update_checksum(&mut self) {}
}
