//! UDP protocol - RFC 768
//!
//! UDP header view, port rewriting and checksum calculation.

use super::transport::{PseudoHeader, Segment};
use super::types::IpVersion;
use crate::Result;
use std::fmt;

/// UDP header size (fixed)
pub const HEADER_SIZE: usize = 8;

/// UDP protocol number for pseudo-header
pub const PROTOCOL_NUMBER: u8 = 17;

const OFFSET_LENGTH: usize = 4;
const OFFSET_CHECKSUM: usize = 6;

/// UDP header view inside an IP packet
#[derive(Debug, Clone)]
pub struct UdpHeader<T> {
    segment: Segment<T>,
}

impl<T: AsRef<[u8]>> UdpHeader<T> {
    pub fn new(packet: T, offset: usize, pseudo: PseudoHeader) -> Result<Self> {
        Ok(Self {
            segment: Segment::new(packet, offset, pseudo, HEADER_SIZE)?,
        })
    }

    /// Source port (offset 0-1)
    pub fn src_port(&self) -> u16 {
        self.segment.u16_at(0)
    }

    /// Destination port (offset 2-3)
    pub fn dst_port(&self) -> u16 {
        self.segment.u16_at(2)
    }

    /// Length (header + data) (offset 4-5)
    pub fn length(&self) -> u16 {
        self.segment.u16_at(OFFSET_LENGTH)
    }

    /// Checksum (offset 6-7)
    /// Note: 0 means checksum not computed (valid for UDP over IPv4)
    pub fn checksum(&self) -> u16 {
        self.segment.u16_at(OFFSET_CHECKSUM)
    }

    /// Packet bytes from the IP header through the end of the UDP header,
    /// the addressing prefix reused when building a reply
    pub fn header(&self) -> &[u8] {
        &self.segment.packet()[..self.segment.offset() + HEADER_SIZE]
    }

    /// Datagram payload after the 8-byte header, bounded by the IP data length
    pub fn data(&self) -> Result<&[u8]> {
        self.segment.payload(HEADER_SIZE)
    }

    /// Validate checksum with pseudo-header.
    /// A zero checksum over IPv4 was never computed and counts as valid.
    pub fn verify_checksum(&self) -> Result<bool> {
        if self.checksum() == 0 && self.segment.pseudo().version == IpVersion::V4 {
            return Ok(true);
        }
        self.segment.verify_checksum(true)
    }

    pub fn pseudo_header(&self) -> PseudoHeader {
        self.segment.pseudo()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> UdpHeader<T> {
    /// Set source port (checksum must be updated separately)
    pub fn set_src_port(&mut self, port: u16) {
        self.segment.set_u16_at(0, port);
    }

    /// Set destination port (checksum must be updated separately)
    pub fn set_dst_port(&mut self, port: u16) {
        self.segment.set_u16_at(2, port);
    }

    pub fn set_length(&mut self, length: u16) {
        self.segment.set_u16_at(OFFSET_LENGTH, length);
    }

    /// Swap source and destination ports in place.
    pub fn revert_port(&mut self) {
        let (src, dst) = (self.src_port(), self.dst_port());
        self.set_src_port(dst);
        self.set_dst_port(src);
    }

    /// Recalculate and write the checksum over header and data
    pub fn update_checksum(&mut self) -> Result<u16> {
        let sum = self.segment.update_checksum(OFFSET_CHECKSUM, true)?;

        // 0 is reserved for "no checksum"
        if sum == 0 {
            self.segment.set_u16_at(OFFSET_CHECKSUM, 0xFFFF);
            return Ok(0xFFFF);
        }
        Ok(sum)
    }
}

impl<T: AsRef<[u8]>> fmt::Display for UdpHeader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} len:{}",
            self.src_port(),
            self.dst_port(),
            self.length()
        )
    }
}
