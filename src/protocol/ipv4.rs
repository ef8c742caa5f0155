//! IPv4 protocol - RFC 791

use super::checksum;
use super::field;
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Minimum IPv4 header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

const OFFSET_TOTAL_LEN: usize = 2;
const OFFSET_CHECKSUM: usize = 10;
const OFFSET_SRC: usize = 12;
const OFFSET_DST: usize = 16;

/// IPv4 header view over the first `len` bytes of `buffer`
///
/// `buffer` may be borrowed (`&[u8]`, `&mut [u8]`) or owned (`Vec<u8>`);
/// setters are only available when it is mutable.
#[derive(Debug, Clone)]
pub struct Ipv4Header<T> {
    buffer: T,
    len: usize,
}

impl<T: AsRef<[u8]>> Ipv4Header<T> {
    pub fn parse(buffer: T, len: usize) -> Result<Self> {
        let bytes = field::read_bytes(buffer.as_ref(), 0, len)?;
        field::read_bytes(bytes, 0, MIN_HEADER_SIZE)?;

        let version = field::read_nibble(bytes, 0, true)?;
        if version != 4 {
            return Err(Error::UnsupportedVersion(version));
        }

        // Options must be present in full; their contents are skipped.
        let header_len = field::read_nibble(bytes, 0, false)? as usize * 4;
        field::read_bytes(bytes, 0, header_len)?;

        Ok(Self { buffer, len })
    }

    /// Valid bytes of the packet
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.len]
    }

    /// Number of valid bytes captured
    pub fn packet_len(&self) -> usize {
        self.len
    }

    pub fn ihl(&self) -> u8 {
        self.as_bytes()[0] & 0x0F
    }

    pub fn header_len(&self) -> usize {
        self.ihl() as usize * 4
    }

    pub fn total_length(&self) -> u16 {
        let b = self.as_bytes();
        u16::from_be_bytes([b[2], b[3]])
    }

    /// Bytes after the header according to the total length field
    pub fn data_len(&self) -> usize {
        (self.total_length() as usize).saturating_sub(self.header_len())
    }

    pub fn identification(&self) -> u16 {
        let b = self.as_bytes();
        u16::from_be_bytes([b[4], b[5]])
    }

    pub fn ttl(&self) -> u8 {
        self.as_bytes()[8]
    }

    pub fn protocol(&self) -> u8 {
        self.as_bytes()[9]
    }

    pub fn checksum(&self) -> u16 {
        let b = self.as_bytes();
        u16::from_be_bytes([b[10], b[11]])
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        let b = self.as_bytes();
        Ipv4Addr::new(b[12], b[13], b[14], b[15])
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        let b = self.as_bytes();
        Ipv4Addr::new(b[16], b[17], b[18], b[19])
    }

    /// Source + destination address words, the pseudo-header contribution
    /// shared by TCP and UDP checksums.
    pub fn pseudo_header_sum(&self) -> u64 {
        field::word_sum(&self.as_bytes()[OFFSET_SRC..OFFSET_DST + 4])
    }

    /// Validate header checksum
    pub fn verify_checksum(&self) -> bool {
        checksum::checksum(self.as_bytes(), 0, self.header_len()).map_or(false, |sum| sum == 0)
    }

    /// Header and payload bytes past the header
    pub fn payload(&self) -> &[u8] {
        &self.as_bytes()[self.header_len()..]
    }

    /// Detach from the borrowed buffer.
    pub fn copy_of(&self) -> Ipv4Header<Vec<u8>> {
        Ipv4Header {
            buffer: self.as_bytes().to_vec(),
            len: self.len,
        }
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Ipv4Header<T> {
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        &mut self.buffer.as_mut()[..len]
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.as_bytes_mut()[OFFSET_SRC..OFFSET_SRC + 4].copy_from_slice(&addr.octets());
    }

    pub fn set_dst_addr(&mut self, addr: Ipv4Addr) {
        self.as_bytes_mut()[OFFSET_DST..OFFSET_DST + 4].copy_from_slice(&addr.octets());
    }

    /// Swap source and destination addresses in place.
    ///
    /// The header checksum is unaffected: the sum is order independent.
    pub fn revert_address(&mut self) {
        let (src, dst) = self.as_bytes_mut()[OFFSET_SRC..OFFSET_DST + 4].split_at_mut(4);
        src.swap_with_slice(dst);
    }

    /// Set total length (checksum must be updated separately)
    pub fn set_total_length(&mut self, total_length: u16) {
        self.as_bytes_mut()[OFFSET_TOTAL_LEN..OFFSET_TOTAL_LEN + 2]
            .copy_from_slice(&total_length.to_be_bytes());
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.as_bytes_mut()[8] = ttl;
    }

    /// Recalculate and update header checksum
    pub fn update_checksum(&mut self) -> u16 {
        let header_len = self.header_len();
        let bytes = self.as_bytes_mut();
        bytes[OFFSET_CHECKSUM] = 0;
        bytes[OFFSET_CHECKSUM + 1] = 0;

        let sum = checksum::finish(field::word_sum(&bytes[..header_len]));
        bytes[OFFSET_CHECKSUM..OFFSET_CHECKSUM + 2].copy_from_slice(&sum.to_be_bytes());
        sum
    }
}
