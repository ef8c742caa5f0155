//! Internet checksum - RFC 1071, incremental update - RFC 1624

use super::field;
use crate::Result;

/// Fold carries back into the low 16 bits until none remain.
#[inline]
pub fn fold(mut sum: u64) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

/// Fold and complement: the value written to a checksum field.
#[inline]
pub fn finish(sum: u64) -> u16 {
    !fold(sum)
}

/// Checksum of a byte range with no pseudo-header (IPv4 header, ICMP).
pub fn checksum(buf: &[u8], offset: usize, len: usize) -> Result<u16> {
    Ok(finish(field::sum_words(buf, offset, len)?))
}

/// Adjust a checksum after one 16-bit word changed from `old` to `new`.
///
/// RFC 1624 eqn. 3: `HC' = ~(~HC + ~m + m')`.
pub fn incremental_update(old_checksum: u16, old: u16, new: u16) -> u16 {
    let sum = (!old_checksum) as u64 + (!old) as u64 + new as u64;
    !fold(sum)
}
