//! Bounds-checked big-endian field access
//!
//! Used wherever an extent depends on packet contents: parse-time length
//! checks, IPv6 extension walking, payload slicing and checksum spans. A
//! truncated or lying packet surfaces there as [`Error::Truncated`]. Fixed
//! header fields are indexed directly by the views once `parse` or the
//! transport constructor has proved the fixed header is present.

use crate::{Error, Result};

/// Return `offset..offset + width` if it lies inside `buf`.
#[inline]
fn range(len: usize, offset: usize, width: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(width) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(Error::Truncated { offset, width, len }),
    }
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    let r = range(buf.len(), offset, 1)?;
    Ok(buf[r.start])
}

/// Read the high (`true`) or low (`false`) nibble of a byte.
pub fn read_nibble(buf: &[u8], offset: usize, high: bool) -> Result<u8> {
    let byte = read_u8(buf, offset)?;
    Ok(if high { byte >> 4 } else { byte & 0x0F })
}

pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    let r = range(buf.len(), offset, 2)?;
    Ok(u16::from_be_bytes([buf[r.start], buf[r.start + 1]]))
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    let r = range(buf.len(), offset, 4)?;
    let b = &buf[r];
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_bytes(buf: &[u8], offset: usize, width: usize) -> Result<&[u8]> {
    let r = range(buf.len(), offset, width)?;
    Ok(&buf[r])
}

pub fn write_u8(buf: &mut [u8], offset: usize, value: u8) -> Result<()> {
    let r = range(buf.len(), offset, 1)?;
    buf[r.start] = value;
    Ok(())
}

pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<()> {
    let r = range(buf.len(), offset, 2)?;
    buf[r].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
    let r = range(buf.len(), offset, 4)?;
    buf[r].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Copy `value` in at `offset`; nothing is written if it would overrun.
pub fn write_bytes(buf: &mut [u8], offset: usize, value: &[u8]) -> Result<()> {
    let r = range(buf.len(), offset, value.len())?;
    buf[r].copy_from_slice(value);
    Ok(())
}

/// Running one's-complement sum of the 16-bit words in `offset..offset + len`.
///
/// The result is not folded; callers add their own terms (pseudo-header,
/// protocol, length) before folding. An odd trailing byte is padded with a
/// zero low octet.
pub fn sum_words(buf: &[u8], offset: usize, len: usize) -> Result<u64> {
    Ok(word_sum(read_bytes(buf, offset, len)?))
}

/// Unchecked counterpart of [`sum_words`] for a slice already in bounds.
pub fn word_sum(bytes: &[u8]) -> u64 {
    let mut chunks = bytes.chunks_exact(2);
    let mut sum: u64 = chunks
        .by_ref()
        .map(|w| u16::from_be_bytes([w[0], w[1]]) as u64)
        .sum();
    if let [last] = chunks.remainder() {
        sum += (*last as u64) << 8;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_big_endian() {
        let buf = [0x12, 0x34, 0x56, 0x78, 0x9a];
        assert_eq!(read_u8(&buf, 4).unwrap(), 0x9a);
        assert_eq!(read_u16(&buf, 1).unwrap(), 0x3456);
        assert_eq!(read_u32(&buf, 0).unwrap(), 0x1234_5678);
        assert_eq!(read_bytes(&buf, 1, 3).unwrap(), &[0x34, 0x56, 0x78]);
        assert_eq!(read_nibble(&buf, 0, true).unwrap(), 0x1);
        assert_eq!(read_nibble(&buf, 0, false).unwrap(), 0x2);
    }

    #[test]
    fn test_read_past_end() {
        let buf = [0u8; 4];
        assert!(matches!(
            read_u32(&buf, 1),
            Err(Error::Truncated {
                offset: 1,
                width: 4,
                len: 4
            })
        ));
        assert!(read_u16(&buf, 3).is_err());
        assert!(read_u8(&buf, 4).is_err());
        assert!(read_bytes(&buf, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_write_in_place() {
        let mut buf = [0u8; 8];
        write_u16(&mut buf, 0, 0xBEEF).unwrap();
        write_u32(&mut buf, 2, 0x0102_0304).unwrap();
        write_u8(&mut buf, 6, 0xFF).unwrap();
        assert_eq!(buf, [0xBE, 0xEF, 1, 2, 3, 4, 0xFF, 0]);
        assert!(write_u16(&mut buf, 7, 1).is_err());
        assert!(write_u32(&mut buf, 5, 1).is_err());
        assert_eq!(buf[7], 0);
    }

    #[test]
    fn test_write_bytes() {
        let mut buf = [0u8; 6];
        write_bytes(&mut buf, 2, &[0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(buf, [0, 0, 0xAA, 0xBB, 0xCC, 0]);

        // nothing is written when the slice would overrun
        assert!(matches!(
            write_bytes(&mut buf, 4, &[1, 2, 3]),
            Err(Error::Truncated {
                offset: 4,
                width: 3,
                len: 6
            })
        ));
        assert_eq!(buf, [0, 0, 0xAA, 0xBB, 0xCC, 0]);
        write_bytes(&mut buf, 6, &[]).unwrap();
    }

    #[test]
    fn test_sum_words_odd_length() {
        let buf = [0x00, 0x01, 0xF2, 0x03, 0xF4];
        assert_eq!(sum_words(&buf, 0, 5).unwrap(), 0x0001 + 0xF203 + 0xF400);
        assert_eq!(sum_words(&buf, 1, 2).unwrap(), 0x01F2);
        assert_eq!(sum_words(&buf, 0, 0).unwrap(), 0);
        assert!(sum_words(&buf, 2, 4).is_err());
    }
}
