//! SOCKS5 UDP relay framing - RFC 1928 section 7
//!
//! ```text
//! +----+------+------+----------+----------+----------+
//! |RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
//! +----+------+------+----------+----------+----------+
//! | 2  |  1   |  1   | Variable |    2     | Variable |
//! +----+------+------+----------+----------+----------+
//! ```
//!
//! One frame per datagram: there is no length prefix, the payload runs to
//! the end of the datagram.

use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// RSV + FRAG + ATYP
const FIXED_PREFIX: usize = 4;

/// Longest domain the one-byte length prefix can carry
pub const MAX_DOMAIN_LEN: usize = 255;

/// SOCKS5 address type (ATYP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressType {
    Ipv4 = 0x01,
    Domain = 0x03,
    Ipv6 = 0x04,
}

impl AddressType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(AddressType::Ipv4),
            0x03 => Some(AddressType::Domain),
            0x04 => Some(AddressType::Ipv6),
            _ => None,
        }
    }
}

/// Destination address; the variant implies the ATYP byte
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Ipv4(Ipv4Addr),
    Domain(String),
    Ipv6(Ipv6Addr),
}

impl Address {
    pub fn address_type(&self) -> AddressType {
        match self {
            Address::Ipv4(_) => AddressType::Ipv4,
            Address::Domain(_) => AddressType::Domain,
            Address::Ipv6(_) => AddressType::Ipv6,
        }
    }

    /// Encoded size of DST.ADDR, including the domain length byte
    pub fn encoded_len(&self) -> usize {
        match self {
            Address::Ipv4(_) => 4,
            Address::Domain(name) => 1 + name.len(),
            Address::Ipv6(_) => 16,
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Address::Ipv4(a) => Some(IpAddr::V4(*a)),
            Address::Ipv6(a) => Some(IpAddr::V6(*a)),
            Address::Domain(_) => None,
        }
    }
}

impl From<IpAddr> for Address {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => Address::Ipv4(a),
            IpAddr::V6(a) => Address::Ipv6(a),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ipv4(a) => write!(f, "{a}"),
            Address::Domain(name) => f.write_str(name),
            Address::Ipv6(a) => write!(f, "[{a}]"),
        }
    }
}

/// One UDP relay frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5UdpDatagram {
    /// Fragment number; 0 for a standalone datagram
    pub frag: u8,
    pub address: Address,
    pub port: u16,
    pub data: Bytes,
}

impl Socks5UdpDatagram {
    /// Standalone (unfragmented) datagram
    pub fn new(address: Address, port: u16, data: impl Into<Bytes>) -> Self {
        Self {
            frag: 0,
            address,
            port,
            data: data.into(),
        }
    }

    pub fn address_type(&self) -> AddressType {
        self.address.address_type()
    }

    pub fn encoded_len(&self) -> usize {
        FIXED_PREFIX + self.address.encoded_len() + 2 + self.data.len()
    }

    /// Append the wire form to `dst`. Nothing is written on error.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        if let Address::Domain(name) = &self.address {
            if name.is_empty() || name.len() > MAX_DOMAIN_LEN {
                return Err(Error::DomainLength(name.len()));
            }
        }

        dst.reserve(self.encoded_len());
        dst.put_u16(0); // RSV
        dst.put_u8(self.frag);
        dst.put_u8(self.address_type() as u8);
        match &self.address {
            Address::Ipv4(a) => dst.put_slice(&a.octets()),
            Address::Domain(name) => {
                dst.put_u8(name.len() as u8);
                dst.put_slice(name.as_bytes());
            }
            Address::Ipv6(a) => dst.put_slice(&a.octets()),
        }
        dst.put_u16(self.port);
        dst.put_slice(&self.data);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Parse one received datagram. FRAG is surfaced, not acted upon.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let mut buf = frame;

        ensure(frame, buf, 2)?;
        let rsv = buf.get_u16();
        if rsv != 0 {
            return Err(Error::Framing(format!(
                "reserved field must be zero, got {rsv:#06x}"
            )));
        }

        ensure(frame, buf, 2)?;
        let frag = buf.get_u8();
        let atyp = buf.get_u8();

        let address = match AddressType::from_u8(atyp) {
            Some(AddressType::Ipv4) => {
                ensure(frame, buf, 4)?;
                let mut octets = [0u8; 4];
                buf.copy_to_slice(&mut octets);
                Address::Ipv4(Ipv4Addr::from(octets))
            }
            Some(AddressType::Domain) => {
                ensure(frame, buf, 1)?;
                let len = buf.get_u8() as usize;
                if len == 0 {
                    return Err(Error::DomainLength(0));
                }
                ensure(frame, buf, len)?;
                // Domains are ASCII on the wire; anything else is kept lossily.
                let name = String::from_utf8_lossy(&buf[..len]).into_owned();
                buf.advance(len);
                Address::Domain(name)
            }
            Some(AddressType::Ipv6) => {
                ensure(frame, buf, 16)?;
                let mut octets = [0u8; 16];
                buf.copy_to_slice(&mut octets);
                Address::Ipv6(Ipv6Addr::from(octets))
            }
            None => return Err(Error::UnsupportedAddressType(atyp)),
        };

        ensure(frame, buf, 2)?;
        let port = buf.get_u16();

        Ok(Self {
            frag,
            address,
            port,
            data: Bytes::copy_from_slice(buf),
        })
    }
}

/// `width` more bytes must remain in `rest`, the unread tail of `frame`.
fn ensure(frame: &[u8], rest: &[u8], width: usize) -> Result<()> {
    if rest.len() < width {
        return Err(Error::Truncated {
            offset: frame.len() - rest.len(),
            width,
            len: frame.len(),
        });
    }
    Ok(())
}
