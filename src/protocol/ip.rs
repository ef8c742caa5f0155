//! Version-dispatched IP header
//!
//! The version nibble is inspected once in [`IpHeader::parse`]; every
//! accessor after that is a plain match on the variant.

use super::field;
use super::icmp::IcmpHeader;
use super::icmpv6::Icmpv6Header;
use super::ipv4::Ipv4Header;
use super::ipv6::Ipv6Header;
use super::tcp::TcpHeader;
use super::transport::{PseudoHeader, Transport};
use super::types::{IpVersion, Protocol};
use super::udp::UdpHeader;
use crate::{Error, Result};
use std::net::IpAddr;

/// IPv4 or IPv6 header view over the first `len` bytes of `buffer`
#[derive(Debug, Clone)]
pub enum IpHeader<T> {
    V4(Ipv4Header<T>),
    V6(Ipv6Header<T>),
}

impl<T: AsRef<[u8]>> IpHeader<T> {
    pub fn parse(buffer: T, len: usize) -> Result<Self> {
        let first = field::read_u8(buffer.as_ref(), 0)?;
        match IpVersion::from_first_byte(first) {
            Some(IpVersion::V4) => Ok(IpHeader::V4(Ipv4Header::parse(buffer, len)?)),
            Some(IpVersion::V6) => Ok(IpHeader::V6(Ipv6Header::parse(buffer, len)?)),
            None => Err(Error::UnsupportedVersion(first >> 4)),
        }
    }

    pub fn version(&self) -> IpVersion {
        match self {
            IpHeader::V4(_) => IpVersion::V4,
            IpHeader::V6(_) => IpVersion::V6,
        }
    }

    pub fn as_v4(&self) -> Option<&Ipv4Header<T>> {
        match self {
            IpHeader::V4(h) => Some(h),
            IpHeader::V6(_) => None,
        }
    }

    pub fn as_v6(&self) -> Option<&Ipv6Header<T>> {
        match self {
            IpHeader::V6(h) => Some(h),
            IpHeader::V4(_) => None,
        }
    }

    /// Transport protocol number (after any IPv6 extension headers)
    pub fn protocol(&self) -> u8 {
        match self {
            IpHeader::V4(h) => h.protocol(),
            IpHeader::V6(h) => h.protocol(),
        }
    }

    /// Offset of the transport header
    pub fn header_len(&self) -> usize {
        match self {
            IpHeader::V4(h) => h.header_len(),
            IpHeader::V6(h) => h.header_len(),
        }
    }

    /// Declared length of the whole datagram
    pub fn total_len(&self) -> usize {
        match self {
            IpHeader::V4(h) => h.total_length() as usize,
            IpHeader::V6(h) => h.total_length(),
        }
    }

    /// Transport header + payload length
    pub fn data_len(&self) -> usize {
        match self {
            IpHeader::V4(h) => h.data_len(),
            IpHeader::V6(h) => h.data_len(),
        }
    }

    pub fn src_addr(&self) -> IpAddr {
        match self {
            IpHeader::V4(h) => IpAddr::V4(h.src_addr()),
            IpHeader::V6(h) => IpAddr::V6(h.src_addr()),
        }
    }

    pub fn dst_addr(&self) -> IpAddr {
        match self {
            IpHeader::V4(h) => IpAddr::V4(h.dst_addr()),
            IpHeader::V6(h) => IpAddr::V6(h.dst_addr()),
        }
    }

    pub fn pseudo_header_sum(&self) -> u64 {
        match self {
            IpHeader::V4(h) => h.pseudo_header_sum(),
            IpHeader::V6(h) => h.pseudo_header_sum(),
        }
    }

    /// Pseudo-header terms handed to the transport views
    pub fn pseudo_header(&self) -> PseudoHeader {
        PseudoHeader {
            version: self.version(),
            address_sum: self.pseudo_header_sum(),
            protocol: self.protocol(),
            data_len: self.data_len(),
        }
    }

    pub fn packet_len(&self) -> usize {
        match self {
            IpHeader::V4(h) => h.packet_len(),
            IpHeader::V6(h) => h.packet_len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IpHeader::V4(h) => h.as_bytes(),
            IpHeader::V6(h) => h.as_bytes(),
        }
    }

    /// Bytes after the IP header (and IPv6 extension headers)
    pub fn payload(&self) -> &[u8] {
        match self {
            IpHeader::V4(h) => h.payload(),
            IpHeader::V6(h) => h.payload(),
        }
    }

    /// Deep copy into an owned header, detached from the read buffer.
    pub fn copy_of(&self) -> IpHeader<Vec<u8>> {
        match self {
            IpHeader::V4(h) => IpHeader::V4(h.copy_of()),
            IpHeader::V6(h) => IpHeader::V6(h.copy_of()),
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            IpHeader::V4(h) => h.into_inner(),
            IpHeader::V6(h) => h.into_inner(),
        }
    }

    /// Transport view for the resolved protocol
    pub fn transport(&self) -> Result<Transport<&[u8]>> {
        Transport::dispatch(self.as_bytes(), self.header_len(), self.pseudo_header())
    }

    pub fn tcp(&self) -> Result<TcpHeader<&[u8]>> {
        match self.transport()? {
            Transport::Tcp(h) => Ok(h),
            _ => Err(self.mismatch(Protocol::Tcp)),
        }
    }

    pub fn udp(&self) -> Result<UdpHeader<&[u8]>> {
        match self.transport()? {
            Transport::Udp(h) => Ok(h),
            _ => Err(self.mismatch(Protocol::Udp)),
        }
    }

    pub fn icmp(&self) -> Result<IcmpHeader<&[u8]>> {
        match self.transport()? {
            Transport::Icmp(h) => Ok(h),
            _ => Err(self.mismatch(Protocol::Icmp)),
        }
    }

    pub fn icmpv6(&self) -> Result<Icmpv6Header<&[u8]>> {
        match self.transport()? {
            Transport::Icmpv6(h) => Ok(h),
            _ => Err(self.mismatch(Protocol::Icmpv6)),
        }
    }

    fn mismatch(&self, expected: Protocol) -> Error {
        Error::ProtocolMismatch {
            expected: expected as u8,
            actual: self.protocol(),
        }
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> IpHeader<T> {
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            IpHeader::V4(h) => h.as_bytes_mut(),
            IpHeader::V6(h) => h.as_bytes_mut(),
        }
    }

    pub fn set_src_addr(&mut self, addr: IpAddr) -> Result<()> {
        match (self, addr) {
            (IpHeader::V4(h), IpAddr::V4(a)) => h.set_src_addr(a),
            (IpHeader::V6(h), IpAddr::V6(a)) => h.set_src_addr(a),
            _ => return Err(Error::AddressFamily),
        }
        Ok(())
    }

    pub fn set_dst_addr(&mut self, addr: IpAddr) -> Result<()> {
        match (self, addr) {
            (IpHeader::V4(h), IpAddr::V4(a)) => h.set_dst_addr(a),
            (IpHeader::V6(h), IpAddr::V6(a)) => h.set_dst_addr(a),
            _ => return Err(Error::AddressFamily),
        }
        Ok(())
    }

    /// Swap source and destination addresses in place.
    pub fn revert_address(&mut self) {
        match self {
            IpHeader::V4(h) => h.revert_address(),
            IpHeader::V6(h) => h.revert_address(),
        }
    }

    /// Recompute the IPv4 header checksum; a no-op for IPv6.
    pub fn update_checksum(&mut self) {
        match self {
            IpHeader::V4(h) => {
                h.update_checksum();
            }
            IpHeader::V6(h) => h.update_checksum(),
        }
    }

    /// Mutable transport view for the resolved protocol
    pub fn transport_mut(&mut self) -> Result<Transport<&mut [u8]>> {
        let offset = self.header_len();
        let pseudo = self.pseudo_header();
        Transport::dispatch(self.as_bytes_mut(), offset, pseudo)
    }

    pub fn tcp_mut(&mut self) -> Result<TcpHeader<&mut [u8]>> {
        let err = self.mismatch(Protocol::Tcp);
        match self.transport_mut()? {
            Transport::Tcp(h) => Ok(h),
            _ => Err(err),
        }
    }

    pub fn udp_mut(&mut self) -> Result<UdpHeader<&mut [u8]>> {
        let err = self.mismatch(Protocol::Udp);
        match self.transport_mut()? {
            Transport::Udp(h) => Ok(h),
            _ => Err(err),
        }
    }

    pub fn icmp_mut(&mut self) -> Result<IcmpHeader<&mut [u8]>> {
        let err = self.mismatch(Protocol::Icmp);
        match self.transport_mut()? {
            Transport::Icmp(h) => Ok(h),
            _ => Err(err),
        }
    }

    pub fn icmpv6_mut(&mut self) -> Result<Icmpv6Header<&mut [u8]>> {
        let err = self.mismatch(Protocol::Icmpv6);
        match self.transport_mut()? {
            Transport::Icmpv6(h) => Ok(h),
            _ => Err(err),
        }
    }
}
