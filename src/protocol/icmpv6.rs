//! ICMPv6 protocol - RFC 4443

use super::field;
use super::transport::{PseudoHeader, Segment};
use crate::Result;

/// Minimum ICMPv6 header size
pub const MIN_HEADER_SIZE: usize = 4;

/// Echo Request/Reply header size (identifier + sequence)
pub const ECHO_HEADER_SIZE: usize = 8;

/// ICMPv6 protocol number for pseudo-header
pub const PROTOCOL_NUMBER: u8 = 58;

const OFFSET_CHECKSUM: usize = 2;

/// ICMPv6 message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Icmpv6Type {
    DestinationUnreachable = 1,
    PacketTooBig = 2,
    TimeExceeded = 3,
    ParameterProblem = 4,
    EchoRequest = 128,
    EchoReply = 129,
    RouterSolicitation = 133,
    RouterAdvertisement = 134,
    NeighborSolicitation = 135,
    NeighborAdvertisement = 136,
    Redirect = 137,
}

impl Icmpv6Type {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Icmpv6Type::DestinationUnreachable),
            2 => Some(Icmpv6Type::PacketTooBig),
            3 => Some(Icmpv6Type::TimeExceeded),
            4 => Some(Icmpv6Type::ParameterProblem),
            128 => Some(Icmpv6Type::EchoRequest),
            129 => Some(Icmpv6Type::EchoReply),
            133 => Some(Icmpv6Type::RouterSolicitation),
            134 => Some(Icmpv6Type::RouterAdvertisement),
            135 => Some(Icmpv6Type::NeighborSolicitation),
            136 => Some(Icmpv6Type::NeighborAdvertisement),
            137 => Some(Icmpv6Type::Redirect),
            _ => None,
        }
    }

    pub fn is_echo(self) -> bool {
        matches!(self, Icmpv6Type::EchoRequest | Icmpv6Type::EchoReply)
    }
}

/// ICMPv6 message view inside an IPv6 packet
#[derive(Debug, Clone)]
pub struct Icmpv6Header<T> {
    segment: Segment<T>,
}

impl<T: AsRef<[u8]>> Icmpv6Header<T> {
    pub fn new(packet: T, offset: usize, pseudo: PseudoHeader) -> Result<Self> {
        Ok(Self {
            segment: Segment::new(packet, offset, pseudo, MIN_HEADER_SIZE)?,
        })
    }

    pub fn msg_type(&self) -> u8 {
        self.segment.bytes()[0]
    }

    pub fn code(&self) -> u8 {
        self.segment.bytes()[1]
    }

    pub fn checksum(&self) -> u16 {
        self.segment.u16_at(OFFSET_CHECKSUM)
    }

    pub fn message_type(&self) -> Option<Icmpv6Type> {
        Icmpv6Type::from_u8(self.msg_type())
    }

    pub fn is_echo_request(&self) -> bool {
        self.message_type() == Some(Icmpv6Type::EchoRequest)
    }

    /// 8 for echo messages, 4 otherwise
    pub fn header_len(&self) -> usize {
        match self.message_type() {
            Some(t) if t.is_echo() => ECHO_HEADER_SIZE,
            _ => MIN_HEADER_SIZE,
        }
    }

    /// Echo identifier; the 4-byte minimum header may not carry one.
    pub fn identifier(&self) -> Result<u16> {
        field::read_u16(self.segment.bytes(), 4)
    }

    pub fn sequence(&self) -> Result<u16> {
        field::read_u16(self.segment.bytes(), 6)
    }

    /// Message body after the header
    pub fn body(&self) -> Result<&[u8]> {
        self.segment.payload(self.header_len())
    }

    /// Validate checksum with pseudo-header
    pub fn verify_checksum(&self) -> Result<bool> {
        self.segment.verify_checksum(true)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Icmpv6Header<T> {
    pub fn set_type(&mut self, msg_type: u8) {
        self.segment.bytes_mut()[0] = msg_type;
    }

    pub fn set_code(&mut self, code: u8) {
        self.segment.bytes_mut()[1] = code;
    }

    pub fn update_checksum(&mut self) -> Result<u16> {
        self.segment.update_checksum(OFFSET_CHECKSUM, true)
    }

    /// Turn an echo request into an echo reply in place, adjusting the
    /// checksum incrementally. Returns false, leaving the message
    /// untouched, when it is not an echo request.
    pub fn revert_echo(&mut self) -> bool {
        if !self.is_echo_request() {
            return false;
        }
        let reply = (Icmpv6Type::EchoReply as u16) << 8;
        self.segment.replace_word(OFFSET_CHECKSUM, 0, reply, true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ip::IpHeader;

    /// fd00::2 -> 2001:db8::1 echo request, id=0x1234 seq=1, "abcdefgh"
    fn make_echo_request() -> Vec<u8> {
        let mut pkt = vec![0x60, 0, 0, 0, 0x00, 0x10, PROTOCOL_NUMBER, 64];
        pkt.extend_from_slice(&[0xfd, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        pkt.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        pkt.extend_from_slice(&[0x80, 0x00, 0xb1, 0x2d, 0x12, 0x34, 0x00, 0x01]);
        pkt.extend_from_slice(b"abcdefgh");
        pkt
    }

    #[test]
    fn test_icmpv6_type_from_u8() {
        assert_eq!(Icmpv6Type::from_u8(1), Some(Icmpv6Type::DestinationUnreachable));
        assert_eq!(Icmpv6Type::from_u8(128), Some(Icmpv6Type::EchoRequest));
        assert_eq!(Icmpv6Type::from_u8(129), Some(Icmpv6Type::EchoReply));
        assert_eq!(Icmpv6Type::from_u8(135), Some(Icmpv6Type::NeighborSolicitation));
        assert_eq!(Icmpv6Type::from_u8(0), None);
        assert!(Icmpv6Type::EchoReply.is_echo());
        assert!(!Icmpv6Type::PacketTooBig.is_echo());
    }

    #[test]
    fn test_icmpv6_parse_echo() {
        let pkt = make_echo_request();
        let ip = IpHeader::parse(&pkt[..], pkt.len()).unwrap();
        let icmp = ip.icmpv6().unwrap();

        assert_eq!(icmp.msg_type(), 128);
        assert_eq!(icmp.code(), 0);
        assert_eq!(icmp.checksum(), 0xb12d);
        assert_eq!(icmp.header_len(), 8);
        assert_eq!(icmp.identifier().unwrap(), 0x1234);
        assert_eq!(icmp.sequence().unwrap(), 1);
        assert_eq!(icmp.body().unwrap(), b"abcdefgh");
        assert!(icmp.verify_checksum().unwrap());
    }

    #[test]
    fn test_icmpv6_minimum_header() {
        let mut pkt = make_echo_request();
        pkt.truncate(44);
        pkt[5] = 4;
        pkt[40] = Icmpv6Type::PacketTooBig as u8;
        let ip = IpHeader::parse(&pkt[..], pkt.len()).unwrap();
        let icmp = ip.icmpv6().unwrap();
        assert_eq!(icmp.header_len(), 4);
        assert!(icmp.identifier().is_err());
        assert!(icmp.body().unwrap().is_empty());

        assert!(IpHeader::parse(&pkt[..43], 43).unwrap().icmpv6().is_err());
    }

    #[test]
    fn test_icmpv6_update_checksum_reproduces_wire_value() {
        let original = make_echo_request();
        let mut pkt = original.clone();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        assert_eq!(ip.icmpv6_mut().unwrap().update_checksum().unwrap(), 0xb12d);
        assert_eq!(pkt, original);
    }

    #[test]
    fn test_icmpv6_revert_echo() {
        let mut pkt = make_echo_request();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        ip.revert_address();
        let mut icmp = ip.icmpv6_mut().unwrap();

        assert!(icmp.revert_echo());
        assert_eq!(icmp.msg_type(), 129);
        assert_eq!(icmp.checksum(), 0xb02d);
        assert!(icmp.verify_checksum().unwrap());
        assert!(!icmp.revert_echo());
    }

    #[test]
    fn test_icmpv6_revert_echo_not_echo() {
        let mut pkt = make_echo_request();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut icmp = ip.icmpv6_mut().unwrap();
        icmp.set_type(Icmpv6Type::NeighborSolicitation as u8);
        icmp.set_code(0);
        let before = icmp.checksum();
        assert!(!icmp.revert_echo());
        assert_eq!(icmp.msg_type(), 135);
        assert_eq!(icmp.checksum(), before);
    }
}
