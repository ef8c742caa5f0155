//! ICMP (Internet Control Message Protocol) - RFC 792

use super::transport::{PseudoHeader, Segment};
use crate::Result;

/// ICMP header size (minimum)
pub const ICMP_HEADER_SIZE: usize = 8;

/// ICMP protocol number
pub const PROTOCOL_NUMBER: u8 = 1;

const OFFSET_CHECKSUM: usize = 2;

/// ICMP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    EchoReply = 0,
    DestinationUnreachable = 3,
    Redirect = 5,
    EchoRequest = 8,
    TimeExceeded = 11,
    ParameterProblem = 12,
}

impl IcmpType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(IcmpType::EchoReply),
            3 => Some(IcmpType::DestinationUnreachable),
            5 => Some(IcmpType::Redirect),
            8 => Some(IcmpType::EchoRequest),
            11 => Some(IcmpType::TimeExceeded),
            12 => Some(IcmpType::ParameterProblem),
            _ => None,
        }
    }
}

/// ICMP message view inside an IPv4 packet
///
/// The checksum covers the ICMP message only; there is no pseudo-header.
#[derive(Debug, Clone)]
pub struct IcmpHeader<T> {
    segment: Segment<T>,
}

impl<T: AsRef<[u8]>> IcmpHeader<T> {
    pub fn new(packet: T, offset: usize, pseudo: PseudoHeader) -> Result<Self> {
        Ok(Self {
            segment: Segment::new(packet, offset, pseudo, ICMP_HEADER_SIZE)?,
        })
    }

    pub fn icmp_type(&self) -> u8 {
        self.segment.bytes()[0]
    }

    pub fn code(&self) -> u8 {
        self.segment.bytes()[1]
    }

    pub fn checksum(&self) -> u16 {
        self.segment.u16_at(OFFSET_CHECKSUM)
    }

    /// For Echo Request/Reply: identifier
    pub fn identifier(&self) -> u16 {
        self.segment.u16_at(4)
    }

    /// For Echo Request/Reply: sequence number
    pub fn sequence(&self) -> u16 {
        self.segment.u16_at(6)
    }

    pub fn message_type(&self) -> Option<IcmpType> {
        IcmpType::from_u8(self.icmp_type())
    }

    pub fn is_echo_request(&self) -> bool {
        self.message_type() == Some(IcmpType::EchoRequest)
    }

    pub fn is_echo_reply(&self) -> bool {
        self.message_type() == Some(IcmpType::EchoReply)
    }

    /// Message body after the 8-byte header
    pub fn payload(&self) -> Result<&[u8]> {
        self.segment.payload(ICMP_HEADER_SIZE)
    }

    pub fn verify_checksum(&self) -> Result<bool> {
        self.segment.verify_checksum(false)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> IcmpHeader<T> {
    pub fn set_type(&mut self, icmp_type: u8) {
        self.segment.bytes_mut()[0] = icmp_type;
    }

    pub fn set_code(&mut self, code: u8) {
        self.segment.bytes_mut()[1] = code;
    }

    pub fn set_identifier(&mut self, id: u16) {
        self.segment.set_u16_at(4, id);
    }

    pub fn set_sequence(&mut self, seq: u16) {
        self.segment.set_u16_at(6, seq);
    }

    /// Recalculate checksum over the ICMP message
    pub fn update_checksum(&mut self) -> Result<u16> {
        self.segment.update_checksum(OFFSET_CHECKSUM, false)
    }

    /// Turn an echo request into an echo reply in place.
    ///
    /// Only the type/code word changes, so the checksum is adjusted
    /// incrementally. Returns false, leaving the message untouched, when it
    /// is not an echo request.
    pub fn revert_echo(&mut self) -> bool {
        if !self.is_echo_request() {
            return false;
        }
        let reply = (IcmpType::EchoReply as u16) << 8;
        self.segment.replace_word(OFFSET_CHECKSUM, 0, reply, false);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ip::IpHeader;

    /// 10.0.0.2 -> 10.0.0.1 echo request, id=0x1234 seq=1, "abcdefgh"
    fn make_echo_request() -> Vec<u8> {
        let mut pkt = vec![
            0x45, 0x00, 0x00, 0x24, 0x00, 0x00, 0x40, 0x00, //
            0x40, 0x01, 0x26, 0xd7, //
            10, 0, 0, 2, 10, 0, 0, 1, //
            0x08, 0x00, 0x54, 0x35, 0x12, 0x34, 0x00, 0x01,
        ];
        pkt.extend_from_slice(b"abcdefgh");
        pkt
    }

    #[test]
    fn test_icmp_type_from_u8() {
        assert_eq!(IcmpType::from_u8(0), Some(IcmpType::EchoReply));
        assert_eq!(IcmpType::from_u8(3), Some(IcmpType::DestinationUnreachable));
        assert_eq!(IcmpType::from_u8(8), Some(IcmpType::EchoRequest));
        assert_eq!(IcmpType::from_u8(11), Some(IcmpType::TimeExceeded));
        assert_eq!(IcmpType::from_u8(255), None);
    }

    #[test]
    fn test_parse_echo_request() {
        let pkt = make_echo_request();
        let ip = IpHeader::parse(&pkt[..], pkt.len()).unwrap();
        assert!(ip.as_v4().unwrap().verify_checksum());
        let icmp = ip.icmp().unwrap();

        assert_eq!(icmp.icmp_type(), 8);
        assert_eq!(icmp.code(), 0);
        assert_eq!(icmp.checksum(), 0x5435);
        assert_eq!(icmp.identifier(), 0x1234);
        assert_eq!(icmp.sequence(), 1);
        assert!(icmp.is_echo_request());
        assert!(!icmp.is_echo_reply());
        assert_eq!(icmp.payload().unwrap(), b"abcdefgh");
        assert!(icmp.verify_checksum().unwrap());
    }

    #[test]
    fn test_parse_too_short() {
        let pkt = make_echo_request();
        let ip = IpHeader::parse(&pkt[..27], 27).unwrap();
        assert!(ip.icmp().is_err());
    }

    #[test]
    fn test_update_checksum_ignores_addresses() {
        let original = make_echo_request();
        let mut pkt = original.clone();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        ip.revert_address();
        assert_eq!(ip.icmp_mut().unwrap().update_checksum().unwrap(), 0x5435);
    }

    #[test]
    fn test_revert_echo() {
        let mut pkt = make_echo_request();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut icmp = ip.icmp_mut().unwrap();

        assert!(icmp.revert_echo());
        assert_eq!(icmp.icmp_type(), 0);
        assert_eq!(icmp.code(), 0);
        assert_eq!(icmp.checksum(), 0x5c35);
        assert!(icmp.verify_checksum().unwrap());

        // a reply is left alone
        assert!(!icmp.revert_echo());
        assert_eq!(icmp.checksum(), 0x5c35);
    }

    #[test]
    fn test_revert_echo_matches_full_recompute() {
        let mut pkt = make_echo_request();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut icmp = ip.icmp_mut().unwrap();
        icmp.set_identifier(0xBEEF);
        icmp.set_sequence(0x0203);
        icmp.update_checksum().unwrap();

        assert!(icmp.revert_echo());
        let incremental = icmp.checksum();
        assert_eq!(icmp.update_checksum().unwrap(), incremental);
    }

    #[test]
    fn test_revert_echo_all_zero_message() {
        // id 0, seq 0, no data: the reply's words sum to zero
        let mut pkt = vec![
            0x45, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x40, 0x00, //
            0x40, 0x01, 0x00, 0x00, //
            10, 0, 0, 2, 10, 0, 0, 1, //
            0x08, 0x00, 0xf7, 0xff, 0x00, 0x00, 0x00, 0x00,
        ];
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut icmp = ip.icmp_mut().unwrap();
        assert!(icmp.verify_checksum().unwrap());

        assert!(icmp.revert_echo());
        let incremental = icmp.checksum();
        assert_eq!(incremental, 0xFFFF);
        assert_eq!(icmp.update_checksum().unwrap(), incremental);
        assert!(icmp.verify_checksum().unwrap());
    }

    #[test]
    fn test_revert_echo_not_echo() {
        let original = {
            let mut pkt = make_echo_request();
            pkt[20] = IcmpType::DestinationUnreachable as u8;
            pkt
        };
        let mut pkt = original.clone();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        assert!(!ip.icmp_mut().unwrap().revert_echo());
        assert_eq!(pkt, original);
    }

    #[test]
    fn test_set_type() {
        let mut pkt = make_echo_request();
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut icmp = ip.icmp_mut().unwrap();
        icmp.set_type(IcmpType::TimeExceeded as u8);
        assert_eq!(icmp.message_type(), Some(IcmpType::TimeExceeded));
        assert!(!icmp.verify_checksum().unwrap());
    }
}
