//! TCP protocol - RFC 793
//!
//! Header accessors and checksum maintenance. No connection state is kept;
//! flags and sequence numbers are exposed for diagnostics.

use super::transport::{PseudoHeader, Segment};
use crate::Result;
use std::fmt;

/// Minimum TCP header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

/// TCP protocol number for pseudo-header
pub const PROTOCOL_NUMBER: u8 = 6;

const OFFSET_CHECKSUM: usize = 16;

/// TCP flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,
}

impl TcpFlags {
    /// Parse flags from the 13th byte of TCP header
    pub fn from_byte(byte: u8) -> Self {
        Self {
            fin: (byte & 0x01) != 0,
            syn: (byte & 0x02) != 0,
            rst: (byte & 0x04) != 0,
            psh: (byte & 0x08) != 0,
            ack: (byte & 0x10) != 0,
            urg: (byte & 0x20) != 0,
            ece: (byte & 0x40) != 0,
            cwr: (byte & 0x80) != 0,
        }
    }

    pub fn to_byte(&self) -> u8 {
        [
            self.fin, self.syn, self.rst, self.psh, self.ack, self.urg, self.ece, self.cwr,
        ]
        .iter()
        .enumerate()
        .fold(0u8, |byte, (bit, &set)| byte | ((set as u8) << bit))
    }

    /// Check if this is a connection establishment (SYN without ACK)
    pub fn is_syn_only(&self) -> bool {
        self.syn && !self.ack
    }

    pub fn is_syn_ack(&self) -> bool {
        self.syn && self.ack
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (self.syn, "SYN"),
            (self.ack, "ACK"),
            (self.psh, "PSH"),
            (self.rst, "RST"),
            (self.fin, "FIN"),
            (self.urg, "URG"),
        ];
        for (_, name) in names.iter().filter(|(set, _)| *set) {
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// TCP header view inside an IP packet
#[derive(Debug, Clone)]
pub struct TcpHeader<T> {
    segment: Segment<T>,
}

impl<T: AsRef<[u8]>> TcpHeader<T> {
    /// View the TCP header at `offset`; the 20-byte fixed header must fit.
    pub fn new(packet: T, offset: usize, pseudo: PseudoHeader) -> Result<Self> {
        Ok(Self {
            segment: Segment::new(packet, offset, pseudo, MIN_HEADER_SIZE)?,
        })
    }

    pub fn src_port(&self) -> u16 {
        self.segment.u16_at(0)
    }

    pub fn dst_port(&self) -> u16 {
        self.segment.u16_at(2)
    }

    pub fn seq_num(&self) -> u32 {
        self.segment.u32_at(4)
    }

    pub fn ack_num(&self) -> u32 {
        self.segment.u32_at(8)
    }

    /// Data offset (header length in 32-bit words)
    pub fn data_offset(&self) -> u8 {
        self.segment.bytes()[12] >> 4
    }

    /// Header length in bytes, options included
    pub fn header_len(&self) -> usize {
        self.data_offset() as usize * 4
    }

    pub fn flags(&self) -> TcpFlags {
        TcpFlags::from_byte(self.segment.bytes()[13])
    }

    pub fn window(&self) -> u16 {
        self.segment.u16_at(14)
    }

    pub fn checksum(&self) -> u16 {
        self.segment.u16_at(OFFSET_CHECKSUM)
    }

    pub fn urgent_ptr(&self) -> u16 {
        self.segment.u16_at(18)
    }

    /// Segment data after the header, bounded by the IP data length
    pub fn payload(&self) -> Result<&[u8]> {
        self.segment.payload(self.header_len())
    }

    /// Validate checksum with pseudo-header
    pub fn verify_checksum(&self) -> Result<bool> {
        self.segment.verify_checksum(true)
    }

    pub fn pseudo_header(&self) -> PseudoHeader {
        self.segment.pseudo()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> TcpHeader<T> {
    /// Set source port (checksum must be updated separately)
    pub fn set_src_port(&mut self, port: u16) {
        self.segment.set_u16_at(0, port);
    }

    /// Set destination port (checksum must be updated separately)
    pub fn set_dst_port(&mut self, port: u16) {
        self.segment.set_u16_at(2, port);
    }

    /// Swap source and destination ports in place.
    pub fn revert_port(&mut self) {
        let (src, dst) = (self.src_port(), self.dst_port());
        self.set_src_port(dst);
        self.set_dst_port(src);
    }

    pub fn set_flags(&mut self, flags: TcpFlags) {
        self.segment.bytes_mut()[13] = flags.to_byte();
    }

    /// Recalculate and write the checksum over header and payload
    pub fn update_checksum(&mut self) -> Result<u16> {
        self.segment.update_checksum(OFFSET_CHECKSUM, true)
    }
}

impl<T: AsRef<[u8]>> fmt::Display for TcpHeader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} {}:{}",
            self.flags(),
            self.src_port(),
            self.dst_port(),
            self.seq_num(),
            self.ack_num()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ip::IpHeader;
    use crate::Error;

    fn make_tcp_segment() -> Vec<u8> {
        // TCP segment: src_port=12345, dst_port=80, seq=1, ack=0, flags=SYN
        vec![
            0x30, 0x39, // src_port = 12345
            0x00, 0x50, // dst_port = 80
            0x00, 0x00, 0x00, 0x01, // seq = 1
            0x00, 0x00, 0x00, 0x00, // ack = 0
            0x50, // data_offset = 5 (20 bytes), reserved = 0
            0x02, // flags = SYN
            0x72, 0x10, // window = 29200
            0x15, 0x61, // checksum
            0x00, 0x00, // urgent_ptr = 0
        ]
    }

    /// 192.168.1.100 -> 93.184.216.34, TCP, carrying `segment`
    fn make_ipv4_packet(segment: &[u8]) -> Vec<u8> {
        let total = (20 + segment.len()) as u16;
        let mut pkt = vec![0x45, 0x00];
        pkt.extend_from_slice(&total.to_be_bytes());
        pkt.extend_from_slice(&[0x00, 0x00, 0x40, 0x00, 0x40, PROTOCOL_NUMBER, 0x00, 0x00]);
        pkt.extend_from_slice(&[192, 168, 1, 100, 93, 184, 216, 34]);
        pkt.extend_from_slice(segment);
        pkt
    }

    #[test]
    fn test_tcp_flags_from_byte() {
        let flags = TcpFlags::from_byte(0x02); // SYN
        assert!(flags.syn);
        assert!(!flags.ack);
        assert!(!flags.fin);
        assert!(!flags.rst);

        let flags = TcpFlags::from_byte(0x12); // SYN + ACK
        assert!(flags.is_syn_ack());

        let flags = TcpFlags::from_byte(0x11); // FIN + ACK
        assert!(flags.fin);
        assert!(flags.ack);

        let flags = TcpFlags::from_byte(0xC0);
        assert!(flags.ece && flags.cwr);
    }

    #[test]
    fn test_tcp_flags_to_byte() {
        let flags = TcpFlags {
            syn: true,
            ack: true,
            ..Default::default()
        };
        assert_eq!(flags.to_byte(), 0x12);
        for byte in [0x00, 0x02, 0x11, 0x3F, 0xFF] {
            assert_eq!(TcpFlags::from_byte(byte).to_byte(), byte);
        }
    }

    #[test]
    fn test_tcp_flags_display() {
        assert_eq!(TcpFlags::from_byte(0x12).to_string(), "SYNACK");
        assert_eq!(TcpFlags::from_byte(0x18).to_string(), "ACKPSH");
        assert_eq!(TcpFlags::from_byte(0x00).to_string(), "");
        assert!(TcpFlags::from_byte(0x02).is_syn_only());
    }

    #[test]
    fn test_tcp_header_fields() {
        let pkt = make_ipv4_packet(&make_tcp_segment());
        let ip = IpHeader::parse(&pkt[..], pkt.len()).unwrap();
        let hdr = ip.tcp().unwrap();

        assert_eq!(hdr.src_port(), 12345);
        assert_eq!(hdr.dst_port(), 80);
        assert_eq!(hdr.seq_num(), 1);
        assert_eq!(hdr.ack_num(), 0);
        assert_eq!(hdr.data_offset(), 5);
        assert_eq!(hdr.header_len(), 20);
        assert!(hdr.flags().syn);
        assert!(!hdr.flags().ack);
        assert_eq!(hdr.window(), 29200);
        assert_eq!(hdr.urgent_ptr(), 0);
        assert!(hdr.payload().unwrap().is_empty());
        assert_eq!(hdr.to_string(), "SYN 12345 -> 80 1:0");
    }

    #[test]
    fn test_tcp_header_truncated() {
        let pkt = make_ipv4_packet(&make_tcp_segment()[..19]);
        let ip = IpHeader::parse(&pkt[..], pkt.len()).unwrap();
        assert!(matches!(ip.tcp(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_tcp_checksum_known_value() {
        let pkt = make_ipv4_packet(&make_tcp_segment());
        let ip = IpHeader::parse(&pkt[..], pkt.len()).unwrap();
        assert!(ip.tcp().unwrap().verify_checksum().unwrap());

        let mut data = pkt.clone();
        let len = data.len();
        let mut ip = IpHeader::parse(&mut data[..], len).unwrap();
        let mut hdr = ip.tcp_mut().unwrap();
        assert_eq!(hdr.update_checksum().unwrap(), 0x1561);
        assert_eq!(data, pkt);
    }

    #[test]
    fn test_tcp_with_payload() {
        let mut seg = make_tcp_segment();
        seg.extend_from_slice(b"GET / HTTP/1.1\r\n");
        let mut pkt = make_ipv4_packet(&seg);
        let len = pkt.len();

        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut hdr = ip.tcp_mut().unwrap();
        assert!(!hdr.verify_checksum().unwrap());
        assert_eq!(hdr.update_checksum().unwrap(), 0x43ba);
        assert!(hdr.verify_checksum().unwrap());
        assert_eq!(hdr.payload().unwrap(), b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn test_tcp_set_ports_and_revert() {
        let mut pkt = make_ipv4_packet(&make_tcp_segment());
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut hdr = ip.tcp_mut().unwrap();

        hdr.set_src_port(54321);
        hdr.set_dst_port(8080);
        assert_eq!(hdr.src_port(), 54321);
        assert_eq!(hdr.dst_port(), 8080);
        assert!(!hdr.verify_checksum().unwrap());

        hdr.update_checksum().unwrap();
        hdr.revert_port();
        assert_eq!(hdr.src_port(), 8080);
        assert_eq!(hdr.dst_port(), 54321);
        // swapping two words leaves the sum unchanged
        assert!(hdr.verify_checksum().unwrap());
    }

    #[test]
    fn test_tcp_set_flags() {
        let mut pkt = make_ipv4_packet(&make_tcp_segment());
        let len = pkt.len();
        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut hdr = ip.tcp_mut().unwrap();
        hdr.set_flags(TcpFlags::from_byte(0x12));
        assert!(hdr.flags().is_syn_ack());
        assert_eq!(hdr.to_string(), "SYNACK 12345 -> 80 1:0");
    }

    #[test]
    fn test_tcp_ipv6_checksum() {
        let mut pkt = vec![0x60, 0, 0, 0, 0, 20, PROTOCOL_NUMBER, 64];
        pkt.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        pkt.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        pkt.extend_from_slice(&make_tcp_segment());
        let len = pkt.len();

        let mut ip = IpHeader::parse(&mut pkt[..], len).unwrap();
        let mut hdr = ip.tcp_mut().unwrap();
        assert_eq!(hdr.update_checksum().unwrap(), 0xb1d3);
        assert!(hdr.verify_checksum().unwrap());
    }
}
