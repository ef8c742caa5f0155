//! Per-packet routing to the TCP, UDP and ICMP paths

use crate::config::OtherStrategy;
use crate::protocol::ip::IpHeader;
use crate::protocol::Transport;
use crate::Result;

/// Which path a captured packet takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// TCP: rewrite toward the forward server ([`super::TcpRedirect`])
    Redirect,
    /// UDP: encapsulate into a relay frame ([`super::UdpRelay`])
    Relay,
    /// ICMP/ICMPv6 echo request ([`super::EchoResponder`])
    Echo,
    /// Write the packet back to the TUN device unchanged
    Forward,
    Drop,
}

impl From<OtherStrategy> for Verdict {
    fn from(strategy: OtherStrategy) -> Self {
        match strategy {
            OtherStrategy::Direct => Verdict::Forward,
            OtherStrategy::Drop => Verdict::Drop,
        }
    }
}

/// Classify `ip` by its transport protocol.
///
/// ICMP other than echo requests and every unknown protocol fall to `other`.
/// A transport header too short to read is an error, not a verdict.
pub fn classify<T: AsRef<[u8]>>(ip: &IpHeader<T>, other: OtherStrategy) -> Result<Verdict> {
    let verdict = match ip.transport()? {
        Transport::Tcp(_) => Verdict::Redirect,
        Transport::Udp(_) => Verdict::Relay,
        Transport::Icmp(icmp) if icmp.is_echo_request() => Verdict::Echo,
        Transport::Icmpv6(icmp) if icmp.is_echo_request() => Verdict::Echo,
        Transport::Icmp(_) | Transport::Icmpv6(_) | Transport::Other(_) => other.into(),
    };
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10.0.0.2 -> 10.0.0.1 with an 8-byte transport header of zeros
    fn make_packet(protocol: u8) -> Vec<u8> {
        let mut pkt = vec![
            0x45, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x40, 0x00, 0x40, protocol, 0x00, 0x00, //
            10, 0, 0, 2, 10, 0, 0, 1,
        ];
        pkt.extend_from_slice(&[0u8; 8]);
        pkt
    }

    fn classify_bytes(pkt: &[u8], other: OtherStrategy) -> Result<Verdict> {
        let ip = IpHeader::parse(pkt, pkt.len())?;
        classify(&ip, other)
    }

    #[test]
    fn test_udp_and_echo() {
        let pkt = make_packet(17);
        assert_eq!(classify_bytes(&pkt, OtherStrategy::Drop).unwrap(), Verdict::Relay);

        let mut pkt = make_packet(1);
        pkt[20] = 8;
        assert_eq!(classify_bytes(&pkt, OtherStrategy::Drop).unwrap(), Verdict::Echo);
    }

    #[test]
    fn test_tcp_redirect() {
        let mut pkt = make_packet(6);
        pkt[3] = 40;
        pkt.extend_from_slice(&[0u8; 12]);
        assert_eq!(
            classify_bytes(&pkt, OtherStrategy::Direct).unwrap(),
            Verdict::Redirect
        );
    }

    #[test]
    fn test_other_follows_strategy() {
        // echo reply, destination unreachable, GRE
        let mut reply = make_packet(1);
        reply[20] = 0;
        let mut unreachable = make_packet(1);
        unreachable[20] = 3;
        let gre = make_packet(47);

        for pkt in [&reply, &unreachable, &gre] {
            assert_eq!(
                classify_bytes(pkt, OtherStrategy::Direct).unwrap(),
                Verdict::Forward
            );
            assert_eq!(
                classify_bytes(pkt, OtherStrategy::Drop).unwrap(),
                Verdict::Drop
            );
        }
    }

    #[test]
    fn test_icmpv6_echo() {
        let mut pkt = vec![0x60, 0, 0, 0, 0x00, 0x08, 58, 64];
        pkt.extend_from_slice(&[0xfd, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        pkt.extend_from_slice(&[0xfd, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        pkt.extend_from_slice(&[128, 0, 0, 0, 0, 1, 0, 1]);
        assert_eq!(classify_bytes(&pkt, OtherStrategy::Drop).unwrap(), Verdict::Echo);

        // neighbor solicitation
        pkt[40] = 135;
        assert_eq!(classify_bytes(&pkt, OtherStrategy::Drop).unwrap(), Verdict::Drop);
    }

    #[test]
    fn test_truncated_transport_is_error() {
        let mut pkt = make_packet(17);
        pkt.truncate(24);
        pkt[3] = 24;
        assert!(classify_bytes(&pkt, OtherStrategy::Direct).is_err());
    }
}
