use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("buffer truncated: {width} bytes at offset {offset} exceed length {len}")]
    Truncated {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("unsupported IP version {0}")]
    UnsupportedVersion(u8),

    #[error("address family does not match the IP header")]
    AddressFamily,

    #[error("expected protocol {expected}, packet carries {actual}")]
    ProtocolMismatch { expected: u8, actual: u8 },

    #[error("framing violation: {0}")]
    Framing(String),

    #[error("unsupported SOCKS5 address type {0:#04x}")]
    UnsupportedAddressType(u8),

    #[error("domain name length {0} out of range 1..=255")]
    DomainLength(usize),

    #[error("packet of {size} bytes exceeds MTU {mtu}")]
    PacketTooLarge { size: usize, mtu: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
