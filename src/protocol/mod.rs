//! Wire formats handled by the forwarding plane
//!
//! Ethernet II framing, ARP for Ethernet/IPv4, and the IPv4 header. Every
//! parser fails closed: a malformed buffer yields a [`ParseError`], never a
//! partially filled value.

pub mod arp;
pub mod ethernet;
pub mod ipv4;
pub mod types;

pub use types::*;

/// Reason a buffer could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{what} truncated: need {need} bytes, got {got}")]
    Truncated {
        what: &'static str,
        need: usize,
        got: usize,
    },

    #[error("unsupported ARP hardware type {0}")]
    HardwareType(u16),

    #[error("unsupported ARP protocol type {0:#06x}")]
    ProtocolType(u16),

    #[error("bad ARP address lengths (hlen={hlen}, plen={plen})")]
    AddressLength { hlen: u8, plen: u8 },

    #[error("unknown ARP opcode {0}")]
    Opcode(u16),

    #[error("not an IPv4 datagram (version {0})")]
    Version(u8),

    #[error("bad IPv4 header length {0}")]
    HeaderLength(u8),

    #[error("bad IPv4 total length {0}")]
    TotalLength(u16),

    #[error("IPv4 header checksum mismatch")]
    Checksum,

    #[error("IPv4 options are {0} bytes, at most 40 fit in the header")]
    OptionsLength(usize),

    #[error("IPv4 datagram of {0} bytes exceeds the 65535-byte total length")]
    Oversize(usize),
}

/// Ensure `buffer` holds at least `need` bytes
pub(crate) fn need(what: &'static str, buffer: &[u8], need: usize) -> Result<(), ParseError> {
    if buffer.len() < need {
        return Err(ParseError::Truncated {
            what,
            need,
            got: buffer.len(),
        });
    }
    Ok(())
}
