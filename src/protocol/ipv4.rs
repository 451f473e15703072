//! IPv4 datagrams - RFC 791
//!
//! Only the fields the forwarding plane touches are interpreted; options are
//! carried through untouched. Fragmentation is not handled.

use super::{need, ParseError};
use std::net::Ipv4Addr;

/// Header size without options
pub const MIN_HEADER_SIZE: usize = 20;

/// Largest header the 4-bit IHL field can describe
pub const MAX_HEADER_SIZE: usize = 60;

/// Largest datagram the 16-bit total length field can describe
pub const MAX_TOTAL_LEN: usize = u16::MAX as usize;

/// TTL given to datagrams built with [`Ipv4Datagram::new`]
pub const DEFAULT_TTL: u8 = 64;

/// RFC 1071 internet checksum
///
/// Summing a header whose checksum field is already filled in yields zero.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data.chunks(2).fold(0, |acc, pair| {
        let word = u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]) as u32;
        let acc = acc + word;
        (acc & 0xffff) + (acc >> 16)
    });
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub tos: u8,
    pub identification: u16,
    pub dont_fragment: bool,
    pub more_fragments: bool,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    /// Raw option bytes, a multiple of four
    pub options: Vec<u8>,
}

impl Default for Ipv4Header {
    fn default() -> Self {
        Self {
            tos: 0,
            identification: 0,
            dont_fragment: true,
            more_fragments: false,
            fragment_offset: 0,
            ttl: DEFAULT_TTL,
            protocol: 0,
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
            options: Vec::new(),
        }
    }
}

impl Ipv4Header {
    pub fn header_len(&self) -> usize {
        MIN_HEADER_SIZE + self.options.len().div_ceil(4) * 4
    }
}

/// An owned IPv4 datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Datagram {
    pub header: Ipv4Header,
    pub payload: Vec<u8>,
}

impl Ipv4Datagram {
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, payload: Vec<u8>) -> Self {
        Self {
            header: Ipv4Header {
                src,
                dst,
                protocol,
                ..Ipv4Header::default()
            },
            payload,
        }
    }

    pub fn dst(&self) -> Ipv4Addr {
        self.header.dst
    }

    pub fn ttl(&self) -> u8 {
        self.header.ttl
    }

    /// Decode a datagram, validating length fields and the header checksum
    ///
    /// Bytes past the total length (link-layer padding) are dropped.
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        need("IPv4 header", buffer, MIN_HEADER_SIZE)?;

        let version = buffer[0] >> 4;
        if version != 4 {
            return Err(ParseError::Version(version));
        }
        let ihl = buffer[0] & 0x0f;
        if ihl < 5 {
            return Err(ParseError::HeaderLength(ihl));
        }
        let header_len = ihl as usize * 4;
        need("IPv4 header", buffer, header_len)?;

        let total_len = u16::from_be_bytes([buffer[2], buffer[3]]);
        if (total_len as usize) < header_len || total_len as usize > buffer.len() {
            return Err(ParseError::TotalLength(total_len));
        }
        if checksum(&buffer[..header_len]) != 0 {
            return Err(ParseError::Checksum);
        }

        let flags_frag = u16::from_be_bytes([buffer[6], buffer[7]]);
        let header = Ipv4Header {
            tos: buffer[1],
            identification: u16::from_be_bytes([buffer[4], buffer[5]]),
            dont_fragment: flags_frag & 0x4000 != 0,
            more_fragments: flags_frag & 0x2000 != 0,
            fragment_offset: flags_frag & 0x1fff,
            ttl: buffer[8],
            protocol: buffer[9],
            src: Ipv4Addr::new(buffer[12], buffer[13], buffer[14], buffer[15]),
            dst: Ipv4Addr::new(buffer[16], buffer[17], buffer[18], buffer[19]),
            options: buffer[MIN_HEADER_SIZE..header_len].to_vec(),
        };

        Ok(Self {
            header,
            payload: buffer[header_len..total_len as usize].to_vec(),
        })
    }

    /// Size on the wire, or why the datagram cannot be encoded
    pub fn encoded_len(&self) -> Result<usize, ParseError> {
        let header_len = self.header.header_len();
        if header_len > MAX_HEADER_SIZE {
            return Err(ParseError::OptionsLength(self.header.options.len()));
        }
        let total_len = header_len + self.payload.len();
        if total_len > MAX_TOTAL_LEN {
            return Err(ParseError::Oversize(total_len));
        }
        Ok(total_len)
    }

    /// Encode with a freshly computed total length and checksum
    ///
    /// Fails when the options or the whole datagram do not fit their
    /// header fields.
    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let total_len = self.encoded_len()?;
        let h = &self.header;
        let header_len = h.header_len();

        let mut flags_frag = h.fragment_offset & 0x1fff;
        if h.dont_fragment {
            flags_frag |= 0x4000;
        }
        if h.more_fragments {
            flags_frag |= 0x2000;
        }

        let mut out = Vec::with_capacity(total_len);
        out.push(0x40 | (header_len / 4) as u8);
        out.push(h.tos);
        out.extend_from_slice(&(total_len as u16).to_be_bytes());
        out.extend_from_slice(&h.identification.to_be_bytes());
        out.extend_from_slice(&flags_frag.to_be_bytes());
        out.push(h.ttl);
        out.push(h.protocol);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&h.src.octets());
        out.extend_from_slice(&h.dst.octets());
        out.extend_from_slice(&h.options);
        out.resize(header_len, 0);

        let sum = checksum(&out[..header_len]);
        out[10..12].copy_from_slice(&sum.to_be_bytes());

        out.extend_from_slice(&self.payload);
        Ok(out)
    }
}
