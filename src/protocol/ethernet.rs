//! Ethernet II frames

use super::{need, EtherType, MacAddr, ParseError};

/// Ethernet header size (no VLAN tag, no FCS)
pub const HEADER_SIZE: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
}

impl EthernetHeader {
    pub fn new(dst: MacAddr, src: MacAddr, ethertype: EtherType) -> Self {
        Self {
            dst,
            src,
            ethertype: ethertype as u16,
        }
    }

    /// Known EtherType, if any
    pub fn kind(&self) -> Option<EtherType> {
        EtherType::from_u16(self.ethertype)
    }
}

/// An owned Ethernet frame: header plus opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub header: EthernetHeader,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    pub fn new(header: EthernetHeader, payload: Vec<u8>) -> Self {
        Self { header, payload }
    }

    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        need("Ethernet frame", buffer, HEADER_SIZE)?;

        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&buffer[0..6]);
        src.copy_from_slice(&buffer[6..12]);

        Ok(Self {
            header: EthernetHeader {
                dst: MacAddr(dst),
                src: MacAddr(src),
                ethertype: u16::from_be_bytes([buffer[12], buffer[13]]),
            },
            payload: buffer[HEADER_SIZE..].to_vec(),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.header.dst.0);
        out.extend_from_slice(&self.header.src.0);
        out.extend_from_slice(&self.header.ethertype.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut frame = vec![0xff; 6];
        frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x07]);
        frame.extend_from_slice(&[0x08, 0x06]);
        frame.extend_from_slice(&[0xde, 0xad]);
        frame
    }

    #[test]
    fn test_parse() {
        let frame = EthernetFrame::parse(&sample()).unwrap();
        assert!(frame.header.dst.is_broadcast());
        assert_eq!(frame.header.src, MacAddr([0x02, 0, 0, 0, 0, 0x07]));
        assert_eq!(frame.header.kind(), Some(EtherType::Arp));
        assert_eq!(frame.payload, vec![0xde, 0xad]);
    }

    #[test]
    fn test_parse_header_only() {
        let frame = EthernetFrame::parse(&sample()[..HEADER_SIZE]).unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_parse_too_short() {
        let err = EthernetFrame::parse(&[0u8; 13]).unwrap_err();
        assert_eq!(
            err,
            ParseError::Truncated {
                what: "Ethernet frame",
                need: 14,
                got: 13
            }
        );
    }

    #[test]
    fn test_unknown_ethertype_is_kept() {
        let mut data = sample();
        data[12] = 0x86;
        data[13] = 0xdd;
        let frame = EthernetFrame::parse(&data).unwrap();
        assert_eq!(frame.header.ethertype, 0x86dd);
        assert_eq!(frame.header.kind(), None);
    }

    #[test]
    fn test_serialize_matches_wire() {
        let frame = EthernetFrame::new(
            EthernetHeader::new(
                MacAddr::BROADCAST,
                MacAddr([0x02, 0, 0, 0, 0, 0x07]),
                EtherType::Arp,
            ),
            vec![0xde, 0xad],
        );
        assert_eq!(frame.serialize(), sample());
    }
}
