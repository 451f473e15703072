//! ARP (RFC 826) for Ethernet/IPv4

use super::{need, EtherType, MacAddr, ParseError};
use std::net::Ipv4Addr;

/// Wire size of an Ethernet/IPv4 ARP message
pub const ARP_MESSAGE_SIZE: usize = 28;

const HTYPE_ETHERNET: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

impl ArpOp {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(ArpOp::Request),
            2 => Some(ArpOp::Reply),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpMessage {
    pub opcode: ArpOp,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpMessage {
    /// Who-has `target_ip`; the target hardware address is left zero
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            opcode: ArpOp::Request,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::ZERO,
            target_ip,
        }
    }

    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            opcode: ArpOp::Reply,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }

    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        need("ARP message", buffer, ARP_MESSAGE_SIZE)?;

        let htype = u16::from_be_bytes([buffer[0], buffer[1]]);
        if htype != HTYPE_ETHERNET {
            return Err(ParseError::HardwareType(htype));
        }
        let ptype = u16::from_be_bytes([buffer[2], buffer[3]]);
        if ptype != EtherType::Ipv4 as u16 {
            return Err(ParseError::ProtocolType(ptype));
        }
        let (hlen, plen) = (buffer[4], buffer[5]);
        if hlen != 6 || plen != 4 {
            return Err(ParseError::AddressLength { hlen, plen });
        }
        let op = u16::from_be_bytes([buffer[6], buffer[7]]);
        let opcode = ArpOp::from_u16(op).ok_or(ParseError::Opcode(op))?;

        let mac_at = |at: usize| {
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&buffer[at..at + 6]);
            MacAddr(mac)
        };
        let ip_at = |at: usize| Ipv4Addr::new(buffer[at], buffer[at + 1], buffer[at + 2], buffer[at + 3]);

        Ok(Self {
            opcode,
            sender_mac: mac_at(8),
            sender_ip: ip_at(14),
            target_mac: mac_at(18),
            target_ip: ip_at(24),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ARP_MESSAGE_SIZE);
        out.extend_from_slice(&HTYPE_ETHERNET.to_be_bytes());
        out.extend_from_slice(&(EtherType::Ipv4 as u16).to_be_bytes());
        out.push(6);
        out.push(4);
        out.extend_from_slice(&(self.opcode as u16).to_be_bytes());
        out.extend_from_slice(&self.sender_mac.0);
        out.extend_from_slice(&self.sender_ip.octets());
        out.extend_from_slice(&self.target_mac.0);
        out.extend_from_slice(&self.target_ip.octets());
        out
    }
}
