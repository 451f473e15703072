//! ARP message handling and resolution bookkeeping
//!
//! Classifies incoming ARP traffic, tracks which destinations have an
//! outstanding request, and holds datagrams until their next hop resolves.

use crate::protocol::arp::{ArpMessage, ArpOp};
use crate::protocol::ipv4::Ipv4Datagram;
use crate::protocol::MacAddr;
use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;

/// Result of processing an ARP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArpAction {
    /// Not addressed to us; nothing learned
    Ignore,
    /// A reply to us: learn the sender
    Learn,
    /// A request for our IP: answer it and learn the sender
    ReplyAndLearn(ArpMessage),
}

/// Decide what to do with an ARP message received on an interface
///
/// A request counts only when it asks for `local_ip`; a reply counts only
/// when it is addressed to `local_mac`. Anything else is ignored, including
/// gratuitous announcements from known neighbors.
pub fn process_arp(msg: &ArpMessage, local_ip: Ipv4Addr, local_mac: MacAddr) -> ArpAction {
    match msg.opcode {
        ArpOp::Request if msg.target_ip == local_ip => ArpAction::ReplyAndLearn(ArpMessage::reply(
            local_mac,
            local_ip,
            msg.sender_mac,
            msg.sender_ip,
        )),
        ArpOp::Reply if msg.target_mac == local_mac => ArpAction::Learn,
        _ => ArpAction::Ignore,
    }
}

#[derive(Debug, Clone)]
struct PendingResolution {
    suppression_remaining: u64,
    resends: u32,
}

/// Destinations due for action after a clock tick
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PendingTick {
    /// Still unresolved; broadcast the request again
    pub resend: Vec<Ipv4Addr>,
    /// Retry limit reached; the entry has been removed
    pub abandoned: Vec<Ipv4Addr>,
}

/// Outstanding ARP requests, at most one per destination
///
/// An entry suppresses further requests for its IP until the window runs
/// out, then asks for a resend and rearms itself. Entries are ordered by
/// IP so resends come out in a stable order.
#[derive(Debug)]
pub struct ArpPendingQueue {
    pending: BTreeMap<Ipv4Addr, PendingResolution>,
    resend_interval_ms: u64,
    max_retries: Option<u32>,
}

impl ArpPendingQueue {
    pub fn new(resend_interval_ms: u64, max_retries: Option<u32>) -> Self {
        Self {
            pending: BTreeMap::new(),
            resend_interval_ms,
            max_retries,
        }
    }

    /// Start the suppression window for `ip`
    pub fn arm(&mut self, ip: Ipv4Addr) {
        self.pending.insert(
            ip,
            PendingResolution {
                suppression_remaining: self.resend_interval_ms,
                resends: 0,
            },
        );
    }

    pub fn contains(&self, ip: &Ipv4Addr) -> bool {
        self.pending.contains_key(ip)
    }

    /// Forget `ip` once it has been resolved; returns whether it was pending
    pub fn resolve(&mut self, ip: &Ipv4Addr) -> bool {
        self.pending.remove(ip).is_some()
    }

    pub fn remaining(&self, ip: &Ipv4Addr) -> Option<u64> {
        self.pending.get(ip).map(|p| p.suppression_remaining)
    }

    pub fn age(&mut self, elapsed_ms: u64) -> PendingTick {
        let mut tick = PendingTick::default();

        for (ip, entry) in self.pending.iter_mut() {
            if entry.suppression_remaining > elapsed_ms {
                entry.suppression_remaining -= elapsed_ms;
                continue;
            }
            if self.max_retries.is_some_and(|max| entry.resends >= max) {
                tick.abandoned.push(*ip);
                continue;
            }
            entry.resends += 1;
            entry.suppression_remaining = self.resend_interval_ms;
            tick.resend.push(*ip);
        }

        for ip in &tick.abandoned {
            self.pending.remove(ip);
        }
        tick
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A datagram parked until its next hop resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingDatagram {
    pub datagram: Ipv4Datagram,
    pub next_hop: Ipv4Addr,
}

/// FIFO of datagrams awaiting ARP resolution, optionally bounded
#[derive(Debug, Default)]
pub struct WaitingQueue {
    queue: VecDeque<WaitingDatagram>,
    max_len: Option<usize>,
}

impl WaitingQueue {
    pub fn new(max_len: Option<usize>) -> Self {
        Self {
            queue: VecDeque::new(),
            max_len,
        }
    }

    /// Append a datagram; returns false (and drops it) when the queue is full
    pub fn push(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Addr) -> bool {
        if self.max_len.is_some_and(|max| self.queue.len() >= max) {
            return false;
        }
        self.queue.push_back(WaitingDatagram { datagram, next_hop });
        true
    }

    /// Remove every datagram waiting on `ip`, in the order they were queued
    pub fn take_for(&mut self, ip: &Ipv4Addr) -> Vec<Ipv4Datagram> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for waiting in self.queue.drain(..) {
            if waiting.next_hop == *ip {
                taken.push(waiting.datagram);
            } else {
                kept.push_back(waiting);
            }
        }
        self.queue = kept;
        taken
    }

    /// Drop every datagram waiting on `ip`, returning how many were dropped
    pub fn discard_for(&mut self, ip: &Ipv4Addr) -> usize {
        let before = self.queue.len();
        self.queue.retain(|w| w.next_hop != *ip);
        before - self.queue.len()
    }

    pub fn count_for(&self, ip: &Ipv4Addr) -> usize {
        self.queue.iter().filter(|w| w.next_hop == *ip).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitingDatagram> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
    const PEER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 2);
    const LOCAL_MAC: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    const PEER_MAC: MacAddr = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

    fn datagram(tag: u8) -> Ipv4Datagram {
        Ipv4Datagram::new(LOCAL_IP, Ipv4Addr::new(8, 8, 8, 8), 17, vec![tag])
    }

    #[test]
    fn test_request_for_us() {
        let request = ArpMessage::request(PEER_MAC, PEER_IP, LOCAL_IP);

        match process_arp(&request, LOCAL_IP, LOCAL_MAC) {
            ArpAction::ReplyAndLearn(reply) => {
                assert_eq!(reply.opcode, ArpOp::Reply);
                assert_eq!(reply.sender_mac, LOCAL_MAC);
                assert_eq!(reply.sender_ip, LOCAL_IP);
                assert_eq!(reply.target_mac, PEER_MAC);
                assert_eq!(reply.target_ip, PEER_IP);
            }
            other => panic!("Expected ReplyAndLearn, got {:?}", other),
        }
    }

    #[test]
    fn test_request_not_for_us() {
        let request = ArpMessage::request(PEER_MAC, PEER_IP, Ipv4Addr::new(192, 168, 1, 3));
        assert_eq!(process_arp(&request, LOCAL_IP, LOCAL_MAC), ArpAction::Ignore);
    }

    #[test]
    fn test_reply_to_us() {
        let reply = ArpMessage::reply(PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP);
        assert_eq!(process_arp(&reply, LOCAL_IP, LOCAL_MAC), ArpAction::Learn);
    }

    #[test]
    fn test_reply_to_someone_else() {
        let other_mac = MacAddr([0x02, 0, 0, 0, 0, 0x09]);
        let reply = ArpMessage::reply(PEER_MAC, PEER_IP, other_mac, LOCAL_IP);
        assert_eq!(process_arp(&reply, LOCAL_IP, LOCAL_MAC), ArpAction::Ignore);
    }

    #[test]
    fn test_reply_keyed_on_mac_not_ip() {
        // Addressed to our MAC but a different IP still counts as a reply
        let reply = ArpMessage::reply(PEER_MAC, PEER_IP, LOCAL_MAC, Ipv4Addr::new(10, 9, 9, 9));
        assert_eq!(process_arp(&reply, LOCAL_IP, LOCAL_MAC), ArpAction::Learn);
    }

    // ArpPendingQueue tests

    #[test]
    fn test_pending_arm_and_resolve() {
        let mut pending = ArpPendingQueue::new(5000, None);
        assert!(pending.is_empty());

        pending.arm(PEER_IP);
        assert!(pending.contains(&PEER_IP));
        assert_eq!(pending.remaining(&PEER_IP), Some(5000));

        assert!(pending.resolve(&PEER_IP));
        assert!(!pending.resolve(&PEER_IP));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_pending_resends_periodically() {
        let mut pending = ArpPendingQueue::new(5000, None);
        pending.arm(PEER_IP);

        assert_eq!(pending.age(4999), PendingTick::default());
        let tick = pending.age(1);
        assert_eq!(tick.resend, vec![PEER_IP]);
        assert!(tick.abandoned.is_empty());
        assert_eq!(pending.remaining(&PEER_IP), Some(5000));

        // Rearmed, not removed
        assert_eq!(pending.age(5000).resend, vec![PEER_IP]);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_pending_resend_order_is_stable() {
        let mut pending = ArpPendingQueue::new(5000, None);
        pending.arm(Ipv4Addr::new(10, 0, 0, 9));
        pending.arm(Ipv4Addr::new(10, 0, 0, 1));
        pending.arm(Ipv4Addr::new(10, 0, 0, 5));

        let tick = pending.age(5000);
        assert_eq!(
            tick.resend,
            vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(10, 0, 0, 9),
            ]
        );
    }

    #[test]
    fn test_pending_retry_limit() {
        let mut pending = ArpPendingQueue::new(5000, Some(2));
        pending.arm(PEER_IP);

        assert_eq!(pending.age(5000).resend, vec![PEER_IP]);
        assert_eq!(pending.age(5000).resend, vec![PEER_IP]);

        let tick = pending.age(5000);
        assert!(tick.resend.is_empty());
        assert_eq!(tick.abandoned, vec![PEER_IP]);
        assert!(!pending.contains(&PEER_IP));
    }

    #[test]
    fn test_pending_zero_retries_abandons_at_first_expiry() {
        let mut pending = ArpPendingQueue::new(5000, Some(0));
        pending.arm(PEER_IP);

        let tick = pending.age(5000);
        assert!(tick.resend.is_empty());
        assert_eq!(tick.abandoned, vec![PEER_IP]);
    }

    // WaitingQueue tests

    #[test]
    fn test_waiting_take_for_keeps_order() {
        let other = Ipv4Addr::new(192, 168, 1, 3);
        let mut queue = WaitingQueue::new(None);
        queue.push(datagram(1), PEER_IP);
        queue.push(datagram(2), other);
        queue.push(datagram(3), PEER_IP);

        let taken = queue.take_for(&PEER_IP);
        assert_eq!(taken, vec![datagram(1), datagram(3)]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.count_for(&other), 1);
        assert!(queue.take_for(&PEER_IP).is_empty());
    }

    #[test]
    fn test_waiting_bound() {
        let mut queue = WaitingQueue::new(Some(2));
        assert!(queue.push(datagram(1), PEER_IP));
        assert!(queue.push(datagram(2), PEER_IP));
        assert!(!queue.push(datagram(3), PEER_IP));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_waiting_discard_for() {
        let mut queue = WaitingQueue::default();
        queue.push(datagram(1), PEER_IP);
        queue.push(datagram(2), LOCAL_IP);
        queue.push(datagram(3), PEER_IP);

        assert_eq!(queue.discard_for(&PEER_IP), 2);
        assert_eq!(queue.iter().count(), 1);
        assert!(!queue.is_empty());
    }
}
