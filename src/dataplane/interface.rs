//! ARP-resolving network interface
//!
//! Turns `{datagram, next hop}` into Ethernet frames, resolving the next hop
//! with ARP when needed, and turns received frames into datagrams. Time only
//! moves when [`NetworkInterface::tick`] is called.

use crate::dataplane::{process_arp, ArpAction, ArpPendingQueue, ArpTable, WaitingQueue};
use crate::protocol::arp::ArpMessage;
use crate::protocol::ethernet::{EthernetFrame, EthernetHeader};
use crate::protocol::ipv4::Ipv4Datagram;
use crate::protocol::{EtherType, MacAddr};
use crate::telemetry::InterfaceStats;
use serde::Deserialize;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use tracing::{debug, trace, warn};

/// Default ARP cache entry lifetime in milliseconds
pub const ARP_CACHE_TTL_MS: u64 = 30_000;

/// Default interval between requests for an unresolved IP in milliseconds
pub const ARP_RESEND_INTERVAL_MS: u64 = 5_000;

/// What to do with a datagram whose next hop already has a request in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingSend {
    /// Drop it; only the datagram that triggered the request is kept
    #[default]
    Discard,
    /// Park it alongside the first one, without sending another request
    Enqueue,
}

/// ARP timing and queueing knobs for an interface
///
/// The default has no queue bound and retries forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPolicy {
    pub cache_ttl_ms: u64,
    pub resend_interval_ms: u64,
    /// Upper bound on parked datagrams across all destinations
    pub max_waiting: Option<usize>,
    /// Resends before an unresolved destination is given up
    pub max_retries: Option<u32>,
    pub on_pending: PendingSend,
}

impl Default for ArpPolicy {
    fn default() -> Self {
        Self {
            cache_ttl_ms: ARP_CACHE_TTL_MS,
            resend_interval_ms: ARP_RESEND_INTERVAL_MS,
            max_waiting: None,
            max_retries: None,
            on_pending: PendingSend::Discard,
        }
    }
}

pub struct NetworkInterface {
    name: String,
    mac_addr: MacAddr,
    ip_addr: Ipv4Addr,
    policy: ArpPolicy,
    arp_table: ArpTable,
    pending: ArpPendingQueue,
    waiting: WaitingQueue,
    /// Frames ready for the link
    frames_out: VecDeque<EthernetFrame>,
    /// Datagrams received via `push_frame`, waiting to be routed
    received: VecDeque<Ipv4Datagram>,
    stats: InterfaceStats,
}

impl NetworkInterface {
    pub fn new(
        name: impl Into<String>,
        mac_addr: MacAddr,
        ip_addr: Ipv4Addr,
        policy: ArpPolicy,
    ) -> Self {
        let name = name.into();
        debug!(
            "Interface {} has MAC {} and IP {}",
            name, mac_addr, ip_addr
        );
        Self {
            arp_table: ArpTable::new(policy.cache_ttl_ms),
            pending: ArpPendingQueue::new(policy.resend_interval_ms, policy.max_retries),
            waiting: WaitingQueue::new(policy.max_waiting),
            frames_out: VecDeque::new(),
            received: VecDeque::new(),
            stats: InterfaceStats::new(),
            name,
            mac_addr,
            ip_addr,
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac_addr(&self) -> MacAddr {
        self.mac_addr
    }

    pub fn ip_addr(&self) -> Ipv4Addr {
        self.ip_addr
    }

    pub fn policy(&self) -> &ArpPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &InterfaceStats {
        &self.stats
    }

    /// Send `datagram` toward `next_hop`
    ///
    /// Never fails: a cache hit emits a frame, a miss emits (at most) one
    /// broadcast request and parks the datagram. A datagram too large to
    /// encode is dropped before any ARP traffic.
    pub fn send_datagram(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Addr) {
        if let Err(e) = datagram.encoded_len() {
            warn!("{}: dropping datagram for {}: {}", self.name, datagram.dst(), e);
            self.stats.datagrams_dropped.inc();
            return;
        }

        if let Some(mac) = self.arp_table.lookup(&next_hop) {
            match datagram.serialize() {
                Ok(bytes) => self.transmit(mac, EtherType::Ipv4, bytes),
                Err(e) => {
                    warn!("{}: dropping datagram for {}: {}", self.name, datagram.dst(), e);
                    self.stats.datagrams_dropped.inc();
                }
            }
            return;
        }

        if self.pending.contains(&next_hop) {
            match self.policy.on_pending {
                PendingSend::Discard => {
                    trace!(
                        "{}: request for {} already pending, dropping datagram",
                        self.name,
                        next_hop
                    );
                    self.stats.datagrams_dropped.inc();
                }
                PendingSend::Enqueue => self.park(datagram, next_hop),
            }
            return;
        }

        self.send_arp_request(next_hop);
        self.park(datagram, next_hop);
        self.pending.arm(next_hop);
    }

    /// Handle a frame from the link
    ///
    /// Returns the datagram carried by an IPv4 frame addressed to us. ARP
    /// frames are consumed here and never surface.
    pub fn recv_frame(&mut self, frame: &EthernetFrame) -> Option<Ipv4Datagram> {
        self.stats.frames_in.inc();

        let dst = frame.header.dst;
        if dst != self.mac_addr && !dst.is_broadcast() {
            trace!("{}: frame for {} is not ours", self.name, dst);
            self.stats.frames_dropped.inc();
            return None;
        }

        match frame.header.kind() {
            Some(EtherType::Ipv4) => match Ipv4Datagram::parse(&frame.payload) {
                Ok(datagram) => {
                    self.stats.datagrams_delivered.inc();
                    Some(datagram)
                }
                Err(e) => {
                    debug!("{}: dropping bad IPv4 payload: {}", self.name, e);
                    self.stats.frames_dropped.inc();
                    None
                }
            },
            Some(EtherType::Arp) => {
                match ArpMessage::parse(&frame.payload) {
                    Ok(msg) => self.handle_arp(&msg),
                    Err(e) => {
                        debug!("{}: dropping bad ARP payload: {}", self.name, e);
                        self.stats.frames_dropped.inc();
                    }
                }
                None
            }
            None => {
                trace!(
                    "{}: ignoring ethertype {:#06x}",
                    self.name,
                    frame.header.ethertype
                );
                self.stats.frames_dropped.inc();
                None
            }
        }
    }

    /// Decode raw link bytes and handle them like [`Self::recv_frame`]
    pub fn recv_bytes(&mut self, bytes: &[u8]) -> Option<Ipv4Datagram> {
        match EthernetFrame::parse(bytes) {
            Ok(frame) => self.recv_frame(&frame),
            Err(e) => {
                debug!("{}: dropping undecodable frame: {}", self.name, e);
                self.stats.frames_in.inc();
                self.stats.frames_dropped.inc();
                None
            }
        }
    }

    /// Receive a frame and queue any delivered datagram for the router
    pub fn push_frame(&mut self, frame: &EthernetFrame) {
        if let Some(datagram) = self.recv_frame(frame) {
            self.received.push_back(datagram);
        }
    }

    pub fn pop_received(&mut self) -> Option<Ipv4Datagram> {
        self.received.pop_front()
    }

    pub fn received_len(&self) -> usize {
        self.received.len()
    }

    /// Advance the interface clock by `ms_since_last_tick`
    ///
    /// Evicts expired cache entries and resends requests whose suppression
    /// window has run out.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        let evicted = self.arp_table.age(ms_since_last_tick);
        if evicted > 0 {
            trace!("{}: {} ARP entries expired", self.name, evicted);
            self.stats.arp_evictions.add(evicted as u64);
        }

        let due = self.pending.age(ms_since_last_tick);
        for ip in due.resend {
            self.send_arp_request(ip);
        }
        for ip in due.abandoned {
            let dropped = self.waiting.discard_for(&ip);
            warn!(
                "{}: giving up on {}, dropping {} queued datagrams",
                self.name, ip, dropped
            );
            self.stats.datagrams_dropped.add(dropped as u64);
        }
    }

    pub fn pop_frame(&mut self) -> Option<EthernetFrame> {
        self.frames_out.pop_front()
    }

    pub fn frames_out(&self) -> &VecDeque<EthernetFrame> {
        &self.frames_out
    }

    /// Take every queued outbound frame
    pub fn drain_frames(&mut self) -> Vec<EthernetFrame> {
        self.frames_out.drain(..).collect()
    }

    pub fn arp_lookup(&self, ip: &Ipv4Addr) -> Option<MacAddr> {
        self.arp_table.lookup(ip)
    }

    pub fn arp_table(&self) -> &ArpTable {
        &self.arp_table
    }

    pub fn has_pending(&self, ip: &Ipv4Addr) -> bool {
        self.pending.contains(ip)
    }

    pub fn waiting(&self) -> &WaitingQueue {
        &self.waiting
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    fn handle_arp(&mut self, msg: &ArpMessage) {
        let action = process_arp(msg, self.ip_addr, self.mac_addr);
        match action {
            ArpAction::Ignore => return,
            ArpAction::ReplyAndLearn(reply) => {
                trace!("{}: answering ARP from {}", self.name, msg.sender_ip);
                self.transmit(msg.sender_mac, EtherType::Arp, reply.serialize());
                self.stats.arp_replies_sent.inc();
            }
            ArpAction::Learn => {}
        }
        self.learn(msg.sender_ip, msg.sender_mac);
    }

    /// Record a binding and flush everything that was waiting on it
    fn learn(&mut self, ip: Ipv4Addr, mac: MacAddr) {
        self.arp_table.insert(ip, mac);

        let ready = self.waiting.take_for(&ip);
        if !ready.is_empty() {
            debug!(
                "{}: {} is at {}, flushing {} datagrams",
                self.name,
                ip,
                mac,
                ready.len()
            );
        }
        for datagram in ready {
            self.send_datagram(datagram, ip);
        }

        self.pending.resolve(&ip);
    }

    fn park(&mut self, datagram: Ipv4Datagram, next_hop: Ipv4Addr) {
        if self.waiting.push(datagram, next_hop) {
            self.stats.datagrams_queued.inc();
        } else {
            warn!(
                "{}: waiting queue full, dropping datagram for {}",
                self.name, next_hop
            );
            self.stats.datagrams_dropped.inc();
        }
    }

    fn send_arp_request(&mut self, target_ip: Ipv4Addr) {
        trace!("{}: who-has {}", self.name, target_ip);
        let request = ArpMessage::request(self.mac_addr, self.ip_addr, target_ip);
        self.transmit(MacAddr::BROADCAST, EtherType::Arp, request.serialize());
        self.stats.arp_requests_sent.inc();
    }

    fn transmit(&mut self, dst: MacAddr, ethertype: EtherType, payload: Vec<u8>) {
        let header = EthernetHeader::new(dst, self.mac_addr, ethertype);
        self.frames_out.push_back(EthernetFrame::new(header, payload));
        self.stats.frames_out.inc();
    }
}
