//! Counters for interface and router activity.
//!
//! Counters only grow; they are observability, not state the forwarding
//! logic reads back.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-interface statistics.
#[derive(Debug, Default)]
pub struct InterfaceStats {
    /// Frames handed to the interface from the link.
    pub frames_in: Counter,
    /// Frames discarded on receive (wrong address, undecodable, unknown type).
    pub frames_dropped: Counter,
    /// Frames placed on the outbound queue.
    pub frames_out: Counter,
    /// Datagrams surfaced to the caller.
    pub datagrams_delivered: Counter,
    /// Datagrams parked waiting for ARP.
    pub datagrams_queued: Counter,
    /// Datagrams discarded before transmission (suppressed, queue full, abandoned).
    pub datagrams_dropped: Counter,
    /// ARP requests broadcast, including resends.
    pub arp_requests_sent: Counter,
    /// ARP replies sent.
    pub arp_replies_sent: Counter,
    /// Cache entries removed by aging.
    pub arp_evictions: Counter,
}

impl InterfaceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports counters as `{prefix}_{name}` pairs.
    pub fn export(&self, prefix: &str) -> Vec<(String, u64)> {
        [
            ("frames_in", &self.frames_in),
            ("frames_dropped", &self.frames_dropped),
            ("frames_out", &self.frames_out),
            ("datagrams_delivered", &self.datagrams_delivered),
            ("datagrams_queued", &self.datagrams_queued),
            ("datagrams_dropped", &self.datagrams_dropped),
            ("arp_requests_sent", &self.arp_requests_sent),
            ("arp_replies_sent", &self.arp_replies_sent),
            ("arp_evictions", &self.arp_evictions),
        ]
        .into_iter()
        .map(|(name, counter)| (format!("{}_{}", prefix, name), counter.get()))
        .collect()
    }
}

/// Router-level forwarding statistics.
#[derive(Debug, Default)]
pub struct RouterStats {
    /// Datagrams handed to an outgoing interface.
    pub forwarded: Counter,
    /// Datagrams dropped because no route matched.
    pub no_route: Counter,
    /// Datagrams dropped because their TTL ran out.
    pub ttl_expired: Counter,
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped(&self) -> u64 {
        self.no_route.get() + self.ttl_expired.get()
    }

    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("forwarded".into(), self.forwarded.get()),
            ("no_route".into(), self.no_route.get()),
            ("ttl_expired".into(), self.ttl_expired.get()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_basic() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.add(10);
        assert_eq!(counter.get(), 11);
    }

    #[test]
    fn test_interface_stats_export() {
        let stats = InterfaceStats::new();
        stats.frames_in.add(3);
        stats.arp_requests_sent.inc();

        let exported = stats.export("eth0");
        assert!(exported.contains(&("eth0_frames_in".into(), 3)));
        assert!(exported.contains(&("eth0_arp_requests_sent".into(), 1)));
        assert!(exported.contains(&("eth0_frames_out".into(), 0)));
    }

    #[test]
    fn test_router_stats() {
        let stats = RouterStats::new();
        stats.forwarded.inc();
        stats.no_route.inc();
        stats.ttl_expired.add(2);

        assert_eq!(stats.dropped(), 3);
        assert!(stats.export().contains(&("forwarded".into(), 1)));
    }
}
