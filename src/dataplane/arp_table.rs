//! ARP cache (IPv4 to MAC) with clock-driven expiry

use crate::protocol::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;

#[derive(Debug, Clone)]
struct ArpEntry {
    mac: MacAddr,
    ttl_remaining: u64,
}

/// ARP cache for one interface
///
/// Entries carry a countdown in milliseconds that only moves when
/// [`ArpTable::age`] is called. Expired entries are removed during aging;
/// lookups never check freshness.
#[derive(Debug)]
pub struct ArpTable {
    entries: HashMap<Ipv4Addr, ArpEntry>,
    lifetime_ms: u64,
}

impl ArpTable {
    pub fn new(lifetime_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lifetime_ms,
        }
    }

    /// Insert or overwrite the binding for `ip`, restarting its lifetime
    pub fn insert(&mut self, ip: Ipv4Addr, mac: MacAddr) {
        self.entries.insert(
            ip,
            ArpEntry {
                mac,
                ttl_remaining: self.lifetime_ms,
            },
        );
    }

    pub fn lookup(&self, ip: &Ipv4Addr) -> Option<MacAddr> {
        self.entries.get(ip).map(|e| e.mac)
    }

    /// Milliseconds left before `ip` is evicted
    pub fn remaining(&self, ip: &Ipv4Addr) -> Option<u64> {
        self.entries.get(ip).map(|e| e.ttl_remaining)
    }

    /// Advance every entry by `elapsed_ms`, returning how many were evicted
    pub fn age(&mut self, elapsed_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            if entry.ttl_remaining <= elapsed_ms {
                return false;
            }
            entry.ttl_remaining -= elapsed_ms;
            true
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIFETIME: u64 = 30_000;

    fn ip() -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 1, 2)
    }

    fn mac(last: u8) -> MacAddr {
        MacAddr([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut table = ArpTable::new(LIFETIME);
        assert!(table.is_empty());

        table.insert(ip(), mac(1));
        assert_eq!(table.lookup(&ip()), Some(mac(1)));
        assert_eq!(table.remaining(&ip()), Some(LIFETIME));
        assert_eq!(table.lookup(&Ipv4Addr::new(192, 168, 1, 3)), None);
    }

    #[test]
    fn test_overwrite_replaces_and_restarts() {
        let mut table = ArpTable::new(LIFETIME);
        table.insert(ip(), mac(1));
        table.age(10_000);
        table.insert(ip(), mac(2));

        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&ip()), Some(mac(2)));
        assert_eq!(table.remaining(&ip()), Some(LIFETIME));
    }

    #[test]
    fn test_entry_survives_until_lifetime() {
        let mut table = ArpTable::new(LIFETIME);
        table.insert(ip(), mac(1));

        assert_eq!(table.age(29_999), 0);
        assert_eq!(table.lookup(&ip()), Some(mac(1)));
        assert_eq!(table.remaining(&ip()), Some(1));

        assert_eq!(table.age(1), 1);
        assert_eq!(table.lookup(&ip()), None);
    }

    #[test]
    fn test_expiry_with_many_small_ticks() {
        let mut table = ArpTable::new(LIFETIME);
        table.insert(ip(), mac(1));

        for _ in 0..2999 {
            table.age(10);
        }
        assert!(table.lookup(&ip()).is_some());
        table.age(10);
        assert!(table.lookup(&ip()).is_none());
    }

    #[test]
    fn test_large_tick_evicts() {
        let mut table = ArpTable::new(LIFETIME);
        table.insert(ip(), mac(1));
        table.insert(Ipv4Addr::new(192, 168, 1, 3), mac(2));

        assert_eq!(table.age(u64::MAX), 2);
        assert!(table.is_empty());
    }
}
