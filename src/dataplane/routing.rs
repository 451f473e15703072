//! Routing table

use serde::Deserialize;
use std::net::Ipv4Addr;

/// Route entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Destination network
    pub destination: Ipv4Addr,
    /// Network prefix length
    pub prefix_len: u8,
    /// Next hop (None for directly connected)
    pub next_hop: Option<Ipv4Addr>,
    /// Outgoing interface index in the router
    pub interface: usize,
}

impl Route {
    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        let mask = prefix_mask(self.prefix_len);
        u32::from(addr) & mask == u32::from(self.destination)
    }
}

/// Which route wins when several matches share the longest prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// The most recently added route
    #[default]
    LastMatch,
    /// The earliest added route
    FirstMatch,
}

/// Netmask for a prefix length; `/0` masks everything out
pub fn prefix_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        len if len >= 32 => u32::MAX,
        len => u32::MAX << (32 - len),
    }
}

/// Routing table using longest prefix match
///
/// Routes are kept in insertion order. A route whose destination has bits
/// set beyond its prefix can never match.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
    tie_break: TieBreak,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(tie_break: TieBreak) -> Self {
        Self {
            routes: Vec::new(),
            tie_break,
        }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Append a route; overlapping and duplicate entries are kept
    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Lookup route using longest prefix match
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<&Route> {
        let mut best: Option<&Route> = None;

        for route in self.routes.iter().filter(|r| r.matches(addr)) {
            let better = match best {
                None => true,
                Some(current) => match self.tie_break {
                    TieBreak::LastMatch => route.prefix_len >= current.prefix_len,
                    TieBreak::FirstMatch => route.prefix_len > current.prefix_len,
                },
            };
            if better {
                best = Some(route);
            }
        }

        best
    }

    /// Get all routes
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
