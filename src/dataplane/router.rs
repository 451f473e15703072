//! Router
//!
//! Owns the interfaces and the routing table. Each call to [`Router::route`]
//! drains every interface's received queue and forwards what it can; nothing
//! waits or runs in the background.

use crate::config::{parse_cidr, Config};
use crate::dataplane::{forward, ForwardAction, NetworkInterface, Route, RoutingTable, TieBreak};
use crate::protocol::ipv4::Ipv4Datagram;
use crate::protocol::MacAddr;
use crate::telemetry::RouterStats;
use crate::{Error, Result};
use std::net::Ipv4Addr;
use tracing::{debug, info, trace, warn};

#[derive(Default)]
pub struct Router {
    interfaces: Vec<NetworkInterface>,
    routing_table: RoutingTable,
    stats: RouterStats,
}

impl Router {
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            interfaces: Vec::new(),
            routing_table: RoutingTable::with_policy(tie_break),
            stats: RouterStats::new(),
        }
    }

    /// Build a router with every interface and route from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut router = Self::new(config.routing.tie_break);
        let policy = config.arp.policy();

        for iface in &config.interfaces {
            let mac: MacAddr = iface
                .mac
                .parse()
                .map_err(|e| Error::Config(format!("interfaces.{}: {}", iface.name, e)))?;
            router.add_interface(NetworkInterface::new(
                iface.name.clone(),
                mac,
                iface.address,
                policy.clone(),
            ));
        }

        for route in &config.routes {
            let (destination, prefix_len) = parse_cidr(&route.destination)?;
            let index = router
                .interface_index(&route.interface)
                .ok_or_else(|| Error::InterfaceNotFound {
                    name: route.interface.clone(),
                })?;
            router.add_route(destination, prefix_len, route.next_hop, index)?;
        }

        info!(
            "Router configured with {} interfaces and {} routes",
            router.interfaces.len(),
            router.routing_table.len()
        );
        Ok(router)
    }

    /// Add an interface, returning its index for use in routes
    pub fn add_interface(&mut self, interface: NetworkInterface) -> usize {
        debug!("Adding interface {}", interface.name());
        self.interfaces.push(interface);
        self.interfaces.len() - 1
    }

    pub fn interface(&self, index: usize) -> Option<&NetworkInterface> {
        self.interfaces.get(index)
    }

    pub fn interface_mut(&mut self, index: usize) -> Option<&mut NetworkInterface> {
        self.interfaces.get_mut(index)
    }

    pub fn interfaces(&self) -> &[NetworkInterface] {
        &self.interfaces
    }

    pub fn interface_index(&self, name: &str) -> Option<usize> {
        self.interfaces.iter().position(|iface| iface.name() == name)
    }

    /// Append a route
    ///
    /// Overlapping routes are fine; only an impossible prefix length or an
    /// interface index that does not exist is rejected.
    pub fn add_route(
        &mut self,
        destination: Ipv4Addr,
        prefix_len: u8,
        next_hop: Option<Ipv4Addr>,
        interface: usize,
    ) -> Result<()> {
        if prefix_len > 32 {
            return Err(Error::InvalidRoute(format!(
                "{}/{}: prefix length exceeds 32",
                destination, prefix_len
            )));
        }
        if interface >= self.interfaces.len() {
            return Err(Error::InvalidRoute(format!(
                "{}/{}: no interface with index {}",
                destination, prefix_len, interface
            )));
        }

        debug!(
            "Route {}/{} via {} on {}",
            destination,
            prefix_len,
            next_hop.map_or_else(|| "direct".to_string(), |hop| hop.to_string()),
            self.interfaces[interface].name()
        );
        self.routing_table.add(Route {
            destination,
            prefix_len,
            next_hop,
            interface,
        });
        Ok(())
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    /// Forward one datagram, or drop it silently
    pub fn route_one(&mut self, mut datagram: Ipv4Datagram) {
        match forward(&self.routing_table, &mut datagram) {
            ForwardAction::Forward {
                interface,
                next_hop,
            } => {
                let Some(iface) = self.interfaces.get_mut(interface) else {
                    // add_route only accepts existing indices
                    warn!(
                        "Route for {} points at missing interface {}",
                        datagram.dst(),
                        interface
                    );
                    self.stats.no_route.inc();
                    return;
                };
                trace!(
                    "Forwarding {} via {} on {}",
                    datagram.dst(),
                    next_hop,
                    iface.name()
                );
                iface.send_datagram(datagram, next_hop);
                self.stats.forwarded.inc();
            }
            ForwardAction::NoRoute { .. } => self.stats.no_route.inc(),
            ForwardAction::TtlExpired { .. } => self.stats.ttl_expired.inc(),
        }
    }

    /// Drain every interface's received queue, in interface order
    pub fn route(&mut self) {
        for index in 0..self.interfaces.len() {
            while let Some(datagram) = self.interfaces[index].pop_received() {
                self.route_one(datagram);
            }
        }
    }

    /// Advance every interface's clock
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        for iface in &mut self.interfaces {
            iface.tick(ms_since_last_tick);
        }
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    /// Router counters followed by each interface's, prefixed with its name
    pub fn export_stats(&self) -> Vec<(String, u64)> {
        let mut out = self.stats.export();
        for iface in &self.interfaces {
            out.extend(iface.stats().export(iface.name()));
        }
        out
    }
}
