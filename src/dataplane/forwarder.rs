//! Forwarding decision
//!
//! Picks the outgoing interface and next hop for a datagram and applies the
//! TTL rule. Nothing here touches an interface; the router acts on the result.

use crate::dataplane::RoutingTable;
use crate::protocol::ipv4::Ipv4Datagram;
use std::net::Ipv4Addr;
use tracing::trace;

/// Result of a forwarding decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardAction {
    /// Send out of `interface`, resolving `next_hop` on that link
    Forward { interface: usize, next_hop: Ipv4Addr },
    /// Drop: no route covers the destination
    NoRoute { dst: Ipv4Addr },
    /// Drop: TTL would reach zero
    TtlExpired { src: Ipv4Addr },
}

/// Decide what to do with `datagram`
///
/// On [`ForwardAction::Forward`] the TTL has already been decremented by one.
/// Dropped datagrams are left untouched.
pub fn forward(table: &RoutingTable, datagram: &mut Ipv4Datagram) -> ForwardAction {
    let dst = datagram.dst();

    let Some(route) = table.lookup(dst) else {
        trace!("No route to {}", dst);
        return ForwardAction::NoRoute { dst };
    };

    if datagram.ttl() <= 1 {
        trace!("TTL expired for {} -> {}", datagram.header.src, dst);
        return ForwardAction::TtlExpired {
            src: datagram.header.src,
        };
    }

    datagram.header.ttl -= 1;

    ForwardAction::Forward {
        interface: route.interface,
        next_hop: route.next_hop.unwrap_or(dst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataplane::Route;

    fn make_table() -> RoutingTable {
        let mut table = RoutingTable::new();
        table.add(Route {
            destination: Ipv4Addr::new(0, 0, 0, 0),
            prefix_len: 0,
            next_hop: Some(Ipv4Addr::new(192, 168, 0, 1)),
            interface: 0,
        });
        table.add(Route {
            destination: Ipv4Addr::new(10, 0, 0, 0),
            prefix_len: 8,
            next_hop: None,
            interface: 1,
        });
        table
    }

    fn datagram_to(dst: Ipv4Addr, ttl: u8) -> Ipv4Datagram {
        let mut dgram = Ipv4Datagram::new(Ipv4Addr::new(172, 16, 0, 9), dst, 17, vec![1, 2, 3]);
        dgram.header.ttl = ttl;
        dgram
    }

    #[test]
    fn test_forward_via_gateway() {
        let table = make_table();
        let mut dgram = datagram_to(Ipv4Addr::new(8, 8, 8, 8), 64);

        assert_eq!(
            forward(&table, &mut dgram),
            ForwardAction::Forward {
                interface: 0,
                next_hop: Ipv4Addr::new(192, 168, 0, 1),
            }
        );
        assert_eq!(dgram.ttl(), 63);
    }

    #[test]
    fn test_directly_attached_uses_destination() {
        let table = make_table();
        let dst = Ipv4Addr::new(10, 4, 4, 4);
        let mut dgram = datagram_to(dst, 64);

        assert_eq!(
            forward(&table, &mut dgram),
            ForwardAction::Forward {
                interface: 1,
                next_hop: dst,
            }
        );
    }

    #[test]
    fn test_ttl_boundaries() {
        let table = make_table();

        for ttl in [0, 1] {
            let mut dgram = datagram_to(Ipv4Addr::new(10, 0, 0, 5), ttl);
            assert_eq!(
                forward(&table, &mut dgram),
                ForwardAction::TtlExpired {
                    src: Ipv4Addr::new(172, 16, 0, 9),
                }
            );
            assert_eq!(dgram.ttl(), ttl);
        }

        let mut dgram = datagram_to(Ipv4Addr::new(10, 0, 0, 5), 2);
        assert!(matches!(
            forward(&table, &mut dgram),
            ForwardAction::Forward { .. }
        ));
        assert_eq!(dgram.ttl(), 1);
    }

    #[test]
    fn test_no_route_checked_before_ttl() {
        let table = RoutingTable::new();
        let dst = Ipv4Addr::new(10, 0, 0, 5);
        let mut dgram = datagram_to(dst, 1);

        assert_eq!(forward(&table, &mut dgram), ForwardAction::NoRoute { dst });
    }
}
