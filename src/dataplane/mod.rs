//! Data plane components
//!
//! Link resolution, route lookup and the forwarding loop. Everything here is
//! synchronous and driven by the caller.

mod arp_processor;
mod arp_table;
mod forwarder;
mod interface;
mod router;
mod routing;

pub use arp_processor::{
    process_arp, ArpAction, ArpPendingQueue, PendingTick, WaitingDatagram, WaitingQueue,
};
pub use arp_table::ArpTable;
pub use forwarder::{forward, ForwardAction};
pub use interface::{
    ArpPolicy, NetworkInterface, PendingSend, ARP_CACHE_TTL_MS, ARP_RESEND_INTERVAL_MS,
};
pub use router::Router;
pub use routing::{prefix_mask, Route, RoutingTable, TieBreak};
