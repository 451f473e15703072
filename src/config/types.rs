//! Configuration type definitions

use crate::dataplane::{ArpPolicy, PendingSend, TieBreak};
use crate::telemetry::LogConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LogConfig,

    #[serde(default)]
    pub arp: ArpConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// ARP timers and queue limits, applied to every interface
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArpConfig {
    pub cache_ttl_ms: u64,
    pub resend_interval_ms: u64,
    pub max_waiting: Option<usize>,
    pub max_retries: Option<u32>,
    pub on_pending: PendingSend,
}

impl Default for ArpConfig {
    fn default() -> Self {
        let policy = ArpPolicy::default();
        Self {
            cache_ttl_ms: policy.cache_ttl_ms,
            resend_interval_ms: policy.resend_interval_ms,
            max_waiting: policy.max_waiting,
            max_retries: policy.max_retries,
            on_pending: policy.on_pending,
        }
    }
}

impl ArpConfig {
    pub fn policy(&self) -> ArpPolicy {
        ArpPolicy {
            cache_ttl_ms: self.cache_ttl_ms,
            resend_interval_ms: self.resend_interval_ms,
            max_waiting: self.max_waiting,
            max_retries: self.max_retries,
            on_pending: self.on_pending,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub tie_break: TieBreak,
}

/// Interface configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    /// Link address, e.g. "02:00:00:00:00:01"
    pub mac: String,
    pub address: Ipv4Addr,
}

/// Static route
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteConfig {
    /// Destination in CIDR notation (e.g., "10.0.0.0/8" or "0.0.0.0/0")
    pub destination: String,
    /// Gateway; omitted for directly attached networks
    #[serde(default)]
    pub next_hop: Option<Ipv4Addr>,
    /// Outgoing interface name
    pub interface: String,
}

/// Parse "a.b.c.d/len"
///
/// The prefix length is not range-checked here.
pub fn parse_cidr(s: &str) -> Result<(Ipv4Addr, u8)> {
    let (addr, len) = s
        .split_once('/')
        .ok_or_else(|| Error::InvalidRoute(format!("{s}: missing prefix length")))?;
    let addr: Ipv4Addr = addr
        .trim()
        .parse()
        .map_err(|_| Error::InvalidRoute(format!("{s}: bad address")))?;
    let len: u8 = len
        .trim()
        .parse()
        .map_err(|_| Error::InvalidRoute(format!("{s}: bad prefix length")))?;
    Ok((addr, len))
}
