//! Configuration validation

use super::{parse_cidr, Config};
use crate::dataplane::prefix_mask;
use crate::protocol::MacAddr;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_interfaces(config, &mut result);
    validate_routes(config, &mut result);
    validate_arp(config, &mut result);

    result
}

fn validate_interfaces(config: &Config, result: &mut ValidationResult) {
    if config.interfaces.is_empty() {
        result.warn("no interfaces defined");
    }

    let mut names = HashSet::new();
    let mut macs = HashSet::new();
    for iface in &config.interfaces {
        if !names.insert(iface.name.as_str()) {
            result.error(format!("interfaces.{}: duplicate name", iface.name));
        }

        match iface.mac.parse::<MacAddr>() {
            Ok(mac) if mac.is_broadcast() || mac == MacAddr::ZERO => {
                result.error(format!(
                    "interfaces.{}: {} is not a usable unicast address",
                    iface.name, mac
                ));
            }
            Ok(mac) => {
                if !macs.insert(mac) {
                    result.warn(format!(
                        "interfaces.{}: MAC {} is shared with another interface",
                        iface.name, mac
                    ));
                }
            }
            Err(e) => result.error(format!("interfaces.{}: {}", iface.name, e)),
        }
    }
}

fn validate_routes(config: &Config, result: &mut ValidationResult) {
    for (i, route) in config.routes.iter().enumerate() {
        if !config.interfaces.iter().any(|iface| iface.name == route.interface) {
            result.error(format!(
                "routes[{}]: unknown interface {}",
                i, route.interface
            ));
        }

        let (dest, prefix_len) = match parse_cidr(&route.destination) {
            Ok(parsed) => parsed,
            Err(e) => {
                result.error(format!("routes[{}]: {}", i, e));
                continue;
            }
        };

        if prefix_len > 32 {
            result.error(format!(
                "routes[{}]: prefix length {} exceeds 32",
                i, prefix_len
            ));
            continue;
        }

        // Such a route can never match
        if u32::from(dest) & !prefix_mask(prefix_len) != 0 {
            result.warn(format!(
                "routes[{}]: {} has host bits set beyond the prefix",
                i, route.destination
            ));
        }
    }
}

fn validate_arp(config: &Config, result: &mut ValidationResult) {
    let arp = &config.arp;
    if arp.cache_ttl_ms == 0 {
        result.warn("arp.cache_ttl_ms is 0, entries expire on the next tick");
    }
    if arp.resend_interval_ms == 0 {
        result.warn("arp.resend_interval_ms is 0, requests are resent on every tick");
    }
    if arp.max_waiting == Some(0) {
        result.warn("arp.max_waiting is 0, unresolved datagrams are always dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::from_str;

    const BASE: &str = r#"
        [[interfaces]]
        name = "eth0"
        mac = "02:00:00:00:00:01"
        address = "10.0.0.1"

        [[interfaces]]
        name = "eth1"
        mac = "02:00:00:00:00:02"
        address = "192.168.0.1"
    "#;

    fn check(extra: &str) -> ValidationResult {
        let config = from_str(&format!("{BASE}\n{extra}")).unwrap();
        validate(&config)
    }

    #[test]
    fn test_valid_config() {
        let result = check(
            r#"
            [[routes]]
            destination = "10.0.0.0/8"
            interface = "eth0"

            [[routes]]
            destination = "0.0.0.0/0"
            next_hop = "192.168.0.254"
            interface = "eth1"
            "#,
        );
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_unknown_interface() {
        let result = check(
            r#"
            [[routes]]
            destination = "10.0.0.0/8"
            interface = "eth9"
            "#,
        );
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("eth9"));
    }

    #[test]
    fn test_bad_cidr_and_prefix() {
        let result = check(
            r#"
            [[routes]]
            destination = "10.0.0.0"
            interface = "eth0"

            [[routes]]
            destination = "10.0.0.0/33"
            interface = "eth0"
            "#,
        );
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[1].contains("exceeds 32"));
    }

    #[test]
    fn test_host_bits_warning() {
        let result = check(
            r#"
            [[routes]]
            destination = "10.1.2.3/8"
            interface = "eth0"
            "#,
        );
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("host bits"));
    }

    #[test]
    fn test_duplicate_name_and_bad_mac() {
        let config = from_str(
            r#"
            [[interfaces]]
            name = "eth0"
            mac = "02:00:00:00:00:01"
            address = "10.0.0.1"

            [[interfaces]]
            name = "eth0"
            mac = "not-a-mac"
            address = "10.0.1.1"

            [[interfaces]]
            name = "eth2"
            mac = "ff:ff:ff:ff:ff:ff"
            address = "10.0.2.1"
            "#,
        )
        .unwrap();

        let result = validate(&config);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].contains("duplicate"));
    }

    #[test]
    fn test_zero_timers_warn() {
        let result = check(
            r#"
            [arp]
            cache_ttl_ms = 0
            resend_interval_ms = 0
            "#,
        );
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_empty_config_warns() {
        let result = validate(&Config::default());
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 1);
    }
}
