use clap::{Parser, Subcommand};
use netfwd::config;
use netfwd::dataplane::Router;
use netfwd::protocol::arp::ArpMessage;
use netfwd::protocol::ipv4::{Ipv4Datagram, DEFAULT_TTL};
use netfwd::protocol::EtherType;
use netfwd::telemetry::init_logging;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "netfwd")]
#[command(about = "IPv4 forwarding plane with ARP resolution")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a config file for errors
    Validate {
        /// Path to config file
        #[arg(short, long, default_value = "netfwd.toml")]
        config: PathBuf,
    },
    /// Show which interface and next hop each destination would use
    Lookup {
        /// Path to config file
        #[arg(short, long, default_value = "netfwd.toml")]
        config: PathBuf,

        /// Destination addresses
        #[arg(required = true)]
        destinations: Vec<Ipv4Addr>,
    },
    /// Route a datagram to each destination and show the frames and counters
    Simulate {
        /// Path to config file
        #[arg(short, long, default_value = "netfwd.toml")]
        config: PathBuf,

        /// TTL given to each datagram
        #[arg(long, default_value_t = DEFAULT_TTL)]
        ttl: u8,

        /// Destination addresses
        #[arg(required = true)]
        destinations: Vec<Ipv4Addr>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            config: config_path,
        } => cmd_validate(&config_path),
        Commands::Lookup {
            config: config_path,
            destinations,
        } => cmd_lookup(&config_path, &destinations),
        Commands::Simulate {
            config: config_path,
            ttl,
            destinations,
        } => cmd_simulate(&config_path, ttl, &destinations),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_validate(config_path: &Path) -> Result<(), String> {
    init_logging(None);

    let config = config::load(config_path).map_err(|e| e.to_string())?;
    let result = config::validate(&config);
    result.print_diagnostics();

    if result.has_errors() {
        return Err(format!(
            "{}: {} error(s) found",
            config_path.display(),
            result.errors.len()
        ));
    }

    println!(
        "{}: {} interfaces, {} routes",
        config_path.display(),
        config.interfaces.len(),
        config.routes.len()
    );
    Ok(())
}

fn load_router(config_path: &Path) -> Result<Router, String> {
    let config = config::load(config_path).map_err(|e| e.to_string())?;
    init_logging(Some(&config.logging));

    let result = config::validate(&config);
    if result.has_errors() {
        result.print_diagnostics();
        return Err("configuration is invalid".to_string());
    }

    Router::from_config(&config).map_err(|e| e.to_string())
}

fn cmd_lookup(config_path: &Path, destinations: &[Ipv4Addr]) -> Result<(), String> {
    let router = load_router(config_path)?;
    debug!("Routing table has {} entries", router.routing_table().len());

    for dst in destinations {
        match router.routing_table().lookup(*dst) {
            Some(route) => {
                let iface = router
                    .interface(route.interface)
                    .map_or("?", |iface| iface.name());
                let next_hop = route.next_hop.unwrap_or(*dst);
                println!(
                    "{} via {} dev {} ({}/{})",
                    dst, next_hop, iface, route.destination, route.prefix_len
                );
            }
            None => println!("{} unreachable", dst),
        }
    }
    Ok(())
}

fn cmd_simulate(config_path: &Path, ttl: u8, destinations: &[Ipv4Addr]) -> Result<(), String> {
    let mut router = load_router(config_path)?;

    for dst in destinations {
        let mut datagram = Ipv4Datagram::new(Ipv4Addr::UNSPECIFIED, *dst, 17, Vec::new());
        datagram.header.ttl = ttl;
        router.route_one(datagram);
    }

    for index in 0..router.interfaces().len() {
        let Some(iface) = router.interface_mut(index) else {
            continue;
        };
        let name = iface.name().to_string();
        for frame in iface.drain_frames() {
            match frame.header.kind() {
                Some(EtherType::Arp) => match ArpMessage::parse(&frame.payload) {
                    Ok(msg) => println!(
                        "{}: arp who-has {} tell {}",
                        name, msg.target_ip, msg.sender_ip
                    ),
                    Err(e) => println!("{}: arp ({})", name, e),
                },
                _ => println!(
                    "{}: {} -> {} ({} bytes)",
                    name,
                    frame.header.src,
                    frame.header.dst,
                    frame.payload.len()
                ),
            }
        }
    }

    for (name, value) in router.export_stats() {
        println!("{} {}", name, value);
    }
    Ok(())
}
