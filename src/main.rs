use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dnsres::config::{load_root_servers, parse_nameserver};
use dnsres::{DnsClient, ResolverConfig, UdpTransport};

#[derive(Parser, Debug)]
#[command(name = "hw3")]
#[command(version)]
#[command(about = "Resolve a hostname to an IPv4 address, or an IPv4 address to its name")]
struct Cli {
    /// Hostname to resolve, or an IPv4 address for a reverse lookup
    #[arg(short = 'i', value_name = "HOSTNAME")]
    hostname: String,

    /// Ask only this nameserver (IP or IP:port) instead of the root servers
    #[arg(short = 'n', value_name = "NAMESERVER", value_parser = parse_nameserver)]
    nameserver: Option<SocketAddr>,

    /// Log every query, referral and alias followed
    #[arg(short = 'd', long)]
    debug: bool,

    /// Resolver configuration file (YAML)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root hints file, one address per line
    #[arg(short = 'r', long = "root-servers", value_name = "FILE")]
    root_servers: Option<PathBuf>,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = ResolverConfig::load(cli.config.as_deref()).context("could not load the configuration")?;
    if let Some(path) = &cli.root_servers {
        config.root_servers = load_root_servers(path)?;
    }
    debug!(?config, "configuration loaded");

    let mut client = DnsClient::new(UdpTransport::from_config(&config), config);
    let hostname = cli.hostname.trim_end_matches('.');
    match hostname.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let name = client
                .reverse(addr, cli.nameserver)
                .with_context(|| format!("could not resolve the address {}", addr))?;
            println!("{} resolves to {}", hostname, name);
        }
        Err(_) => {
            let ip = client
                .resolve(hostname, cli.nameserver)
                .with_context(|| format!("could not resolve the name {}", hostname))?;
            println!("{} resolves to {}", hostname, ip);
        }
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        },
    };
    init_logging(cli.debug);

    if let Err(err) = run(&cli) {
        eprintln!("hw3: {:#}", err);
        process::exit(1);
    }
}
