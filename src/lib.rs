//! A small DNS resolver: wire codec, UDP/TCP transport, a TTL cache and an
//! engine that follows referrals and aliases from the root servers (or from
//! a given nameserver) down to an A record.

pub mod answer;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod header;
pub mod packet;
pub mod query;
pub mod record;
pub mod serialization;
pub mod transport;

pub use client::DnsClient;
pub use config::ResolverConfig;
pub use error::{ConfigError, ResolveError, TransportError, WireError};
pub use packet::{encode_query, DnsPacket};
pub use transport::{Transport, UdpTransport};
