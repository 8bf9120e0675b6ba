use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::header::ResponseCode;

/// Corrupt or short wire data. Fatal to the message being decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("message truncated: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("compression pointer loop")]
    PointerLoop,

    #[error("invalid label")]
    BadLabel,

    #[error("domain name longer than 255 bytes")]
    NameTooLong,

    #[error("bad record data for type {rtype}: {reason}")]
    BadRecordData { rtype: u16, reason: &'static str },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no reply from {0} before the retry budget ran out")]
    Timeout(SocketAddr),

    #[error("{0} refused the query")]
    Unreachable(SocketAddr),

    #[error("malformed reply from {server}: {source}")]
    Malformed {
        server: SocketAddr,
        #[source]
        source: WireError,
    },

    #[error("{0} answered a different query")]
    UnexpectedReply(SocketAddr),

    #[error("I/O error talking to {server}: {source}")]
    Io {
        server: SocketAddr,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{0}: no such name (NXDOMAIN)")]
    NoSuchName(String),

    #[error("nameserver unreachable: {0}")]
    NameserverUnreachable(#[source] TransportError),

    #[error("query failed: {0}")]
    Transport(#[source] TransportError),

    #[error("resolution of {0} exceeded the referral/alias depth limit")]
    ResolutionDepthExceeded(String),

    #[error("server failure resolving {name}: {rcode:?}")]
    ServerFailure { name: String, rcode: ResponseCode },

    #[error("{0} has no records of the requested type")]
    NoRecords(String),

    #[error("no usable nameserver for zone {0}")]
    NoNameservers(String),

    #[error("invalid name {name:?}: {source}")]
    InvalidName {
        name: String,
        #[source]
        source: WireError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid yaml in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: yaml_rust::ScanError,
    },

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
}
