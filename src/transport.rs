//! UDP exchange with retries, and a single TCP exchange when the UDP reply
//! comes back truncated (RFC 1035 4.2).

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use byteorder::{ByteOrder, NetworkEndian};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::TransportError;
use crate::header::DnsHeader;
use crate::packet::DnsPacket;
use crate::serialization::{FromBytes, ToBytes};

/// Large enough for any UDP reply, EDNS included.
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Sends one query to one server and returns the matching reply.
pub trait Transport {
    fn query(
        &self,
        server: SocketAddr,
        request: &DnsPacket,
        timeout: Duration,
    ) -> Result<DnsPacket, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(SocketAddr, &DnsPacket, Duration) -> Result<DnsPacket, TransportError>,
{
    fn query(
        &self,
        server: SocketAddr,
        request: &DnsPacket,
        timeout: Duration,
    ) -> Result<DnsPacket, TransportError> {
        self(server, request, timeout)
    }
}

#[derive(Debug, Clone)]
pub struct UdpTransport {
    attempts: u32,
    backoff: Duration,
}

impl UdpTransport {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        UdpTransport {
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.attempts, config.backoff)
    }

    /// Wait before `attempt` (counting from zero): nothing for the first,
    /// then `backoff`, `2 * backoff`, `4 * backoff`...
    fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.backoff.checked_mul(factor).unwrap_or(self.backoff)
    }
}

impl Transport for UdpTransport {
    fn query(
        &self,
        server: SocketAddr,
        request: &DnsPacket,
        timeout: Duration,
    ) -> Result<DnsPacket, TransportError> {
        let mut last_error = TransportError::Timeout(server);
        for attempt in 0..self.attempts {
            let delay = self.delay_before(attempt);
            if attempt > 0 {
                warn!(%server, attempt, ?delay, error = %last_error, "retrying query");
                thread::sleep(delay);
            }
            // a fresh id per attempt so a late reply to an earlier one is ignored
            let mut request = request.clone();
            request.header.tx_id = rand::random();

            match exchange_udp(server, &request, timeout) {
                Ok(reply) if reply.header.truncated => {
                    debug!(%server, "reply truncated, retrying over tcp");
                    return exchange_tcp(server, &request, timeout);
                }
                Ok(reply) => return Ok(reply),
                Err(e @ TransportError::Timeout(_)) | Err(e @ TransportError::Unreachable(_)) => {
                    last_error = e
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }
}

fn classify(server: SocketAddr, source: io::Error) -> TransportError {
    match source.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout(server),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => TransportError::Unreachable(server),
        _ => TransportError::Io { server, source },
    }
}

/// Whether `reply` answers `request`: same id, same question. A truncated
/// reply may have lost its question, in which case the id has to do.
fn is_reply_to(request: &DnsPacket, reply: &DnsPacket) -> bool {
    if !reply.header.is_response || reply.header.tx_id != request.header.tx_id {
        return false;
    }
    match (request.question(), reply.question()) {
        (Some(asked), Some(answered)) => asked.matches(answered),
        (Some(_), None) => reply.header.truncated,
        (None, _) => true,
    }
}

/// Decodes a datagram. A truncated reply may be cut mid-record, in which
/// case only the header is kept; the TC bit is all the caller needs.
fn decode_reply(server: SocketAddr, bytes: &[u8]) -> Result<DnsPacket, TransportError> {
    match DnsPacket::parse(bytes) {
        Ok(reply) => Ok(reply),
        Err(source) => match DnsHeader::from_bytes(bytes, 0) {
            Ok((header, _)) if header.truncated => {
                let mut reply = DnsPacket::new();
                reply.header = header;
                Ok(reply)
            }
            _ => Err(TransportError::Malformed { server, source }),
        },
    }
}

/// One UDP send, then replies are read until one matches or `timeout` has
/// passed since the send. The socket is closed when this returns.
pub fn exchange_udp(
    server: SocketAddr,
    request: &DnsPacket,
    timeout: Duration,
) -> Result<DnsPacket, TransportError> {
    let bind_addr: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind_addr).map_err(|e| classify(server, e))?;
    // connected, so the kernel drops datagrams from other peers and reports
    // ICMP port unreachable as ConnectionRefused
    socket.connect(server).map_err(|e| classify(server, e))?;

    let bytes = request.to_bytes();
    socket.send(&bytes).map_err(|e| classify(server, e))?;
    debug!(%server, id = request.header.tx_id, bytes = bytes.len(), "udp query sent");

    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::from_secs(0) {
            return Err(TransportError::Timeout(server));
        }
        socket
            .set_read_timeout(Some(remaining))
            .map_err(|e| classify(server, e))?;
        let len = socket.recv(&mut buf).map_err(|e| classify(server, e))?;

        let reply = match decode_reply(server, &buf[..len]) {
            Ok(reply) => reply,
            Err(e) if len >= 2 && NetworkEndian::read_u16(&buf[..2]) != request.header.tx_id => {
                warn!(%server, error = %e, "ignoring undecodable reply to another query");
                continue;
            }
            Err(e) => return Err(e),
        };
        if is_reply_to(request, &reply) {
            debug!(%server, id = reply.header.tx_id, bytes = len, "udp reply received");
            return Ok(reply);
        }
        warn!(
            %server,
            expected = request.header.tx_id,
            received = reply.header.tx_id,
            "ignoring reply that does not match the query"
        );
    }
}

/// One query over TCP with the two byte length prefix. No retries.
pub fn exchange_tcp(
    server: SocketAddr,
    request: &DnsPacket,
    timeout: Duration,
) -> Result<DnsPacket, TransportError> {
    let mut stream = TcpStream::connect_timeout(&server, timeout).map_err(|e| classify(server, e))?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| classify(server, e))?;

    let bytes = request.to_bytes();
    let mut framed = vec![0u8; 2];
    NetworkEndian::write_u16(&mut framed, bytes.len() as u16);
    framed.extend_from_slice(&bytes);
    stream.write_all(&framed).map_err(|e| classify(server, e))?;
    debug!(%server, id = request.header.tx_id, bytes = bytes.len(), "tcp query sent");

    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).map_err(|e| classify(server, e))?;
    let mut body = vec![0u8; NetworkEndian::read_u16(&len_buf) as usize];
    stream.read_exact(&mut body).map_err(|e| classify(server, e))?;

    let reply = DnsPacket::parse(&body).map_err(|source| TransportError::Malformed { server, source })?;
    if !is_reply_to(request, &reply) {
        return Err(TransportError::UnexpectedReply(server));
    }
    debug!(%server, id = reply.header.tx_id, bytes = body.len(), "tcp reply received");
    Ok(reply)
}
