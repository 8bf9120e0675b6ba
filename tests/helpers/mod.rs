#![allow(dead_code)]
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, UdpSocket};
use std::thread;
use std::time::Duration;

use byteorder::{ByteOrder, NetworkEndian};
use dnsres::answer::DnsAnswer;
use dnsres::record::RecordData;
use dnsres::serialization::ToBytes;
use dnsres::DnsPacket;

/// How long an idle mock keeps its socket open.
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// A UDP nameserver on 127.0.0.1. For each query the handler returns the
/// datagrams to send back, in order; an empty list means stay silent.
pub fn start_udp<F>(handler: F) -> SocketAddr
where
    F: Fn(&DnsPacket) -> Vec<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();
    serve_udp(socket, handler);
    addr
}

/// UDP and TCP listeners sharing one port, for truncation fallback.
pub fn start_udp_and_tcp<U, T>(udp_handler: U, tcp_handler: T) -> SocketAddr
where
    U: Fn(&DnsPacket) -> Vec<Vec<u8>> + Send + 'static,
    T: Fn(&DnsPacket) -> Vec<u8> + Send + 'static,
{
    for _ in 0..20 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let socket = match UdpSocket::bind(addr) {
            Ok(socket) => socket,
            Err(_) => continue,
        };
        serve_udp(socket, udp_handler);
        thread::spawn(move || {
            while let Ok((mut stream, _)) = listener.accept() {
                let mut len_buf = [0u8; 2];
                if stream.read_exact(&mut len_buf).is_err() {
                    continue;
                }
                let mut body = vec![0u8; NetworkEndian::read_u16(&len_buf) as usize];
                if stream.read_exact(&mut body).is_err() {
                    continue;
                }
                let request = DnsPacket::parse(&body).unwrap();
                let reply = tcp_handler(&request);
                let mut framed = vec![0u8; 2];
                NetworkEndian::write_u16(&mut framed, reply.len() as u16);
                framed.extend_from_slice(&reply);
                let _ = stream.write_all(&framed);
            }
        });
        return addr;
    }
    panic!("could not find a port free for both udp and tcp");
}

fn serve_udp<F>(socket: UdpSocket, handler: F)
where
    F: Fn(&DnsPacket) -> Vec<Vec<u8>> + Send + 'static,
{
    socket.set_read_timeout(Some(IDLE_TIMEOUT)).unwrap();
    thread::spawn(move || {
        let mut buf = [0u8; 512];
        while let Ok((len, peer)) = socket.recv_from(&mut buf) {
            let request = DnsPacket::parse(&buf[..len]).unwrap();
            for datagram in handler(&request) {
                let _ = socket.send_to(&datagram, peer);
            }
        }
    });
}

/// A port on 127.0.0.1 that nothing listens on.
pub fn unused_port() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}

pub fn reply_to(request: &DnsPacket) -> DnsPacket {
    let mut reply = request.clone();
    reply.header.is_response = true;
    reply.header.recursion_available = true;
    reply
}

pub fn a_reply(request: &DnsPacket, ip: Ipv4Addr) -> DnsPacket {
    let mut reply = reply_to(request);
    let name = request.question().unwrap().name.clone();
    reply.answers = vec![DnsAnswer::new(&name, 60, RecordData::A(ip))];
    reply
}

pub fn bytes(packet: &DnsPacket) -> Vec<u8> {
    packet.to_bytes()
}
