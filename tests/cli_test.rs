mod helpers;

use std::io::Write;
use std::net::Ipv4Addr;
use std::process::{Command, Output};

use dnsres::answer::DnsAnswer;
use dnsres::record::RecordData;
use helpers::{a_reply, bytes, reply_to, start_udp, unused_port};
use tempfile::NamedTempFile;

fn fast_config() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "timeout-ms: 300\nattempts: 2\nbackoff-ms: 10").unwrap();
    file
}

fn hw3(args: &[&str]) -> Output {
    let config = fast_config();
    Command::new(env!("CARGO_BIN_EXE_hw3"))
        .arg("-c")
        .arg(config.path())
        .args(args)
        .output()
        .unwrap()
}

/// The harness's view of stdout: the last token with dots and spaces trimmed.
fn last_token(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .last()
        .unwrap_or("")
        .trim_matches(|c| c == '.' || c == ' ')
        .to_owned()
}

#[test]
fn prints_address_from_given_nameserver() {
    let server = start_udp(|request| vec![bytes(&a_reply(request, Ipv4Addr::new(128, 84, 1, 2)))]);
    let output = hw3(&["-n", &server.to_string(), "-i", "www.cornell.edu"]);
    assert_eq!(Some(0), output.status.code());
    assert_eq!("128.84.1.2", last_token(&output));
}

#[test]
fn bogus_nameserver_exits_with_one() {
    let server = unused_port();
    let output = hw3(&["-n", &server.to_string(), "-i", "www.yahoo.com"]);
    assert_eq!(Some(1), output.status.code());
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn address_argument_does_reverse_lookup() {
    let server = start_udp(|request| {
        let mut reply = reply_to(request);
        let name = request.question().unwrap().name.clone();
        reply.answers = vec![DnsAnswer::new(&name, 3600, RecordData::Pointer("akron.csail.mit.edu".to_owned()))];
        vec![bytes(&reply)]
    });
    let output = hw3(&["-n", &server.to_string(), "-i", "128.30.76.78"]);
    assert_eq!(Some(0), output.status.code());
    assert_eq!("akron.csail.mit.edu", last_token(&output));
}

#[test]
fn nxdomain_exits_with_one() {
    let server = start_udp(|request| {
        let mut reply = reply_to(request);
        reply.header.response_code = dnsres::header::ResponseCode::NameError;
        vec![bytes(&reply)]
    });
    let output = hw3(&["-n", &server.to_string(), "-i", "nothing.oberlin.edu"]);
    assert_eq!(Some(1), output.status.code());
}

#[test]
fn missing_hostname_exits_with_one() {
    let output = hw3(&["-n", "127.0.0.1"]);
    assert_eq!(Some(1), output.status.code());
}

#[test]
fn bad_nameserver_argument_exits_with_one() {
    let output = hw3(&["-n", "not-an-address", "-i", "www.cornell.edu"]);
    assert_eq!(Some(1), output.status.code());
}
