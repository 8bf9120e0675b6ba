use std::collections::HashMap;

use byteorder::{ByteOrder, NetworkEndian};

use crate::error::WireError;

/// Longest name allowed on the wire, length octets included (RFC 1035 2.3.4)
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_LABEL_LENGTH: usize = 63;

const POINTER_MASK: u8 = 0xc0;
const MAX_POINTER_OFFSET: usize = 0x3fff;

pub trait FromBytes: Sized {
    /// Reads `Self` starting at `offset` of the whole message and returns it
    /// with the number of bytes consumed. The full message is needed because
    /// names may point backwards into it.
    fn from_bytes(packet: &[u8], offset: usize) -> Result<(Self, usize), WireError>;
}

pub trait ToBytes {
    fn write_bytes(&self, writer: &mut WireWriter);

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        self.write_bytes(&mut writer);
        writer.finish()
    }
}

/// Output buffer that remembers where each name suffix was written so later
/// names can be replaced by a compression pointer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
    suffixes: HashMap<String, u16>,
}

impl WireWriter {
    pub fn new() -> Self {
        WireWriter {
            buf: Vec::with_capacity(512),
            suffixes: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        NetworkEndian::write_u16(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        NetworkEndian::write_u32(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
    }

    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Overwrites two bytes already written, used to back-fill RDLENGTH.
    pub fn patch_u16(&mut self, at: usize, value: u16) {
        NetworkEndian::write_u16(&mut self.buf[at..at + 2], value);
    }

    /// Writes `domain` label by label. As soon as the remaining suffix was
    /// written before, a pointer to it ends the name.
    pub fn write_domain(&mut self, domain: &str) {
        let labels = domain_labels(domain);
        for i in 0..labels.len() {
            let suffix = labels[i..].join(".").to_ascii_lowercase();
            if let Some(&offset) = self.suffixes.get(&suffix) {
                self.write_u16(0xc000 | offset);
                return;
            }
            if self.buf.len() <= MAX_POINTER_OFFSET {
                self.suffixes.insert(suffix, self.buf.len() as u16);
            }
            let label = labels[i].as_bytes();
            self.buf.push(label.len() as u8);
            self.buf.extend_from_slice(label);
        }
        self.buf.push(0);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

fn domain_labels(domain: &str) -> Vec<&str> {
    domain
        .trim_end_matches('.')
        .split('.')
        .filter(|label| !label.is_empty())
        .collect()
}

/// Checks that `domain` can be put on the wire: no empty inner labels, no
/// label over 63 bytes and at most 255 bytes encoded.
pub fn validate_domain(domain: &str) -> Result<(), WireError> {
    let trimmed = domain.trim_end_matches('.');
    if trimmed.is_empty() {
        // the root
        return Ok(());
    }
    let mut encoded = 1;
    for label in trimmed.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
            return Err(WireError::BadLabel);
        }
        encoded += label.len() + 1;
    }
    if encoded > MAX_NAME_LENGTH {
        return Err(WireError::NameTooLong);
    }
    Ok(())
}

/// Encodes a domain without compression, e.g. for a lone question.
pub fn serialize_domain_to_bytes(domain: &str) -> Vec<u8> {
    let mut res = Vec::new();
    for label in domain_labels(domain) {
        res.push(label.len() as u8);
        res.extend_from_slice(label.as_bytes());
    }
    res.push(0);
    res
}

/// Decodes the name at `offset`, following compression pointers. Returns the
/// name (without trailing dot, empty for the root) and how many bytes the
/// name occupies at `offset` itself.
///
/// A chain of more jumps than the message has bytes can only be a loop, so
/// it is rejected.
pub fn deserialize_domain_from_bytes(
    packet: &[u8],
    offset: usize,
) -> Result<(String, usize), WireError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = offset;
    let mut consumed = None;
    let mut jumps = 0;
    let mut encoded_len = 1;

    loop {
        let len = read_u8(packet, pos)?;
        match len & POINTER_MASK {
            0x00 => {
                pos += 1;
                if len == 0 {
                    break;
                }
                let label = read_slice(packet, pos, len as usize)?;
                encoded_len += label.len() + 1;
                if encoded_len > MAX_NAME_LENGTH {
                    return Err(WireError::NameTooLong);
                }
                labels.push(String::from_utf8_lossy(label).into_owned());
                pos += len as usize;
            }
            POINTER_MASK => {
                let pointer = read_u16(packet, pos)? as usize & MAX_POINTER_OFFSET;
                if consumed.is_none() {
                    consumed = Some(pos + 2 - offset);
                }
                jumps += 1;
                if jumps > packet.len() {
                    return Err(WireError::PointerLoop);
                }
                pos = pointer;
            }
            // 0x40 and 0x80 are reserved label types
            _ => return Err(WireError::BadLabel),
        }
    }

    let consumed = consumed.unwrap_or(pos - offset);
    Ok((labels.join("."), consumed))
}

pub fn read_slice(packet: &[u8], offset: usize, len: usize) -> Result<&[u8], WireError> {
    packet
        .get(offset..offset + len)
        .ok_or(WireError::Truncated { offset, needed: len })
}

pub fn read_u8(packet: &[u8], offset: usize) -> Result<u8, WireError> {
    Ok(read_slice(packet, offset, 1)?[0])
}

pub fn read_u16(packet: &[u8], offset: usize) -> Result<u16, WireError> {
    Ok(NetworkEndian::read_u16(read_slice(packet, offset, 2)?))
}

pub fn read_u32(packet: &[u8], offset: usize) -> Result<u32, WireError> {
    Ok(NetworkEndian::read_u32(read_slice(packet, offset, 4)?))
}
