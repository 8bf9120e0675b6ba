use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::WireError;
use crate::header::ResourceType;
use crate::serialization::{
    deserialize_domain_from_bytes, read_slice, read_u32, WireWriter,
};

/// Type-specific RDATA. Only the types the resolver acts on are decoded,
/// everything else is carried as raw bytes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RecordData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NameServer(String),
    CName(String),
    Pointer(String),
    Soa(SoaInformation),
    Unknown(Vec<u8>),
}

impl RecordData {
    /// Decodes `len` bytes of RDATA at `offset`. Names inside RDATA may use
    /// compression, which is why the whole message is passed in.
    pub fn from_wire(
        rtype: ResourceType,
        packet: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<Self, WireError> {
        let rdata = read_slice(packet, offset, len)?;
        let data = match rtype {
            ResourceType::A => {
                if len != 4 {
                    return Err(bad_length(rtype));
                }
                RecordData::A(Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]))
            }
            ResourceType::AAAA => {
                if len != 16 {
                    return Err(bad_length(rtype));
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(rdata);
                RecordData::AAAA(Ipv6Addr::from(octets))
            }
            ResourceType::NameServer => RecordData::NameServer(rdata_name(rtype, packet, offset, len)?),
            ResourceType::CName => RecordData::CName(rdata_name(rtype, packet, offset, len)?),
            ResourceType::Pointer => RecordData::Pointer(rdata_name(rtype, packet, offset, len)?),
            ResourceType::StartOfAuthority => {
                RecordData::Soa(SoaInformation::from_wire(packet, offset, len)?)
            }
            ResourceType::Other(_) => RecordData::Unknown(rdata.to_vec()),
        };
        Ok(data)
    }

    pub fn write_bytes(&self, writer: &mut WireWriter) {
        match self {
            RecordData::A(addr) => writer.write_slice(&addr.octets()),
            RecordData::AAAA(addr) => writer.write_slice(&addr.octets()),
            RecordData::NameServer(name) | RecordData::CName(name) | RecordData::Pointer(name) => {
                writer.write_domain(name)
            }
            RecordData::Soa(soa) => soa.write_bytes(writer),
            RecordData::Unknown(bytes) => writer.write_slice(bytes),
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(addr) => write!(f, "{}", addr),
            RecordData::AAAA(addr) => write!(f, "{}", addr),
            RecordData::NameServer(name) | RecordData::CName(name) | RecordData::Pointer(name) => {
                write!(f, "{}.", name)
            }
            RecordData::Soa(soa) => write!(f, "{}. {}. {}", soa.mname, soa.rname, soa.serial),
            RecordData::Unknown(bytes) => write!(f, "\\# {}", bytes.len()),
        }
    }
}

fn bad_length(rtype: ResourceType) -> WireError {
    WireError::BadRecordData {
        rtype: rtype.into(),
        reason: "unexpected rdata length",
    }
}

/// A name that must fill its RDATA exactly.
fn rdata_name(
    rtype: ResourceType,
    packet: &[u8],
    offset: usize,
    len: usize,
) -> Result<String, WireError> {
    let (name, read) = deserialize_domain_from_bytes(packet, offset)?;
    if read != len {
        return Err(WireError::BadRecordData {
            rtype: rtype.into(),
            reason: "name does not fill rdata",
        });
    }
    Ok(name)
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SoaInformation {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl SoaInformation {
    fn from_wire(packet: &[u8], offset: usize, len: usize) -> Result<Self, WireError> {
        let (mname, mname_len) = deserialize_domain_from_bytes(packet, offset)?;
        let (rname, rname_len) = deserialize_domain_from_bytes(packet, offset + mname_len)?;
        let pos = offset + mname_len + rname_len;
        if mname_len + rname_len + 20 != len {
            return Err(WireError::BadRecordData {
                rtype: ResourceType::StartOfAuthority.into(),
                reason: "unexpected rdata length",
            });
        }
        Ok(SoaInformation {
            mname,
            rname,
            serial: read_u32(packet, pos)?,
            refresh: read_u32(packet, pos + 4)?,
            retry: read_u32(packet, pos + 8)?,
            expire: read_u32(packet, pos + 12)?,
            minimum: read_u32(packet, pos + 16)?,
        })
    }

    fn write_bytes(&self, writer: &mut WireWriter) {
        writer.write_domain(&self.mname);
        writer.write_domain(&self.rname);
        writer.write_u32(self.serial);
        writer.write_u32(self.refresh);
        writer.write_u32(self.retry);
        writer.write_u32(self.expire);
        writer.write_u32(self.minimum);
    }
}
