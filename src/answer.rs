use std::fmt;
use std::net::Ipv4Addr;

use crate::error::WireError;
use crate::header::{ResourceType, CLASS_IN};
use crate::record::RecordData;
use crate::serialization::{
    deserialize_domain_from_bytes, read_u16, read_u32, FromBytes, ToBytes, WireWriter,
};

/// A resource record. The answer, authority and additional sections all
/// hold these.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DnsAnswer {
    pub name: String,
    pub rtype: ResourceType,
    pub class: u16,
    pub ttl: u32,
    pub data: RecordData,
}

impl DnsAnswer {
    pub fn new(name: &str, ttl: u32, data: RecordData) -> Self {
        let rtype = match &data {
            RecordData::A(_) => ResourceType::A,
            RecordData::AAAA(_) => ResourceType::AAAA,
            RecordData::NameServer(_) => ResourceType::NameServer,
            RecordData::CName(_) => ResourceType::CName,
            RecordData::Pointer(_) => ResourceType::Pointer,
            RecordData::Soa(_) => ResourceType::StartOfAuthority,
            RecordData::Unknown(_) => ResourceType::Other(0),
        };
        DnsAnswer {
            name: name.trim_end_matches('.').to_owned(),
            rtype,
            class: CLASS_IN,
            ttl,
            data,
        }
    }

    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        match self.data {
            RecordData::A(addr) => Some(addr),
            _ => None,
        }
    }

    /// The target name of NS, CNAME and PTR records.
    pub fn target(&self) -> Option<&str> {
        match &self.data {
            RecordData::NameServer(name) | RecordData::CName(name) | RecordData::Pointer(name) => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn is(&self, name: &str, rtype: ResourceType) -> bool {
        self.rtype == rtype && self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for DnsAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} {:?} {}", self.name, self.ttl, self.rtype, self.data)
    }
}

impl FromBytes for DnsAnswer {
    fn from_bytes(packet: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let (name, name_len) = deserialize_domain_from_bytes(packet, offset)?;
        let pos = offset + name_len;
        let rtype = ResourceType::from(read_u16(packet, pos)?);
        let class = read_u16(packet, pos + 2)?;
        let ttl = read_u32(packet, pos + 4)?;
        let data_length = read_u16(packet, pos + 8)? as usize;
        let data = RecordData::from_wire(rtype, packet, pos + 10, data_length)?;
        Ok((
            DnsAnswer {
                name,
                rtype,
                class,
                ttl,
                data,
            },
            name_len + 10 + data_length,
        ))
    }
}

impl ToBytes for DnsAnswer {
    fn write_bytes(&self, writer: &mut WireWriter) {
        writer.write_domain(&self.name);
        writer.write_u16(self.rtype.into());
        writer.write_u16(self.class);
        writer.write_u32(self.ttl);
        let length_at = writer.len();
        writer.write_u16(0);
        self.data.write_bytes(writer);
        let data_length = writer.len() - length_at - 2;
        writer.patch_u16(length_at, data_length as u16);
    }
}
