use crate::error::WireError;
use crate::header::{ResourceType, CLASS_IN};
use crate::serialization::{deserialize_domain_from_bytes, read_u16, FromBytes, ToBytes, WireWriter};

/// A question: the (name, type, class) triple a query asks about.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct DnsQuery {
    pub name: String,
    pub qtype: ResourceType,
    pub class: u16,
}

impl DnsQuery {
    pub fn new(name: &str, qtype: ResourceType) -> Self {
        DnsQuery {
            name: name.trim_end_matches('.').to_owned(),
            qtype,
            class: CLASS_IN,
        }
    }

    /// Whether `other` asks the same thing, ignoring name case.
    pub fn matches(&self, other: &DnsQuery) -> bool {
        self.qtype == other.qtype
            && self.class == other.class
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl FromBytes for DnsQuery {
    /// Remember according to the rfc:
    /// 'each label consists of a length octet followed by that
    /// number of octets.  The domain name terminates with the
    /// zero length octet for the null label of the root.  Note
    /// that this field may be an odd number of octets; no
    /// padding is used.'
    fn from_bytes(packet: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let (name, name_len) = deserialize_domain_from_bytes(packet, offset)?;
        let curr_byte = offset + name_len;
        let qtype = read_u16(packet, curr_byte)?;
        let class = read_u16(packet, curr_byte + 2)?;
        Ok((
            DnsQuery {
                name,
                qtype: ResourceType::from(qtype),
                class,
            },
            name_len + 4,
        ))
    }
}

impl ToBytes for DnsQuery {
    fn write_bytes(&self, writer: &mut WireWriter) {
        writer.write_domain(&self.name);
        writer.write_u16(self.qtype.into());
        writer.write_u16(self.class);
    }
}
