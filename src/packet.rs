use crate::answer::DnsAnswer;
use crate::error::WireError;
use crate::header::{DnsHeader, ResourceType, HEADER_LENGTH};
use crate::query::DnsQuery;
use crate::serialization::{FromBytes, ToBytes, WireWriter};

#[derive(Debug, PartialEq, Clone)]
pub struct DnsPacket {
    pub header: DnsHeader,
    pub queries: Vec<DnsQuery>,
    pub answers: Vec<DnsAnswer>,
    /// The answer, authority, and additional sections all share the same
    /// format: a variable number of resource records, where the number of
    /// records is specified in the corresponding count field in the header.
    pub authority: Vec<DnsAnswer>,
    pub additional: Vec<DnsAnswer>,
}

/// NS records pointing at a zone closer to the queried name.
#[derive(Debug, PartialEq, Clone)]
pub struct Referral {
    pub zone: String,
    pub nameservers: Vec<String>,
}

impl DnsPacket {
    pub fn new() -> Self {
        DnsPacket {
            header: DnsHeader::new(),
            queries: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn new_response() -> Self {
        let mut packet = DnsPacket::new();
        packet.header.is_response = true;
        packet
    }

    /// A standard query for one question with recursion desired. Servers
    /// that don't recurse (roots, TLDs) ignore RD and answer with referrals.
    pub fn new_query(name: &str, qtype: ResourceType, tx_id: u16) -> Self {
        let mut packet = DnsPacket::new();
        packet.header.tx_id = tx_id;
        packet.header.recursion_desired = true;
        packet.header.questions_count = 1;
        packet.queries = vec![DnsQuery::new(name, qtype)];
        packet
    }

    /// Decodes a whole message. Bytes after the last record are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        Self::from_bytes(bytes, 0).map(|(packet, _)| packet)
    }

    pub fn question(&self) -> Option<&DnsQuery> {
        self.queries.first()
    }

    /// Answer records of `rtype` owned by `name`.
    pub fn answers_for(&self, name: &str, rtype: ResourceType) -> Vec<DnsAnswer> {
        self.answers
            .iter()
            .filter(|answer| answer.is(name, rtype))
            .cloned()
            .collect()
    }

    /// The canonical name `name` is an alias of, if the answer section says so.
    pub fn cname_for(&self, name: &str) -> Option<&DnsAnswer> {
        self.answers
            .iter()
            .find(|answer| answer.is(name, ResourceType::CName))
    }

    /// NS records in the authority section for the deepest ancestor of
    /// `name` they cover. An authoritative reply carrying NS records is a
    /// negative answer, not a delegation.
    pub fn referral_for(&self, name: &str) -> Option<Referral> {
        if self.header.authoritative {
            return None;
        }
        // every candidate is an ancestor of `name`, so longer means deeper
        let zone = self
            .authority
            .iter()
            .filter(|record| record.rtype == ResourceType::NameServer && is_subdomain(name, &record.name))
            .map(|record| record.name.as_str())
            .max_by_key(|zone| zone.trim_end_matches('.').len())?;
        let nameservers = self
            .authority
            .iter()
            .filter(|record| record.is(zone, ResourceType::NameServer))
            .filter_map(DnsAnswer::target)
            .map(str::to_owned)
            .collect();
        Some(Referral {
            zone: zone.to_owned(),
            nameservers,
        })
    }

    /// A records for `nameserver` from the additional section.
    pub fn glue_for(&self, nameserver: &str) -> Vec<DnsAnswer> {
        self.additional
            .iter()
            .filter(|record| record.is(nameserver, ResourceType::A))
            .cloned()
            .collect()
    }
}

impl Default for DnsPacket {
    fn default() -> Self {
        DnsPacket::new()
    }
}

/// Whether `name` equals `zone` or sits below it. Every name is below the root.
pub fn is_subdomain(name: &str, zone: &str) -> bool {
    let name = name.trim_end_matches('.');
    let zone = zone.trim_end_matches('.');
    if zone.is_empty() || name.eq_ignore_ascii_case(zone) {
        return true;
    }
    name.len() > zone.len()
        && name.as_bytes()[name.len() - zone.len() - 1] == b'.'
        && name.as_bytes()[name.len() - zone.len()..].eq_ignore_ascii_case(zone.as_bytes())
}

/// The wire bytes of a single-question query.
pub fn encode_query(name: &str, qtype: ResourceType, tx_id: u16) -> Vec<u8> {
    DnsPacket::new_query(name, qtype, tx_id).to_bytes()
}

fn read_records(
    bytes: &[u8],
    count: u16,
    offset: &mut usize,
) -> Result<Vec<DnsAnswer>, WireError> {
    // a record is at least 11 bytes, so don't trust huge counts for capacity
    let mut records = Vec::with_capacity((count as usize).min(bytes.len() / 11));
    for _ in 0..count {
        let (record, num_read) = DnsAnswer::from_bytes(bytes, *offset)?;
        records.push(record);
        *offset += num_read;
    }
    Ok(records)
}

impl FromBytes for DnsPacket {
    fn from_bytes(bytes: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let (header, header_len) = DnsHeader::from_bytes(bytes, offset)?;
        let mut pos = offset + header_len;
        let mut queries = Vec::with_capacity((header.questions_count as usize).min(bytes.len() / 5));
        for _ in 0..header.questions_count {
            let (query, num_read) = DnsQuery::from_bytes(bytes, pos)?;
            queries.push(query);
            pos += num_read;
        }
        let answers = read_records(bytes, header.answers_count, &mut pos)?;
        let authority = read_records(bytes, header.authority_count, &mut pos)?;
        let additional = read_records(bytes, header.additional_count, &mut pos)?;
        Ok((
            DnsPacket {
                header,
                queries,
                answers,
                authority,
                additional,
            },
            pos - offset,
        ))
    }
}

impl ToBytes for DnsPacket {
    /// Counts are taken from the sections, not from the header fields.
    fn write_bytes(&self, writer: &mut WireWriter) {
        let mut header = self.header.clone();
        header.questions_count = self.queries.len() as u16;
        header.answers_count = self.answers.len() as u16;
        header.authority_count = self.authority.len() as u16;
        header.additional_count = self.additional.len() as u16;
        header.write_bytes(writer);
        debug_assert_eq!(HEADER_LENGTH, writer.len());
        for query in &self.queries {
            query.write_bytes(writer);
        }
        for record in self.answers.iter().chain(&self.authority).chain(&self.additional) {
            record.write_bytes(writer);
        }
    }
}
