use byteorder::{ByteOrder, NetworkEndian};

use crate::error::WireError;
use crate::serialization::{read_slice, FromBytes, ToBytes, WireWriter};

pub const HEADER_LENGTH: usize = 12;
pub const CLASS_IN: u16 = 1;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ResourceType {
    A,
    NameServer,
    CName,
    StartOfAuthority,
    Pointer,
    AAAA,
    Other(u16),
}

impl From<u16> for ResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => ResourceType::A,
            2 => ResourceType::NameServer,
            5 => ResourceType::CName,
            6 => ResourceType::StartOfAuthority,
            12 => ResourceType::Pointer,
            28 => ResourceType::AAAA,
            n => ResourceType::Other(n),
        }
    }
}

impl From<ResourceType> for u16 {
    fn from(rtype: ResourceType) -> Self {
        match rtype {
            ResourceType::A => 1,
            ResourceType::NameServer => 2,
            ResourceType::CName => 5,
            ResourceType::StartOfAuthority => 6,
            ResourceType::Pointer => 12,
            ResourceType::AAAA => 28,
            ResourceType::Other(n) => n,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u8),
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            n => ResponseCode::Other(n),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(rcode: ResponseCode) -> Self {
        match rcode {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(n) => n & 0x0f,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct DnsHeader {
    pub tx_id: u16,
    pub is_response: bool,
    pub opcode: u8, // only 4 bits actually
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: u8,
    pub response_code: ResponseCode,
    pub questions_count: u16,
    pub answers_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

impl DnsHeader {
    pub fn new() -> Self {
        DnsHeader {
            tx_id: 0,
            is_response: false,
            opcode: 0,
            authoritative: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            z: 0,
            response_code: ResponseCode::NoError,
            questions_count: 0,
            answers_count: 0,
            authority_count: 0,
            additional_count: 0,
        }
    }

    /// In the flags section, the opcode is
    /// .xxx x... .... ....
    fn opcode(byte: u8) -> u8 {
        let mut res = byte & 0x78;
        res >>= 3;
        res
    }

    fn flags(&self) -> u16 {
        let mut flags = self.is_response as u16;
        flags <<= 4;
        flags += (self.opcode & 0x0f) as u16;
        flags <<= 1;
        flags += self.authoritative as u16;
        flags <<= 1;
        flags += self.truncated as u16;
        flags <<= 1;
        flags += self.recursion_desired as u16;
        flags <<= 1;
        flags += self.recursion_available as u16;
        flags <<= 3;
        flags += (self.z & 0x07) as u16;
        flags <<= 4;
        flags += u8::from(self.response_code) as u16;
        flags
    }
}

impl Default for DnsHeader {
    fn default() -> Self {
        DnsHeader::new()
    }
}

impl FromBytes for DnsHeader {
    fn from_bytes(packet: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        let bytes = read_slice(packet, offset, HEADER_LENGTH)?;
        let flags = &bytes[2..4];
        let header = DnsHeader {
            tx_id: NetworkEndian::read_u16(&bytes[0..2]),
            is_response: flags[0] & 0x80 > 0,
            opcode: Self::opcode(flags[0]),
            authoritative: flags[0] & 0x04 > 0,
            truncated: flags[0] & 0x02 > 0,
            recursion_desired: flags[0] & 0x01 > 0,
            recursion_available: flags[1] & 0x80 > 0,
            z: (flags[1] & 0x70) >> 4,
            response_code: ResponseCode::from(flags[1] & 0x0f),
            questions_count: NetworkEndian::read_u16(&bytes[4..6]),
            answers_count: NetworkEndian::read_u16(&bytes[6..8]),
            authority_count: NetworkEndian::read_u16(&bytes[8..10]),
            additional_count: NetworkEndian::read_u16(&bytes[10..12]),
        };
        Ok((header, HEADER_LENGTH))
    }
}

impl ToBytes for DnsHeader {
    fn write_bytes(&self, writer: &mut WireWriter) {
        writer.write_u16(self.tx_id);
        writer.write_u16(self.flags());
        writer.write_u16(self.questions_count);
        writer.write_u16(self.answers_count);
        writer.write_u16(self.authority_count);
        writer.write_u16(self.additional_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_from_bytes() {
        let bytes = [
            0xffu8, 0xff, // transaction id
            0x00, 0x00, // flags (standard query request)
            0x00, 0x01, // 1 question
            0x00, 0x00, // dns request, so no answer rr's here of course
            0x00, 0x00, // neither authority rr's
            0x00, 0x00, // nor additional rr's
        ];
        let (actual_header, read) = DnsHeader::from_bytes(&bytes, 0).unwrap();
        let mut expected_header = DnsHeader::new();
        expected_header.tx_id = 0xffff;
        expected_header.questions_count = 1;

        assert_eq!(expected_header, actual_header);
        assert_eq!(HEADER_LENGTH, read);
    }

    #[test]
    fn test_header_from_bytes_with_more_nonzero_flags() {
        let bytes = [
            0xff, 0xff, // transaction id
            0x81, 0x85, // flags (response, rd, ra, refused)
            0x00, 0x01, // 1 question
            0x00, 0x00,
            0x00, 0x00,
            0x00, 0x00,
        ];
        let (actual_header, _) = DnsHeader::from_bytes(&bytes, 0).unwrap();
        let mut expected_header = DnsHeader::new();
        expected_header.tx_id = 0xffff;
        expected_header.is_response = true;
        expected_header.recursion_desired = true;
        expected_header.recursion_available = true;
        expected_header.questions_count = 1;
        expected_header.response_code = ResponseCode::Refused;

        assert_eq!(expected_header, actual_header);
    }

    #[test]
    fn test_header_from_bytes_with_opcode_and_truncation() {
        let bytes = [
            0xffu8, 0xff, // transaction id
            0xfb, 0x83, // flags (opcode 15, truncated, nxdomain)
            0x00, 0x01, // 1 question
            0x00, 0x00,
            0x00, 0x00,
            0x00, 0x00,
        ];
        let (actual_header, _) = DnsHeader::from_bytes(&bytes, 0).unwrap();
        let mut expected_header = DnsHeader::new();
        expected_header.tx_id = 0xffff;
        expected_header.opcode = 0x0f;
        expected_header.is_response = true;
        expected_header.truncated = true;
        expected_header.recursion_desired = true;
        expected_header.recursion_available = true;
        expected_header.questions_count = 1;
        expected_header.response_code = ResponseCode::NameError;

        assert_eq!(expected_header, actual_header);
    }

    #[test]
    /// mostly testing for endianness
    fn test_header_from_bytes_with_nonzero_counts() {
        let bytes = [
            0x00u8, 0x00, // transaction id
            0x00, 0x00, // flags (standard query request)
            0x00, 0x00, // 0 questions
            0x00, 0x01, // 1 answer rr
            0x01, 0x00, // 256 authority rr's
            0x00, 0x00, // additional rr's
        ];
        let (actual_header, _) = DnsHeader::from_bytes(&bytes, 0).unwrap();
        let mut expected_header = DnsHeader::new();
        expected_header.answers_count = 1;
        expected_header.authority_count = 256;

        assert_eq!(expected_header, actual_header);
    }

    #[test]
    fn test_short_header_is_truncated() {
        let bytes = [0x00u8, 0x00, 0x01];
        assert_eq!(
            Err(WireError::Truncated { offset: 0, needed: HEADER_LENGTH }),
            DnsHeader::from_bytes(&bytes, 0)
        );
    }

    #[test]
    fn test_header_to_bytes_all_zero() {
        let header = DnsHeader::new();
        assert_eq!(vec![0u8; 12], header.to_bytes());
    }

    #[test]
    fn test_response_header_to_bytes() {
        let mut header = DnsHeader::new();
        header.tx_id = 0xbeef;
        header.is_response = true;
        header.authoritative = true;
        header.truncated = true;
        header.recursion_desired = true;
        header.recursion_available = true;
        header.response_code = ResponseCode::Refused;
        header.questions_count = 0xabcd;
        header.answers_count = 0xabcd;
        header.authority_count = 0xabcd;
        header.additional_count = 0xabcd;
        let expected_bytes = vec![
            0xbeu8, 0xef,
            0x87, 0x85,
            0xab, 0xcd,
            0xab, 0xcd,
            0xab, 0xcd,
            0xab, 0xcd,
        ];
        assert_eq!(expected_bytes, header.to_bytes());
    }

    #[test]
    fn test_resource_type_round_trips_unknown_values() {
        assert_eq!(ResourceType::Other(99), ResourceType::from(99));
        assert_eq!(99u16, u16::from(ResourceType::Other(99)));
        assert_eq!(ResourceType::Pointer, ResourceType::from(12));
    }
}
