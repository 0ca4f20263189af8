//! RR type registry: `RecordData` is a tagged sum type over the handful of
//! record payloads this crate understands, with an `Opaque` fallback for
//! everything else. Grounded on `dnssector::synth::gen`'s per-type builders
//! (`A::build`, `MX::build`, `TXT::build`, ...) for wire-layout details, but
//! adapted from "always build uncompressed, from a presentation string" to
//! "serialize into a packet, compression included" — `gen.rs` never
//! compresses names, it only ever calls `copy_raw_name_from_str`.

use byteorder::{BigEndian, ByteOrder};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::constants::Type;
use crate::errors::{Error, Result};
use crate::name;
use crate::packet::Packet;

/// A decoded or to-be-serialized RR payload. `Opaque` round-trips any type
/// not otherwise registered here, carrying its own type code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(String),
    Cname(String),
    Mx(u16, String),
    Txt(Vec<u8>),
    Opaque(u16, Vec<u8>),
}

impl RecordData {
    pub fn rr_type(&self) -> u16 {
        match self {
            RecordData::A(_) => Type::A.into(),
            RecordData::Aaaa(_) => Type::AAAA.into(),
            RecordData::Ns(_) => Type::NS.into(),
            RecordData::Cname(_) => Type::CNAME.into(),
            RecordData::Mx(_, _) => Type::MX.into(),
            RecordData::Txt(_) => Type::TXT.into(),
            RecordData::Opaque(t, _) => *t,
        }
    }

    /// Appends this record's rdata to `packet` (not including the 2-byte
    /// rdlength prefix, which the caller computes after compression).
    pub fn serialize(&self, packet: &mut Packet) -> Result<()> {
        match self {
            RecordData::A(ip) => packet.push_bytes(&ip.octets()),
            RecordData::Aaaa(ip) => packet.push_bytes(&ip.octets()),
            RecordData::Ns(name) | RecordData::Cname(name) => packet.write_name(name),
            RecordData::Mx(preference, exchange) => {
                packet.push_u16(*preference)?;
                packet.write_name(exchange)
            }
            RecordData::Txt(text) => {
                if text.len() > 255 * 255 {
                    return Err(Error::TooLong);
                }
                for chunk in text.chunks(255) {
                    packet.push_bytes(&[chunk.len() as u8])?;
                    packet.push_bytes(chunk)?;
                }
                Ok(())
            }
            RecordData::Opaque(_, bytes) => packet.push_bytes(bytes),
        }
    }

    /// Decodes rdata already present in `packet_bytes[rd_offset..rd_offset+rd_len]`,
    /// expanding any embedded compressed name against the whole packet.
    pub fn parse(rr_type: u16, packet_bytes: &[u8], rd_offset: usize, rd_len: usize) -> Result<RecordData> {
        let rdata = packet_bytes
            .get(rd_offset..rd_offset + rd_len)
            .ok_or(Error::Malformed)?;
        if rr_type == u16::from(Type::A) {
            if rdata.len() != 4 {
                return Err(Error::Malformed);
            }
            return Ok(RecordData::A(Ipv4Addr::new(
                rdata[0], rdata[1], rdata[2], rdata[3],
            )));
        }
        if rr_type == u16::from(Type::AAAA) {
            if rdata.len() != 16 {
                return Err(Error::Malformed);
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(rdata);
            return Ok(RecordData::Aaaa(Ipv6Addr::from(octets)));
        }
        if rr_type == u16::from(Type::NS) {
            return Ok(RecordData::Ns(name::expand_to_string(packet_bytes, rd_offset)?));
        }
        if rr_type == u16::from(Type::CNAME) {
            return Ok(RecordData::Cname(name::expand_to_string(packet_bytes, rd_offset)?));
        }
        if rr_type == u16::from(Type::MX) {
            if rdata.len() < 2 {
                return Err(Error::Malformed);
            }
            let preference = BigEndian::read_u16(rdata);
            let exchange = name::expand_to_string(packet_bytes, rd_offset + 2)?;
            return Ok(RecordData::Mx(preference, exchange));
        }
        if rr_type == u16::from(Type::TXT) {
            let mut out = Vec::with_capacity(rdata.len());
            let mut i = 0;
            while i < rdata.len() {
                let len = rdata[i] as usize;
                i += 1;
                if i + len > rdata.len() {
                    return Err(Error::Malformed);
                }
                out.extend_from_slice(&rdata[i..i + len]);
                i += len;
            }
            return Ok(RecordData::Txt(out));
        }
        Ok(RecordData::Opaque(rr_type, rdata.to_owned()))
    }

    /// Presentation-format text, per the registry's print column.
    pub fn print(&self) -> String {
        match self {
            RecordData::A(ip) => ip.to_string(),
            RecordData::Aaaa(ip) => ip.to_string(),
            RecordData::Ns(name) | RecordData::Cname(name) => name.clone(),
            RecordData::Mx(preference, exchange) => format!("{} {}", preference, exchange),
            RecordData::Txt(text) => text
                .chunks(256)
                .map(|chunk| format!("\"{}\"", String::from_utf8_lossy(chunk)))
                .collect::<Vec<_>>()
                .join(" "),
            RecordData::Opaque(rr_type, bytes) => format!("\\# {} {}", rr_type, hex_encode(bytes)),
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_record_prints_dotted_quad() {
        let rd = RecordData::A(Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(rd.print(), "192.0.2.1");
    }

    #[test]
    fn txt_print_quotes_each_256_byte_chunk_separately() {
        let text = vec![b'a'; 300];
        let rd = RecordData::Txt(text);
        let printed = rd.print();
        assert_eq!(printed.matches('"').count(), 4);
        let expected = format!("\"{}\" \"{}\"", "a".repeat(256), "a".repeat(44));
        assert_eq!(printed, expected);
    }

    #[test]
    fn txt_round_trips_through_serialize_and_parse() {
        let mut packet = crate::packet::Packet::new(512);
        let rd = RecordData::Txt(b"hello world".to_vec());
        packet
            .push(
                crate::constants::Section::Answer,
                "a.",
                Type::TXT.into(),
                crate::constants::Class::IN.into(),
                60,
                Some(&rd),
            )
            .unwrap();
        let (records, _) = packet
            .grep(&crate::packet::Filter::default(), crate::packet::GrepState::new(), 10)
            .unwrap();
        let rec = records[0];
        let parsed = RecordData::parse(rec.rr_type, packet.bytes(), rec.rd_offset, rec.rd_len).unwrap();
        assert_eq!(parsed, RecordData::Txt(b"hello world".to_vec()));
    }
}
