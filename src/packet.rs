//! Append-only DNS message buffer: header accessors, the compression
//! dictionary, `push`/`parse_record`, and the restartable `grep` iterator.
//!
//! Grounded on `dnssector::dns_sector`'s header/section-count accessors and
//! `dnssector::rr_iterator::RRIterator`'s `skip_name`/`skip_rdata` style, but
//! this buffer is written to (append-only), not just validated in place.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::constants::{
    Section, SectionMask, DNS_HEADER_SIZE, DNS_RR_HEADER_SIZE, DNS_RR_QUESTION_HEADER_SIZE,
    DNS_RR_RDLEN_OFFSET, DICTIONARY_CAP,
};
use crate::errors::{Error, Result};
use crate::name;
use crate::rr::RecordData;

const ID_OFFSET: usize = 0;
const FLAGS_OFFSET: usize = 2;
const QDCOUNT_OFFSET: usize = 4;
const ANCOUNT_OFFSET: usize = 6;
const NSCOUNT_OFFSET: usize = 8;
const ARCOUNT_OFFSET: usize = 10;

/// A record as recovered by `parse_record`/`grep`: `{dn_offset, dn_len, type,
/// class, ttl, rd_offset, rd_len, section}`. For question-section entries
/// `ttl` is zero and `rd_len` is zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub dn_offset: usize,
    pub dn_len: usize,
    pub rr_type: u16,
    pub class: u16,
    pub ttl: u32,
    pub rd_offset: usize,
    pub rd_len: usize,
    pub section: Section,
}

impl Record {
    #[inline]
    fn end_offset(&self) -> usize {
        self.rd_offset + self.rd_len
    }
}

/// An append-only DNS message buffer of fixed capacity `cap`.
#[derive(Debug, Clone)]
pub struct Packet {
    buf: Vec<u8>,
    cap: usize,
    end: usize,
    dictionary: Vec<u16>,
}

impl Packet {
    /// Creates an empty packet with a zeroed 12-byte header and capacity `cap`.
    pub fn new(cap: usize) -> Packet {
        assert!(cap >= DNS_HEADER_SIZE);
        Packet {
            buf: vec![0u8; DNS_HEADER_SIZE],
            cap,
            end: DNS_HEADER_SIZE,
            dictionary: Vec::with_capacity(DICTIONARY_CAP),
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.end]
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn dictionary(&self) -> &[u16] {
        &self.dictionary
    }

    #[inline]
    pub fn id(&self) -> u16 {
        BigEndian::read_u16(&self.buf[ID_OFFSET..])
    }

    pub fn set_id(&mut self, id: u16) {
        BigEndian::write_u16(&mut self.buf[ID_OFFSET..], id);
    }

    #[inline]
    pub fn flags(&self) -> u16 {
        BigEndian::read_u16(&self.buf[FLAGS_OFFSET..])
    }

    pub fn set_flags(&mut self, flags: u16) {
        BigEndian::write_u16(&mut self.buf[FLAGS_OFFSET..], flags);
    }

    #[inline]
    fn count_offset(section: Section) -> usize {
        match section {
            Section::Question => QDCOUNT_OFFSET,
            Section::Answer => ANCOUNT_OFFSET,
            Section::NameServers => NSCOUNT_OFFSET,
            Section::Additional => ARCOUNT_OFFSET,
        }
    }

    #[inline]
    pub fn count(&self, section: Section) -> u16 {
        BigEndian::read_u16(&self.buf[Self::count_offset(section)..])
    }

    pub fn qdcount(&self) -> u16 {
        self.count(Section::Question)
    }
    pub fn ancount(&self) -> u16 {
        self.count(Section::Answer)
    }
    pub fn nscount(&self) -> u16 {
        self.count(Section::NameServers)
    }
    pub fn arcount(&self) -> u16 {
        self.count(Section::Additional)
    }

    fn inc_count(&mut self, section: Section) -> Result<()> {
        let off = Self::count_offset(section);
        let v = BigEndian::read_u16(&self.buf[off..]);
        let v = v.checked_add(1).ok_or(Error::NoBufs)?;
        BigEndian::write_u16(&mut self.buf[off..], v);
        Ok(())
    }

    fn ensure_room(&mut self, n: usize) -> Result<()> {
        if self.end + n > self.cap {
            return Err(Error::NoBufs);
        }
        Ok(())
    }

    pub(crate) fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_room(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        self.end += bytes.len();
        Ok(())
    }

    pub(crate) fn push_u16(&mut self, v: u16) -> Result<()> {
        let mut b = [0u8; 2];
        BigEndian::write_u16(&mut b, v);
        self.push_bytes(&b)
    }

    pub(crate) fn push_u32(&mut self, v: u32) -> Result<()> {
        let mut b = [0u8; 4];
        BigEndian::write_u32(&mut b, v);
        self.push_bytes(&b)
    }

    /// Compresses and appends `name` at the current write cursor, registering
    /// one dictionary entry per label boundary of the literal bytes written
    /// (see `DESIGN.md` for why every suffix, not just the name's own start,
    /// needs to be registered).
    pub fn write_name(&mut self, name: &str) -> Result<()> {
        let mut scratch = [0u8; 256];
        let n = name::compress(name, &mut scratch, &self.buf[..self.end], &self.dictionary)?;
        self.ensure_room(n)?;
        let start = self.end;
        self.buf.extend_from_slice(&scratch[..n]);
        self.end += n;
        for off in name::label_offsets(&scratch, n) {
            if self.dictionary.len() < DICTIONARY_CAP {
                self.dictionary.push((start + off) as u16);
            }
        }
        Ok(())
    }

    /// Appends a record. For `Section::Question`, `ttl` and `rdata` are ignored.
    /// On any failure the buffer, section counts and dictionary are rolled back
    /// to their pre-call state.
    pub fn push(
        &mut self,
        section: Section,
        name: &str,
        rr_type: u16,
        class: u16,
        ttl: u32,
        rdata: Option<&RecordData>,
    ) -> Result<()> {
        let save_end = self.end;
        let save_dict_len = self.dictionary.len();
        let result = self.push_inner(section, name, rr_type, class, ttl, rdata);
        if result.is_err() {
            self.buf.truncate(save_end);
            self.end = save_end;
            self.dictionary.truncate(save_dict_len);
        }
        result
    }

    fn push_inner(
        &mut self,
        section: Section,
        name: &str,
        rr_type: u16,
        class: u16,
        ttl: u32,
        rdata: Option<&RecordData>,
    ) -> Result<()> {
        self.write_name(name)?;
        self.push_u16(rr_type)?;
        self.push_u16(class)?;
        if section == Section::Question {
            self.inc_count(section)?;
            return Ok(());
        }
        self.push_u32(ttl & 0x7fff_ffff)?;
        let rdlen_offset = self.end;
        self.push_u16(0)?;
        let rdata_start = self.end;
        let rdata = rdata.ok_or(Error::Internal("rdata required outside the question section"))?;
        rdata.serialize(self)?;
        let rdlen = self.end - rdata_start;
        if rdlen > 0xffff {
            return Err(Error::TooLong);
        }
        BigEndian::write_u16(&mut self.buf[rdlen_offset..], rdlen as u16);
        self.inc_count(section)?;
        Ok(())
    }

    /// Reads the record at `offset` (name via `skip`, then type/class and,
    /// outside the question section, ttl/rdlength), validating that the
    /// rdata slice stays within the buffer.
    pub fn parse_record(&self, offset: usize, section: Section) -> Result<Record> {
        let packet = self.bytes();
        let dn_offset = offset;
        let after_name = name::skip(packet, offset)?;
        let dn_len = after_name - offset;
        if section == Section::Question {
            if after_name + DNS_RR_QUESTION_HEADER_SIZE > packet.len() {
                return Err(Error::Malformed);
            }
            let rr_type = BigEndian::read_u16(&packet[after_name..]);
            let class = BigEndian::read_u16(&packet[after_name + 2..]);
            return Ok(Record {
                dn_offset,
                dn_len,
                rr_type,
                class,
                ttl: 0,
                rd_offset: after_name + DNS_RR_QUESTION_HEADER_SIZE,
                rd_len: 0,
                section,
            });
        }
        if after_name + DNS_RR_HEADER_SIZE > packet.len() {
            return Err(Error::Malformed);
        }
        let rr_type = BigEndian::read_u16(&packet[after_name..]);
        let class = BigEndian::read_u16(&packet[after_name + 2..]);
        let ttl = BigEndian::read_u32(&packet[after_name + 4..]);
        let rd_len = BigEndian::read_u16(&packet[after_name + DNS_RR_RDLEN_OFFSET..]) as usize;
        let rd_offset = after_name + DNS_RR_HEADER_SIZE;
        if rd_offset + rd_len > packet.len() {
            return Err(Error::Malformed);
        }
        Ok(Record {
            dn_offset,
            dn_len,
            rr_type,
            class,
            ttl,
            rd_offset,
            rd_len,
            section,
        })
    }
}

/// Selects which records `grep` should return.
#[derive(Clone, Debug)]
pub struct Filter {
    pub sections: SectionMask,
    pub rr_type: Option<u16>,
    pub class: Option<u16>,
    pub name: Option<String>,
}

impl Default for Filter {
    fn default() -> Filter {
        Filter {
            sections: SectionMask::ALL,
            rr_type: None,
            class: None,
            name: None,
        }
    }
}

impl Filter {
    fn matches(&self, packet: &Packet, record: &Record) -> Result<bool> {
        if let Some(t) = self.rr_type {
            if t != u16::from(crate::constants::Type::ANY) && record.rr_type != t {
                return Ok(false);
            }
        }
        if let Some(c) = self.class {
            if c != u16::from(crate::constants::Class::ANY) && record.class != c {
                return Ok(false);
            }
        }
        if let Some(ref wanted) = self.name {
            let got = name::expand_to_string(packet.bytes(), record.dn_offset)?;
            if !got.eq_ignore_ascii_case(wanted) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

const SECTION_ORDER: [Section; 4] = [
    Section::Question,
    Section::Answer,
    Section::NameServers,
    Section::Additional,
];

/// Restartable state for [`Packet::grep`]. Zero-initializable: `GrepState::default()`
/// starts scanning from the question section.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct GrepState {
    section_idx: u8,
    index: u16,
    offset: usize,
    carry: u16,
}

impl GrepState {
    pub fn new() -> GrepState {
        GrepState::default()
    }

    pub fn is_done(&self) -> bool {
        self.section_idx as usize >= SECTION_ORDER.len()
    }
}

/// Reports a `grep` failure alongside how many records were successfully
/// matched before the offending record could not be parsed. The state is
/// NOT advanced past the bad record, so retrying after fixing the underlying
/// data (or simply stopping) does not skip it.
#[derive(Debug, Error)]
#[error("grep stopped after matching {processed} record(s): {source}")]
pub struct GrepError {
    pub processed: usize,
    #[source]
    pub source: Error,
}

impl Packet {
    /// A restartable, filtering iterator over already-serialized records.
    /// Scans QD -> AN -> NS -> AR, returning up to `batch` matches per call;
    /// resume with the returned `GrepState` to continue where this call left
    /// off. A record that fails to parse stops iteration with a `GrepError`
    /// that reports how many matches were found first; `state` is left
    /// pointing at the offending record, not past it.
    pub fn grep(
        &self,
        filter: &Filter,
        mut state: GrepState,
        batch: usize,
    ) -> std::result::Result<(Vec<Record>, GrepState), GrepError> {
        let mut out = Vec::new();
        loop {
            if out.len() >= batch || state.is_done() {
                return Ok((out, state));
            }
            let section = SECTION_ORDER[state.section_idx as usize];
            if state.index == 0 && state.carry == 0 {
                let count = self.count(section);
                if count == 0 {
                    state.section_idx += 1;
                    continue;
                }
                state.carry = count;
                if state.offset == 0 {
                    state.offset = DNS_HEADER_SIZE;
                }
            }
            if state.index >= state.carry {
                state.section_idx += 1;
                state.index = 0;
                state.carry = 0;
                continue;
            }
            let pre_offset = state.offset;
            match self.parse_record(pre_offset, section) {
                Err(source) => {
                    state.offset = pre_offset;
                    return Err(GrepError {
                        processed: out.len(),
                        source,
                    });
                }
                Ok(record) => {
                    state.offset = record.end_offset();
                    state.index += 1;
                    match filter.matches(self, &record) {
                        Ok(true) => out.push(record),
                        Ok(false) => {}
                        Err(source) => {
                            return Err(GrepError {
                                processed: out.len(),
                                source,
                            })
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{Class, Type};
    use crate::rr::RecordData;
    use std::net::Ipv4Addr;

    #[test]
    fn builds_worked_example_1() {
        let mut p = Packet::new(512);
        p.push(
            Section::Question,
            "www.example.com.",
            Type::A.into(),
            Class::IN.into(),
            0,
            None,
        )
        .unwrap();
        assert_eq!(p.id(), 0);
        assert_eq!(p.flags(), 0);
        assert_eq!(p.qdcount(), 1);
        assert_eq!(p.ancount(), 0);
        let expected = [
            0x03, b'w', b'w', b'w', 0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c',
            b'o', b'm', 0x00, 0x00, 0x01, 0x00, 0x01,
        ];
        assert_eq!(&p.bytes()[12..], &expected[..]);
    }

    #[test]
    fn cname_target_compresses_into_question_name() {
        let mut p = Packet::new(512);
        p.push(
            Section::Question,
            "www.example.com.",
            Type::A.into(),
            Class::IN.into(),
            0,
            None,
        )
        .unwrap();
        p.push(
            Section::Answer,
            "www.example.com.",
            Type::CNAME.into(),
            Class::IN.into(),
            300,
            Some(&RecordData::Cname("example.com.".to_owned())),
        )
        .unwrap();
        assert_eq!(p.ancount(), 1);

        let filter = Filter {
            sections: SectionMask::ANSWER,
            ..Filter::default()
        };
        let (records, _state) = p.grep(&filter, GrepState::new(), 10).unwrap();
        assert_eq!(records.len(), 1);
        let rec = records[0];
        let target = name::expand_to_string(p.bytes(), rec.rd_offset).unwrap();
        assert_eq!(target, "example.com.");
        assert_eq!(p.bytes()[rec.rd_offset] & 0xc0, 0xc0);
    }

    #[test]
    fn rollback_on_failure_restores_counts() {
        let mut p = Packet::new(35);
        p.push(
            Section::Question,
            "www.example.com.",
            Type::A.into(),
            Class::IN.into(),
            0,
            None,
        )
        .unwrap();
        let end_before = p.end();
        let qd_before = p.qdcount();
        let err = p
            .push(
                Section::Answer,
                "www.example.com.",
                Type::A.into(),
                Class::IN.into(),
                60,
                Some(&RecordData::A(Ipv4Addr::new(1, 2, 3, 4))),
            )
            .unwrap_err();
        assert!(matches!(err, Error::NoBufs));
        assert_eq!(p.end(), end_before);
        assert_eq!(p.qdcount(), qd_before);
        assert_eq!(p.ancount(), 0);
    }

    #[test]
    fn section_count_matches_grep_with_no_filter() {
        let mut p = Packet::new(512);
        p.push(Section::Question, "a.", Type::A.into(), Class::IN.into(), 0, None)
            .unwrap();
        p.push(
            Section::Answer,
            "a.",
            Type::A.into(),
            Class::IN.into(),
            60,
            Some(&RecordData::A(Ipv4Addr::new(1, 1, 1, 1))),
        )
        .unwrap();
        p.push(
            Section::Answer,
            "a.",
            Type::A.into(),
            Class::IN.into(),
            60,
            Some(&RecordData::A(Ipv4Addr::new(2, 2, 2, 2))),
        )
        .unwrap();
        let total = p.qdcount() + p.ancount() + p.nscount() + p.arcount();
        let (records, state) = p.grep(&Filter::default(), GrepState::new(), 100).unwrap();
        assert!(state.is_done());
        assert_eq!(records.len() as u16, total);
    }
}
