#![allow(dead_code)]

/// Size of the main DNS header: id, flags, and the four section counts.
pub const DNS_HEADER_SIZE: usize = 12;

/// Offset to the first record of the question section, from the start of the packet.
pub const DNS_QUESTION_OFFSET: usize = DNS_HEADER_SIZE;

/// Maximum length of a presentation-form host name, including the terminator.
pub const DNS_MAX_HOSTNAME_LEN: usize = 255;

/// Maximum length of a single label.
pub const DNS_MAX_LABEL_LEN: usize = 63;

/// Maximum number of indirections followed while expanding a compressed name (`MAXPTRS`).
pub const DNS_MAX_HOSTNAME_INDIRECTIONS: u16 = 127;

/// Size of the header for a RR in the question section (type + class).
pub const DNS_RR_QUESTION_HEADER_SIZE: usize = 4;

/// Size of the header for a RR outside the question section (type + class + ttl + rdlength).
pub const DNS_RR_HEADER_SIZE: usize = 10;

/// Offset to the type identifier, from the location right after the RR name.
pub const DNS_RR_TYPE_OFFSET: usize = 0;

/// Offset to the class identifier, from the location right after the RR name.
pub const DNS_RR_CLASS_OFFSET: usize = 2;

/// Offset to the TTL, from the location right after the RR name.
pub const DNS_RR_TTL_OFFSET: usize = 4;

/// Offset to the rdata length, from the location right after the RR name.
pub const DNS_RR_RDLEN_OFFSET: usize = 8;

/// Offset to the transaction ID, from the beginning of a DNS packet.
pub const DNS_TID_OFFSET: usize = 0;

/// Offset to the flags word, from the beginning of a DNS packet.
pub const DNS_FLAGS_OFFSET: usize = 2;

// Header flag bits, as they sit within the 16-bit flags word.
pub const DNS_FLAG_QR: u16 = 1 << 15;
pub const DNS_FLAG_AA: u16 = 1 << 10;
pub const DNS_FLAG_TC: u16 = 1 << 9;
pub const DNS_FLAG_RD: u16 = 1 << 8;
pub const DNS_FLAG_RA: u16 = 1 << 7;

/// Maximum number of hops a compressed name may dereference before `expand` gives up.
pub const MAXPTRS: u16 = DNS_MAX_HOSTNAME_INDIRECTIONS;

/// Size of a packet's compression dictionary.
pub const DICTIONARY_CAP: usize = 16;

/// DNS query class.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Class {
    IN = 1,
    CH = 3,
    HS = 4,
    NONE = 254,
    ANY = 255,
}

impl From<Class> for u16 {
    fn from(v: Class) -> u16 {
        v as u16
    }
}

/// DNS query type. The full IANA-ish registry is kept as an extension point even though
/// the RR registry only implements a handful of these; unknown types round-trip opaquely.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Type {
    A = 1,
    NS = 2,
    MD = 3,
    MF = 4,
    CNAME = 5,
    SOA = 6,
    MB = 7,
    MG = 8,
    MR = 9,
    NULL = 10,
    WKS = 11,
    PTR = 12,
    HINFO = 13,
    MINFO = 14,
    MX = 15,
    TXT = 16,
    RP = 17,
    AFSDB = 18,
    SRV = 33,
    NAPTR = 35,
    AAAA = 28,
    DNAME = 39,
    OPT = 41,
    DS = 43,
    RRSIG = 46,
    NSEC = 47,
    DNSKEY = 48,
    NSEC3 = 50,
    NSEC3PARAM = 51,
    TLSA = 52,
    SVCB = 64,
    HTTPS = 65,
    SPF = 99,
    TKEY = 249,
    TSIG = 250,
    IXFR = 251,
    AXFR = 252,
    ANY = 255,
    URI = 256,
    CAA = 257,
}

impl From<Type> for u16 {
    fn from(v: Type) -> u16 {
        v as u16
    }
}

/// DNS return codes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rcode {
    NOERROR = 0,
    FORMERR = 1,
    SERVFAIL = 2,
    NXDOMAIN = 3,
    NOTIMPL = 4,
    REFUSED = 5,
}

impl From<Rcode> for u8 {
    fn from(v: Rcode) -> u8 {
        v as u8
    }
}

/// DNS opcodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Opcode {
    QUERY = 0,
    IQUERY = 1,
    STATUS = 2,
    NOTIFY = 4,
    UPDATE = 5,
}

impl From<Opcode> for u8 {
    fn from(v: Opcode) -> u8 {
        v as u8
    }
}

/// DNS packet section. `section ∈ {QD, AN, NS, AR}`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Section {
    Question,
    Answer,
    NameServers,
    Additional,
}

impl From<Section> for u8 {
    fn from(v: Section) -> u8 {
        v as u8
    }
}

/// Bitmask over `Section`, used by `grep`'s filter to select which sections to scan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SectionMask(pub u8);

impl SectionMask {
    pub const QUESTION: SectionMask = SectionMask(1 << 0);
    pub const ANSWER: SectionMask = SectionMask(1 << 1);
    pub const NAME_SERVERS: SectionMask = SectionMask(1 << 2);
    pub const ADDITIONAL: SectionMask = SectionMask(1 << 3);
    pub const ALL: SectionMask = SectionMask(0b1111);

    #[inline]
    pub fn contains(self, section: Section) -> bool {
        self.0 & Self::bit(section) != 0
    }

    #[inline]
    fn bit(section: Section) -> u8 {
        match section {
            Section::Question => Self::QUESTION.0,
            Section::Answer => Self::ANSWER.0,
            Section::NameServers => Self::NAME_SERVERS.0,
            Section::Additional => Self::ADDITIONAL.0,
        }
    }
}

impl std::ops::BitOr for SectionMask {
    type Output = SectionMask;
    fn bitor(self, rhs: SectionMask) -> SectionMask {
        SectionMask(self.0 | rhs.0)
    }
}
