//! Domain-name codec: compression-aware encode, pointer-following decode, and the
//! small presentation-form helpers (`anchor`, `cleave`) used by the search-list
//! generator and the resolv.conf loader.

use crate::constants::{DNS_MAX_HOSTNAME_LEN, DNS_MAX_LABEL_LEN, MAXPTRS};
use crate::errors::{Error, Result};

/// Encodes `name` (presentation form, dot-separated, optionally trailing-dot-anchored)
/// into `dst` as wire-format labels, then tries to replace a suffix with a two-byte
/// compression pointer into `packet` using `dictionary` (offsets in insertion order).
///
/// Returns the number of bytes written into `dst` (`<= dst.len()`).
pub fn compress(name: &str, dst: &mut [u8], packet: &[u8], dictionary: &[u16]) -> Result<usize> {
    let labels = split_labels(name)?;

    let mut needed = 1; // root terminator
    for l in &labels {
        needed += 1 + l.len();
    }
    if needed > dst.len() {
        return Err(Error::TooLong);
    }

    let mut w = 0;
    let mut label_offsets = Vec::with_capacity(labels.len());
    for l in &labels {
        label_offsets.push(w);
        dst[w] = l.len() as u8;
        w += 1;
        dst[w..w + l.len()].copy_from_slice(l.as_bytes());
        w += l.len();
    }
    dst[w] = 0;
    w += 1;
    debug_assert_eq!(w, needed);

    for &p in &label_offsets {
        for &q in dictionary {
            if (q as usize) >= packet.len() || q > 0x3fff {
                continue;
            }
            if suffixes_match(dst, p, packet, q as usize) {
                dst[p] = 0xc0 | (q >> 8) as u8;
                dst[p + 1] = (q & 0xff) as u8;
                return Ok(p + 2);
            }
        }
    }
    Ok(needed)
}

/// Offsets within `dst[..written]` at which each (non-root) label of a name just
/// written by `compress`/a literal write begins. Used to populate a packet's
/// compression dictionary with every label-boundary suffix, not just the name's
/// own start (see `DESIGN.md` for why the topmost offset alone isn't enough).
pub fn label_offsets(dst: &[u8], written: usize) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut off = 0;
    while off < written {
        let b = dst[off];
        if b & 0xc0 != 0 {
            break; // a pointer: nothing further to register
        }
        let len = b as usize;
        if len == 0 {
            break; // root
        }
        offsets.push(off);
        off += 1 + len;
    }
    offsets
}

/// Decodes the name at `offset` into presentation form, following compression
/// pointers, copying into `dst`. Returns the full logical length of the
/// presentation name (not counting the NUL), which may exceed `dst.len()`: if
/// `dst` is too short the copy is truncated to fit but the walk still runs to
/// completion so the true length is still reported, and `dst` is always
/// NUL-terminated (as long as it isn't empty). Callers that need the whole
/// name can compare the returned length against `dst.len()` and retry with a
/// bigger buffer, or treat a too-short `dst` as `TOOLONG` outright.
pub fn expand(packet: &[u8], offset: usize, dst: &mut [u8]) -> Result<usize> {
    let mut total_len = 0usize;
    let mut written = 0usize;
    let mut cur = offset;
    let mut hops = MAXPTRS;
    let packet_len = packet.len();
    if offset >= packet_len {
        return Err(Error::Malformed);
    }
    let room = dst.len().saturating_sub(1); // leave a byte for the NUL
    loop {
        if cur >= packet_len {
            return Err(Error::Malformed);
        }
        let b = packet[cur];
        if b & 0xc0 == 0xc0 {
            if hops == 0 {
                return Err(Error::Loop);
            }
            hops -= 1;
            if cur + 1 >= packet_len {
                return Err(Error::Malformed);
            }
            let ptr = (((b & 0x3f) as usize) << 8) | packet[cur + 1] as usize;
            cur = ptr;
            continue;
        }
        if b & 0xc0 != 0 {
            return Err(Error::Malformed);
        }
        let label_len = b as usize;
        if label_len == 0 {
            break;
        }
        if label_len > DNS_MAX_LABEL_LEN {
            return Err(Error::Malformed);
        }
        if cur + 1 + label_len > packet_len {
            return Err(Error::Malformed);
        }
        let label = &packet[cur + 1..cur + 1 + label_len];
        for &byte in label.iter().chain(std::iter::once(&b'.')) {
            if written < room {
                dst[written] = byte;
                written += 1;
            }
        }
        total_len += label_len + 1;
        cur += 1 + label_len;
        if total_len > DNS_MAX_HOSTNAME_LEN {
            return Err(Error::TooLong);
        }
    }
    if total_len == 0 {
        if written < room {
            dst[written] = b'.';
            written += 1;
        }
        total_len = 1;
    }
    if !dst.is_empty() {
        dst[written] = 0;
    }
    Ok(total_len)
}

/// Convenience wrapper over [`expand`] for callers that just want an owned
/// presentation string. Presentation names never exceed [`DNS_MAX_HOSTNAME_LEN`]
/// bytes, so a fixed-size stack buffer is always enough; if a hand-crafted
/// packet somehow produced a longer one, `expand` itself already raised
/// `TOOLONG` before this could be reached.
pub fn expand_to_string(packet: &[u8], offset: usize) -> Result<String> {
    let mut dst = [0u8; DNS_MAX_HOSTNAME_LEN + 1];
    let len = expand(packet, offset, &mut dst)?;
    Ok(String::from_utf8_lossy(&dst[..len]).into_owned())
}

/// Non-copying advance past a single on-wire name. A pointer is not followed: the
/// two pointer bytes are consumed and the offset right after them is returned.
pub fn skip(packet: &[u8], mut offset: usize) -> Result<usize> {
    loop {
        if offset >= packet.len() {
            return Err(Error::Malformed);
        }
        let b = packet[offset];
        if b & 0xc0 == 0xc0 {
            if offset + 1 >= packet.len() {
                return Err(Error::Malformed);
            }
            return Ok(offset + 2);
        }
        if b & 0xc0 != 0 {
            return Err(Error::Malformed);
        }
        let len = b as usize;
        if len > DNS_MAX_LABEL_LEN {
            return Err(Error::Malformed);
        }
        if offset + 1 + len > packet.len() {
            return Err(Error::Malformed);
        }
        offset += 1 + len;
        if len == 0 {
            return Ok(offset);
        }
    }
}

/// Ensures `name` ends with a trailing dot.
pub fn anchor(name: &str) -> String {
    if name.ends_with('.') {
        name.to_owned()
    } else {
        let mut s = String::with_capacity(name.len() + 1);
        s.push_str(name);
        s.push('.');
        s
    }
}

/// Returns the suffix after the first internal dot: `a.b.c` -> `b.c`, `a.` -> ``, `.` -> ``.
pub fn cleave(name: &str) -> &str {
    match name.find('.') {
        Some(pos) => &name[pos + 1..],
        None => "",
    }
}

fn split_labels(name: &str) -> Result<Vec<&str>> {
    if name.is_empty() || name == "." {
        return Ok(Vec::new());
    }
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    let mut labels = Vec::new();
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(Error::InvalidName("empty label"));
        }
        if label.len() > DNS_MAX_LABEL_LEN {
            return Err(Error::InvalidName("label too long"));
        }
        labels.push(label);
    }
    Ok(labels)
}

/// Compares the name suffix written at `dst[p..]` (always literal, no pointers: `dst`
/// is mid-encode) against the suffix that begins at `packet[q..]` (may itself contain
/// pointers, bounded by `MAXPTRS`), label by label, ASCII-case-insensitively. Returns
/// `true` only if both sides terminate with a zero label at the same step.
fn suffixes_match(dst: &[u8], mut p: usize, packet: &[u8], mut q: usize) -> bool {
    let mut hops = MAXPTRS;
    loop {
        let Some((a_off, a_len)) = literal_label(dst, p) else {
            return false;
        };
        let Some((b_off, b_len)) = dereferenced_label(packet, q, &mut hops) else {
            return false;
        };
        if a_len != b_len {
            return false;
        }
        if a_len == 0 {
            return true;
        }
        let a_bytes = &dst[a_off + 1..a_off + 1 + a_len];
        let b_bytes = &packet[b_off + 1..b_off + 1 + b_len];
        if !a_bytes.eq_ignore_ascii_case(b_bytes) {
            return false;
        }
        p = a_off + 1 + a_len;
        q = b_off + 1 + b_len;
    }
}

fn literal_label(buf: &[u8], offset: usize) -> Option<(usize, usize)> {
    let b = *buf.get(offset)?;
    if b & 0xc0 != 0 {
        return None;
    }
    Some((offset, b as usize))
}

fn dereferenced_label(buf: &[u8], mut offset: usize, hops: &mut u16) -> Option<(usize, usize)> {
    loop {
        let b = *buf.get(offset)?;
        if b & 0xc0 == 0xc0 {
            if *hops == 0 {
                return None;
            }
            *hops -= 1;
            let ptr = (((b & 0x3f) as u16) << 8) | *buf.get(offset + 1)? as u16;
            offset = ptr as usize;
            continue;
        }
        if b & 0xc0 != 0 {
            return None;
        }
        return Some((offset, b as usize));
    }
}
