//! Resolv.conf model & loader: a typed configuration plus the line-oriented
//! text parser that fills it in. No repo in the example pack implements
//! this; it is grounded in the classic BSD/glibc resolver whose vocabulary
//! (`nameserver`, `domain`/`search`, `options ndots:N`, `lookup file bind`)
//! this spec is visibly modeled after, keeping that original's caps
//! (`MAXNS` == 3, `MAXDNSRCH` == 6) since the spec names none of its own.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::net::{IpAddr, SocketAddr};

use crate::errors::Result;
use crate::name;

/// Maximum nameservers kept; extras are silently dropped (glibc's `MAXNS`).
pub const MAX_NAMESERVERS: usize = 3;
/// Maximum search-list entries kept (glibc's `MAXDNSRCH`).
pub const MAX_SEARCH: usize = 6;

/// Where a name lookup may be satisfied from, in configured order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LookupSource {
    File,
    Bind,
}

/// `options` line flags.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvOptions {
    pub edns0: bool,
    pub ndots: u8,
    pub recursive: bool,
}

impl Default for ResolvOptions {
    fn default() -> ResolvOptions {
        ResolvOptions {
            edns0: false,
            ndots: 1,
            recursive: false,
        }
    }
}

/// A parsed resolv.conf-style configuration. Shared, immutable-after-setup
/// (callers typically hold this behind an `Arc`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvConf {
    pub nameservers: Vec<SocketAddr>,
    pub search: Vec<String>,
    pub lookup_order: Vec<LookupSource>,
    pub options: ResolvOptions,
    pub bind_address: Option<SocketAddr>,
}

impl ResolvConf {
    /// Rewinds `reader` and parses it line by line. Unknown keywords or short
    /// lines are silently skipped; this loader favors forward compatibility
    /// over strict rejection.
    pub fn load<R: Read + Seek>(mut reader: R) -> Result<ResolvConf> {
        reader.seek(SeekFrom::Start(0))?;
        let mut conf = ResolvConf::default();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            Self::parse_line(&mut conf, &line);
        }
        Ok(conf)
    }

    fn parse_line(conf: &mut ResolvConf, raw: &str) {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            return;
        }
        let mut tokens = line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty());
        let Some(keyword) = tokens.next() else {
            return;
        };
        let rest: Vec<&str> = tokens.collect();
        match keyword {
            k if k.eq_ignore_ascii_case("nameserver") => {
                if let Some(tok) = rest.first() {
                    if conf.nameservers.len() < MAX_NAMESERVERS {
                        if let Some(addr) = parse_nameserver(tok) {
                            conf.nameservers.push(addr);
                        }
                    }
                }
            }
            k if k.eq_ignore_ascii_case("domain") || k.eq_ignore_ascii_case("search") => {
                conf.search = rest
                    .into_iter()
                    .take(MAX_SEARCH)
                    .map(name::anchor)
                    .collect();
            }
            k if k.eq_ignore_ascii_case("lookup") => {
                conf.lookup_order = rest
                    .into_iter()
                    .filter_map(|t| {
                        if t.eq_ignore_ascii_case("file") {
                            Some(LookupSource::File)
                        } else if t.eq_ignore_ascii_case("bind") {
                            Some(LookupSource::Bind)
                        } else {
                            None
                        }
                    })
                    .collect();
            }
            k if k.eq_ignore_ascii_case("options") => {
                for opt in rest {
                    if opt.eq_ignore_ascii_case("edns0") {
                        conf.options.edns0 = true;
                    } else if opt.eq_ignore_ascii_case("recursive") {
                        conf.options.recursive = true;
                    } else if let Some(digits) = opt
                        .strip_prefix("ndots:")
                        .or_else(|| opt.strip_prefix("NDOTS:"))
                    {
                        if let Ok(n) = digits.parse::<u8>() {
                            conf.options.ndots = n;
                        }
                    }
                }
            }
            k if k.eq_ignore_ascii_case("interface") => {
                if rest.len() >= 2 {
                    if let (Ok(ip), Ok(port)) = (rest[0].parse::<IpAddr>(), rest[1].parse::<u16>()) {
                        conf.bind_address = Some(SocketAddr::new(ip, port));
                    }
                }
            }
            _ => {}
        }
    }
}

fn strip_comment(line: &str) -> &str {
    let cut = line
        .find(|c| c == '#' || c == ';')
        .unwrap_or(line.len());
    &line[..cut]
}

fn parse_nameserver(tok: &str) -> Option<SocketAddr> {
    let ip: IpAddr = tok.parse().ok()?;
    Some(SocketAddr::new(ip, 53))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_worked_example_3() {
        let text = "nameserver 8.8.8.8\nnameserver 2001:4860:4860::8888\nsearch a.example b.example\noptions ndots:2\n";
        let conf = ResolvConf::load(Cursor::new(text.as_bytes())).unwrap();
        assert_eq!(conf.nameservers.len(), 2);
        assert!(conf.nameservers[0].is_ipv4());
        assert!(conf.nameservers[1].is_ipv6());
        assert_eq!(conf.nameservers[0].port(), 53);
        assert_eq!(conf.search, vec!["a.example.".to_owned(), "b.example.".to_owned()]);
        assert_eq!(conf.options.ndots, 2);
    }

    #[test]
    fn silently_drops_unknown_keywords_and_extra_nameservers() {
        let text = "bogus line\nnameserver 1.1.1.1\nnameserver 2.2.2.2\nnameserver 3.3.3.3\nnameserver 4.4.4.4\n";
        let conf = ResolvConf::load(Cursor::new(text.as_bytes())).unwrap();
        assert_eq!(conf.nameservers.len(), MAX_NAMESERVERS);
    }

    #[test]
    fn comments_are_stripped() {
        let text = "nameserver 9.9.9.9 # quad9\n";
        let conf = ResolvConf::load(Cursor::new(text.as_bytes())).unwrap();
        assert_eq!(conf.nameservers.len(), 1);
    }
}
