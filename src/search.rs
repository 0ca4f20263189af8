//! Search-list generator: a three-phase, state-passing state machine that
//! synthesizes candidate FQDNs from a query name, the configured search
//! suffixes, and the `ndots` policy. No repo in the pack builds this either;
//! grounded directly in §4.4's algorithm and the classic resolver it mirrors.

use crate::name;
use crate::resolvconf::ResolvConf;

const PHASE_ENTRY: u8 = 0;
const PHASE_ITERATE: u8 = 1;
const PHASE_FINAL: u8 = 2;
const PHASE_DONE: u8 = 3;

/// A caller-opaque token threaded through successive [`search`] calls.
/// Initial value is `Default::default()` (encodes to zero); the caller must
/// not inspect or construct one by hand.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchState(u64);

impl SearchState {
    fn encode(phase: u8, srchi: u8, ndots: u8) -> SearchState {
        SearchState((phase as u64) | ((srchi as u64) << 8) | ((ndots as u64) << 16))
    }

    fn decode(self) -> (u8, u8, u8) {
        let phase = (self.0 & 0xff) as u8;
        let srchi = ((self.0 >> 8) & 0xff) as u8;
        let ndots = ((self.0 >> 16) & 0xff) as u8;
        (phase, srchi, ndots)
    }
}

/// Produces the next candidate FQDN, or `None` once every phase is
/// exhausted. The caller must call again with the returned state until it
/// yields `None` to enumerate all candidates.
///
/// - Phase 0 (entry): if `qname` already has at least `options.ndots` dots,
///   it is emitted anchored as the first candidate before the search list is
///   tried; otherwise the search list is tried first.
/// - Phase 1: `qname + "." + search[i]` for each configured suffix.
/// - Phase 2: if `qname` had fewer than `options.ndots` dots, it is emitted
///   anchored one last time.
pub fn search(qname: &str, resconf: &ResolvConf, state: SearchState) -> (Option<String>, SearchState) {
    let (phase, mut srchi, mut ndots) = state.decode();

    if phase == PHASE_DONE {
        return (None, state);
    }

    if phase == PHASE_ENTRY {
        ndots = qname.matches('.').count().min(u8::MAX as usize) as u8;
        if ndots >= resconf.options.ndots {
            return (
                Some(name::anchor(qname)),
                SearchState::encode(PHASE_ITERATE, 0, ndots),
            );
        }
        srchi = 0;
    }

    if phase == PHASE_ENTRY || phase == PHASE_ITERATE {
        if (srchi as usize) < resconf.search.len() {
            let candidate = format!("{}.{}", strip_trailing_dot(qname), resconf.search[srchi as usize]);
            let next_srchi = srchi + 1;
            let next_phase = if (next_srchi as usize) < resconf.search.len() {
                PHASE_ITERATE
            } else {
                PHASE_FINAL
            };
            return (Some(candidate), SearchState::encode(next_phase, next_srchi, ndots));
        }
    }

    if ndots < resconf.options.ndots {
        return (Some(name::anchor(qname)), SearchState::encode(PHASE_DONE, 0, ndots));
    }
    (None, SearchState::encode(PHASE_DONE, 0, ndots))
}

fn strip_trailing_dot(s: &str) -> &str {
    s.strip_suffix('.').unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvconf::ResolvOptions;

    fn conf(ndots: u8, search: &[&str]) -> ResolvConf {
        ResolvConf {
            nameservers: Vec::new(),
            search: search.iter().map(|s| name::anchor(s)).collect(),
            lookup_order: Vec::new(),
            options: ResolvOptions {
                edns0: false,
                ndots,
                recursive: false,
            },
            bind_address: None,
        }
    }

    fn collect_all(qname: &str, resconf: &ResolvConf) -> Vec<String> {
        let mut out = Vec::new();
        let mut state = SearchState::default();
        loop {
            let (candidate, next) = search(qname, resconf, state);
            match candidate {
                Some(c) => out.push(c),
                None => break,
            }
            state = next;
        }
        out
    }

    #[test]
    fn scenario_4_low_dot_count() {
        let resconf = conf(2, &["a.example", "b.example"]);
        let got = collect_all("host", &resconf);
        assert_eq!(
            got,
            vec!["host.a.example.".to_owned(), "host.b.example.".to_owned(), "host.".to_owned()]
        );
    }

    #[test]
    fn scenario_5_high_dot_count() {
        let resconf = conf(2, &["a.example", "b.example"]);
        let got = collect_all("a.b.c", &resconf);
        assert_eq!(
            got,
            vec![
                "a.b.c.".to_owned(),
                "a.b.c.a.example.".to_owned(),
                "a.b.c.b.example.".to_owned(),
            ]
        );
    }

    #[test]
    fn empty_search_list_still_terminates() {
        let resconf = conf(1, &[]);
        let got = collect_all("host", &resconf);
        assert_eq!(got, vec!["host.".to_owned()]);
    }
}
