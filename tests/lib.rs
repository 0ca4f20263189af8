extern crate dnshints;

use std::io::Cursor;
use std::net::Ipv4Addr;

use anyhow::Context;

use dnshints::constants::{Class, Section, Type};
use dnshints::hints::{HintsIterState, HintsTable, RandomSource};
use dnshints::packet::{Filter, GrepState, Packet};
use dnshints::resolvconf::ResolvConf;
use dnshints::rr::RecordData;
use dnshints::search::{search, SearchState};

struct FixedSource(usize);
impl RandomSource for FixedSource {
    fn gen_range(&self, upper: usize) -> usize {
        self.0 % upper
    }
}

#[test]
fn builds_a_response_and_greps_it_back() {
    let mut p = Packet::new(512);
    p.push(Section::Question, "www.example.com.", Type::A.into(), Class::IN.into(), 0, None)
        .unwrap();
    p.push(
        Section::Answer,
        "www.example.com.",
        Type::A.into(),
        Class::IN.into(),
        300,
        Some(&RecordData::A(Ipv4Addr::new(93, 184, 216, 34))),
    )
    .unwrap();

    let filter = Filter {
        rr_type: Some(Type::A.into()),
        ..Filter::default()
    };
    let (records, state) = p.grep(&filter, GrepState::new(), 10).unwrap();
    assert!(state.is_done());
    assert_eq!(records.len(), 2);

    let answer = records[1];
    let rdata = RecordData::parse(answer.rr_type, p.bytes(), answer.rd_offset, answer.rd_len).unwrap();
    assert_eq!(rdata, RecordData::A(Ipv4Addr::new(93, 184, 216, 34)));
}

#[test]
fn resolvconf_drives_the_search_list() -> anyhow::Result<()> {
    let text = "domain example.com\nsearch a.example b.example\noptions ndots:2\nnameserver 8.8.8.8\n";
    let resconf = ResolvConf::load(Cursor::new(text.as_bytes())).context("loading resolv.conf")?;

    let mut out = Vec::new();
    let mut state = SearchState::default();
    loop {
        let (candidate, next) = search("host", &resconf, state);
        match candidate {
            Some(c) => out.push(c),
            None => break,
        }
        state = next;
    }
    assert_eq!(
        out,
        vec!["host.a.example.".to_owned(), "host.b.example.".to_owned(), "host.".to_owned()]
    );

    // fold the resolved candidate straight into a question packet, so a
    // resolv.conf parse error and a packet-build error would surface through
    // the same chained context.
    let mut p = Packet::new(512);
    p.push(Section::Question, &out[0], Type::A.into(), Class::IN.into(), 0, None)
        .context("building the question packet for the first search candidate")?;
    assert_eq!(p.qdcount(), 1);
    Ok(())
}

#[test]
fn hints_table_demotes_and_recovers_across_a_clock_advance() {
    use dnshints::clock::ManualClock;
    use std::net::SocketAddr;

    // captures the `tracing::debug!` points in the penalty/recovery path below.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let table = HintsTable::new(FixedSource(0), ManualClock::new(0));
    let primary: SocketAddr = "192.0.2.1:53".parse().unwrap();
    let backup: SocketAddr = "192.0.2.2:53".parse().unwrap();
    table.insert("example.com.", primary, 1);
    table.insert("example.com.", backup, 2);

    table.update("example.com.", primary, -1);
    let (first, _) = table.next("example.com.", HintsIterState::new());
    assert_eq!(first, Some(backup));

    table.clock().advance(10);
    let (second, _) = table.next("example.com.", HintsIterState::new());
    assert_eq!(second, Some(primary));
}
