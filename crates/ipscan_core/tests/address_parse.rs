use ipscan_core::{
    classify, format_for_display, is_valid, parse, AddressBatch, AddressKind, SAMPLE_ADDRESSES,
};
use pretty_assertions::assert_eq;

#[test]
fn accepts_host_literals() {
    for token in [
        "192.168.1.1",
        "0.0.0.0",
        "255.255.255.255",
        "010.001.1.1",
        "::1",
        "::",
        "2001:4860:4860::8888",
        "2001:db8::1",
        "fe80::",
        "1:2:3:4:5:6:7:8",
        "1:2:3:4:5:6:7::",
        "::ffff:192.168.1.1",
        "::FFFF:10.0.0.1",
        "ABCD:ef01::",
    ] {
        assert!(is_valid(token), "{token} should be accepted");
    }
}

#[test]
fn rejects_other_shapes() {
    for token in [
        "256.1.1.1",
        "192.168.1",
        "1.2.3.4.5",
        "1.2.3.0001",
        "not-an-ip",
        "example.com",
        "10.0.0.0/8",
        "2001:db8:::1",
        "1::2::3",
        "1:2:3:4:5:6:7:8:9",
        "1:2:3:4:5:6:7",
        "1:2:3:4:5:6:7:8::",
        "12345::1",
        "::ffff:1.2.3",
        "::ffff:256.0.0.1",
        "64:ff9b::1.2.3.4",
        ":1:2:3:4:5:6:7",
        "",
    ] {
        assert!(!is_valid(token), "{token:?} should be rejected");
    }
}

#[test]
fn classify_distinguishes_shapes() {
    assert_eq!(classify("8.8.8.8"), Some(AddressKind::V4));
    assert_eq!(classify("2001:db8::1"), Some(AddressKind::V6));
    assert_eq!(classify("::ffff:8.8.8.8"), Some(AddressKind::MappedV4));
    assert_eq!(classify("::ffff:abcd"), Some(AddressKind::V6));
    assert_eq!(classify("nope"), None);
}

#[test]
fn parse_splits_dedupes_and_keeps_first_seen_order() {
    let parsed = parse("101.133.148.169\n103.203.56.1, 103.203.57.3\n::1 ::1");
    assert_eq!(
        parsed,
        vec!["101.133.148.169", "103.203.56.1", "103.203.57.3", "::1"]
    );
}

#[test]
fn parse_accepts_every_separator_and_drops_junk() {
    let parsed = parse("  1.1.1.1;2.2.2.2|3.3.3.3\t\r\n\n garbage, 999.1.1.1 ,,, 2.2.2.2 ");
    assert_eq!(parsed, vec!["1.1.1.1", "2.2.2.2", "3.3.3.3"]);
}

#[test]
fn parse_of_nothing_valid_is_empty() {
    assert!(parse("").is_empty());
    assert!(parse(" \n\t ").is_empty());
    assert!(parse("foo bar 300.300.300.300").is_empty());
}

#[test]
fn dedup_is_exact_string_equality() {
    // Different spellings of one address stay distinct.
    let parsed = parse("::1 0:0:0:0:0:0:0:1 ::1");
    assert_eq!(parsed, vec!["::1", "0:0:0:0:0:0:0:1"]);
}

#[test]
fn reparsing_joined_output_is_stable() {
    for text in [
        SAMPLE_ADDRESSES,
        "1.1.1.1 1.1.1.1|2.2.2.2 junk ::1",
        "",
        "a;b;c",
    ] {
        let once = parse(text);
        let twice = parse(&once.join("\n"));
        assert_eq!(once, twice);
    }
}

#[test]
fn sample_batch_counts_families() {
    let batch = AddressBatch::from_text(SAMPLE_ADDRESSES);
    assert_eq!(batch.len(), 13);
    assert_eq!(batch.ipv4, 8);
    assert_eq!(batch.ipv6, 5);
    assert_eq!(AddressBatch::from_text(&batch.to_text()), batch);
}

#[test]
fn long_ipv6_is_shortened_for_display() {
    assert_eq!(
        format_for_display("2001:0db8:85a3:0000:0000:8a2e:0370:7334"),
        "2001:0db8:85a3:00..."
    );
    assert_eq!(format_for_display("2001:4860:4860::8888"), "2001:4860:4860::8888");
    assert_eq!(format_for_display("101.133.148.169"), "101.133.148.169");
}
