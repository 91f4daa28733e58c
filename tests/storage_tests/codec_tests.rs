//! Codec Tests
//!
//! Tests for partition encoding/decoding:
//! - Header layout and schema union
//! - Quoting of delimiters, quotes and line breaks
//! - Empty vs absent partitions
//! - Early exit on a row key
//! - Malformed images

use fstable::storage::codec::{decode, encode, schema, RecordReader, RecordWriter};
use fstable::{CellValue, Row};

fn text(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap()
}

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn test_schema_is_row_key_then_sorted_union() {
    let rows = [
        Row::new("p", "1").with("zeta", "z").with("alpha", "a"),
        Row::new("p", "2").with("mid", "m").with("alpha", "b"),
    ];

    assert_eq!(schema(rows.iter()), vec!["RowKey", "alpha", "mid", "zeta"]);
}

#[test]
fn test_encode_fills_absent_cells_with_empty_fields() {
    let rows = [
        Row::new("p", "1").with("A", "x"),
        Row::new("p", "2").with("B", "y"),
    ];

    let image = encode(rows.iter());

    assert_eq!(text(&image), "RowKey,A,B\n1,x,\n2,,y\n");
}

#[test]
fn test_encode_uses_canonical_forms() {
    let date = "2024-03-01T12:30:00Z".parse().unwrap();
    let row = Row::new("p", "1")
        .with("Count", 42)
        .with("Ratio", 0.25)
        .with("Flag", false)
        .with("When", CellValue::Date(date));

    let image = encode([&row]);

    assert_eq!(
        text(&image),
        "RowKey,Count,Flag,Ratio,When\n1,42,false,0.25,2024-03-01T12:30:00Z\n"
    );
}

#[test]
fn test_encode_quotes_special_fields() {
    let row = Row::new("p", "k,1")
        .with("A", "he said \"hi\"")
        .with("B", "two\nlines")
        .with("C", "plain");

    let image = encode([&row]);

    assert_eq!(
        text(&image),
        "RowKey,A,B,C\n\"k,1\",\"he said \"\"hi\"\"\",\"two\nlines\",plain\n"
    );
}

#[test]
fn test_encode_no_rows_is_header_only() {
    let image = encode(std::iter::empty());
    assert_eq!(text(&image), "RowKey\n");
}

#[test]
fn test_record_writer_quotes_lone_empty_field() {
    let mut writer = RecordWriter::new();
    writer.write_record(&["RowKey"]);
    writer.write_record(&[""]);
    assert_eq!(writer.record_count(), 2);

    let image = writer.finish();
    assert_eq!(text(&image), "RowKey\n\"\"\n");

    let records: Vec<Vec<String>> = RecordReader::new(text(&image))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records, vec![vec!["RowKey".to_string()], vec![String::new()]]);
}

// =============================================================================
// Decoding
// =============================================================================

#[test]
fn test_decode_round_trip_of_special_characters() {
    let values = [
        "comma, inside",
        "\"leading quote",
        "trailing quote\"",
        "multi\nline\r\nvalue",
        "   spaced   ",
        "ünïcödé ✓",
    ];
    let rows: Vec<Row> = values
        .iter()
        .enumerate()
        .map(|(i, v)| Row::new("p", format!("r{}", i)).with("V", *v))
        .collect();

    let image = encode(rows.iter());
    let decoded = decode(&image, "p", None).unwrap().unwrap();

    for (i, v) in values.iter().enumerate() {
        let row = &decoded[format!("r{}", i).as_str()];
        assert_eq!(row.text("V").as_deref(), Some(*v));
    }
}

#[test]
fn test_decode_yields_text_cells_and_drops_empty_fields() {
    let decoded = decode(b"RowKey,A,B\n1,42,\n", "p", None).unwrap().unwrap();

    let row = &decoded["1"];
    assert_eq!(row.partition_key(), "p");
    assert_eq!(row.get("A"), Some(&CellValue::Text("42".to_string())));
    assert_eq!(row.get("B"), None);
}

#[test]
fn test_decode_empty_image_is_absent_partition() {
    assert!(decode(b"", "p", None).unwrap().is_none());
    assert!(decode(b"\n\n", "p", None).unwrap().is_none());
}

#[test]
fn test_decode_header_only_is_empty_partition() {
    let partition = decode(b"RowKey,A\n", "p", None).unwrap().unwrap();
    assert!(partition.is_empty());
}

#[test]
fn test_decode_accepts_crlf_and_bom() {
    let image = "\u{feff}RowKey,A\r\n1,x\r\n2,y\r\n";
    let decoded = decode(image.as_bytes(), "p", None).unwrap().unwrap();

    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded["2"].text("A").as_deref(), Some("y"));
}

#[test]
fn test_decode_stops_after_requested_row_key() {
    // The ragged last record is never reached
    let image = b"RowKey,A\n1,a\n2,b\n3,c,extra\n";

    let decoded = decode(image, "p", Some("2")).unwrap().unwrap();

    assert_eq!(decoded.len(), 2);
    assert!(decoded.contains_key("2"));
    assert!(!decoded.contains_key("3"));
}

#[test]
fn test_decode_later_duplicate_overwrites_earlier() {
    let decoded = decode(b"RowKey,A\n1,old\n1,new\n", "p", None)
        .unwrap()
        .unwrap();

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded["1"].text("A").as_deref(), Some("new"));
}

// =============================================================================
// Malformed Images
// =============================================================================

#[test]
fn test_decode_ragged_record_is_format_error() {
    let short = decode(b"RowKey,A,B\n1,x\n", "p", None).unwrap_err();
    assert!(short.is_format());
    assert!(short.to_string().contains("line 2"));

    let long = decode(b"RowKey,A\n1,x\n2,y,z\n", "p", None).unwrap_err();
    assert!(long.is_format());
    assert!(long.to_string().contains("line 3"));
}

#[test]
fn test_decode_rejects_bad_quoting() {
    assert!(decode(b"RowKey,A\n1,\"open\n", "p", None)
        .unwrap_err()
        .is_format());
    assert!(decode(b"RowKey,A\n1,\"x\"y\n", "p", None)
        .unwrap_err()
        .is_format());
    assert!(decode(b"RowKey,A\n1,x\"y\n", "p", None)
        .unwrap_err()
        .is_format());
}

#[test]
fn test_decode_rejects_bad_header_and_encoding() {
    assert!(decode(b"Key,A\n1,x\n", "p", None).unwrap_err().is_format());
    assert!(decode(b"RowKey,A,A\n1,x,y\n", "p", None)
        .unwrap_err()
        .is_format());
    assert!(decode(&[0xff, 0xfe, b'\n'], "p", None)
        .unwrap_err()
        .is_format());
}
