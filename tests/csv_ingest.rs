//! CSV text to table objects.

use colrt::csv::{self, CsvOptions, CsvRowReader};
use colrt::kind::Kind;
use colrt::object::{ErrorCode, live_count, table};
use colrt::{ObjRef, Session, SessionConfig};

fn cell(t: &ObjRef, column: &str, row: i64) -> Option<String> {
    table::column(t, column).get(row).as_text()
}

#[test]
fn test_two_rows_of_text() {
    let t = csv::parse(b"a,b\n1,2\n3,4\n");
    assert_eq!(t.kind(), Kind::Table);
    assert_eq!(table::keys(&t).len(), 2);
    assert_eq!(table::keys(&t).get(0).as_text().as_deref(), Some("a"));
    assert_eq!(table::row_count(&t), 2);

    for (column, expected) in [("a", ["1", "3"]), ("b", ["2", "4"])] {
        for (row, text) in expected.iter().enumerate() {
            let value = table::column(&t, column).get(row as i64);
            assert_eq!(value.kind(), Kind::Char);
            assert_eq!(value.as_text().as_deref(), Some(*text));
        }
    }
}

#[test]
fn test_header_only() {
    let t = csv::parse(b"a,b\n");
    assert_eq!(t.kind(), Kind::Table);
    assert_eq!(table::keys(&t).len(), 2);
    assert_eq!(table::row_count(&t), 0);
}

#[test]
fn test_empty_input_is_error() {
    let err = csv::parse(b"");
    assert!(err.is_error());
    assert_eq!(err.error_message(), "CSV length is zero or negative");
}

#[test]
fn test_quoted_field_keeps_separator() {
    let t = csv::parse(b"name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n");
    assert_eq!(table::row_count(&t), 1);
    assert_eq!(cell(&t, "name", 0).as_deref(), Some("Smith, J"));
    assert_eq!(cell(&t, "note", 0).as_deref(), Some("said \"hi\""));
}

#[test]
fn test_crlf_and_trimmed_header() {
    let t = csv::parse(b" a , b \r\n1,2\r\n");
    assert_eq!(cell(&t, "a", 0).as_deref(), Some("1"));
    assert_eq!(cell(&t, "b", 0).as_deref(), Some("2"));
}

#[test]
fn test_short_row_is_padded() {
    let t = csv::parse(b"a,b,c\n1\n");
    assert_eq!(cell(&t, "c", 0).as_deref(), Some(""));
}

#[test]
fn test_failure_releases_partial_columns() {
    let before = live_count();
    let err = csv::parse(b"a,b\n1,2\n1,2,3\n");
    assert_eq!(err.error_code(), Some(ErrorCode::User));
    assert_eq!(err.error_message(), "CSV line 3: expected 2 fields, found 3");
    drop(err);
    assert_eq!(live_count(), before);
}

#[test]
fn test_size_limit() {
    let options = CsvOptions { max_bytes: 4, ..CsvOptions::default() };
    let result = csv::read_csv(b"a,b\n1,2\n", &options, &CsvRowReader);
    assert!(result.is_err());
}

#[test]
fn test_session_separator() {
    let config = SessionConfig::builder().csv_separator(b'\t').build().unwrap();
    let session = Session::with_config(config);
    let t = session.parse_csv(b"x\ty\n1\t2\n");
    assert_eq!(cell(&t, "y", 0).as_deref(), Some("2"));
}
