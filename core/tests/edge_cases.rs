//! End-to-end scenarios against the public façade: the six behaviors a
//! conformant streaming reader must get right, plus the chunk-boundary
//! regression this family of readers has historically gotten wrong.

use std::io::Cursor;

use streamjson_core::{ReaderConfig, StreamReader, Value};

#[test]
fn object_with_array_member_reports_single_top_level_item() {
    let mut reader = StreamReader::from_str(r#"{"users": [1, 2, 3], "count": 3}"#).unwrap();
    let value = reader.read_all().unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.get("count"), Some(&Value::Integer(3)));
    assert_eq!(reader.items_processed(), 1);
}

#[test]
fn array_iteration_reports_index_and_bounded_depth() {
    let mut reader = StreamReader::from_str("[1, 2, [3, 4], 5]").unwrap();
    let mut arr = reader.array().unwrap();
    let values = arr.to_array().unwrap();
    assert_eq!(
        values,
        vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Array(vec![Value::Integer(3), Value::Integer(4)]),
            Value::Integer(5),
        ]
    );
    assert_eq!(arr.index(), 4);
}

#[test]
fn wildcard_selector_streams_without_materializing_outer_array() {
    let mut reader = StreamReader::from_str(
        r#"{"Ads": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}, {"id": 3, "title": "c"}]}"#,
    )
    .unwrap();
    let matches = reader.read_all_matches("$.Ads[*]").unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[1].as_object().unwrap().get("id"), Some(&Value::Integer(2)));
}

#[test]
fn bounded_index_selector_terminates_after_target_element() {
    let mut reader = StreamReader::from_str(r#"{"items": [10, 20, 30, 40, 50]}"#).unwrap();
    let matches = reader.read_all_matches("$.items[2]").unwrap();
    assert_eq!(matches, vec![Value::Integer(30)]);
}

#[test]
fn negative_index_selector_falls_back_to_full_materialization() {
    let mut reader = StreamReader::from_str(r#"{"items": [10, 20, 30, 40, 50]}"#).unwrap();
    let matches = reader.read_all_matches("$.items[-1]").unwrap();
    assert_eq!(matches, vec![Value::Integer(50)]);
}

#[test]
fn slice_selector_with_trailing_property_streams_projected_values() {
    let mut reader = StreamReader::from_str(
        r#"{"items": [{"v": "a"}, {"v": "b"}, {"v": "c"}, {"v": "d"}]}"#,
    )
    .unwrap();
    let matches = reader.read_all_matches("$.items[0:2].v").unwrap();
    assert_eq!(matches, vec![Value::String("a".into()), Value::String("b".into())]);
}

#[test]
fn truncated_input_fails_with_nonzero_line_and_column() {
    let mut reader = StreamReader::from_str(r#"{"a": [1, 2"#).unwrap();
    let err = reader.read_all().unwrap_err();
    let position = err.position().expect("parse errors carry a position");
    assert!(position.line >= 1);
    assert!(position.column >= 1);
}

#[test]
fn large_array_with_comma_at_buffer_boundary_parses_correctly() {
    // Forces the separator between two elements to land exactly at the
    // first buffer refill, exercising the peek-across-refill contract at
    // the façade level rather than directly against ByteSource.
    let buffer_size = 1024;
    let body = "1,".repeat(600);
    let input = format!("[{body}1]");
    let config = ReaderConfig::new().with_buffer_size(buffer_size);
    let mut reader = StreamReader::with_config(Cursor::new(input.into_bytes()), config).unwrap();
    let value = reader.read_all().unwrap();
    assert_eq!(value.as_array().unwrap().len(), 601);
}

#[test]
fn depth_exactly_at_configured_limit_succeeds() {
    let config = ReaderConfig::new().with_max_depth(3);
    let input = "[".repeat(3) + "1" + &"]".repeat(3);
    let mut reader = StreamReader::with_config(Cursor::new(input.into_bytes()), config).unwrap();
    assert!(reader.read_all().is_ok());
}

#[test]
fn depth_one_past_configured_limit_fails_with_clear_message() {
    let config = ReaderConfig::new().with_max_depth(3);
    let input = "[".repeat(4) + "1" + &"]".repeat(4);
    let mut reader = StreamReader::with_config(Cursor::new(input.into_bytes()), config).unwrap();
    let err = reader.read_all().unwrap_err();
    assert!(err.to_string().contains("Maximum nesting depth exceeded"));
}

#[test]
fn round_trip_preserves_structural_equality_across_value_kinds() {
    let input = r#"{"s": "text", "n": 42, "f": 3.5, "b": true, "nil": null, "a": [1, 2]}"#;
    let mut reader = StreamReader::from_str(input).unwrap();
    let value = reader.read_all().unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.get("s"), Some(&Value::String("text".into())));
    assert_eq!(obj.get("n"), Some(&Value::Integer(42)));
    assert_eq!(obj.get("f"), Some(&Value::Float(3.5)));
    assert_eq!(obj.get("b"), Some(&Value::Bool(true)));
    assert_eq!(obj.get("nil"), Some(&Value::Null));
}

#[test]
fn object_iterator_has_advances_stream_until_key_found() {
    let mut reader = StreamReader::from_str(r#"{"a": 1, "b": 2, "c": 3}"#).unwrap();
    let mut obj = reader.object().unwrap();
    assert!(obj.has("b").unwrap());
}

#[test]
fn reconfigure_transfers_ownership_to_a_fresh_reader() {
    let reader = StreamReader::from_str("[1, 2, 3]").unwrap();
    let mut reconfigured = reader.reconfigure(ReaderConfig::new().with_max_depth(8)).unwrap();
    assert_eq!(reconfigured.config().max_depth(), 8);
    let value = reconfigured.read_all().unwrap();
    assert_eq!(value.as_array().unwrap().len(), 3);
}

#[test]
fn reset_allows_rereading_a_seekable_stream() {
    let mut reader = StreamReader::from_str(r#"{"a": 1}"#).unwrap();
    let first = reader.read_all().unwrap();
    reader.reset().unwrap();
    let second = reader.read_all().unwrap();
    assert_eq!(first, second);
}
