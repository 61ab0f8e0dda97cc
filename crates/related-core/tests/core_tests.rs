use std::fs;
use tempfile::TempDir;

use related_core::error::Error;
use related_core::input::{load_corpus, parse_corpus, RecordFormat};
use related_core::output::{render_mapping, write_mapping, write_mapping_to_path};
use related_core::types::{Corpus, DocId, Document, NeighborEntry, NeighborMapping};

#[test]
fn load_json_array_preserves_order_and_ids() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("input.json");
    fs::write(
        &path,
        r#"[
            {"id": 1, "title": "A", "categories": ["x"]},
            {"id": "post-2", "title": "B", "categories": ["x", "x", "z"], "url": "ignored"},
            {"id": 3, "title": "C", "categories": "y"}
        ]"#,
    )
    .unwrap();

    let corpus = load_corpus(&path).expect("load");
    let ids: Vec<&str> = corpus.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["1", "post-2", "3"]);
    assert_eq!(corpus[1].categories.len(), 2, "duplicate labels collapse");
    assert!(corpus[2].categories.contains("y"), "bare string is a single category");
}

#[test]
fn load_json_lines_skips_blank_lines() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("input.jsonl");
    fs::write(
        &path,
        "{\"id\": 1, \"title\": \"A\", \"categories\": [\"x\"]}\n\n{\"id\": 2, \"title\": \"B\", \"categories\": []}\n",
    )
    .unwrap();

    let corpus = load_corpus(&path).expect("load");
    assert_eq!(corpus.len(), 2);
    assert!(corpus[1].categories.is_empty());
}

#[test]
fn missing_field_is_input_format_error() {
    let err = parse_corpus(r#"[{"id": 1, "categories": ["x"]}]"#, RecordFormat::JsonArray).unwrap_err();
    match err {
        Error::InputFormat(msg) => assert!(msg.contains("title"), "message names the field: {msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wrongly_typed_fields_are_rejected() {
    let bad_categories = r#"[{"id": 1, "title": "A", "categories": [1, 2]}]"#;
    assert!(matches!(parse_corpus(bad_categories, RecordFormat::JsonArray), Err(Error::InputFormat(_))));

    let null_id = r#"[{"id": null, "title": "A", "categories": ["x"]}]"#;
    assert!(matches!(parse_corpus(null_id, RecordFormat::JsonArray), Err(Error::InputFormat(_))));

    let not_array = r#"{"id": 1, "title": "A", "categories": ["x"]}"#;
    assert!(matches!(parse_corpus(not_array, RecordFormat::JsonArray), Err(Error::InputFormat(_))));
}

#[test]
fn duplicate_ids_are_rejected() {
    let docs = vec![Document::new("1", "A", ["x"]), Document::new("1", "B", ["x"])];
    assert!(matches!(Corpus::new(docs), Err(Error::InputFormat(_))));
}

#[test]
fn format_detection_by_extension() {
    assert_eq!(RecordFormat::from_path("a.JSONL".as_ref()), RecordFormat::JsonLines);
    assert_eq!(RecordFormat::from_path("a.ndjson".as_ref()), RecordFormat::JsonLines);
    assert_eq!(RecordFormat::from_path("a.json".as_ref()), RecordFormat::JsonArray);
    assert_eq!(RecordFormat::from_path("input".as_ref()), RecordFormat::JsonArray);
}

fn mapping() -> NeighborMapping {
    NeighborMapping {
        entries: vec![
            NeighborEntry { source_id: DocId::from("1"), neighbor_ids: vec![DocId::from("2"), DocId::from("5")] },
            NeighborEntry { source_id: DocId::from("3"), neighbor_ids: vec![] },
        ],
        warnings: vec![],
    }
}

#[test]
fn output_lines_have_no_trailing_comma() {
    assert_eq!(render_mapping(&mapping()), "1 => 2,5\n3 => \n");

    let mut buf = Vec::new();
    write_mapping(&mapping(), &mut buf).expect("write");
    assert_eq!(String::from_utf8(buf).unwrap(), "1 => 2,5\n3 => \n");
}

#[test]
fn output_to_missing_directory_is_output_write_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("no-such-dir").join("out.txt");
    assert!(matches!(write_mapping_to_path(&mapping(), &path), Err(Error::OutputWrite(_))));
}
