use super::*;

#[derive(serde::Serialize)]
struct Item {
    name: String,
}

#[test]
fn format_or_json_renders_json_when_requested() {
    format_or_json(OutputFormat::Json, &serde_json::json!({"a": 1}), || panic!("text path should not run"))
        .unwrap();
}

#[test]
fn format_or_json_calls_text_fn_for_text_format() {
    let mut called = false;
    format_or_json(OutputFormat::Text, &serde_json::json!({}), || called = true).unwrap();
    assert!(called);
}

#[test]
fn handle_list_prints_empty_message_for_an_empty_text_list() {
    let items: Vec<Item> = vec![];
    handle_list(OutputFormat::Text, &items, "nothing here", |_, _| panic!("should not render")).unwrap();
}

#[test]
fn handle_list_renders_text_for_non_empty_list() {
    let items = vec![Item { name: "svc-a".to_string() }];
    let mut rendered = false;
    handle_list(OutputFormat::Text, &items, "nothing here", |rows, _| {
        assert_eq!(rows.len(), 1);
        rendered = true;
    })
    .unwrap();
    assert!(rendered);
}
