use lamina_types::{Row, Value, row};

#[test]
fn test_row_json_round_trip() -> anyhow::Result<()> {
    let original = row! { "id" => 1, "name" => "a" };
    let line = serde_json::to_string(&original)?;
    let reparsed: Row = serde_json::from_str(&line)?;
    assert_eq!(reparsed, original);
    Ok(())
}

#[test]
fn test_row_from_nested_json() -> anyhow::Result<()> {
    let row: Row = serde_json::from_str(r#"{"id": 7, "tags": ["a", "b"], "meta": {"x": 1.5}}"#)?;
    let names: Vec<_> = row.field_names().collect();
    assert_eq!(names, vec!["id", "tags", "meta"]);
    assert_eq!(row.lookup("meta.x"), Some(&Value::Float(1.5)));
    assert_eq!(row.lookup("tags.0"), Some(&Value::from("a")));
    Ok(())
}
