use frappe_diff::{parse_json, JsonPath, Node, Segment};

#[test]
fn test_semantic_equals_ignores_key_order() {
    let a = parse_json(r#"{"fieldname": "a", "reqd": 1}"#).unwrap();
    let b = parse_json(r#"{"reqd": 1, "fieldname": "a"}"#).unwrap();
    assert!(a.semantic_equals(&b));
    assert_eq!(a.canonical(), b.canonical());
}

#[test]
fn test_semantic_equals_list_order_matters() {
    let a = parse_json("[1, 2]").unwrap();
    let b = parse_json("[2, 1]").unwrap();
    assert!(!a.semantic_equals(&b));
}

#[test]
fn test_integer_and_float_literals_match() {
    let a = parse_json("1").unwrap();
    let b = parse_json("1.0").unwrap();
    assert!(a.semantic_equals(&b));
    assert_eq!(a.canonical(), b.canonical());
}

#[test]
fn test_type_names() {
    assert_eq!(Node::Null.type_name(), "null");
    assert_eq!(Node::Bool(false).type_name(), "boolean");
    assert_eq!(parse_json("[]").unwrap().type_name(), "array");
    assert_eq!(parse_json("{}").unwrap().type_name(), "object");
}

#[test]
fn test_to_json_keeps_key_order() {
    let node = parse_json(r#"{"z": 1, "a": [true, null]}"#).unwrap();
    assert_eq!(node.to_json().to_string(), r#"{"z":1,"a":[true,null]}"#);
}

#[test]
fn test_record_preview() {
    let node = parse_json(r#"{"fieldname": "a", "label": "A long label"}"#).unwrap();
    assert_eq!(node.preview(200), r#"{"fieldname":"a","label":"A long label"}"#);
    assert_eq!(node.preview(16), r#"{"fieldname":..."#);
}

#[test]
fn test_json_path_building() {
    let mut path = JsonPath::root().key("fields");
    path.push(Segment::Index(4));
    assert_eq!(path.to_string(), "/fields/4");
    assert_eq!(path.pop(), Some(Segment::Index(4)));
    assert_eq!(path, JsonPath::root().key("fields"));
}
