//! Identity-key selection for lists of records.
//!
//! Records in metadata lists (fields, permissions, workflow states...) are
//! routinely reordered, inserted and removed, so they are paired across
//! versions by an identity field rather than by position. The key comes
//! from, in order:
//!
//! 1. the fixed mapping in [`DiffConfig::identity_keys`] for the parent field,
//! 2. `"name"` for a list that is the whole document,
//! 3. the first field shared by every record whose values are all present
//!    and distinct.
//!
//! The first two only apply when at least one record carries the field.
//! When nothing qualifies the caller compares items as opaque values.

use crate::diff::DiffConfig;
use crate::path::JsonPath;
use crate::tree::Node;
use std::collections::HashSet;

/// Identity field used for whole-document lists (fixtures, exported records).
pub const DOCUMENT_IDENTITY_KEY: &str = "name";

/// True when both sides together hold at least one item and every item is an object.
///
/// Lists mixing objects and scalars are treated as scalar lists.
pub fn is_record_list(base: &[Node], head: &[Node]) -> bool {
    let mut items = base.iter().chain(head.iter()).peekable();
    items.peek().is_some() && items.all(|item| matches!(item, Node::Object(_)))
}

/// Picks the field used to pair records of one list across base and head.
///
/// `parent` is the object key the list sits under, `None` for a root list.
pub fn identity_key(
    parent: Option<&str>,
    path: &JsonPath,
    base: &[Node],
    head: &[Node],
    config: &DiffConfig,
) -> Option<String> {
    let declared = match parent {
        Some(name) => config.identity_keys.get(name).map(String::as_str),
        None if path.is_root() => Some(DOCUMENT_IDENTITY_KEY),
        None => None,
    };

    if let Some(key) = declared {
        if base.iter().chain(head).any(|record| carries(record, key)) {
            return Some(key.to_string());
        }
        log::debug!("{}: no record carries {:?}, inferring identity", path, key);
    }

    let representative = if !base.is_empty() { base } else { head };
    infer_unique_key(representative)
}

fn carries(record: &Node, key: &str) -> bool {
    record
        .as_object()
        .and_then(|map| map.get(key))
        .is_some_and(|value| !value.is_null())
}

/// Returns the first field, in the first record's key order, that every
/// record carries with a distinct non-null value.
///
/// Several fields may qualify; the first one wins and no attempt is made to
/// rank them.
pub fn infer_unique_key(records: &[Node]) -> Option<String> {
    let maps: Vec<_> = records.iter().filter_map(Node::as_object).collect();
    if maps.is_empty() || maps.len() != records.len() {
        return None;
    }

    let candidates = maps[0]
        .keys()
        .filter(|key| maps.iter().all(|map| map.contains_key(*key)));

    for key in candidates {
        let distinct: HashSet<String> = maps
            .iter()
            .filter_map(|map| map.get(key))
            .filter(|value| !value.is_null())
            .map(Node::canonical)
            .collect();

        if distinct.len() == maps.len() {
            return Some(key.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_json;

    fn list(json: &str) -> Vec<Node> {
        match parse_json(json).unwrap() {
            Node::Array(items) => items,
            other => panic!("expected array, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_declared_parent_wins() {
        let config = DiffConfig::default();
        // "idx" is unique but "fields" always maps to "fieldname".
        let base = list(r#"[{"idx": 1, "fieldname": "a"}, {"idx": 2, "fieldname": "a"}]"#);
        let key = identity_key(
            Some("fields"),
            &JsonPath::root().key("fields"),
            &base,
            &[],
            &config,
        );
        assert_eq!(key.as_deref(), Some("fieldname"));
    }

    #[test]
    fn test_root_list_uses_name() {
        let config = DiffConfig::default();
        let base = list(r#"[{"doctype": "Custom Field", "name": "Task-x"}]"#);
        let key = identity_key(None, &JsonPath::root(), &base, &base, &config);
        assert_eq!(key.as_deref(), Some("name"));
    }

    #[test]
    fn test_declared_key_missing_everywhere_is_inferred() {
        let config = DiffConfig::default();
        let base = list(r#"[{"link_doctype": "A", "link_fieldname": "x"}, {"link_doctype": "B", "link_fieldname": "x"}]"#);
        let key = identity_key(
            Some("links"),
            &JsonPath::root().key("links"),
            &base,
            &[],
            &config,
        );
        assert_eq!(key.as_deref(), Some("link_doctype"));
    }

    #[test]
    fn test_root_list_without_name_is_inferred() {
        let config = DiffConfig::default();
        let base = list(r#"[{"role": "A"}, {"role": "B"}]"#);
        let key = identity_key(None, &JsonPath::root(), &base, &base, &config);
        assert_eq!(key.as_deref(), Some("role"));
    }

    #[test]
    fn test_infers_first_unique_key() {
        let records = list(r#"[{"kind": "a", "code": 1}, {"kind": "a", "code": 2}]"#);
        assert_eq!(infer_unique_key(&records).as_deref(), Some("code"));
    }

    #[test]
    fn test_first_qualifying_key_in_record_order() {
        let records = list(r#"[{"b": 1, "a": 1}, {"b": 2, "a": 2}]"#);
        assert_eq!(infer_unique_key(&records).as_deref(), Some("b"));
    }

    #[test]
    fn test_key_missing_from_one_record_is_not_a_candidate() {
        let records = list(r#"[{"id": 1, "v": "x"}, {"v": "y"}]"#);
        assert_eq!(infer_unique_key(&records).as_deref(), Some("v"));
    }

    #[test]
    fn test_null_values_disqualify() {
        let records = list(r#"[{"id": null}, {"id": 2}]"#);
        assert_eq!(infer_unique_key(&records), None);
    }

    #[test]
    fn test_no_unique_key() {
        let records = list(r#"[{"role": "A", "read": 1}, {"role": "A", "read": 1}]"#);
        assert_eq!(infer_unique_key(&records), None);
    }

    #[test]
    fn test_representative_falls_back_to_head() {
        let config = DiffConfig::default();
        let head = list(r#"[{"code": "x"}, {"code": "y"}]"#);
        let path = JsonPath::root().key("items");
        let key = identity_key(Some("items"), &path, &[], &head, &config);
        assert_eq!(key.as_deref(), Some("code"));
    }

    #[test]
    fn test_mixed_list_is_not_record_list() {
        let base = list(r#"[{"a": 1}, 2]"#);
        assert!(!is_record_list(&base, &[]));
        assert!(is_record_list(&list(r#"[{"a": 1}]"#), &[]));
        assert!(!is_record_list(&[], &[]));
    }
}
