//! Core structural diff algorithm.
//!
//! This module compares two value trees and reports additions, removals and
//! modifications as a stream of [`Change`]s pushed to a [`DiffSink`]. It is
//! tuned for Frappe metadata:
//!
//! - objects are compared key by key in base order;
//! - lists of records are paired by an identity field (see [`crate::matcher`])
//!   instead of by position, and whole records are reported when they appear
//!   or disappear;
//! - lists of scalars are compared as sets;
//! - fields that hold JSON text (print-format layouts) are parsed and diffed
//!   as nested documents;
//! - bookkeeping fields such as `modified` are never reported as modified.
//!
//! # Examples
//!
//! ```
//! use frappe_diff::{compute_diff, parse_json, ChangeType, DiffConfig};
//!
//! let base = parse_json(r#"{"fields": [{"fieldname": "a", "label": "X"}]}"#).unwrap();
//! let head = parse_json(r#"{"fields": [{"fieldname": "a", "label": "Y"}]}"#).unwrap();
//!
//! let diff = compute_diff(&base, &head, &DiffConfig::default());
//!
//! assert_eq!(diff.stats.modified, 1);
//! assert_eq!(diff.changes[0].change_type, ChangeType::Modified);
//! assert_eq!(diff.changes[0].path().to_string(), "/fields/0/label");
//! ```

use crate::locator::{LocationKind, SourceLocator};
use crate::matcher::{identity_key, is_record_list};
use crate::parser::{parse_json, Document};
use crate::path::{JsonPath, Segment};
use crate::tree::Node;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Identity field per parent list name.
pub const DEFAULT_IDENTITY_KEYS: &[(&str, &str)] = &[
    ("custom_fields", "fieldname"),
    ("fields", "fieldname"),
    ("actions", "label"),
    ("links", "link_to"),
    ("property_setters", "name"),
    ("custom_perms", "role"),
    ("permissions", "role"),
    ("roles", "role"),
    ("states", "state"),
    ("transitions", "state"),
];

/// Fields rewritten on every save; their modification is noise.
pub const DEFAULT_IGNORED_FIELDS: &[&str] = &["modified", "modified_by", "creation"];

/// Fields whose string value is itself a JSON document.
pub const DEFAULT_NESTED_JSON_FIELDS: &[&str] = &["format_data"];

/// The type of change that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Present in head only
    Added,
    /// Present in base only
    Removed,
    /// Present in both with different values
    Modified,
}

/// A single change in the diff.
///
/// Base and head paths are tracked separately because paired records can sit
/// at different indices on each side.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub change_type: ChangeType,
    /// Location in the base document (None for Added changes)
    pub base_path: Option<JsonPath>,
    /// Location in the head document (None for Removed changes)
    pub head_path: Option<JsonPath>,
    /// Human labels of the enclosing groups: object keys, and record
    /// identities for paired list records.
    pub trail: Vec<String>,
    /// Label of the changed member: its key, the record identity, or the
    /// element itself for scalar list items.
    pub key: String,
    pub base_value: Option<Node>,
    pub head_value: Option<Node>,
    pub base_line: Option<usize>,
    pub head_line: Option<usize>,
    /// Identity field when the change is a whole-record bundle.
    pub identity: Option<String>,
}

impl Change {
    /// The base path when present, otherwise the head path.
    pub fn path(&self) -> &JsonPath {
        self.base_path
            .as_ref()
            .or(self.head_path.as_ref())
            .unwrap_or(&ROOT)
    }

    /// True for whole records added to or removed from a list.
    pub fn is_record(&self) -> bool {
        self.identity.is_some()
    }

    /// True for scalar list elements, which are labelled by their value.
    pub fn is_element(&self) -> bool {
        self.identity.is_none() && matches!(self.path().last(), Some(Segment::Index(_)))
    }
}

static ROOT: JsonPath = JsonPath::root();

/// Which document a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Base,
    Head,
}

/// Non-fatal conditions met during the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No identity field qualified; the list was compared item by item as values.
    AmbiguousIdentity { path: String },
    /// A nested JSON field did not parse and was compared as plain text.
    NestedJsonFallback {
        path: String,
        side: Side,
        message: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AmbiguousIdentity { path } => write!(
                f,
                "{}: no unique identity field, records compared by content",
                path
            ),
            Diagnostic::NestedJsonFallback {
                path,
                side,
                message,
            } => write!(
                f,
                "{}: {:?} value is not valid JSON ({}), compared as text",
                path, side, message
            ),
        }
    }
}

/// Statistics about the diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_changes(&self) -> usize {
        self.added + self.removed + self.modified
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    fn record(&mut self, change_type: ChangeType) {
        match change_type {
            ChangeType::Added => self.added += 1,
            ChangeType::Removed => self.removed += 1,
            ChangeType::Modified => self.modified += 1,
        }
    }
}

/// Receives changes in discovery order.
pub trait DiffSink {
    fn emit(&mut self, change: Change);

    fn diagnose(&mut self, diagnostic: Diagnostic);
}

/// The complete diff result; also the default collecting sink.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub changes: Vec<Change>,
    pub stats: DiffStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

impl DiffSink for Diff {
    fn emit(&mut self, change: Change) {
        self.stats.record(change.change_type);
        self.changes.push(change);
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Fixed tables that steer the diff.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Parent field name -> identity field of its records
    pub identity_keys: HashMap<String, String>,
    /// Keys never reported as Modified
    pub ignored_fields: HashSet<String>,
    /// Keys whose string values are parsed and diffed as JSON
    pub nested_json_fields: HashSet<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            identity_keys: DEFAULT_IDENTITY_KEYS
                .iter()
                .map(|(parent, key)| (parent.to_string(), key.to_string()))
                .collect(),
            ignored_fields: DEFAULT_IGNORED_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            nested_json_fields: DEFAULT_NESTED_JSON_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Compares two bare value trees. Changes carry no line numbers.
pub fn compute_diff(base: &Node, head: &Node, config: &DiffConfig) -> Diff {
    let mut diff = Diff::new();
    diff_into(base, head, None, None, config, &mut diff);
    diff
}

/// Compares two parsed documents, annotating changes with source lines.
pub fn compare_documents(base: &Document, head: &Document, config: &DiffConfig) -> Diff {
    let mut diff = Diff::new();
    diff_into(
        &base.root,
        &head.root,
        Some(&base.locator),
        Some(&head.locator),
        config,
        &mut diff,
    );
    log::debug!(
        "{} -> {}: {} added, {} removed, {} modified",
        base.label,
        head.label,
        diff.stats.added,
        diff.stats.removed,
        diff.stats.modified
    );
    diff
}

/// Streams the comparison of `base` and `head` into `sink`.
pub fn diff_into<S: DiffSink + ?Sized>(
    base: &Node,
    head: &Node,
    base_locator: Option<&SourceLocator>,
    head_locator: Option<&SourceLocator>,
    config: &DiffConfig,
    sink: &mut S,
) {
    let ctx = DiffContext {
        config,
        base_locator,
        head_locator,
        base_path: JsonPath::root(),
        head_path: JsonPath::root(),
        trail: Vec::new(),
        parent: None,
        anchor: None,
    };
    diff_nodes(base, head, &ctx, sink);
}

/// Per-walk state, copied down the recursion rather than shared.
#[derive(Clone)]
struct DiffContext<'a> {
    config: &'a DiffConfig,
    base_locator: Option<&'a SourceLocator>,
    head_locator: Option<&'a SourceLocator>,
    base_path: JsonPath,
    head_path: JsonPath,
    trail: Vec<String>,
    /// Object key the current value sits under.
    parent: Option<String>,
    /// Inside a nested JSON field, lines resolve to the field itself.
    anchor: Option<(JsonPath, JsonPath)>,
}

impl<'a> DiffContext<'a> {
    fn member(&self, key: &str) -> Self {
        let mut trail = self.trail.clone();
        trail.push(key.to_string());
        Self {
            base_path: self.base_path.key(key),
            head_path: self.head_path.key(key),
            trail,
            parent: Some(key.to_string()),
            ..self.clone()
        }
    }

    fn record(&self, base_index: usize, head_index: usize, label: String) -> Self {
        let mut trail = self.trail.clone();
        trail.push(label);
        Self {
            base_path: self.base_path.index(base_index),
            head_path: self.head_path.index(head_index),
            trail,
            parent: None,
            ..self.clone()
        }
    }

    fn anchored(mut self) -> Self {
        if self.anchor.is_none() {
            self.anchor = Some((self.base_path.clone(), self.head_path.clone()));
        }
        self
    }

    fn base_line(&self, path: &JsonPath) -> Option<usize> {
        let path = self.anchor.as_ref().map(|(base, _)| base).unwrap_or(path);
        locate_line(self.base_locator, path)
    }

    fn head_line(&self, path: &JsonPath) -> Option<usize> {
        let path = self.anchor.as_ref().map(|(_, head)| head).unwrap_or(path);
        locate_line(self.head_locator, path)
    }

    fn removed(&self, key: String, path: JsonPath, value: &Node, identity: Option<&str>) -> Change {
        Change {
            change_type: ChangeType::Removed,
            base_line: self.base_line(&path),
            head_line: None,
            base_path: Some(path),
            head_path: None,
            trail: self.trail.clone(),
            key,
            base_value: Some(value.clone()),
            head_value: None,
            identity: identity.map(str::to_string),
        }
    }

    fn added(&self, key: String, path: JsonPath, value: &Node, identity: Option<&str>) -> Change {
        Change {
            change_type: ChangeType::Added,
            base_line: None,
            head_line: self.head_line(&path),
            base_path: None,
            head_path: Some(path),
            trail: self.trail.clone(),
            key,
            base_value: None,
            head_value: Some(value.clone()),
            identity: identity.map(str::to_string),
        }
    }

    fn modified(
        &self,
        key: String,
        base_path: JsonPath,
        head_path: JsonPath,
        base: &Node,
        head: &Node,
    ) -> Change {
        Change {
            change_type: ChangeType::Modified,
            base_line: self.base_line(&base_path),
            head_line: self.head_line(&head_path),
            base_path: Some(base_path),
            head_path: Some(head_path),
            trail: self.trail.clone(),
            key,
            base_value: Some(base.clone()),
            head_value: Some(head.clone()),
            identity: None,
        }
    }
}

fn locate_line(locator: Option<&SourceLocator>, path: &JsonPath) -> Option<usize> {
    let locator = locator?;
    // Object members resolve to their key; list elements to their value.
    match locator.locate(path, LocationKind::Key) {
        Ok(pos) => Some(pos.line),
        Err(err) => {
            log::debug!("{}", err);
            None
        }
    }
}

fn diff_nodes<S: DiffSink + ?Sized>(base: &Node, head: &Node, ctx: &DiffContext, sink: &mut S) {
    match (base, head) {
        (Node::Object(base_map), Node::Object(head_map)) => {
            diff_objects(base_map, head_map, ctx, sink)
        }
        (Node::Array(base_list), Node::Array(head_list)) => {
            diff_lists(base_list, head_list, ctx, sink)
        }
        _ => {
            if !base.semantic_equals(head) {
                sink.emit(ctx.modified(
                    "(root)".to_string(),
                    ctx.base_path.clone(),
                    ctx.head_path.clone(),
                    base,
                    head,
                ));
            }
        }
    }
}

/// Compares two objects in base key order, then reports head-only keys.
fn diff_objects<S: DiffSink + ?Sized>(
    base_map: &IndexMap<String, Node>,
    head_map: &IndexMap<String, Node>,
    ctx: &DiffContext,
    sink: &mut S,
) {
    for (key, base_value) in base_map {
        match head_map.get(key) {
            Some(head_value) => diff_member(key, base_value, head_value, ctx, sink),
            None => sink.emit(ctx.removed(key.clone(), ctx.base_path.key(key), base_value, None)),
        }
    }

    for (key, head_value) in head_map {
        if !base_map.contains_key(key) {
            sink.emit(ctx.added(key.clone(), ctx.head_path.key(key), head_value, None));
        }
    }
}

fn diff_member<S: DiffSink + ?Sized>(
    key: &str,
    base: &Node,
    head: &Node,
    ctx: &DiffContext,
    sink: &mut S,
) {
    match (base, head) {
        (Node::Object(base_map), Node::Object(head_map)) => {
            diff_objects(base_map, head_map, &ctx.member(key), sink)
        }
        (Node::Array(base_list), Node::Array(head_list)) => {
            if !base_list.is_empty() || !head_list.is_empty() {
                diff_lists(base_list, head_list, &ctx.member(key), sink)
            }
        }
        (Node::String(base_text), Node::String(head_text))
            if base_text != head_text && ctx.config.nested_json_fields.contains(key) =>
        {
            diff_nested_json(key, base, head, base_text, head_text, ctx, sink)
        }
        _ => {
            if !base.semantic_equals(head) && !ctx.config.ignored_fields.contains(key) {
                sink.emit(ctx.modified(
                    key.to_string(),
                    ctx.base_path.key(key),
                    ctx.head_path.key(key),
                    base,
                    head,
                ));
            }
        }
    }
}

/// Diffs a field holding JSON text as a nested document.
///
/// Blank text or a shape change between sides is an ordinary modification;
/// text that does not parse is compared as text and reported as a diagnostic.
fn diff_nested_json<S: DiffSink + ?Sized>(
    key: &str,
    base: &Node,
    head: &Node,
    base_text: &str,
    head_text: &str,
    ctx: &DiffContext,
    sink: &mut S,
) {
    let member = ctx.member(key).anchored();
    let as_text = |sink: &mut S| {
        sink.emit(ctx.modified(
            key.to_string(),
            member.base_path.clone(),
            member.head_path.clone(),
            base,
            head,
        ))
    };

    if base_text.trim().is_empty() || head_text.trim().is_empty() {
        return as_text(sink);
    }

    let parsed_base = parse_nested(base_text, Side::Base, &member, sink);
    let parsed_head = parse_nested(head_text, Side::Head, &member, sink);

    match (parsed_base, parsed_head) {
        (Some(Node::Array(base_list)), Some(Node::Array(head_list))) => {
            diff_lists(&base_list, &head_list, &member, sink)
        }
        (Some(Node::Object(base_map)), Some(Node::Object(head_map))) => {
            diff_objects(&base_map, &head_map, &member, sink)
        }
        (Some(parsed_base), Some(parsed_head)) if parsed_base.semantic_equals(&parsed_head) => {}
        _ => as_text(sink),
    }
}

fn parse_nested<S: DiffSink + ?Sized>(
    text: &str,
    side: Side,
    ctx: &DiffContext,
    sink: &mut S,
) -> Option<Node> {
    match parse_json(text) {
        Ok(node) => Some(node),
        Err(err) => {
            let path = match side {
                Side::Base => &ctx.base_path,
                Side::Head => &ctx.head_path,
            };
            let diagnostic = Diagnostic::NestedJsonFallback {
                path: path.to_string(),
                side,
                message: err.to_string(),
            };
            log::warn!("{}", diagnostic);
            sink.diagnose(diagnostic);
            None
        }
    }
}

/// Compares two lists: records by identity, everything else as sets.
fn diff_lists<S: DiffSink + ?Sized>(
    base: &[Node],
    head: &[Node],
    ctx: &DiffContext,
    sink: &mut S,
) {
    if !is_record_list(base, head) {
        return diff_as_sets(base, head, ctx, sink);
    }

    let list_path = if base.is_empty() {
        &ctx.head_path
    } else {
        &ctx.base_path
    };
    let key = identity_key(ctx.parent.as_deref(), list_path, base, head, ctx.config);

    match key {
        Some(key) => {
            log::debug!("{}: pairing records on {:?}", list_path, key);
            diff_records(base, head, Some(&key), ctx, sink)
        }
        // Nothing to pair against, so the missing key does not matter.
        None if base.is_empty() || head.is_empty() => diff_records(base, head, None, ctx, sink),
        None => {
            let diagnostic = Diagnostic::AmbiguousIdentity {
                path: list_path.to_string(),
            };
            log::warn!("{}", diagnostic);
            sink.diagnose(diagnostic);
            diff_as_sets(base, head, ctx, sink)
        }
    }
}

/// How a base record was matched against the head list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Open,
    Identical,
    Paired(usize),
}

/// Pairs records sharing an identity value and recurses into each pair.
///
/// Identical records match first and stay silent. Remaining records with the
/// same identity pair in occurrence order. Leftovers, and records without an
/// identity value, are compared as whole items: one that also exists on the
/// other side is a repeat and stays silent, the rest become bundles.
fn diff_records<S: DiffSink + ?Sized>(
    base: &[Node],
    head: &[Node],
    key: Option<&str>,
    ctx: &DiffContext,
    sink: &mut S,
) {
    let bundle_identity = key.unwrap_or("");
    let identities = |records: &[Node]| -> Vec<Option<String>> {
        records
            .iter()
            .map(|record| key.and_then(|key| identity_value(record, key)))
            .collect()
    };
    let base_ids = identities(base);
    let head_ids = identities(head);
    let base_text: Vec<String> = base.iter().map(Node::canonical).collect();
    let head_text: Vec<String> = head.iter().map(Node::canonical).collect();

    let mut slots = vec![Slot::Open; base.len()];
    let mut taken = vec![false; head.len()];

    let mut identical: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (j, text) in head_text.iter().enumerate() {
        identical.entry(text.as_str()).or_default().push_back(j);
    }
    for (i, text) in base_text.iter().enumerate() {
        if let Some(j) = identical
            .get_mut(text.as_str())
            .and_then(VecDeque::pop_front)
        {
            slots[i] = Slot::Identical;
            taken[j] = true;
        }
    }

    let mut by_identity: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (j, id) in head_ids.iter().enumerate() {
        if let (Some(id), false) = (id, taken[j]) {
            by_identity.entry(id.as_str()).or_default().push_back(j);
        }
    }
    for (i, id) in base_ids.iter().enumerate() {
        if slots[i] != Slot::Open {
            continue;
        }
        if let Some(j) = id
            .as_deref()
            .and_then(|id| by_identity.get_mut(id))
            .and_then(VecDeque::pop_front)
        {
            slots[i] = Slot::Paired(j);
            taken[j] = true;
        }
    }

    let base_seen: HashSet<&str> = base_text.iter().map(String::as_str).collect();
    let head_seen: HashSet<&str> = head_text.iter().map(String::as_str).collect();

    for (i, record) in base.iter().enumerate() {
        match slots[i] {
            Slot::Identical => {}
            Slot::Paired(j) => {
                let label = record_label(record, key, i);
                let record_ctx = ctx.record(i, j, label);
                match (record, &head[j]) {
                    (Node::Object(base_map), Node::Object(head_map)) => {
                        diff_objects(base_map, head_map, &record_ctx, sink)
                    }
                    (base_record, head_record) => {
                        diff_nodes(base_record, head_record, &record_ctx, sink)
                    }
                }
            }
            Slot::Open if head_seen.contains(base_text[i].as_str()) => {}
            Slot::Open => sink.emit(ctx.removed(
                record_label(record, key, i),
                ctx.base_path.index(i),
                record,
                Some(bundle_identity),
            )),
        }
    }

    for (j, record) in head.iter().enumerate() {
        if !taken[j] && !base_seen.contains(head_text[j].as_str()) {
            sink.emit(ctx.added(
                record_label(record, key, j),
                ctx.head_path.index(j),
                record,
                Some(bundle_identity),
            ));
        }
    }
}

/// Hashable identity of a record; `None` when the field is missing or null.
fn identity_value(record: &Node, key: &str) -> Option<String> {
    record
        .as_object()
        .and_then(|map| map.get(key))
        .filter(|value| !value.is_null())
        .map(Node::canonical)
}

fn record_label(record: &Node, key: Option<&str>, index: usize) -> String {
    key.and_then(|key| record.as_object().and_then(|map| map.get(key)))
        .filter(|value| !value.is_null())
        .map(Node::display)
        .unwrap_or_else(|| format!("[{}]", index))
}

/// Set comparison: each distinct element missing from the other side is
/// reported once, at its first position.
fn diff_as_sets<S: DiffSink + ?Sized>(
    base: &[Node],
    head: &[Node],
    ctx: &DiffContext,
    sink: &mut S,
) {
    let base_keys: Vec<String> = base.iter().map(Node::canonical).collect();
    let head_keys: Vec<String> = head.iter().map(Node::canonical).collect();
    let (removed, added) = symmetric_difference(&base_keys, &head_keys);

    let mut seen = HashSet::new();
    for (i, (item, canonical)) in base.iter().zip(&base_keys).enumerate() {
        if removed.contains(canonical.as_str()) && seen.insert(canonical.as_str()) {
            sink.emit(ctx.removed(item.display(), ctx.base_path.index(i), item, None));
        }
    }

    seen.clear();
    for (j, (item, canonical)) in head.iter().zip(&head_keys).enumerate() {
        if added.contains(canonical.as_str()) && seen.insert(canonical.as_str()) {
            sink.emit(ctx.added(item.display(), ctx.head_path.index(j), item, None));
        }
    }
}

/// Elements exclusive to each side, keeping track of which side they came from.
fn symmetric_difference<'s>(
    base: &'s [String],
    head: &'s [String],
) -> (HashSet<&'s str>, HashSet<&'s str>) {
    let base_set: HashSet<&str> = base.iter().map(String::as_str).collect();
    let head_set: HashSet<&str> = head.iter().map(String::as_str).collect();
    (
        base_set.difference(&head_set).copied().collect(),
        head_set.difference(&base_set).copied().collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(text: &str) -> Node {
        parse_json(text).unwrap()
    }

    fn diff(base: &str, head: &str) -> Diff {
        compute_diff(&json(base), &json(head), &DiffConfig::default())
    }

    #[test]
    fn test_diff_stats_total_changes() {
        let stats = DiffStats {
            added: 2,
            removed: 1,
            modified: 3,
        };
        assert_eq!(stats.total_changes(), 6);
        assert!(!stats.is_empty());
        assert!(DiffStats::new().is_empty());
    }

    #[test]
    fn test_identical_documents() {
        let doc = r#"{"name": "Task", "fields": [{"fieldname": "a"}], "tags": [1, 2]}"#;
        assert!(diff(doc, doc).is_empty());
    }

    #[test]
    fn test_modified_scalar_member() {
        let result = diff(r#"{"label": "X"}"#, r#"{"label": "Y"}"#);
        assert_eq!(result.changes.len(), 1);
        let change = &result.changes[0];
        assert_eq!(change.change_type, ChangeType::Modified);
        assert_eq!(change.key, "label");
        assert_eq!(change.base_value, Some(Node::String("X".to_string())));
        assert_eq!(change.head_value, Some(Node::String("Y".to_string())));
    }

    #[test]
    fn test_root_scalar_change() {
        let result = diff("1", "2");
        assert_eq!(result.stats.modified, 1);
        assert_eq!(result.changes[0].path().to_string(), "/");
    }

    #[test]
    fn test_removed_before_added() {
        let result = diff(r#"{"a": 1, "b": 2}"#, r#"{"c": 3, "b": 2}"#);
        let kinds: Vec<ChangeType> = result.changes.iter().map(|c| c.change_type).collect();
        assert_eq!(kinds, vec![ChangeType::Removed, ChangeType::Added]);
        assert_eq!(result.changes[0].key, "a");
        assert_eq!(result.changes[1].key, "c");
    }

    #[test]
    fn test_base_key_order_is_kept() {
        let result = diff(r#"{"z": 1, "a": 1, "m": 1}"#, r#"{"a": 2, "m": 2, "z": 2}"#);
        let keys: Vec<&str> = result.changes.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_ignored_fields() {
        let result = diff(
            r#"{"modified": "2023-01-01", "modified_by": "a", "creation": "x", "name": "T"}"#,
            r#"{"modified": "2024-01-01", "modified_by": "b", "creation": "y", "name": "T"}"#,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_ignored_field_still_reported_when_added() {
        let result = diff(r#"{}"#, r#"{"modified": "2024-01-01"}"#);
        assert_eq!(result.stats.added, 1);
    }

    #[test]
    fn test_scalar_lists_are_sets() {
        let result = diff(r#"{"v": [1, 2, 2, 3]}"#, r#"{"v": [2, 3, 3, 4]}"#);
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.changes[0].change_type, ChangeType::Removed);
        assert_eq!(result.changes[0].base_value, Some(Node::Number(1.0)));
        assert_eq!(result.changes[0].path().to_string(), "/v/0");
        assert_eq!(result.changes[1].change_type, ChangeType::Added);
        assert_eq!(result.changes[1].head_value, Some(Node::Number(4.0)));
        assert_eq!(result.changes[1].path().to_string(), "/v/3");
        assert!(result.changes[1].is_element());
    }

    #[test]
    fn test_reordered_scalars_are_unchanged() {
        assert!(diff(r#"{"v": ["a", "b"]}"#, r#"{"v": ["b", "a"]}"#).is_empty());
    }

    #[test]
    fn test_records_pair_by_fieldname() {
        let result = diff(
            r#"{"fields": [{"fieldname": "a", "label": "X"}, {"fieldname": "b", "label": "Y"}]}"#,
            r#"{"fields": [{"fieldname": "b", "label": "Z"}, {"fieldname": "c", "label": "Y"}]}"#,
        );
        assert_eq!(result.changes.len(), 3);

        let removed = &result.changes[0];
        assert_eq!(removed.change_type, ChangeType::Removed);
        assert_eq!(removed.key, "a");
        assert_eq!(removed.identity.as_deref(), Some("fieldname"));
        assert_eq!(
            removed.base_value,
            Some(json(r#"{"fieldname": "a", "label": "X"}"#))
        );

        let modified = &result.changes[1];
        assert_eq!(modified.change_type, ChangeType::Modified);
        assert_eq!(modified.trail, vec!["fields", "b"]);
        assert_eq!(modified.key, "label");
        assert_eq!(
            modified.base_path.as_ref().unwrap().to_string(),
            "/fields/1/label"
        );
        assert_eq!(
            modified.head_path.as_ref().unwrap().to_string(),
            "/fields/0/label"
        );

        let added = &result.changes[2];
        assert_eq!(added.change_type, ChangeType::Added);
        assert_eq!(added.key, "c");
        assert!(added.is_record());
    }

    #[test]
    fn test_unchanged_reordered_records_are_silent() {
        let result = diff(
            r#"{"permissions": [{"role": "A", "read": 1}, {"role": "B", "read": 1}]}"#,
            r#"{"permissions": [{"role": "B", "read": 1}, {"role": "A", "read": 1}]}"#,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_side_reports_every_record() {
        let result = diff(
            r#"{"states": []}"#,
            r#"{"states": [{"state": "Open"}, {"state": "Closed"}]}"#,
        );
        assert_eq!(result.stats.added, 2);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_duplicate_identity_surplus_is_removed() {
        let result = diff(
            r#"{"fields": [{"fieldname": "x", "v": 1}, {"fieldname": "x", "v": 2}]}"#,
            r#"{"fields": [{"fieldname": "x", "v": 1}]}"#,
        );
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].change_type, ChangeType::Removed);
        assert_eq!(result.changes[0].path().to_string(), "/fields/1");
    }

    #[test]
    fn test_no_identity_degrades_to_values() {
        let result = diff(
            r#"{"items": [{"a": 1, "b": 1}, {"a": 1, "b": 1}]}"#,
            r#"{"items": [{"a": 1, "b": 2}]}"#,
        );
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::AmbiguousIdentity {
                path: "/items".to_string()
            }]
        );
        assert_eq!(result.stats.removed, 1);
        assert_eq!(result.stats.added, 1);
    }

    #[test]
    fn test_inferred_identity() {
        let result = diff(
            r#"{"items": [{"code": "a", "qty": 1}, {"code": "b", "qty": 1}]}"#,
            r#"{"items": [{"code": "b", "qty": 1}, {"code": "a", "qty": 5}]}"#,
        );
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].trail, vec!["items", "a"]);
        assert_eq!(result.changes[0].key, "qty");
    }

    #[test]
    fn test_nested_json_field() {
        let base = serde_json::json!({
            "format_data": r#"[{"fieldname": "x", "fieldtype": "Custom HTML", "options": "<b>1</b>"}]"#
        });
        let head = serde_json::json!({
            "format_data": r#"[{"fieldname": "x", "fieldtype": "Custom HTML", "options": "<b>2</b>"}, {"fieldname": "y", "fieldtype": "Data"}]"#
        });
        let result = diff(&base.to_string(), &head.to_string());

        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.changes[0].change_type, ChangeType::Modified);
        assert_eq!(result.changes[0].key, "options");
        assert_eq!(
            result.changes[0].path().to_string(),
            "/format_data/0/options"
        );
        assert_eq!(result.changes[1].change_type, ChangeType::Added);
        assert_eq!(result.changes[1].key, "y");
    }

    #[test]
    fn test_nested_json_parse_failure_falls_back() {
        let result = diff(
            r#"{"format_data": "[{\"fieldname\": \"x\"}]"}"#,
            r#"{"format_data": "[{broken"}"#,
        );
        assert_eq!(result.stats.modified, 1);
        assert_eq!(result.changes[0].key, "format_data");
        assert!(matches!(
            result.diagnostics[0],
            Diagnostic::NestedJsonFallback {
                side: Side::Head,
                ..
            }
        ));
    }

    #[test]
    fn test_nested_json_blank_side_is_text_change() {
        let result = diff(
            r#"{"format_data": ""}"#,
            r#"{"format_data": "[{\"fieldname\": \"x\"}]"}"#,
        );
        assert_eq!(result.stats.modified, 1);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_shape_change_is_modified() {
        let result = diff(r#"{"options": "a"}"#, r#"{"options": ["a"]}"#);
        assert_eq!(result.stats.modified, 1);
    }

    #[test]
    fn test_root_list_uses_name() {
        let result = diff(
            r#"[{"name": "A", "v": 1}, {"name": "B", "v": 1}]"#,
            r#"[{"name": "B", "v": 2}, {"name": "A", "v": 1}]"#,
        );
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].trail, vec!["B"]);
    }

    #[test]
    fn test_lines_from_documents() {
        let base = Document::parse("a.json", "{\n  \"label\": \"X\",\n  \"old\": 1\n}").unwrap();
        let head = Document::parse("b.json", "{\n  \"new\": 2,\n  \"label\": \"Y\"\n}").unwrap();
        let result = compare_documents(&base, &head, &DiffConfig::default());

        let modified = &result.changes[0];
        assert_eq!(modified.base_line, Some(2));
        assert_eq!(modified.head_line, Some(3));
        let removed = &result.changes[1];
        assert_eq!(removed.base_line, Some(3));
        let added = &result.changes[2];
        assert_eq!(added.head_line, Some(2));
    }

    #[test]
    fn test_repeated_record_on_both_sides_is_silent() {
        let result = diff(
            r#"{"fields": [{"fieldname": "x", "v": 1}]}"#,
            r#"{"fields": [{"fieldname": "x", "v": 1}, {"fieldname": "x", "v": 1}]}"#,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_identical_duplicate_matches_before_edited_one() {
        let result = diff(
            r#"{"fields": [{"fieldname": "x", "v": 1}, {"fieldname": "x", "v": 2}]}"#,
            r#"{"fields": [{"fieldname": "x", "v": 2}]}"#,
        );
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].change_type, ChangeType::Removed);
        assert_eq!(result.changes[0].path().to_string(), "/fields/0");
    }

    #[test]
    fn test_records_without_identity_compare_as_items() {
        let result = diff(
            r#"{"fields": [{"fieldname": "a"}, {"label": "Section"}, {"label": "Old"}]}"#,
            r#"{"fields": [{"label": "Section"}, {"label": "New"}, {"fieldname": "a"}]}"#,
        );
        let summary: Vec<(ChangeType, String)> = result
            .changes
            .iter()
            .map(|c| (c.change_type, c.path().to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChangeType::Removed, "/fields/2".to_string()),
                (ChangeType::Added, "/fields/1".to_string()),
            ]
        );
        assert_eq!(result.changes[0].key, "[2]");
    }

    #[test]
    fn test_undeclared_identity_falls_back_to_inference() {
        let result = diff(
            r#"{"links": [{"link_doctype": "A"}, {"link_doctype": "B"}]}"#,
            r#"{"links": [{"link_doctype": "B"}]}"#,
        );
        assert_eq!(result.changes.len(), 1);
        let removed = &result.changes[0];
        assert_eq!(removed.change_type, ChangeType::Removed);
        assert_eq!(removed.key, "A");
        assert_eq!(removed.identity.as_deref(), Some("link_doctype"));
        assert_eq!(removed.path().to_string(), "/links/0");
    }

    #[test]
    fn test_symmetric_difference_keeps_sides() {
        let base = vec!["a".to_string(), "b".to_string()];
        let head = vec!["b".to_string(), "c".to_string()];
        let (only_base, only_head) = symmetric_difference(&base, &head);
        assert!(only_base.contains("a") && only_base.len() == 1);
        assert!(only_head.contains("c") && only_head.len() == 1);
    }
}
