//! In-memory document tree.

use crate::path;
use std::fmt;

/// A leaf value as it appears in the persisted document.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

/// Insertion-ordered string-keyed mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMap {
    entries: Vec<(String, Node)>,
}

impl NodeMap {
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, node)| node)
    }

    /// Replaces an existing entry in place, otherwise appends.
    pub fn insert(&mut self, key: impl Into<String>, node: Node) -> Option<Node> {
        let key = key.into();
        if let Some(slot) = self.get_mut(&key) {
            return Some(std::mem::replace(slot, node));
        }
        self.entries.push((key, node));
        None
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Node)> for NodeMap {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, node) in iter {
            map.insert(key, node);
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Scalar(Scalar),
    Sequence(Vec<Self>),
    Mapping(NodeMap),
}

impl Node {
    #[must_use]
    pub const fn empty_mapping() -> Self {
        Self::Mapping(NodeMap::new())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_mapping(&self) -> Option<&NodeMap> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Short shape name used in diagnostics.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Scalar(Scalar::Bool(_)) => "boolean",
            Self::Scalar(Scalar::Int(_)) => "integer",
            Self::Scalar(Scalar::Float(_)) => "float",
            Self::Scalar(Scalar::Str(_)) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Follows a dotted path. Numeric segments also index into sequences.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Self> {
        path::segments(path).try_fold(self, |node, segment| match node {
            Self::Mapping(map) => map.get(segment),
            Self::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Writes `node` at `path`, turning every intermediate non-mapping into a mapping.
    pub fn insert_at(&mut self, path: &str, node: Self) {
        let mut segments: Vec<&str> = path::segments(path).collect();
        let Some(last) = segments.pop() else {
            *self = node;
            return;
        };

        let mut current = self;
        for segment in segments {
            let map = current.force_mapping();
            if !map.contains_key(segment) {
                map.insert(segment, Self::empty_mapping());
            }
            let Some(next) = map.get_mut(segment) else {
                return;
            };
            current = next;
        }
        current.force_mapping().insert(last, node);
    }

    /// Detaches the node at `path`, leaving parents in place.
    pub fn remove_at(&mut self, path: &str) -> Option<Self> {
        let mut segments: Vec<&str> = path::segments(path).collect();
        let last = segments.pop()?;

        let mut current = self;
        for segment in segments {
            current = match current {
                Self::Mapping(map) => map.get_mut(segment)?,
                _ => return None,
            };
        }
        match current {
            Self::Mapping(map) => map.remove(last),
            _ => None,
        }
    }

    fn force_mapping(&mut self) -> &mut NodeMap {
        if !matches!(self, Self::Mapping(_)) {
            *self = Self::empty_mapping();
        }
        match self {
            Self::Mapping(map) => map,
            _ => unreachable!("node was just replaced by a mapping"),
        }
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> Node {
        Node::Scalar(Scalar::Int(value))
    }

    #[test]
    fn insert_creates_intermediate_mappings() {
        let mut root = Node::empty_mapping();
        root.insert_at("server.limits.players", int(20));

        assert_eq!(root.lookup("server.limits.players"), Some(&int(20)));
        assert_eq!(root.lookup("server.limits").map(Node::shape), Some("mapping"));
    }

    #[test]
    fn insert_replaces_scalar_parent() {
        let mut root = Node::empty_mapping();
        root.insert_at("server", int(1));
        root.insert_at("server.port", int(8080));

        assert_eq!(root.lookup("server.port"), Some(&int(8080)));
    }

    #[test]
    fn insert_keeps_key_order_on_replace() {
        let mut root = Node::empty_mapping();
        root.insert_at("a", int(1));
        root.insert_at("b", int(2));
        root.insert_at("a", int(3));

        let keys: Vec<_> = root.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(root.lookup("a"), Some(&int(3)));
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut root = Node::empty_mapping();
        root.insert_at("a.b", int(1));
        root.insert_at("a.c", int(2));

        assert_eq!(root.remove_at("a.b"), Some(int(1)));
        assert!(root.lookup("a.b").is_none());
        assert_eq!(root.lookup("a.c"), Some(&int(2)));
        assert_eq!(root.remove_at("missing.path"), None);
    }

    #[test]
    fn lookup_indexes_sequences() {
        let mut root = Node::empty_mapping();
        root.insert_at("names", Node::Sequence(vec![int(5), int(6)]));

        assert_eq!(root.lookup("names.1"), Some(&int(6)));
        assert!(root.lookup("names.2").is_none());
        assert!(root.lookup("names.x").is_none());
    }
}
