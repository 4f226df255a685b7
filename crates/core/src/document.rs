//! The document store: a node tree with a value cache, comments and a backing medium.

use crate::error::{BindError, Result, StoreError, StoreErrorExt};
use crate::naming::{CommentStyle, NameStyle, NamingStrategy};
use crate::node::Node;
use crate::path;
use crate::registry::SerializerRegistry;
use crate::serializer::is_reserved_key;
use crate::value::Value;
use crate::yaml::{self, Decorations};
use bindery_storage::{Bootstrap, ConfigStorage, StorageError};
use serde::de::Error as _;
use fxhash::FxHashMap;
use private::Sealed;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a document is loaded from and saved to.
#[derive(Debug, Clone)]
enum Backing {
    File { storage: ConfigStorage, name: String },
    Memory { text: String },
}

/// A hierarchical configuration document.
///
/// The node tree is the source of truth. Values written through [`Document::set`] are also kept
/// in a flat cache keyed by path; every `set`, `remove` and `load` drops the cache entries at the
/// touched path, its ancestors and its descendants, so a cached value always matches what a fresh
/// read of the tree would produce.
pub struct Document {
    root: Node,
    cache: FxHashMap<String, Value>,
    comments: FxHashMap<String, String>,
    header: Vec<String>,
    naming: Arc<dyn NamingStrategy>,
    comment_style: CommentStyle,
    backing: Backing,
    revision: u64,
    loads: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("backing", &self.backing)
            .field("cached", &self.cache.len())
            .field("comments", &self.comments.len())
            .field("revision", &self.revision)
            .field("loads", &self.loads)
            .finish_non_exhaustive()
    }
}

/// Tree and cache captured by [`Document::snapshot`].
#[derive(Debug, Clone)]
pub struct Snapshot {
    root: Node,
    cache: FxHashMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct NoBacking;
#[derive(Debug)]
pub struct WithBacking(Backing);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoBacking {}
impl Sealed for WithBacking {}

#[allow(private_bounds)]
#[derive(Debug)]
pub struct DocumentBuilder<S: Sealed = NoBacking> {
    state: S,
    naming: Arc<dyn NamingStrategy>,
    comment_style: CommentStyle,
    header: Vec<String>,
}

impl Default for DocumentBuilder<NoBacking> {
    fn default() -> Self {
        Self {
            state: NoBacking,
            naming: Arc::new(NameStyle::default()),
            comment_style: CommentStyle::default(),
            header: Vec::new(),
        }
    }
}

#[allow(private_bounds)]
impl<S: Sealed> DocumentBuilder<S> {
    #[must_use = "Sets the strategy turning field names into document keys"]
    pub fn naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    #[must_use = "Sets the strategy turning field names into document keys"]
    pub fn shared_naming(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    #[must_use = "Sets where field comments are rendered"]
    pub const fn comment_style(mut self, style: CommentStyle) -> Self {
        self.comment_style = style;
        self
    }

    /// Leading comment of the document, one entry per line.
    #[must_use = "Sets the document header comment"]
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into().lines().map(str::to_owned).collect();
        self
    }

    fn transition<N: Sealed>(self, state: N) -> DocumentBuilder<N> {
        DocumentBuilder {
            state,
            naming: self.naming,
            comment_style: self.comment_style,
            header: self.header,
        }
    }
}

impl DocumentBuilder<NoBacking> {
    #[must_use = "Creates a new document builder"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backs the document with `name` inside `storage`.
    #[must_use = "Sets the file backing the document"]
    pub fn file(self, storage: ConfigStorage, name: impl Into<String>) -> DocumentBuilder<WithBacking> {
        self.transition(WithBacking(Backing::File { storage, name: name.into() }))
    }

    /// Backs the document with an in-memory text buffer.
    #[must_use = "Sets the in-memory text backing the document"]
    pub fn memory(self, text: impl Into<String>) -> DocumentBuilder<WithBacking> {
        self.transition(WithBacking(Backing::Memory { text: text.into() }))
    }
}

impl DocumentBuilder<WithBacking> {
    /// Provisions the backing file when needed and loads the document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be provisioned or read and
    /// [`StoreError::Corrupt`] if its contents are not a YAML mapping.
    pub fn open(self) -> Result<Document, StoreError> {
        let WithBacking(backing) = self.state;
        if let Backing::File { storage, name } = &backing {
            let outcome = storage.bootstrap(name).context(format!("Failed to provision {name}"))?;
            if outcome != Bootstrap::Existing {
                info!(file = %name, outcome = ?outcome, "Created configuration document");
            }
        }

        let mut document = Document {
            root: Node::empty_mapping(),
            cache: FxHashMap::default(),
            comments: FxHashMap::default(),
            header: self.header,
            naming: self.naming,
            comment_style: self.comment_style,
            backing,
            revision: 0,
            loads: 0,
        };
        document.load()?;
        Ok(document)
    }
}

impl Document {
    #[must_use = "The document is not loaded until you call .open()"]
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// File name of a file-backed document.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.backing {
            Backing::File { name, .. } => Some(name),
            Backing::Memory { .. } => None,
        }
    }

    #[must_use]
    pub fn naming(&self) -> &dyn NamingStrategy {
        self.naming.as_ref()
    }

    #[must_use]
    pub const fn comment_style(&self) -> CommentStyle {
        self.comment_style
    }

    /// `true` when a node exists at `path` (an explicit null counts) or a value is cached there.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.cache.contains_key(path) || self.root.lookup(path).is_some()
    }

    #[must_use]
    pub fn node(&self, path: &str) -> Option<&Node> {
        self.root.lookup(path)
    }

    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// Cached value, otherwise a generic view of the raw node. Null nodes read as absent.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        if let Some(value) = self.cache.get(path) {
            return Some(value.clone());
        }
        self.root.lookup(path).filter(|node| !node.is_null()).map(Value::from_node)
    }

    /// Data keys of the mapping at `path`, without `type`/`structure` metadata.
    #[must_use]
    pub fn keys(&self, path: &str) -> Vec<String> {
        let node = if path.is_empty() { Some(&self.root) } else { self.root.lookup(path) };
        node.and_then(Node::as_mapping)
            .map(|map| map.keys().filter(|key| !is_reserved_key(key)).map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Writes `value` at `path`.
    ///
    /// `Null` removes the node, scalars are written directly and everything else is handed to the
    /// serializer the registry resolves for it, after the old subtree has been cleared.
    ///
    /// # Errors
    ///
    /// Whatever the resolved serializer reports, or `MissingSerializer` when none applies.
    pub fn set(&mut self, path: &str, value: Value, registry: &SerializerRegistry) -> Result<()> {
        self.invalidate(path);

        if value.is_null() {
            self.root.remove_at(path);
            debug!(path, "Removed value");
            return Ok(());
        }
        if let Some(node) = value.to_scalar_node() {
            self.root.insert_at(path, node);
            debug!(path, "Wrote scalar");
            return Ok(());
        }

        if value.is_empty_composite() {
            return Err(BindError::cannot_infer(format!(
                "{path}: the element type of an empty {} is unknown",
                value.type_name()
            )));
        }
        let serializer = registry.resolve_by_value(&value)?;
        self.root.remove_at(path);
        serializer.serialize(path, &value, self, registry)?;
        debug!(path, kind = value.type_name(), "Wrote composite");
        self.cache.insert(path.to_owned(), value);
        Ok(())
    }

    /// Replaces the raw node at `path`.
    pub fn set_node(&mut self, path: &str, node: Node) {
        self.invalidate(path);
        self.root.insert_at(path, node);
    }

    pub fn remove(&mut self, path: &str) -> Option<Node> {
        self.invalidate(path);
        self.root.remove_at(path)
    }

    fn invalidate(&mut self, path: &str) {
        self.cache.retain(|cached, _| !path::is_within(cached, path) && !path::is_within(path, cached));
    }

    #[must_use]
    pub fn cached(&self, path: &str) -> Option<&Value> {
        self.cache.get(path)
    }

    #[must_use]
    pub fn is_cached(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    /// Records an already decoded value for `path`.
    pub fn cache_value(&mut self, path: &str, value: Value) {
        self.cache.insert(path.to_owned(), value);
    }

    pub fn set_comment(&mut self, path: &str, comment: impl Into<String>) {
        self.comments.insert(path.to_owned(), comment.into());
    }

    #[must_use]
    pub fn comment(&self, path: &str) -> Option<&str> {
        self.comments.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn header_comment(&self) -> &[String] {
        &self.header
    }

    pub fn set_header_comment(&mut self, header: impl Into<String>) {
        self.header = header.into().lines().map(str::to_owned).collect();
    }

    /// Re-reads the backing medium, dropping every cached value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read and [`StoreError::Corrupt`] if it is
    /// not UTF-8 or does not parse into a mapping.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let root = match &self.backing {
            Backing::File { storage, name } => {
                let text = match storage.read_to_string(name) {
                    Err(StorageError::InvalidEncoding { message, .. }) => {
                        return Err(StoreError::Corrupt {
                            source: serde_yaml::Error::custom(message),
                            context: Some(format!("Failed to parse {name}").into()),
                        });
                    },
                    read => read.context(format!("Failed to read {name}"))?,
                };
                yaml::parse(&text).context(format!("Failed to parse {name}"))?
            },
            Backing::Memory { text } => yaml::parse(text)?,
        };
        self.root = root;
        self.cache.clear();
        self.loads += 1;
        debug!(file = self.name(), loads = self.loads, "Loaded configuration document");
        Ok(())
    }

    /// Renders the tree with its comments and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Render`] if the tree cannot be rendered and [`StoreError::Io`] if
    /// the file cannot be written.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let text = self.to_yaml_string()?;
        match &mut self.backing {
            Backing::File { storage, name } => {
                storage.write(name.as_str(), text.as_bytes()).context(format!("Failed to save {name}"))?;
            },
            Backing::Memory { text: buffer } => *buffer = text,
        }
        self.revision += 1;
        info!(file = self.name(), revision = self.revision, "Saved configuration document");
        Ok(())
    }

    /// The text [`Document::save`] would persist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Render`] if the tree cannot be rendered.
    pub fn to_yaml_string(&self) -> Result<String, StoreError> {
        let decorations =
            Decorations { header: &self.header, comments: &self.comments, style: self.comment_style };
        yaml::render(&self.root, decorations)
            .map_err(|err| StoreError::Render { message: err.to_string().into(), context: None })
    }

    /// Number of saves performed.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of loads performed, including the initial one.
    #[must_use]
    pub const fn loads(&self) -> u64 {
        self.loads
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { root: self.root.clone(), cache: self.cache.clone() }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.root = snapshot.root;
        self.cache = snapshot.cache;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Scalar;
    use tempfile::tempdir;

    fn memory(text: &str) -> Document {
        Document::builder().memory(text).open().unwrap()
    }

    #[test]
    fn get_reads_raw_nodes() {
        let document = memory("server:\n  port: 8080\n  hosts:\n    - a\n");
        assert_eq!(document.get("server.port"), Some(Value::Int(8080)));
        assert!(matches!(document.get("server.hosts"), Some(Value::List { .. })));
        assert_eq!(document.get("server.missing"), None);
    }

    #[test]
    fn explicit_null_is_contained_but_absent() {
        let document = memory("name: ~\n");
        assert!(document.contains("name"));
        assert_eq!(document.get("name"), None);
    }

    #[test]
    fn null_set_removes_node() {
        let registry = SerializerRegistry::new();
        let mut document = memory("name: bindery\n");
        document.set("name", Value::Null, &registry).unwrap();
        assert!(!document.contains("name"));
    }

    #[test]
    fn set_invalidates_ancestors_and_descendants() {
        let mut document = memory("");
        document.cache_value("a", Value::Int(1));
        document.cache_value("a.b.c", Value::Int(2));
        document.cache_value("ab", Value::Int(3));

        document.set_node("a.b", Node::Scalar(Scalar::Int(4)));
        assert!(!document.is_cached("a"));
        assert!(!document.is_cached("a.b.c"));
        assert!(document.is_cached("ab"));
    }

    #[test]
    fn load_clears_cache() {
        let mut document = memory("port: 1\n");
        document.cache_value("port", Value::Int(2));
        assert_eq!(document.get("port"), Some(Value::Int(2)));

        document.load().unwrap();
        assert_eq!(document.get("port"), Some(Value::Int(1)));
        assert_eq!(document.loads(), 2);
    }

    #[test]
    fn corrupt_text_is_reported() {
        let result = Document::builder().memory("port: [1, 2\n").open();
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn keys_skip_metadata() {
        let document = memory("list:\n  structure: Vec\n  type: string\n  '0': a\n  '1': b\n");
        assert_eq!(document.keys("list"), ["0", "1"]);
        assert_eq!(document.keys(""), ["list"]);
    }

    #[test]
    fn memory_save_round_trips() {
        let mut document = Document::builder().header("Demo settings").memory("").open().unwrap();
        document.set_node("port", Node::Scalar(Scalar::Int(25565)));
        document.set_comment("port", "Listen port");
        document.save().unwrap();
        document.load().unwrap();

        assert_eq!(document.get("port"), Some(Value::Int(25565)));
        assert_eq!(document.revision(), 1);
        assert_eq!(
            document.to_yaml_string().unwrap(),
            "# Demo settings\n\n# Listen port\nport: 25565\n"
        );
    }

    #[test]
    fn file_backed_document_persists() {
        let dir = tempdir().unwrap();
        let storage = ConfigStorage::builder().root(dir.path()).open().unwrap();

        let mut document = Document::builder().file(storage.clone(), "app.yml").open().unwrap();
        assert_eq!(document.name(), Some("app.yml"));
        document.set_node("enabled", Node::Scalar(Scalar::Bool(true)));
        document.save().unwrap();

        let reopened = Document::builder().file(storage, "app.yml").open().unwrap();
        assert_eq!(reopened.get("enabled"), Some(Value::Bool(true)));
    }

    #[test]
    fn snapshot_restores_tree_and_cache() {
        let mut document = memory("a: 1\n");
        let snapshot = document.snapshot();
        document.set_node("b", Node::Scalar(Scalar::Int(2)));
        document.cache_value("b", Value::Int(2));

        document.restore(snapshot);
        assert!(!document.contains("b"));
        assert_eq!(document.get("a"), Some(Value::Int(1)));
    }
}
