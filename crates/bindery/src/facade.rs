use crate::global;
use crate::settings::BinderySettings;
use bindery_core::text::translate_color_codes;
use bindery_core::{
    BoundConfig, CommentStyle, ConfigHandle, ConfigInterface, Document, NameStyle, NamingStrategy,
    Result, Schema, SerializerRegistry, StoreError, StoreErrorExt,
};
use bindery_storage::ConfigStorage;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const FILE_SUFFIX: &str = ".yml";
const DEFAULT_DIRECTORY: &str = "config";

/// `name` with the `.yml` suffix added when missing.
#[must_use]
pub fn file_name(name: &str) -> String {
    if name.ends_with(FILE_SUFFIX) { name.to_owned() } else { format!("{name}{FILE_SUFFIX}") }
}

/// Host-side entry point: one configuration directory and the interfaces bound inside it.
pub struct Bindery {
    storage: ConfigStorage,
    naming: Arc<dyn NamingStrategy>,
    comment_style: CommentStyle,
    translate_colors: bool,
    registry: Arc<SerializerRegistry>,
    configs: RwLock<FxHashMap<String, ConfigHandle>>,
}

impl fmt::Debug for Bindery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindery")
            .field("root", &self.storage.root())
            .field("naming", &self.naming)
            .field("comment_style", &self.comment_style)
            .field("translate_colors", &self.translate_colors)
            .field("configs", &self.configs.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Bindery {
    #[must_use = "The instance is not created until you call .build()"]
    pub fn builder() -> BinderyBuilder {
        BinderyBuilder::default()
    }

    /// Provisions `<T::NAME>.yml`, binds `T` to it and remembers the handle.
    ///
    /// # Errors
    ///
    /// Returns `Store` when the file cannot be provisioned, read or saved, and every schema or
    /// data error binding reports.
    pub fn init<T: ConfigInterface>(&self) -> Result<T> {
        let file = file_name(T::NAME);
        let document = Document::builder()
            .shared_naming(Arc::clone(&self.naming))
            .comment_style(self.comment_style)
            .file(self.storage.clone(), file.as_str())
            .open()?;

        let mut schema = Schema::build(&T::describe(), document.naming())?;
        if self.translate_colors {
            schema = schema.with_text_post_process(translate_color_codes);
        }
        let bound = BoundConfig::bind_schema(Arc::new(schema), document, Arc::clone(&self.registry))?;

        let handle = ConfigHandle::new(bound);
        self.configs.write().insert(file.clone(), handle.clone());
        info!(file = %file, "Initialized configuration");
        Ok(T::from_handle(handle))
    }

    /// A previously initialized interface.
    #[must_use]
    pub fn configuration<T: ConfigInterface>(&self) -> Option<T> {
        self.raw(T::NAME).map(T::from_handle)
    }

    /// Handle of a previously initialized configuration; `name` may omit the `.yml` suffix.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<ConfigHandle> {
        self.configs.read().get(&file_name(name)).cloned()
    }

    #[must_use]
    pub const fn storage(&self) -> &ConfigStorage {
        &self.storage
    }

    #[must_use]
    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }
}

#[derive(Debug, Default)]
pub struct BinderyBuilder {
    directory: Option<PathBuf>,
    naming: Option<Arc<dyn NamingStrategy>>,
    comment_style: CommentStyle,
    translate_colors: bool,
    defaults: Vec<(String, Cow<'static, str>)>,
    registry: Option<SerializerRegistry>,
}

impl BinderyBuilder {
    /// Directory holding the configuration files. Defaults to `config`.
    #[must_use = "Sets the configuration directory"]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    #[must_use = "Sets the built-in naming strategy"]
    pub fn name_style(mut self, style: NameStyle) -> Self {
        self.naming = Some(Arc::new(style));
        self
    }

    #[must_use = "Sets a custom naming strategy"]
    pub fn naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Some(Arc::new(naming));
        self
    }

    #[must_use = "Sets where field comments are rendered"]
    pub const fn comment_style(mut self, style: CommentStyle) -> Self {
        self.comment_style = style;
        self
    }

    /// Rewrites `&` formatting codes in every string field that is read.
    #[must_use = "Enables formatting-code translation for string fields"]
    pub const fn translate_colors(mut self, enable: bool) -> Self {
        self.translate_colors = enable;
        self
    }

    /// Bundled contents copied into `name` (suffix added when missing) on first use.
    #[must_use = "Registers a bundled default file"]
    pub fn default_file(mut self, name: &str, contents: impl Into<Cow<'static, str>>) -> Self {
        self.defaults.push((file_name(name), contents.into()));
        self
    }

    /// Registry used for every binding. Defaults to a snapshot of the global registry.
    #[must_use = "Sets the serializer registry"]
    pub fn registry(mut self, registry: SerializerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Applies host settings loaded with [`BinderySettings::load`].
    #[must_use = "Applies the host settings"]
    pub fn settings(self, settings: &BinderySettings) -> Self {
        self.directory(settings.directory.clone())
            .name_style(settings.name_style)
            .comment_style(settings.comment_style)
            .translate_colors(settings.translate_colors)
    }

    /// Opens the configuration directory, creating it when needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created or opened.
    pub fn build(self) -> std::result::Result<Bindery, StoreError> {
        let directory = self.directory.unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY));
        let storage = ConfigStorage::builder()
            .root(&directory)
            .create(true)
            .default_files(self.defaults)
            .open()
            .context(format!("Failed to open {}", directory.display()))?;

        info!(root = %storage.root().display(), "Opened configuration directory");
        Ok(Bindery {
            storage,
            naming: self.naming.unwrap_or_else(|| Arc::new(NameStyle::default())),
            comment_style: self.comment_style,
            translate_colors: self.translate_colors,
            registry: Arc::new(self.registry.unwrap_or_else(global::registry)),
            configs: RwLock::new(FxHashMap::default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_get_one_suffix() {
        assert_eq!(file_name("server"), "server.yml");
        assert_eq!(file_name("server.yml"), "server.yml");
        assert_eq!(file_name("nested/chat"), "nested/chat.yml");
    }
}
