use crate::engine::{ConfigStorage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use private::Sealed;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tracing::info;

#[derive(Debug, Clone)]
struct StorageConfig {
    create: bool,
    defaults: BTreeMap<String, Cow<'static, str>>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { create: true, defaults: BTreeMap::new() }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StorageConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    #[must_use = "Sets whether the configuration directory should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    /// Registers the bundled contents copied into `name` when the file does not exist yet.
    #[must_use = "Registers a bundled default file"]
    pub fn default_file(
        mut self,
        name: impl Into<String>,
        contents: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.config.defaults.insert(name.into(), contents.into());
        self
    }

    #[must_use = "Registers bundled default files"]
    pub fn default_files<I, N, C>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<Cow<'static, str>>,
    {
        self.config.defaults.extend(files.into_iter().map(|(n, c)| (n.into(), c.into())));
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StorageBuilder<N> {
        StorageBuilder { state, config: self.config }
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use = "Creates a new storage builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the configuration directory"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl StorageBuilder<WithRoot> {
    /// Consumes the configuration and opens the configuration directory.
    ///
    /// This method performs the following boot sequence:
    /// 1. **Bootstrapping**: Creates the directory if `create(true)` was set.
    /// 2. **Canonicalization**: Resolves the root to an absolute, physical path on disk
    ///    to prevent symlink-based escape attacks.
    /// 3. **Self-Healing**: Removes orphaned `.binderytmp.` files left behind by
    ///    interrupted saves.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DirectoryNotFound`] if the directory does not exist and
    /// `create` is false.
    /// Returns [`StorageError::Io`] if the process lacks permissions to create or resolve
    /// the directory.
    pub fn open(self) -> Result<ConfigStorage, StorageError> {
        let root = &self.state.0;

        if self.config.create {
            fs::create_dir_all(root)
                .context(format!("Failed to bootstrap configuration directory: {}", root.display()))?;
            info!(path = %root.display(), "Bootstrapped configuration directory");
        } else if !root.is_dir() {
            return Err(StorageError::DirectoryNotFound {
                message: root.display().to_string().into(),
                context: Some("Directory creation is disabled".into()),
            });
        }

        let canonical = fs::canonicalize(root)
            .context(format!("Failed to resolve configuration directory: {}", root.display()))?;

        let storage = ConfigStorage {
            inner: Arc::new(StorageInner {
                root: canonical,
                defaults: self.config.defaults,
                tmp_counter: AtomicU64::new(1),
            }),
        };

        storage.purge_tmp();

        Ok(storage)
    }
}
