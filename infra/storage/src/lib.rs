//! Sandboxed storage for configuration files.
//!
//! It provides a secure abstraction over one configuration directory with built-in protections
//! against common I/O pitfalls. All examples use temporary directories to avoid writing to the
//! real filesystem.
//!
//! # Core Features
//!
//! - **Sandbox Security**: Strict path traversal protection using physical path canonicalization.
//! - **Atomic Writes**: Uses an "atomic swap" pattern (unique temp write + `fsync` + `rename`) to prevent data corruption during crashes.
//! - **Bundled Defaults**: Files registered with [`StorageBuilder::default_file`] are copied on first use; other files start empty.
//! - **Self-Healing**: Automatically identifies and cleans up orphaned temporary files during initialization.
//!
//! # Examples
//!
//! ```rust
//! use bindery_storage::{Bootstrap, ConfigStorage, StorageError};
//!
//! fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("config");
//!     let storage = ConfigStorage::builder().root(&root).create(true).open()?;
//!
//!     // No bundled default for this name: an empty file is created.
//!     assert_eq!(storage.bootstrap("messages.yml")?, Bootstrap::CreatedEmpty);
//!
//!     storage.write("messages.yml", b"greeting: hello\n")?;
//!     assert_eq!(storage.read_to_string("messages.yml")?, "greeting: hello\n");
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::StorageBuilder;
pub use engine::{Bootstrap, ConfigStorage};
pub use error::{StorageError, StorageErrorExt};
