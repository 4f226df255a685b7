mod bind;
mod store;

pub use bind::{BindError, BindErrorExt};
pub use store::{StoreError, StoreErrorExt};

/// Result alias used across the binding engine.
pub type Result<T, E = BindError> = std::result::Result<T, E>;
