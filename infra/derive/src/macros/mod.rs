pub mod attrs;
pub mod error;
pub mod interface;
pub mod object;
