//! Configuration types
//!
//! Compile-time defaults for the CH32V003 plus plain structures an
//! application can persist as postcard binary data.

pub mod types;

pub use types::*;
