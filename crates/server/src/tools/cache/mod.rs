//! Cache inspection tools.
//!
//! This module provides read-only access to the active generation's stores.

pub mod get;

pub use get::{CacheGetParams, get_impl};
