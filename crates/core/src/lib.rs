//! Core types and shared functionality for the offline cache engine.
//!
//! This crate provides:
//! - Request/response model and URL canonicalization
//! - Request-keyed stores with in-memory and SQLite backends
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod message;
pub mod request;
pub mod response;
pub mod scope;
pub mod store;

pub use config::{AppConfig, ConfigError, StoreBackend};
pub use error::Error;
pub use message::ControlMessage;
pub use request::{CacheMode, Method, Request, RequestMode};
pub use response::ResponseSnapshot;
pub use scope::Scope;
pub use store::{
    CacheDb, CacheStorage, KeyValueStore, MemoryStorage, RequestKey, StoreNames, StoreRole, StoreSet,
};
