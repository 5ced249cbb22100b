//! Client code for the offline cache engine.
//!
//! This crate provides the HTTP transport the engine falls back from: a
//! [`Fetcher`] trait and its reqwest implementation.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
