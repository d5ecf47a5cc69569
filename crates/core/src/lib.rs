//! Core domain types and shared logic for the stratus weather cache.
//!
//! This crate defines the data model used across all other crates:
//! - The normalized weather record served to clients and kept in the cache
//! - Validated city input and its cache key
//! - Configuration for the server, cache, store, upstream and rate limiter

pub mod city;
pub mod config;
pub mod error;
pub mod record;

pub use city::City;
pub use error::{Error, Result};
pub use record::WeatherRecord;

/// Namespace prepended to every cache key.
pub const CACHE_KEY_PREFIX: &str = "weather:";

/// Source tag reported for records served from the cache.
pub const CACHE_SOURCE: &str = "cache";

/// Default cache TTL: 12 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 12 * 60 * 60;
