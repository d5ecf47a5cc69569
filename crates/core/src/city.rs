//! Validated city input.

use crate::error::{Error, Result};
use std::fmt;

/// A city name as requested by a client, trimmed and known to be non-empty.
///
/// The original spelling is what gets sent upstream; the cache key is derived
/// from its lowercase form so lookups are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct City(String);

impl City {
    /// Parse a raw `city` query value.
    ///
    /// Missing, empty and whitespace-only values are rejected.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            Some(city) if !city.is_empty() => Ok(Self(city.to_string())),
            _ => Err(Error::MissingCity),
        }
    }

    /// The trimmed city name, in the client's original casing.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key for this city: `weather:<lowercased city>`.
    pub fn cache_key(&self) -> String {
        format!("{}{}", crate::CACHE_KEY_PREFIX, self.0.to_lowercase())
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
