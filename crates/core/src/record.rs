//! Normalized current-weather record.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Current weather for one city, in the shape served to clients.
///
/// The same JSON is written to the cache store. Records are never mutated in
/// place: a cache hit produces a new record through [`WeatherRecord::into_cached`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// City name as reported by the provider.
    pub city: String,
    /// Country name as reported by the provider.
    pub country: String,
    /// Temperature in degrees Celsius.
    #[serde(serialize_with = "number::serialize")]
    pub temperature: f64,
    /// Human-readable condition, e.g. "Partly cloudy".
    pub condition: String,
    /// Relative humidity in percent.
    #[serde(serialize_with = "number::serialize")]
    pub humidity: f64,
    /// Wind speed in km/h.
    #[serde(serialize_with = "number::serialize")]
    pub wind_kph: f64,
    /// Provider identifier, or `"cache"` when served from the cache.
    pub source: String,
}

impl WeatherRecord {
    /// Consume the record and return it tagged as served from the cache.
    pub fn into_cached(self) -> Self {
        Self {
            source: crate::CACHE_SOURCE.to_string(),
            ..self
        }
    }

    /// Serialize to the JSON form stored in the cache.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a record previously written with [`WeatherRecord::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Whole numbers render without a fractional part (`18`, not `18.0`),
/// matching how the provider and existing clients format them.
mod number {
    use serde::Serializer;

    /// Largest integer an f64 represents exactly.
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }
}
