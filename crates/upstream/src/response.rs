//! Provider response shapes.
//!
//! Only the fields the record needs are modeled; everything else in the
//! provider payload is ignored.

use serde::Deserialize;
use stratus_core::WeatherRecord;

/// Body of a `current.json` response.
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub location: Location,
    pub current: Current,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct Current {
    pub temp_c: f64,
    pub condition: Condition,
    pub humidity: f64,
    pub wind_kph: f64,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    pub text: String,
}

impl CurrentResponse {
    /// Normalize into a record tagged with `source`.
    pub fn into_record(self, source: &str) -> WeatherRecord {
        WeatherRecord {
            city: self.location.name,
            country: self.location.country,
            temperature: self.current.temp_c,
            condition: self.current.condition.text,
            humidity: self.current.humidity,
            wind_kph: self.current.wind_kph,
            source: source.to_string(),
        }
    }
}
