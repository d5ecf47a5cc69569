//! Provider payloads and environment checks.

use serde_json::{Value, json};
use std::net::TcpListener;

/// Path the mock provider serves.
pub const PROVIDER_PATH: &str = "/v1/current.json";

/// Whether the mock provider can listen on localhost.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// A `current.json` body with extra fields the client must ignore.
#[allow(dead_code)]
pub fn provider_body(
    name: &str,
    country: &str,
    temp_c: f64,
    condition: &str,
    humidity: u32,
    wind_kph: f64,
) -> Value {
    json!({
        "location": {
            "name": name,
            "region": "",
            "country": country,
            "lat": 0.0,
            "lon": 0.0,
            "localtime": "2024-06-01 12:00"
        },
        "current": {
            "last_updated": "2024-06-01 12:00",
            "temp_c": temp_c,
            "temp_f": temp_c * 9.0 / 5.0 + 32.0,
            "is_day": 1,
            "condition": {"text": condition, "icon": "//cdn.weatherapi.com/113.png", "code": 1000},
            "wind_kph": wind_kph,
            "humidity": humidity,
            "cloud": 0
        }
    })
}

#[allow(dead_code)]
pub fn paris_body() -> Value {
    provider_body("Paris", "France", 18.0, "Clear", 55, 10.0)
}

/// Exact response body for a fresh Paris lookup.
#[allow(dead_code)]
pub const PARIS_RESPONSE: &str = r#"{"city":"Paris","country":"France","temperature":18,"condition":"Clear","humidity":55,"wind_kph":10,"source":"weatherapi.com"}"#;

/// The provider's answer for an unknown location.
#[allow(dead_code)]
pub fn no_location_body() -> Value {
    json!({"error": {"code": 1006, "message": "No matching location found."}})
}
