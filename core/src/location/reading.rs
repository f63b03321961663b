use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Coordinates within this many degrees of (0, 0) on both axes are treated as
/// a provider's null-island default rather than a fix.
pub const NULL_ISLAND_EPSILON_DEG: f64 = 0.001;

/// One validated position/motion sample.
///
/// `speed` is in metres per second, the unit the location provider reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReading {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub speed: f64,
    pub altitude: f64,
    pub bearing: Option<f64>,
    pub provider: String,
    pub captured_at: DateTime<Local>,
}

pub fn coordinates_valid(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (latitude.abs() > NULL_ISLAND_EPSILON_DEG || longitude.abs() > NULL_ISLAND_EPSILON_DEG)
}

/// Raw provider payload as printed on stdout. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
struct RawFix {
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    speed: Option<f64>,
    altitude: Option<f64>,
    bearing: Option<f64>,
    provider: Option<String>,
}

/// Parses provider stdout into a reading, or `None` if the payload is empty,
/// malformed or fails the coordinate validity check.
pub fn parse_fix(stdout: &str, fallback_provider: &str) -> Option<LocationReading> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return None;
    }
    let raw: RawFix = serde_json::from_str(trimmed).ok()?;
    let (latitude, longitude) = (raw.latitude?, raw.longitude?);
    if !coordinates_valid(latitude, longitude) {
        return None;
    }

    Some(LocationReading {
        latitude,
        longitude,
        accuracy: non_negative(raw.accuracy),
        speed: non_negative(raw.speed),
        altitude: raw.altitude.unwrap_or(0.0),
        bearing: raw.bearing.filter(|b| b.is_finite()),
        provider: raw
            .provider
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| fallback_provider.to_string()),
        captured_at: Local::now(),
    })
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0)
}
