use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// A point written by the range test logger. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub rssi: Option<f64>,
    #[serde(default)]
    pub snr: Option<f64>,
    #[serde(default, deserialize_with = "display_time")]
    pub time: String,
}

/// Accepts the display time as a string or as a bare number (epoch seconds
/// written by older loggers); anything else becomes empty.
fn display_time<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Deserialize)]
struct PointLogFile {
    #[serde(default)]
    points: Vec<Value>,
}

/// Re-reads the point log on every call. The logger rewrites the file at
/// arbitrary times, so nothing is cached.
#[derive(Debug, Clone)]
pub struct PointLogReader {
    path: PathBuf,
}

impl PointLogReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Points in stored order (first is the start, last the most recent).
    /// A missing, truncated or malformed file yields an empty list; a single
    /// malformed entry is skipped and the rest are kept.
    pub fn read(&self) -> Vec<LoggedPoint> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!("point log {} unreadable: {}", self.path.display(), err);
                return Vec::new();
            }
        };
        match serde_json::from_str::<PointLogFile>(&contents) {
            Ok(file) => {
                let stored = file.points.len();
                let points: Vec<LoggedPoint> = file
                    .points
                    .into_iter()
                    .filter_map(|entry| serde_json::from_value(entry).ok())
                    .collect();
                if points.len() < stored {
                    debug!(
                        "point log {}: skipped {} malformed entries",
                        self.path.display(),
                        stored - points.len()
                    );
                }
                points
            }
            Err(err) => {
                debug!("point log {} malformed: {}", self.path.display(), err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_empty() {
        let dir = tempdir().unwrap();
        let reader = PointLogReader::new(dir.path().join("rangetest.json"));
        assert!(reader.read().is_empty());
    }

    #[test]
    fn reads_points_in_stored_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rangetest.json");
        fs::write(
            &path,
            r#"{"session": "a", "points": [
                {"latitude": 47.1, "longitude": 19.1, "rssi": -71.5, "snr": 8.25, "time": "12:00:01"},
                {"latitude": 47.2, "longitude": 19.2, "rssi": null, "snr": null, "time": "12:00:06"},
                {"latitude": 47.3, "longitude": 19.3, "time": "12:00:11"}
            ]}"#,
        )
        .unwrap();

        let points = PointLogReader::new(&path).read();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].rssi, Some(-71.5));
        assert_eq!(points[0].snr, Some(8.25));
        assert_eq!(points[1].rssi, None);
        assert_eq!(points[2].time, "12:00:11");
        assert_eq!(points[2].latitude, 47.3);
    }

    #[test]
    fn truncated_or_wrong_shape_yields_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rangetest.json");
        let reader = PointLogReader::new(&path);

        fs::write(&path, r#"{"points": [{"latitude": 47.1, "longi"#).unwrap();
        assert!(reader.read().is_empty());

        fs::write(&path, r#"{"points": "nope"}"#).unwrap();
        assert!(reader.read().is_empty());

        fs::write(&path, r#"{"other": []}"#).unwrap();
        assert!(reader.read().is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rangetest.json");
        fs::write(
            &path,
            r#"{"points": [
                {"latitude": 47.1, "longitude": 19.1, "rssi": -70.0, "time": "12:00:01"},
                {"latitude": 47.2, "longitude": 19.2, "time": 1700000000},
                {"latitude": null, "longitude": 19.3, "time": "12:00:11"},
                "garbage",
                {"latitude": 47.4, "longitude": 19.4, "snr": 6.5, "time": "12:00:21"}
            ]}"#,
        )
        .unwrap();

        let points = PointLogReader::new(&path).read();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].time, "12:00:01");
        assert_eq!(points[1].latitude, 47.2);
        assert_eq!(points[1].time, "1700000000");
        assert_eq!(points[2].snr, Some(6.5));
    }

    #[test]
    fn picks_up_external_rewrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rangetest.json");
        let reader = PointLogReader::new(&path);

        fs::write(&path, r#"{"points": []}"#).unwrap();
        assert!(reader.read().is_empty());

        fs::write(
            &path,
            r#"{"points": [{"latitude": 1.0, "longitude": 2.0, "time": "t"}]}"#,
        )
        .unwrap();
        assert_eq!(reader.read().len(), 1);
    }
}
