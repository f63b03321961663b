use rtcomcore::rangetest::{ExportedMap, LoggedPoint};
use rtcomcore::state::LiveState;
use serde::Serialize;
use std::path::PathBuf;

/// Body of `GET /api/current_gps`. Every field except `available` is null
/// while no fix is held.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentGpsPayload {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    /// Metres per second.
    pub speed: Option<f64>,
    pub altitude: Option<f64>,
    pub bearing: Option<f64>,
    pub provider: Option<String>,
    pub timestamp: Option<String>,
    pub available: bool,
}

impl From<LiveState> for CurrentGpsPayload {
    fn from(state: LiveState) -> Self {
        match state.reading {
            Some(reading) if state.available => Self {
                latitude: Some(reading.latitude),
                longitude: Some(reading.longitude),
                accuracy: Some(reading.accuracy),
                speed: Some(reading.speed),
                altitude: Some(reading.altitude),
                bearing: reading.bearing,
                provider: Some(reading.provider),
                timestamp: Some(reading.captured_at.to_rfc3339()),
                available: true,
            },
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PointsPayload {
    pub points: Vec<LoggedPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DispatchResponse {
    Sent {
        success: bool,
        message: String,
        note: &'static str,
    },
    Failed {
        success: bool,
        error: String,
    },
}

impl DispatchResponse {
    pub fn sent(message: String) -> Self {
        DispatchResponse::Sent {
            success: true,
            message,
            note: "Command sent to LXMF-CLI via rtcom_bridge plugin",
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        DispatchResponse::Failed {
            success: false,
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExportResponse {
    Exported {
        success: bool,
        filename: String,
        path: PathBuf,
    },
    Failed {
        success: bool,
        error: String,
    },
}

impl From<ExportedMap> for ExportResponse {
    fn from(exported: ExportedMap) -> Self {
        ExportResponse::Exported {
            success: true,
            filename: exported.filename,
            path: exported.path,
        }
    }
}

impl ExportResponse {
    pub fn failed(error: impl ToString) -> Self {
        ExportResponse::Failed {
            success: false,
            error: error.to_string(),
        }
    }
}
