use std::path::PathBuf;

pub const TERMUX_MARKER: &str = "/data/data/com.termux";

/// Detects whether the Termux GPS tooling is expected to be present.
#[derive(Debug, Clone)]
pub struct PlatformProbe {
    marker: PathBuf,
}

impl PlatformProbe {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn termux() -> Self {
        Self::new(TERMUX_MARKER)
    }

    pub fn is_supported(&self) -> bool {
        self.marker.is_dir()
    }
}

impl Default for PlatformProbe {
    fn default() -> Self {
        Self::termux()
    }
}
