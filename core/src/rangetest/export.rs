use crate::prelude::{CompanionError, CompanionResult};
use crate::rangetest::platform::PlatformProbe;
use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

/// Where an exported copy of the map ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedMap {
    pub filename: String,
    pub path: PathBuf,
}

/// Copies the logger's HTML map into a user-visible downloads directory.
#[derive(Debug, Clone)]
pub struct MapExporter {
    artifact: PathBuf,
    downloads_dir: PathBuf,
    platform: PlatformProbe,
}

impl MapExporter {
    pub fn new(
        artifact: impl Into<PathBuf>,
        downloads_dir: impl Into<PathBuf>,
        platform: PlatformProbe,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            downloads_dir: downloads_dir.into(),
            platform,
        }
    }

    pub fn export(&self) -> CompanionResult<ExportedMap> {
        self.export_at(Local::now())
    }

    pub fn export_at(&self, now: DateTime<Local>) -> CompanionResult<ExportedMap> {
        if !self.platform.is_supported() {
            return Err(CompanionError::Unsupported(
                "Export only works on Termux/Android".into(),
            ));
        }
        if !self.downloads_dir.is_dir() {
            return Err(CompanionError::DestinationMissing(self.downloads_dir.clone()));
        }
        if !self.artifact.is_file() {
            return Err(CompanionError::ArtifactMissing(self.artifact.clone()));
        }

        let filename = export_filename(now);
        let path = self.downloads_dir.join(&filename);
        std::fs::copy(&self.artifact, &path).map_err(|err| {
            CompanionError::io(format!("copying map to {}", path.display()), err)
        })?;
        info!("map exported to {}", path.display());

        Ok(ExportedMap { filename, path })
    }
}

pub fn export_filename(now: DateTime<Local>) -> String {
    format!("rangetest_{}.html", now.format("%Y%m%d_%H%M%S"))
}
