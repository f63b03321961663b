use crate::app::config::CompanionConfig;
use log::{info, warn};
use rtcomcore::location::TermuxLocationSource;
use rtcomcore::rangetest::{CommandMailbox, MapExporter, PlatformProbe, PointLogReader};
use rtcomcore::state::{GpsPoller, LiveStateCache, PollerHandle};
use std::path::PathBuf;

/// Everything the HTTP layer reads from or writes to. Cheap to clone; the
/// live state slot is shared between clones.
#[derive(Clone, Debug)]
pub struct CompanionServices {
    pub live: LiveStateCache,
    pub points: PointLogReader,
    pub mailbox: CommandMailbox,
    pub exporter: MapExporter,
    pub platform: PlatformProbe,
    pub map_file: PathBuf,
}

impl CompanionServices {
    pub fn from_config(config: &CompanionConfig) -> Self {
        let platform = PlatformProbe::new(&config.platform_marker);
        Self {
            live: LiveStateCache::new(),
            points: PointLogReader::new(config.points_file()),
            mailbox: CommandMailbox::new(config.command_file())
                .with_settle_delay(config.mailbox_settle()),
            exporter: MapExporter::new(
                config.map_file(),
                &config.downloads_dir,
                platform.clone(),
            ),
            platform,
            map_file: config.map_file(),
        }
    }

    /// Starts GPS polling when the platform supports it. Otherwise the live
    /// state stays unavailable for the lifetime of the process.
    pub fn start_poller(&self, config: &CompanionConfig) -> Option<PollerHandle> {
        if !self.platform.is_supported() {
            warn!("GPS tracking disabled (not on Termux)");
            return None;
        }
        let source = TermuxLocationSource::with_default_tiers(
            &config.location_program,
            config.gps_timeout(),
            config.network_timeout(),
        );
        info!("GPS tracking enabled via {}", config.location_program);
        Some(
            GpsPoller::new(source, self.live.clone())
                .with_interval(config.gps_interval())
                .start(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn poller_is_not_started_off_platform() {
        let dir = tempdir().unwrap();
        let config = CompanionConfig {
            storage_dir: dir.path().to_path_buf(),
            platform_marker: dir.path().join("com.termux"),
            ..Default::default()
        };
        let services = CompanionServices::from_config(&config);
        assert!(services.start_poller(&config).is_none());
        assert!(!services.live.read().available);
    }

    #[tokio::test]
    async fn poller_runs_on_platform_and_stops_cleanly() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("com.termux");
        std::fs::create_dir(&marker).unwrap();
        let config = CompanionConfig {
            storage_dir: dir.path().to_path_buf(),
            platform_marker: marker,
            location_program: "/nonexistent/termux-location".into(),
            gps_interval_ms: 5,
            ..Default::default()
        };
        let services = CompanionServices::from_config(&config);
        let handle = services.start_poller(&config).unwrap();
        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.fresh, 0);
        assert!(!services.live.read().available);
    }
}
