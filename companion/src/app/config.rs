use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STORAGE_DIR: &str =
    "/data/data/com.termux/files/home/lxmf-cli/lxmf_client_storage";

const MAP_FILE: &str = "rangetest.html";
const POINTS_FILE: &str = "rangetest.json";
const COMMAND_FILE: &str = "rtcom_command.txt";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub host: IpAddr,
    pub port: u16,
    pub storage_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub platform_marker: PathBuf,
    pub location_program: String,
    pub gps_interval_ms: u64,
    pub gps_timeout_ms: u64,
    pub network_timeout_ms: u64,
    pub mailbox_settle_ms: u64,
    /// How often the front end polls the points endpoint.
    pub points_refresh_secs: u64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8033,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            downloads_dir: PathBuf::from("/sdcard/Download"),
            platform_marker: PathBuf::from(rtcomcore::rangetest::platform::TERMUX_MARKER),
            location_program: "termux-location".into(),
            gps_interval_ms: 1000,
            gps_timeout_ms: 2000,
            network_timeout_ms: 1000,
            mailbox_settle_ms: 100,
            points_refresh_secs: 5,
        }
    }
}

/// Values given on the command line; each one overrides the file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub storage_dir: Option<PathBuf>,
    pub downloads_dir: Option<PathBuf>,
    pub gps_interval_ms: Option<u64>,
}

impl CompanionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading companion config {}", path_ref.display()))?;
        let config: CompanionConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing companion config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dir) = overrides.storage_dir {
            self.storage_dir = dir;
        }
        if let Some(dir) = overrides.downloads_dir {
            self.downloads_dir = dir;
        }
        if let Some(interval) = overrides.gps_interval_ms {
            self.gps_interval_ms = interval;
        }
        self
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn map_file(&self) -> PathBuf {
        self.storage_dir.join(MAP_FILE)
    }

    pub fn points_file(&self) -> PathBuf {
        self.storage_dir.join(POINTS_FILE)
    }

    pub fn command_file(&self) -> PathBuf {
        self.storage_dir.join(COMMAND_FILE)
    }

    pub fn gps_interval(&self) -> Duration {
        Duration::from_millis(self.gps_interval_ms)
    }

    pub fn gps_timeout(&self) -> Duration {
        Duration::from_millis(self.gps_timeout_ms)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn mailbox_settle(&self) -> Duration {
        Duration::from_millis(self.mailbox_settle_ms)
    }
}
