use crate::location::reading::{parse_fix, LocationReading};
use crate::prelude::LocationSource;
use log::debug;
use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// One provider attempt: the `-p` argument and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTier {
    pub name: String,
    pub timeout: Duration,
}

impl ProviderTier {
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
        }
    }

    pub fn gps(timeout: Duration) -> Self {
        Self::new("gps", timeout)
    }

    pub fn network(timeout: Duration) -> Self {
        Self::new("network", timeout)
    }
}

/// Location source backed by the `termux-location` command.
///
/// Tiers are tried in order; the first valid fix wins.
#[derive(Debug, Clone)]
pub struct TermuxLocationSource {
    program: OsString,
    leading_args: Vec<OsString>,
    tiers: Vec<ProviderTier>,
}

impl TermuxLocationSource {
    pub fn new(program: impl Into<OsString>, tiers: Vec<ProviderTier>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            tiers,
        }
    }

    /// High-accuracy GPS first, then the coarse network provider.
    pub fn with_default_tiers(
        program: impl Into<OsString>,
        gps_timeout: Duration,
        network_timeout: Duration,
    ) -> Self {
        Self::new(
            program,
            vec![
                ProviderTier::gps(gps_timeout),
                ProviderTier::network(network_timeout),
            ],
        )
    }

    /// Arguments placed before `-p <tier> -r once`, e.g. a script path when
    /// `program` is an interpreter.
    pub fn with_leading_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    async fn query(&self, tier: &ProviderTier) -> Option<LocationReading> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .args(["-p", tier.name.as_str(), "-r", "once"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(tier.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                debug!("{} provider failed to launch: {}", tier.name, err);
                return None;
            }
            Err(_) => {
                debug!("{} provider timed out after {:?}", tier.name, tier.timeout);
                return None;
            }
        };

        if !output.status.success() {
            debug!("{} provider exited with {}", tier.name, output.status);
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reading = parse_fix(&stdout, &tier.name);
        if reading.is_none() {
            debug!("{} provider returned no usable fix", tier.name);
        }
        reading
    }
}

impl LocationSource for TermuxLocationSource {
    async fn acquire(&self) -> Option<LocationReading> {
        for tier in &self.tiers {
            if let Some(reading) = self.query(tier).await {
                return Some(reading);
            }
        }
        None
    }
}
