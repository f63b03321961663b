use crate::location::LocationReading;
use std::future::Future;
use std::path::PathBuf;

/// Failures that cross a component boundary as values.
///
/// An unavailable location source or an unreadable point log are not errors:
/// they surface as `None` and an empty list respectively.
#[derive(thiserror::Error, Debug)]
pub enum CompanionError {
    #[error("{0}")]
    Validation(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No range test data to export")]
    ArtifactMissing(PathBuf),
    #[error("{} not found", .0.display())]
    DestinationMissing(PathBuf),
    #[error("{0}")]
    Unsupported(String),
}

impl CompanionError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CompanionError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type CompanionResult<T> = Result<T, CompanionError>;

/// Anything able to produce a single validated position fix on demand.
///
/// Implementations swallow every provider failure and report it as `None`;
/// the poller never sees an error path.
pub trait LocationSource: Send + Sync + 'static {
    fn acquire(&self) -> impl Future<Output = Option<LocationReading>> + Send;
}
