pub mod metrics;

pub use metrics::{PollMetrics, PollSnapshot};
