pub mod live;
pub mod poller;

pub use live::{LiveState, LiveStateCache};
pub use poller::{GpsPoller, PollerHandle, DEFAULT_POLL_INTERVAL};
