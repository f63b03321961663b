//! Live-state core for the range test companion.
//!
//! A background poller keeps the latest GPS fix in a lock-guarded slot that
//! request handlers read without ever touching the location provider. The
//! `rangetest` module wraps the files shared with the range test logger and
//! its bridge plugin: the point log, the HTML map and the command mailbox.

pub mod location;
pub mod prelude;
pub mod rangetest;
pub mod state;
pub mod telemetry;

pub use prelude::{CompanionError, CompanionResult, LocationSource};
