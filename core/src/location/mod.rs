pub mod reading;
pub mod termux;

pub use reading::{coordinates_valid, parse_fix, LocationReading, NULL_ISLAND_EPSILON_DEG};
pub use termux::{ProviderTier, TermuxLocationSource};
