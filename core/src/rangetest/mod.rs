pub mod export;
pub mod mailbox;
pub mod platform;
pub mod points;

pub use export::{ExportedMap, MapExporter};
pub use mailbox::{CommandKind, CommandMailbox, DispatchCommand, DispatchRequest};
pub use platform::PlatformProbe;
pub use points::{LoggedPoint, PointLogReader};
