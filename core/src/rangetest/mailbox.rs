use crate::prelude::{CompanionError, CompanionResult};
use log::info;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_PING_COUNT: u32 = 10;
pub const DEFAULT_PING_DELAY: u32 = 5;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

const MISSING_FIELDS: &str = "Missing required fields";

/// Dispatch request as posted by a client. Numeric fields may arrive as JSON
/// numbers or as numeric strings (HTML form values).
///
/// Only a JSON object deserializes; arrays and scalars are rejected.
#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
    pub contact_index: Option<Value>,
    pub command: Option<Value>,
    pub ping_count: Option<Value>,
    pub ping_delay: Option<Value>,
}

impl<'de> Deserialize<'de> for DispatchRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            contact_index: fields.remove("contact_index"),
            command: fields.remove("command"),
            ping_count: fields.remove("ping_count"),
            ping_delay: fields.remove("ping_delay"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    StartRangeTest { ping_count: u32, ping_delay: u32 },
    StopRangeTest,
}

impl CommandKind {
    /// Two-letter code understood by the bridge plugin.
    pub fn code(&self) -> &'static str {
        match self {
            CommandKind::StartRangeTest { .. } => "rt",
            CommandKind::StopRangeTest => "rs",
        }
    }
}

/// A validated command ready to be written to the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchCommand {
    pub contact_index: u32,
    pub kind: CommandKind,
}

impl DispatchCommand {
    pub fn start(contact_index: u32, ping_count: u32, ping_delay: u32) -> Self {
        Self {
            contact_index,
            kind: CommandKind::StartRangeTest {
                ping_count,
                ping_delay,
            },
        }
    }

    pub fn stop(contact_index: u32) -> Self {
        Self {
            contact_index,
            kind: CommandKind::StopRangeTest,
        }
    }

    pub fn protocol_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DispatchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s {} {}", self.contact_index, self.kind.code())?;
        if let CommandKind::StartRangeTest {
            ping_count,
            ping_delay,
        } = self.kind
        {
            write!(f, " {} {}", ping_count, ping_delay)?;
        }
        Ok(())
    }
}

impl TryFrom<&DispatchRequest> for DispatchCommand {
    type Error = CompanionError;

    fn try_from(request: &DispatchRequest) -> CompanionResult<Self> {
        let contact_index = present(&request.contact_index);
        let command = present(&request.command);
        let (Some(contact_index), Some(command)) = (contact_index, command) else {
            return Err(CompanionError::Validation(MISSING_FIELDS.into()));
        };

        let contact_index = parse_count(contact_index, "contact_index")?;
        let command = command
            .as_str()
            .map(str::trim)
            .ok_or_else(|| CompanionError::Validation("Unknown command".into()))?;

        match command {
            "start" | "rt" => {
                let ping_count = match present(&request.ping_count) {
                    Some(value) => parse_count(value, "ping_count")?,
                    None => DEFAULT_PING_COUNT,
                };
                let ping_delay = match present(&request.ping_delay) {
                    Some(value) => parse_count(value, "ping_delay")?,
                    None => DEFAULT_PING_DELAY,
                };
                Ok(DispatchCommand::start(contact_index, ping_count, ping_delay))
            }
            "stop" | "rs" => Ok(DispatchCommand::stop(contact_index)),
            _ => Err(CompanionError::Validation("Unknown command".into())),
        }
    }
}

/// Treats JSON `null` and blank strings as absent.
fn present(value: &Option<Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn parse_count(value: &Value, field: &str) -> CompanionResult<u32> {
    let parsed = match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        CompanionError::Validation(format!("{} must be a non-negative integer", field))
    })
}

/// Single-slot command file watched by the bridge plugin.
///
/// Each delivery replaces the whole file. The bridge clears the file after
/// reading it; nothing here can confirm that happened.
#[derive(Debug, Clone)]
pub struct CommandMailbox {
    path: PathBuf,
    settle: Duration,
}

impl CommandMailbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settle: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Pause after each write so the bridge's next poll sees the whole line.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Validates the request and, only if it is well formed, delivers it.
    /// Returns the protocol line that was written.
    pub async fn dispatch(&self, request: &DispatchRequest) -> CompanionResult<String> {
        let command = DispatchCommand::try_from(request)?;
        self.deliver(&command).await
    }

    pub async fn deliver(&self, command: &DispatchCommand) -> CompanionResult<String> {
        let line = command.protocol_line();
        tokio::fs::write(&self.path, format!("{}\n", line))
            .await
            .map_err(|err| {
                CompanionError::io(format!("writing {}", self.path.display()), err)
            })?;
        sleep(self.settle).await;
        info!("command queued for bridge: {}", line);
        Ok(line)
    }
}
