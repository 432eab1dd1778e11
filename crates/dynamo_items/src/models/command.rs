use chrono::{DateTime, Utc};
use dynamo_items_core::{FieldType, Record, RecordShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored values of [`CommandStatus`], in declaration order.
pub const COMMAND_STATUSES: &[&str] = &["pending", "failed", "complete"];

/// Lifecycle state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    #[default]
    Pending,
    Failed,
    Complete,
}

/// A command addressed by its own ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command_id: Uuid,
    #[serde(default)]
    pub status: CommandStatus,
    #[serde(default)]
    pub retry: i64,
}

impl Command {
    /// Creates a pending command that has not been retried.
    pub fn new(command_id: Uuid) -> Self {
        Self {
            command_id,
            status: CommandStatus::Pending,
            retry: 0,
        }
    }

    pub fn with_status(mut self, status: CommandStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_retry(mut self, retry: i64) -> Self {
        self.retry = retry;
        self
    }
}

impl Record for Command {
    fn shape() -> RecordShape {
        RecordShape::builder("Command")
            .field("command_id", FieldType::Uuid)
            .with_default("status", FieldType::Enum(COMMAND_STATUSES), "pending")
            .with_default("retry", FieldType::Integer, 0)
            .build()
    }
}

/// A command sent to a device, stored in the device's item collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandV2 {
    pub device_id: String,
    pub command_id: Uuid,
    #[serde(default)]
    pub status: CommandStatus,
}

impl CommandV2 {
    pub fn new(device_id: impl Into<String>, command_id: Uuid) -> Self {
        Self {
            device_id: device_id.into(),
            command_id,
            status: CommandStatus::Pending,
        }
    }
}

impl Record for CommandV2 {
    fn shape() -> RecordShape {
        RecordShape::builder("CommandV2")
            .field("device_id", FieldType::String)
            .field("command_id", FieldType::Uuid)
            .with_default("status", FieldType::Enum(COMMAND_STATUSES), "pending")
            .build()
    }
}

/// A log line written next to a device's commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandV2Log {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub log: String,
}

impl CommandV2Log {
    pub fn new(device_id: impl Into<String>, timestamp: DateTime<Utc>, log: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            log: log.into(),
        }
    }
}

impl Record for CommandV2Log {
    fn shape() -> RecordShape {
        RecordShape::builder("CommandV2Log")
            .field("device_id", FieldType::String)
            .field("timestamp", FieldType::DateTime)
            .field("log", FieldType::String)
            .build()
    }
}
