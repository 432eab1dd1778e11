mod command;

pub use command::{Command, CommandStatus, CommandV2, CommandV2Log, COMMAND_STATUSES};
