//! Demo record kinds and the end-to-end walkthrough run by the CLI.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use dynamo_items_core::mapping::PrefixOrigin;
use dynamo_items_core::{
    ItemStore, Key, KeyRole, KeySpec, MapperError, RecordMapper, Registry, TableSpec,
};

use crate::models::{Command, CommandV2, CommandV2Log};

/// Device used by the item collection walkthrough.
pub const DEMO_DEVICE_ID: &str = "device-0001";

/// Mappers for every demo kind registered against one table.
#[derive(Debug, Clone)]
pub struct DemoMappers {
    pub command: RecordMapper<Command>,
    /// Only registered when the table declares a sort key.
    pub device: Option<DeviceMappers>,
}

/// Mappers for the two kinds sharing a device's item collection.
#[derive(Debug, Clone)]
pub struct DeviceMappers {
    pub command: RecordMapper<CommandV2>,
    pub log: RecordMapper<CommandV2Log>,
}

/// One resolved key, as shown by `dynamo-items prefixes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRow {
    pub kind: String,
    pub role: KeyRole,
    pub field: String,
    pub prefix: Option<String>,
    pub origin: PrefixOrigin,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    pub command: Command,
    pub device_command: Option<CommandV2>,
    pub device_log: Option<CommandV2Log>,
}

/// Registers the demo kinds against `table`.
///
/// `CommandV2` and `CommandV2Log` form an item collection keyed by device,
/// which only makes sense on a table with a sort key.
pub fn register_demo_kinds(
    table: &TableSpec,
    registry: &mut Registry,
) -> Result<DemoMappers, MapperError> {
    let command = RecordMapper::<Command>::builder(table)
        .register(registry)?
        .into_mapper();

    let device = if table.has_sort_key() {
        let device_command = RecordMapper::<CommandV2>::builder(table)
            .partition_key(Key::field("device_id"))
            .sort_key(Key::field("command_id"))
            .register(registry)?
            .into_mapper();
        let log = RecordMapper::<CommandV2Log>::builder(table)
            .partition_key(Key::inherit("device_id", device_command.partition_key()))
            .sort_key(Key::field("timestamp"))
            .register(registry)?
            .into_mapper();
        Some(DeviceMappers {
            command: device_command,
            log,
        })
    } else {
        None
    };

    Ok(DemoMappers { command, device })
}

impl DemoMappers {
    /// Every resolved key, in registration order.
    pub fn prefix_rows(&self) -> Vec<PrefixRow> {
        let mut rows = Vec::new();
        push_rows(&mut rows, &self.command);
        if let Some(device) = &self.device {
            push_rows(&mut rows, &device.command);
            push_rows(&mut rows, &device.log);
        }
        rows
    }
}

fn push_rows<T>(rows: &mut Vec<PrefixRow>, mapper: &RecordMapper<T>) {
    let kind = mapper.shape().kind();
    let keys = std::iter::once(mapper.partition_key()).chain(mapper.sort_key());
    rows.extend(keys.map(|spec: &KeySpec| PrefixRow {
        kind: kind.to_string(),
        role: spec.role(),
        field: spec.field().to_string(),
        prefix: spec.prefix().map(str::to_string),
        origin: spec.origin(),
    }));
}

/// Writes a `Command` and reads it back by its raw id, then does the same
/// for a device command and log sharing one partition.
///
/// Fails when a record is missing right after its write.
pub async fn run(mappers: &DemoMappers, store: &dyn ItemStore) -> anyhow::Result<DemoReport> {
    let command_id = Uuid::new_v4();
    mappers
        .command
        .put_item(store, &Command::new(command_id))
        .await?;
    let command = mappers
        .command
        .get_item(store, command_id, None)
        .await?
        .ok_or_else(|| missing(mappers.command.shape().kind()))?;
    tracing::info!(
        command_id = %command.command_id,
        status = ?command.status,
        retry = command.retry,
        "Command round trip complete"
    );

    let Some(device) = &mappers.device else {
        return Ok(DemoReport {
            command,
            device_command: None,
            device_log: None,
        });
    };

    let device_command = CommandV2::new(DEMO_DEVICE_ID, command_id);
    device.command.put_item(store, &device_command).await?;

    let timestamp = Utc
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let log = CommandV2Log::new(DEMO_DEVICE_ID, timestamp, "command queued");
    device.log.put_item(store, &log).await?;

    let (pk, sk) = device.command.raw_keys(&device_command)?;
    let device_command = device
        .command
        .get_item(store, pk, sk)
        .await?
        .ok_or_else(|| missing(device.command.shape().kind()))?;

    let (pk, sk) = device.log.raw_keys(&log)?;
    let device_log = device
        .log
        .get_item(store, pk, sk)
        .await?
        .ok_or_else(|| missing(device.log.shape().kind()))?;
    tracing::info!(
        device_id = DEMO_DEVICE_ID,
        "Device command and log stored in one item collection"
    );

    Ok(DemoReport {
        command,
        device_command: Some(device_command),
        device_log: Some(device_log),
    })
}

fn missing(kind: &str) -> anyhow::Error {
    anyhow::anyhow!("{kind} was not found right after being written")
}
