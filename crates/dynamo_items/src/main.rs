use std::fmt::Debug;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dynamo_items::demo::{self, DemoMappers};
use dynamo_items::storage::InMemoryStore;
use dynamo_items::Config;
use dynamo_items_core::{ItemStore, Record, RecordMapper, Registry};

/// dynamo-items - Map typed records onto a single DynamoDB table
#[derive(Parser, Debug)]
#[command(name = "dynamo-items")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Table name
    #[arg(long, global = true, env = "DYDB_TABLE_NAME")]
    table: Option<String>,

    /// Treat the table as having a partition key only
    #[arg(long, global = true)]
    no_sort_key: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the key prefixes allocated to the demo record kinds
    Prefixes,

    /// Write and read back the demo records
    Demo {
        /// Storage backend to run against
        #[arg(long, value_enum, default_value_t = Backend::Memory)]
        backend: Backend,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Dynamodb,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynamo_items=debug,dynamo_items_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(table) = cli.table {
        config.table_name = table;
    }
    if cli.no_sort_key {
        config.sort_key = false;
    }

    let table = config.table_spec();
    let mut registry = Registry::new();
    let mappers = demo::register_demo_kinds(&table, &mut registry)?;

    match cli.command {
        Commands::Prefixes => print_prefixes(&mappers),
        Commands::Demo { backend } => {
            let store = open_store(backend, &config).await?;
            let report = demo::run(&mappers, store.as_ref()).await?;

            print_record(&mappers.command, &report.command)?;
            if let Some(device) = &mappers.device {
                if let Some(command) = &report.device_command {
                    print_record(&device.command, command)?;
                }
                if let Some(log) = &report.device_log {
                    print_record(&device.log, log)?;
                }
            }
        }
    }

    Ok(())
}

fn print_prefixes(mappers: &DemoMappers) {
    println!(
        "{:<14} {:<10} {:<12} {:<8} ORIGIN",
        "KIND", "ROLE", "FIELD", "PREFIX"
    );
    for row in mappers.prefix_rows() {
        println!(
            "{:<14} {:<10} {:<12} {:<8} {}",
            row.kind,
            row.role.to_string(),
            row.field,
            row.prefix.as_deref().unwrap_or("-"),
            row.origin
        );
    }
}

/// Prints a decoded record followed by the item it is stored as.
fn print_record<T: Record + Debug>(mapper: &RecordMapper<T>, record: &T) -> Result<()> {
    let mut attributes: Vec<_> = mapper.to_item(record)?.into_iter().collect();
    attributes.sort_by(|a, b| a.0.cmp(&b.0));

    println!("{}: {:?}", mapper.shape().kind(), record);
    for (name, value) in attributes {
        println!("  {name} = {value}");
    }
    Ok(())
}

async fn open_store(backend: Backend, config: &Config) -> Result<Box<dyn ItemStore>> {
    match backend {
        Backend::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Box::new(InMemoryStore::new()))
        }
        Backend::Dynamodb => open_dynamodb(config).await,
    }
}

#[cfg(feature = "dynamodb")]
async fn open_dynamodb(config: &Config) -> Result<Box<dyn ItemStore>> {
    use dynamo_items::storage::DynamoDbStore;

    tracing::info!(
        table = %config.table_name,
        target = %config.target_display(),
        "Using DynamoDB store"
    );
    Ok(Box::new(DynamoDbStore::from_config(config).await?))
}

#[cfg(not(feature = "dynamodb"))]
async fn open_dynamodb(_config: &Config) -> Result<Box<dyn ItemStore>> {
    anyhow::bail!("the dynamodb backend requires building with `--features dynamodb`")
}
