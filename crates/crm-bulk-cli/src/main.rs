//! crm-bulk CLI - chunked bulk transfer against a page-capped record store.

use clap::{Parser, Subcommand};
use crm_bulk::{
    BulkClient, BulkError, Config, FetchOptions, InsertOptions, InsertRows, Record,
    SearchOptions, UpdateOptions, UpdatedAfterOptions,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "crm-bulk")]
#[command(about = "Chunked bulk transfer against a page-capped remote record store")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API auth token
    #[arg(long, env = "CRM_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch records by id
    FetchById {
        /// Module name (e.g. Leads)
        module: String,

        /// Record ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Remote newFormat (1 omits null fields, 2 includes them)
        #[arg(long)]
        new_format: Option<u8>,
    },

    /// Fetch records modified after a watermark, oldest first
    UpdatedAfter {
        module: String,

        /// Watermark as "YYYY-MM-DD HH:MM:SS"
        since: String,

        /// Soft cap on records fetched
        #[arg(long)]
        limit: Option<usize>,

        /// Comma-separated labels to fetch
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        #[arg(long)]
        new_format: Option<u8>,
    },

    /// Fetch records whose field equals any of the given values
    ValueIn {
        module: String,

        /// Field label to match
        key: String,

        /// Values to match
        values: Vec<String>,

        /// Only match records modified after this watermark
        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        new_format: Option<u8>,
    },

    /// Fetch the first page of records matching a criteria expression
    Criteria {
        module: String,

        /// Criteria expression, e.g. "(Company:Acme)"
        criteria: String,

        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        new_format: Option<u8>,
    },

    /// Insert one record (JSON object) or a batch (JSON array)
    Insert {
        module: String,

        /// JSON file holding the rows
        #[arg(long)]
        rows: PathBuf,

        /// 1 rejects duplicates, 2 updates the existing record
        #[arg(long)]
        duplicate_check: Option<u8>,

        /// Trigger workflow rules (single record only)
        #[arg(long)]
        wf_trigger: Option<bool>,

        #[arg(long)]
        is_approval: Option<bool>,

        /// Lead assignment rule id (single record only)
        #[arg(long)]
        larid: Option<String>,

        #[arg(long)]
        new_format: Option<u8>,
    },

    /// Update a single record by id
    Update {
        module: String,

        /// Record id
        id: String,

        /// JSON file holding one row
        #[arg(long)]
        rows: PathBuf,

        #[arg(long)]
        wf_trigger: Option<bool>,

        #[arg(long)]
        larid: Option<String>,

        #[arg(long)]
        new_format: Option<u8>,
    },

    /// Update a batch of records, each carrying its Id
    UpdateBulk {
        module: String,

        /// JSON file holding an array of rows
        #[arg(long)]
        rows: PathBuf,

        #[arg(long)]
        wf_trigger: Option<bool>,

        #[arg(long)]
        new_format: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), BulkError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    let token = cli.auth_token.ok_or_else(|| {
        BulkError::Config("auth token required: pass --auth-token or set CRM_AUTH_TOKEN".into())
    })?;
    let client = BulkClient::new(config, token)?;

    let output = match cli.command {
        Commands::FetchById {
            module,
            ids,
            new_format,
        } => {
            let records = client
                .fetch_by_id(&module, &ids, &FetchOptions { new_format })
                .await?;
            serde_json::to_string_pretty(&records)?
        }

        Commands::UpdatedAfter {
            module,
            since,
            limit,
            columns,
            new_format,
        } => {
            let opts = UpdatedAfterOptions {
                limit,
                select_columns: columns,
                new_format,
            };
            let records = client.fetch_updated_after(&module, &since, &opts).await?;
            serde_json::to_string_pretty(&records)?
        }

        Commands::ValueIn {
            module,
            key,
            values,
            since,
            new_format,
        } => {
            let opts = SearchOptions {
                watermark: since,
                new_format,
            };
            let records = client
                .fetch_by_value_in(&module, &key, &values, &opts)
                .await?;
            serde_json::to_string_pretty(&records)?
        }

        Commands::Criteria {
            module,
            criteria,
            since,
            new_format,
        } => {
            let opts = SearchOptions {
                watermark: since,
                new_format,
            };
            let records = client.fetch_by_criteria(&module, &criteria, &opts).await?;
            serde_json::to_string_pretty(&records)?
        }

        Commands::Insert {
            module,
            rows,
            duplicate_check,
            wf_trigger,
            is_approval,
            larid,
            new_format,
        } => {
            let opts = InsertOptions {
                wf_trigger,
                duplicate_check,
                is_approval,
                larid,
                new_format,
            };
            let outcome = client.insert(&module, read_rows(&rows)?, &opts).await?;
            serde_json::to_string_pretty(&outcome)?
        }

        Commands::Update {
            module,
            id,
            rows,
            wf_trigger,
            larid,
            new_format,
        } => {
            let row = match read_rows(&rows)? {
                InsertRows::One(row) => row,
                InsertRows::Many(_) => {
                    return Err(BulkError::InvalidArgument(
                        "update takes a single JSON object; use update-bulk for arrays".into(),
                    ))
                }
            };
            let opts = UpdateOptions {
                wf_trigger,
                larid,
                new_format,
            };
            let record = client.update(&module, &id, &row, &opts).await?;
            serde_json::to_string_pretty(&record)?
        }

        Commands::UpdateBulk {
            module,
            rows,
            wf_trigger,
            new_format,
        } => {
            let rows = match read_rows(&rows)? {
                InsertRows::One(row) => vec![row],
                InsertRows::Many(rows) => rows,
            };
            let opts = UpdateOptions {
                wf_trigger,
                larid: None,
                new_format,
            };
            let ids = client.update_bulk(&module, rows, &opts).await?;
            serde_json::to_string_pretty(&ids)?
        }
    };

    println!("{}", output);
    Ok(())
}

/// Read a JSON object (one row) or an array of objects (a batch).
fn read_rows(path: &Path) -> Result<InsertRows, BulkError> {
    let content = std::fs::read_to_string(path)?;
    let rows = match serde_json::from_str::<Value>(&content)? {
        Value::Array(items) => InsertRows::Many(
            items
                .into_iter()
                .map(serde_json::from_value::<Record>)
                .collect::<Result<_, _>>()?,
        ),
        value @ Value::Object(_) => InsertRows::One(serde_json::from_value(value)?),
        _ => {
            return Err(BulkError::InvalidArgument(format!(
                "{}: expected a JSON object or array of objects",
                path.display()
            )))
        }
    };
    Ok(rows)
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
