mod api;
mod config;
mod db;
mod error;
mod models;
mod operations;

use clap::{Parser, Subcommand};
use config::Config;
use db::Store;
use error::{AppError, Result};
use operations::validation::{self, AssignmentPayload, BucketPayload, NumberOrText};
use operations::{browse, bucket, import, report, transaction};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "buckets")]
#[command(version)]
#[command(about = "Budget buckets: import bank statements, assign spending, track pace", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "buckets.yaml", global = true)]
    config: PathBuf,

    /// SQLite database file, overrides the configured path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the database schema
    Migrate,
    /// Import a CSV bank statement
    Import { file: PathBuf },
    /// Manage buckets
    #[command(subcommand)]
    Bucket(BucketCommand),
    /// Assign a transaction to a bucket, or to `none`
    Assign { transaction_id: String, bucket: String },
    /// Interactive pacing dashboard
    Dashboard,
    /// Interactive transaction browser
    Browse,
}

#[derive(Subcommand, Debug)]
enum BucketCommand {
    /// Create a bucket
    Add {
        name: String,
        size: String,
        /// monthly or yearly
        period: String,
    },
    /// List buckets
    List,
    /// Change a bucket's name, size or period
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        period: Option<String>,
    },
    /// Delete a bucket; its transactions become unassigned
    Remove { id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = cli.database {
        config.database.path = path;
    }
    if let Command::Serve { ref host, port } = cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = port;
        }
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
        .init();

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> Result<()> {
    let store = Store::new(config.database.path.clone());

    match command {
        Command::Serve { .. } => {
            let runtime = tokio::runtime::Runtime::new()
                .map_err(|e| AppError::Internal(format!("Failed to start runtime: {}", e)))?;
            runtime.block_on(api::start_server(config, store))
        }
        Command::Migrate => {
            store.migrate()?;
            println!("Database ready at {}", store.path().display());
            Ok(())
        }
        command => {
            store.migrate()?;
            store.with_connection(|conn| run_local(conn, command))
        }
    }
}

fn run_local(conn: &rusqlite::Connection, command: Command) -> Result<()> {
    match command {
        Command::Import { file } => {
            let imported = import::import_file(conn, &file)?;
            println!("Successfully imported {} transactions.", imported.len());
        }
        Command::Bucket(BucketCommand::Add { name, size, period }) => {
            let input = validation::validate_new_bucket(&BucketPayload {
                name: Some(name),
                size: Some(NumberOrText::Text(size)),
                period: Some(period),
            })?;
            let created = bucket::create_bucket(conn, input)?;
            println!("Created bucket {} ({})", created.bucket.name, created.bucket.id);
        }
        Command::Bucket(BucketCommand::List) => {
            let buckets = bucket::list_buckets(conn)?;
            if buckets.is_empty() {
                println!("No buckets yet.");
            }
            for entry in buckets {
                println!(
                    "{}  {:<24} {:>12} {:<8} {} transactions",
                    entry.bucket.id,
                    entry.bucket.name,
                    entry.bucket.size,
                    entry.bucket.period,
                    entry.transactions.len()
                );
            }
        }
        Command::Bucket(BucketCommand::Update { id, name, size, period }) => {
            let changes = validation::validate_bucket_changes(&BucketPayload {
                name,
                size: size.map(NumberOrText::Text),
                period,
            })?;
            let updated = bucket::update_bucket(conn, &id, &changes)?;
            println!(
                "Bucket {} is now {} ({} {})",
                updated.bucket.id, updated.bucket.name, updated.bucket.size, updated.bucket.period
            );
        }
        Command::Bucket(BucketCommand::Remove { id }) => {
            bucket::delete_bucket(conn, &id)?;
            println!("Bucket removed.");
        }
        Command::Assign { transaction_id, bucket } => {
            let target = if bucket.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(bucket)
            };
            let bucket_id = validation::validate_assignment(&AssignmentPayload {
                bucket_id: Some(target),
            })?;
            let updated = transaction::assign_bucket(conn, &transaction_id, bucket_id.as_deref())?;
            match updated.bucket {
                Some(b) => println!("Transaction assigned to {}.", b.name),
                None => println!("Transaction unassigned."),
            }
        }
        Command::Dashboard => report::run_report(conn)?,
        Command::Browse => browse::run_browse(conn)?,
        Command::Serve { .. } | Command::Migrate => {}
    }
    Ok(())
}

fn report_error(err: &AppError) {
    eprintln!("Error: {}", err);
    match err {
        AppError::Validation { errors } => {
            for (field, messages) in errors {
                for message in messages {
                    eprintln!("  {}: {}", field, message);
                }
            }
        }
        AppError::StatementParse(errors) => {
            for message in errors {
                eprintln!("  {}", message);
            }
        }
        _ => {}
    }
}
