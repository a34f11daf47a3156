//! mirr-ingest - load comment documents into Postgres

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mirr_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use mirr_ingest::{
    run_pipeline, DatabaseConfig, IngestConfig, LocalSourceConfig, RunConfig, RunSummary,
    S3SourceConfig, SourceConfig,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mirr-ingest")]
#[command(author, version, about = "Load regulations.gov comment documents into Postgres", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    source: SourceCommand,

    /// Items per batch (one transaction each)
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Batches processed in parallel
    #[arg(short = 'j', long, global = true)]
    concurrency: Option<usize>,

    /// Drop and recreate the comments table before loading
    #[arg(long, global = true)]
    recreate_table: bool,

    /// Commit one batch at a time
    #[arg(long, global = true)]
    serialize_writes: bool,

    /// Postgres connection URL; overrides DATABASE_HOST/PORT/NAME
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    database_url: Option<String>,

    /// Debug logging to the console
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum SourceCommand {
    /// Ingest every comment under an S3 prefix
    S3 {
        #[arg(long, env = "S3_BUCKET")]
        bucket: String,

        /// Key prefix, e.g. an agency such as `WHD/`
        #[arg(long, env = "S3_PREFIX", default_value = "")]
        prefix: String,

        /// Endpoint of an S3-compatible store such as MinIO
        #[arg(long, env = "S3_ENDPOINT")]
        endpoint: Option<String>,

        #[arg(long, env = "S3_REGION")]
        region: Option<String>,
    },

    /// Ingest every comment under a local directory
    Local {
        #[arg(long, env = "MIRR_SOURCE_DIR")]
        dir: PathBuf,
    },
}

impl Cli {
    /// Environment first, then command-line overrides.
    fn into_config(self) -> Result<IngestConfig> {
        let source = match self.source {
            SourceCommand::S3 {
                bucket,
                prefix,
                endpoint,
                region,
            } => {
                let mut s3 = S3SourceConfig::from_env()?;
                s3.bucket = bucket;
                s3.prefix = prefix;
                if endpoint.is_some() {
                    s3.endpoint = endpoint;
                }
                if let Some(region) = region {
                    s3.region = region;
                }
                SourceConfig::S3(s3)
            }
            SourceCommand::Local { dir } => SourceConfig::Local(LocalSourceConfig { root: dir }),
        };

        let mut database = DatabaseConfig::from_env()?;
        if self.database_url.is_some() {
            database.url = self.database_url;
        }

        let mut run = RunConfig::from_env()?;
        if let Some(batch_size) = self.batch_size {
            run.batch_size = batch_size;
        }
        if let Some(concurrency) = self.concurrency {
            run.concurrency = concurrency;
        }
        run.recreate_table |= self.recreate_table;
        run.serialize_writes |= self.serialize_writes;

        let config = IngestConfig {
            source,
            database,
            run,
        };
        config.validate()?;
        Ok(config)
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let config = cli.into_config().context("Invalid configuration")?;
    run_pipeline(&config).await.context("Ingestion failed")
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("mirr-ingest")
        .filter_directives("sqlx=warn,aws_config=warn,aws_smithy_runtime=warn")
        .build();

    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {:#}", e);
            log_config
        }
    };

    let log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            None
        }
    };

    match run(cli).await {
        Ok(summary) => {
            info!(
                batches = summary.batches_total,
                batches_failed = summary.batches_failed,
                items = summary.items_total,
                items_dropped = summary.items_dropped,
                inserted = summary.records_inserted,
                skipped = summary.records_skipped,
                elapsed_secs = summary.elapsed.as_secs_f64(),
                "Run complete"
            );
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "Run failed");
            eprintln!("Error: {:#}", e);
            drop(log_guard);
            process::exit(1);
        }
    }
}
