// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use cloudglue::utils::logging::{format_error, format_success, format_warning};
use cloudglue::{
    CancelFlag, Config, CsvWarehouse, DailyScheduler, EtlPipeline, EtlRunReport,
    GenerativeModelClient, HttpListingsClient, LocalBucketStore, PageLayout, PdfRenderer,
    TaskOutcome, TranslateService, Translator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cloudglue")]
#[command(version = "0.1.0")]
#[command(about = "Document translation and scheduled listings ETL pipelines", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Document translation pipeline actions
    Translate {
        #[command(subcommand)]
        action: TranslateActions,
    },

    /// Scheduled listings ETL pipeline
    Etl {
        #[command(subcommand)]
        action: EtlActions,
    },
}

#[derive(Subcommand)]
enum TranslateActions {
    /// Delete every object in both staging areas. Irreversible.
    Clear,

    /// Copy local PDF files into the source staging area
    Upload {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Translate every staged PDF and publish the results
    Process,
}

#[derive(Subcommand)]
enum EtlActions {
    /// Run the extract/stage/gate/load chain once, now
    Run,

    /// Run the chain once per day at the configured time
    Schedule,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    cloudglue::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Translate { action } => match action {
            TranslateActions::Clear => cmd_clear(&config).await?,
            TranslateActions::Upload { files } => cmd_upload(&config, &files).await?,
            TranslateActions::Process => cmd_process(&config).await?,
        },
        Commands::Etl { action } => match action {
            EtlActions::Run => cmd_etl_run(&config).await?,
            EtlActions::Schedule => cmd_etl_schedule(&config).await?,
        },
    }

    Ok(())
}

fn build_translate_service(config: &Config) -> Result<TranslateService> {
    let store = Arc::new(LocalBucketStore::new(config.storage.root.clone()));
    let model =
        GenerativeModelClient::new(&config.translator).context("Failed to create model client")?;
    let translator = Translator::from_config(Arc::new(model), &config.translator);
    let renderer = PdfRenderer::new(PageLayout::from(&config.render));

    Ok(TranslateService::new(
        store,
        config.storage.source_bucket.clone(),
        config.storage.destination_bucket.clone(),
        translator,
        renderer,
    ))
}

fn build_etl_pipeline(config: &Config) -> Result<EtlPipeline> {
    let store = Arc::new(LocalBucketStore::new(config.storage.root.clone()));
    let listings =
        HttpListingsClient::new(&config.listings).context("Failed to create listings client")?;
    // The in-process warehouse stands in for an external engine behind the
    // same trait.
    let warehouse = Arc::new(CsvWarehouse::new());

    Ok(EtlPipeline::new(
        store,
        Arc::new(listings),
        warehouse,
        &config.storage,
        &config.etl,
    ))
}

async fn cmd_clear(config: &Config) -> Result<()> {
    let service = build_translate_service(config)?;
    let (source, destination) = service.clear().await?;
    println!(
        "{}",
        format_success(&format!(
            "Cleared {} source and {} destination object(s)",
            source, destination
        ))
    );
    Ok(())
}

async fn cmd_upload(config: &Config, files: &[PathBuf]) -> Result<()> {
    let service = build_translate_service(config)?;
    let uploaded = service.upload(files).await?;
    println!(
        "{}",
        format_success(&format!("Uploaded {} file(s)", uploaded))
    );
    Ok(())
}

async fn cmd_process(config: &Config) -> Result<()> {
    let service = build_translate_service(config)?;

    let cancel = CancelFlag::new();
    let ctrl_c_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current document");
            ctrl_c_flag.cancel();
        }
    });

    let report = service.process(&cancel).await?;

    for outcome in &report.outcomes {
        match (&outcome.published_key, &outcome.error) {
            (Some(published), _) => println!(
                "{}",
                format_success(&format!(
                    "{} -> {} ({} ms)",
                    outcome.source_key, published, outcome.duration_ms
                ))
            ),
            (None, Some(error)) => println!(
                "{}",
                format_error(&format!("{}: {}", outcome.source_key, error))
            ),
            (None, None) => {}
        }
    }

    if report.cancelled {
        println!("{}", format_warning("Processing cancelled"));
    }
    println!(
        "{}",
        format_success(&format!(
            "{} translated, {} failed, {} skipped",
            report.processed(),
            report.failed(),
            report.skipped_non_pdf
        ))
    );

    if report.failed() > 0 {
        anyhow::bail!("{} document(s) failed", report.failed());
    }
    Ok(())
}

async fn cmd_etl_run(config: &Config) -> Result<()> {
    let pipeline = build_etl_pipeline(config)?;
    let report = pipeline.run_once().await?;
    print_etl_report(&report);

    if !report.succeeded() {
        anyhow::bail!("ETL run failed");
    }
    Ok(())
}

async fn cmd_etl_schedule(config: &Config) -> Result<()> {
    let pipeline = Arc::new(build_etl_pipeline(config)?);
    let scheduler = DailyScheduler::new(
        pipeline,
        config.etl.schedule_hour,
        config.etl.schedule_minute,
    );
    info!(
        "Scheduling daily ETL run at {:02}:{:02} UTC",
        config.etl.schedule_hour, config.etl.schedule_minute
    );
    scheduler.run().await?;
    Ok(())
}

fn print_etl_report(report: &EtlRunReport) {
    println!("ETL run {} (batch {})", report.run_id, report.batch_ts);
    for run in &report.task_runs {
        let line = match &run.outcome {
            TaskOutcome::Success => format_success(&format!(
                "{} succeeded after {} attempt(s)",
                run.task_id, run.attempts
            )),
            TaskOutcome::Failed(message) => {
                format_error(&format!("{} failed: {}", run.task_id, message))
            }
            TaskOutcome::Skipped => format_warning(&format!("{} skipped", run.task_id)),
        };
        println!("{}", line);
    }

    match (&report.rows_loaded, &report.error) {
        (Some(rows), _) => println!(
            "{}",
            format_success(&format!("Loaded {} row(s), full replace", rows))
        ),
        (None, Some(error)) => println!("{}", format_error(error)),
        (None, None) => {}
    }
}
