use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use fitbit_scheduler::config::AppConfig;
use fitbit_scheduler::logging::init_logging;
use fitbit_scheduler::models::{CatalogEntry, RegistrationRequest, FINISH_DATE_FORMAT};
use fitbit_scheduler::repository::{DeviceCatalog, RegistrationSheet};
use fitbit_scheduler::schema::Column;
use fitbit_scheduler::{server, CatalogDatabase, CsvSheet, GoogleSheet, RegistrationService, StaticCatalog};

#[derive(Parser)]
#[command(author, version, about = "Register wearables for scheduled sync scanning", long_about = None)]
struct Cli {
    /// Configuration file, layered over config/default and config/local
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a watch, or update its existing registration
    Register {
        /// Study project
        #[arg(short, long)]
        project: String,

        /// Watch name from the project catalog
        #[arg(short, long)]
        watch: String,

        /// Contact email
        #[arg(short, long)]
        email: String,

        /// Scan in the morning
        #[arg(long)]
        morning: bool,

        /// Scan at noon
        #[arg(long)]
        noon: bool,

        /// Scan in the evening
        #[arg(long)]
        evening: bool,

        /// Sync failures tolerated (1-5)
        #[arg(long, default_value_t = 3)]
        fail_threshold: u32,

        /// Enable EMA prompting
        #[arg(long)]
        ema: bool,

        /// EMA failures tolerated (1-5)
        #[arg(long, default_value_t = 3)]
        fail_threshold_ema: u32,

        /// Last day of scanning (YYYY-MM-DD)
        #[arg(long)]
        finish_date: Option<String>,

        /// Clear telemetry and failure counters of an existing registration
        #[arg(long)]
        reset: bool,

        /// Show what would be written without writing it
        #[arg(long)]
        dry_run: bool,
    },
    /// List study projects
    Projects,
    /// List the watches of a project
    Watches {
        /// Study project
        project: String,
    },
    /// Print the registrations of a project as CSV
    Log {
        /// Study project
        project: String,
    },
    /// Add a watch to the SQLite catalog, replacing its token if present
    AddWatch {
        /// Study project
        #[arg(short, long)]
        project: String,

        /// Watch name
        #[arg(short, long)]
        name: String,

        /// Device auth token
        #[arg(short, long)]
        token: String,
    },
    /// Serve the JSON endpoints
    Serve {
        /// Address to listen on, overriding server.bind_address
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    let _log_guard = init_logging(
        &config.get_log_level(),
        config.logging.file_path.as_deref().map(Path::new),
        &config.logging.format,
    )?;

    info!(sheet = %config.sheet.backend, catalog = %config.catalog.backend, "Starting fitbit-scheduler");

    match cli.command {
        Commands::Register {
            project,
            watch,
            email,
            morning,
            noon,
            evening,
            fail_threshold,
            ema,
            fail_threshold_ema,
            finish_date,
            reset,
            dry_run,
        } => {
            let request = RegistrationRequest {
                morning_scan: morning,
                noon_scan: noon,
                evening_scan: evening,
                fail_threshold,
                ema_enable: ema,
                fail_threshold_ema,
                finish_date: finish_date.as_deref().map(parse_finish_date).transpose()?,
                reset_prev_data: reset,
                ..RegistrationRequest::new(&project, &watch, &email)
            };
            register(&build_service(&config)?, &request, dry_run).await?;
        }
        Commands::Projects => {
            for project in build_service(&config)?.projects().await.map_err(user_facing)? {
                println!("{project}");
            }
        }
        Commands::Watches { project } => {
            for name in build_service(&config)?.watch_options(&project).await.map_err(user_facing)? {
                println!("{name}");
            }
        }
        Commands::Log { project } => print_log(&build_service(&config)?, &project).await?,
        Commands::AddWatch { project, name, token } => {
            let db = CatalogDatabase::new(&config.get_catalog_database_path())?;
            db.add_watch(&CatalogEntry { name, token, project })?;
            info!("Watch added to catalog");
        }
        Commands::Serve { bind } => {
            let address = match bind {
                Some(address) => address,
                None => config
                    .server
                    .bind_address
                    .parse()
                    .with_context(|| format!("Invalid bind address: {}", config.server.bind_address))?,
            };
            let service = Arc::new(build_service(&config)?);
            server::serve(address, service).await.context("Server failed")?;
        }
    }

    Ok(())
}

/// Build the sheet and catalog clients once for the whole process
fn build_service(config: &AppConfig) -> Result<RegistrationService> {
    let sheet: Box<dyn RegistrationSheet> = match config.sheet.backend.as_str() {
        "google" => {
            let token = config
                .get_sheet_access_token()
                .context("No Google Sheets access token: set sheet.access_token or GOOGLE_SHEETS_ACCESS_TOKEN")?;
            Box::new(GoogleSheet::new(&config.sheet, token)?)
        }
        _ => Box::new(CsvSheet::open(&config.sheet.csv_path)?),
    };

    let catalog: Box<dyn DeviceCatalog> = match config.catalog.backend.as_str() {
        "static" => Box::new(StaticCatalog::new(config.catalog.watches.clone())),
        _ => Box::new(CatalogDatabase::new(&config.get_catalog_database_path())?),
    };

    Ok(RegistrationService::new(sheet, catalog))
}

async fn register(service: &RegistrationService, request: &RegistrationRequest, dry_run: bool) -> Result<()> {
    if dry_run {
        let preview = service.preview(request).await.map_err(user_facing)?;
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    let outcome = service.submit(request).await.map_err(user_facing)?;
    if let Some(notice) = outcome.notice() {
        println!("{notice}");
    }
    println!("{}", outcome.message());
    Ok(())
}

async fn print_log(service: &RegistrationService, project: &str) -> Result<()> {
    let entries = service.watch_log(project).await.map_err(user_facing)?;

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(Column::DISPLAY.iter().map(|c| c.header()))?;
    for entry in &entries {
        writer.write_record(entry.to_record())?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_finish_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), FINISH_DATE_FORMAT)
        .with_context(|| format!("Invalid finish date '{value}', expected YYYY-MM-DD"))
}

/// Report store failures with the generic message; details stay in the logs
fn user_facing(error: fitbit_scheduler::SchedulerError) -> anyhow::Error {
    anyhow::anyhow!(error.user_message())
}
