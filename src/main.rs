//! CLI entry point for the radar speed dashboard.
//!
//! Provides subcommands for listing map markers, rendering a speed report
//! for one equipment, computing the inoperability table, and an interactive
//! session that re-renders after every input.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use radar_dashboard::config::{DashboardDefaults, DbConfig};
use radar_dashboard::dashboard::Dashboard;
use radar_dashboard::dashboard::view::DashboardView;
use radar_dashboard::db::MySqlExecutor;
use radar_dashboard::models::EquipmentId;
use radar_dashboard::output::{
    append_inoperability, print_json, print_pretty, render_text, write_json,
};
use radar_dashboard::publish::publish_json;
use radar_dashboard::session::{HELP, SelectionState, SessionCommand, parse_date};
use radar_dashboard::store::{LocalStore, RadarStore, SqlStore};
use std::ffi::OsStr;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "radar_dashboard")]
#[command(
    about = "Speed distribution and inoperability dashboard for traffic radars",
    long_about = None
)]
struct Cli {
    /// Read equipment and measurements from CSV files in this directory
    /// instead of the database
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<String>,

    /// JSON file overriding the default date range and map zoom
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the equipment that can be placed on the map
    Map,
    /// Render the speed report for one equipment
    Report {
        /// Equipment identifier
        #[arg(short, long)]
        equipment: String,

        /// First day of the range (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long)]
        from: Option<String>,

        /// Last day of the range (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long)]
        to: Option<String>,

        /// Also compute the inoperability table for the range
        #[arg(long, default_value_t = false)]
        inoperability: bool,

        /// Write the rendered view as JSON to this file
        #[arg(long, value_name = "FILE")]
        json: Option<String>,

        /// Optional: S3 bucket to publish the rendered view to
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Object key used with --s3-bucket
        #[arg(long, default_value = "dashboard/latest.json")]
        s3_key: String,

        /// Gzip the JSON before uploading
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// List equipment inoperative for 25 hours or more
    Inoperability {
        /// First day of the range (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long)]
        from: String,

        /// Last day of the range (YYYY-MM-DD or DD/MM/YYYY)
        #[arg(long)]
        to: String,

        /// CSV file to append results to
        #[arg(long, value_name = "FILE")]
        csv: Option<String>,
    },
    /// Interactive session: click markers, pick dates, query inoperability
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging();

    let cli = Cli::parse();

    let defaults = match &cli.config {
        Some(path) => DashboardDefaults::load(path)?,
        None => DashboardDefaults::default(),
    };

    let store: Box<dyn RadarStore> = match &cli.data_dir {
        Some(dir) => Box::new(LocalStore::load_csv_dir(dir)?),
        None => {
            let db = DbConfig::from_env()?;
            info!(host = %db.host, database = %db.database, port = db.port, "Using MySQL store");
            Box::new(SqlStore::new(MySqlExecutor::new(db.connect_options())))
        }
    };
    let dashboard = Dashboard::new(store, defaults);

    match cli.command {
        Commands::Map => {
            let mut state = SelectionState::new();
            let view = dashboard.render(&mut state).await;
            print!("{}", render_text(&view));
        }
        Commands::Report {
            equipment,
            from,
            to,
            inoperability,
            json,
            s3_bucket,
            s3_key,
            gzip,
        } => {
            let mut state = SelectionState::new();
            state.select(EquipmentId::new(equipment));
            if let Some((start, end)) = date_args(from.as_deref(), to.as_deref())? {
                state.pick_dates(start, end)?;
            }
            if inoperability {
                state.request_inoperability();
            }

            let view = dashboard.render(&mut state).await;
            print_pretty(&view);
            print!("{}", render_text(&view));

            if let Some(path) = json {
                write_json(&path, &view)?;
                info!(path = %path, "Dashboard JSON written");
            }

            if let Some(bucket) = s3_bucket {
                let config = aws_config::load_from_env().await;
                let s3 = aws_sdk_s3::Client::new(&config);
                publish_json(&s3, &bucket, &s3_key, &view, gzip).await?;
            }

            if view.has_error() {
                bail!("report rendered with errors");
            }
        }
        Commands::Inoperability { from, to, csv } => {
            let mut state = SelectionState::new();
            state.pick_dates(parse_date(&from)?, parse_date(&to)?)?;
            state.request_inoperability();

            let view = dashboard.render(&mut state).await;
            print!("{}", render_text(&view));

            match (&view.inoperability, csv) {
                (Some(table), Some(path)) => {
                    append_inoperability(&path, table)?;
                    info!(path = %path, rows = table.rows.len(), "Inoperability appended");
                }
                (None, Some(_)) => warn!("No inoperability table to export"),
                _ => {}
            }

            if view.has_error() {
                bail!("inoperability query failed");
            }
        }
        Commands::Session => run_session(&dashboard).await?,
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/radar_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("radar_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

fn date_args(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<(chrono::NaiveDate, chrono::NaiveDate)>> {
    match (from, to) {
        (Some(from), Some(to)) => Ok(Some((parse_date(from)?, parse_date(to)?))),
        (None, None) => Ok(None),
        _ => bail!("--from and --to must be given together"),
    }
}

/// Reads commands from stdin; every accepted command triggers one render.
async fn run_session<S: RadarStore>(dashboard: &Dashboard<S>) -> Result<()> {
    let mut state = SelectionState::new();
    let mut view: DashboardView = dashboard.render(&mut state).await;
    print!("{}", render_text(&view));
    println!("{HELP}");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match SessionCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Help => {
                println!("{HELP}");
                continue;
            }
            SessionCommand::Json => {
                print_json(&view)?;
                continue;
            }
            SessionCommand::Click(click) => {
                if !state.click(&click, view.markers()) {
                    println!("No equipment at that position.");
                }
            }
            SessionCommand::Range(start, end) => {
                if let Err(e) = state.pick_dates(start, end) {
                    println!("{e}");
                    continue;
                }
            }
            SessionCommand::Inoperability => state.request_inoperability(),
            SessionCommand::Show => {}
        }

        view = dashboard.render(&mut state).await;
        print_pretty(&view);
        print!("{}", render_text(&view));
    }

    info!("Session ended");
    Ok(())
}
