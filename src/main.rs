use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use gateview::domain::{DEFAULT_FEED_INTERVAL_MS, DEFAULT_LIVE_CAP, DEFAULT_PAGE_SIZE, GateViewError, ViewConfig};
use gateview::feed::ReplayFeed;
use gateview::loader::{load_data_file, load_data_file_with_id_start, next_free_id};
use gateview::record::RecordSchema;
use gateview::view::TableView;
use model::{Model, Status};
use ui::TableUI;

/// Page through access-control event tables in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV, Parquet or Arrow IPC file with the records to show
    path: String,

    /// Replay the records of this file one by one as a live feed
    #[arg(long)]
    replay: Option<String>,

    /// Milliseconds between replayed records
    #[arg(long, default_value_t = DEFAULT_FEED_INTERVAL_MS)]
    interval_ms: u64,

    /// Maximum number of records kept (defaults to 500 with --replay)
    #[arg(long)]
    cap: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Column holding the record id
    #[arg(long, default_value = "id")]
    id_column: String,

    /// Column holding the status class (ok, warning, error, offline, info)
    #[arg(long)]
    status_column: Option<String>,

    #[arg(long)]
    timestamp_column: Option<String>,

    /// Columns shown at startup, in order
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Log file, defaults to gateview.log in the temp dir
    #[arg(long)]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand_path(path: &str) -> Result<PathBuf, GateViewError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| GateViewError::LoadingFailed(e.to_string()))
}

fn init_logging(path: Option<&str>) -> Result<PathBuf, GateViewError> {
    let log_path = match path {
        Some(p) => expand_path(p)?,
        None => std::env::temp_dir().join("gateview.log"),
    };
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    // The terminal belongs to the TUI, so everything goes to the file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| GateViewError::Logging(e.to_string()))?;
    Ok(log_path)
}

fn run(args: Args) -> Result<(), GateViewError> {
    let log_path = init_logging(args.log_file.as_deref())?;
    info!("Starting gateview, logging to {}", log_path.display());

    let schema = RecordSchema {
        id_field: args.id_column.clone(),
        status_field: args.status_column.clone(),
        timestamp_field: args.timestamp_column.clone(),
    };
    let live_cap = args
        .cap
        .or(args.replay.as_ref().map(|_| DEFAULT_LIVE_CAP));
    let cfg = ViewConfig::default()
        .with_page_size(args.page_size)
        .with_live_cap(live_cap)
        .with_feed_interval_ms(args.interval_ms)
        .with_default_columns(args.columns.clone());

    let data = load_data_file(expand_path(&args.path)?, &schema)?;
    let view = TableView::with_config(data.name, data.columns, data.records, &cfg)?;

    let feed = match &args.replay {
        Some(path) => {
            // Generated replay ids continue after the loaded ones
            let first_id = next_free_id(view.store().all());
            let replay = load_data_file_with_id_start(expand_path(path)?, &schema, first_id)?;
            Some(ReplayFeed::new(
                replay.records,
                Duration::from_millis(cfg.feed_interval_ms),
                Instant::now(),
            ))
        }
        None => None,
    };

    let mut model = Model::init(&cfg, view, feed);
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &Controller,
) -> Result<(), GateViewError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // At most one input message and one feed record per turn
        let message = controller.handle_event(model)?;
        model.update(message)?;
        model.tick(Instant::now());
    }
    info!("Closing with {} records", model.view().total_count());
    Ok(())
}
