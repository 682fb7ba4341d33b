use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

mod controller;
mod csv_bridge;
mod domain;
mod inputter;
mod logging;
mod model;
mod pipeline;
mod store;
mod ui;

use controller::Controller;
use domain::{TDMConfig, TDMError};
use model::{Model, Status};
use store::{DEFAULT_ROWS_PER_PAGE, TableStore, Theme};
use ui::TableUI;

/// Browse, search, sort and edit a table in the terminal. Imports and exports CSV.
#[derive(Parser, Debug)]
#[command(name = "tdm", version, about)]
struct Args {
    /// CSV file imported at startup
    file: Option<String>,

    /// Start without the example rows
    #[arg(long)]
    empty: bool,

    #[arg(long, default_value_t = DEFAULT_ROWS_PER_PAGE)]
    rows_per_page: usize,

    /// Start with the dark theme
    #[arg(long)]
    dark: bool,

    /// Directory exports are written to
    #[arg(long, default_value = ".")]
    export_dir: String,

    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log filter, overridden by TDM_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the store as JSON and exit
    #[arg(long)]
    dump_state: bool,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn expand_path(path: &str) -> Result<PathBuf, TDMError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| TDMError::InvalidConfig(format!("{path}: {e}")))
}

fn config_from_args(args: &Args) -> Result<TDMConfig, TDMError> {
    if args.rows_per_page == 0 {
        return Err(TDMError::InvalidConfig(
            "rows per page must be at least 1".to_string(),
        ));
    }
    let theme = if args.dark { Theme::Dark } else { Theme::Light };
    Ok(TDMConfig::default()
        .with_event_poll_time(args.poll_ms)
        .with_rows_per_page(args.rows_per_page)
        .with_theme(theme)
        .with_export_dir(expand_path(&args.export_dir)?)
        .with_seed(!args.empty))
}

fn build_store(cfg: &TDMConfig) -> TableStore {
    let mut store = TableStore::seeded();
    if !cfg.seed {
        store.set_rows(Vec::new());
    }
    store.set_rows_per_page(cfg.rows_per_page);
    store.set_theme(cfg.theme);
    store
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), TDMError> {
    logging::init(args.log_file.as_deref(), &args.log_level)?;
    let cfg = config_from_args(&args)?;
    info!("Starting tdm with {cfg:?}");

    let mut model = Model::init(&cfg, build_store(&cfg));
    if let Some(file) = &args.file {
        let count = model.import_file(expand_path(file)?)?;
        info!("Loaded {count} rows from {file}");
    }

    if args.dump_state {
        println!("{}", serde_json::to_string_pretty(model.store())?);
        return Ok(());
    }

    let ui = TableUI::default();
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut model, &ui, &controller, &mut terminal);
    ratatui::restore();
    if let Err(e) = &result {
        error!("Exiting on error: {e}");
    }
    result
}

fn event_loop(
    model: &mut Model,
    ui: &TableUI,
    controller: &Controller,
    terminal: &mut ratatui::DefaultTerminal,
) -> Result<(), TDMError> {
    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)? {
            model.update(Some(message))?;
        }
    }
    Ok(())
}
