use std::path::PathBuf;

use clap::{Parser, Subcommand};
use layers::ViewportFitter;
use persistence::{FileOffsetStore, OffsetStore};
use serde::Serialize;
use session::ViewerConfig;
use tools::{Boundaries, ToolError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atlas", about = "Inspect client boundaries and saved overlay positions")]
struct Cli {
    /// Viewer configuration (JSON); defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List clients found in a boundary file.
    Clients {
        geojson: PathBuf,
        #[arg(long)]
        search: Option<String>,
    },
    /// Camera framing for one client's boundaries.
    Fit { geojson: PathBuf, client: String },
    /// Boundary and client containing a point.
    Attribute {
        geojson: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
    /// Saved overlay position.
    Offset {
        #[command(subcommand)]
        action: OffsetAction,
    },
    /// Print the effective viewer configuration.
    Config,
}

#[derive(Subcommand)]
enum OffsetAction {
    Show {
        #[arg(long)]
        store: PathBuf,
    },
    Reset {
        #[arg(long)]
        store: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path).map_err(|e| e.to_string())?,
        None => ViewerConfig::default(),
    };

    match cli.command {
        Command::Clients { geojson, search } => {
            let boundaries = Boundaries::load(&geojson).map_err(err)?;
            print_json(&boundaries.clients(search.as_deref()))
        }
        Command::Fit { geojson, client } => {
            let boundaries = Boundaries::load(&geojson).map_err(err)?;
            let fitter = ViewportFitter::new(config.viewport.clone());
            print_json(&boundaries.fit(&fitter, &client).map_err(err)?)
        }
        Command::Attribute { geojson, lon, lat } => {
            let boundaries = Boundaries::load(&geojson).map_err(err)?;
            print_json(&boundaries.attribute(lon, lat))
        }
        Command::Offset { action } => match action {
            OffsetAction::Show { store } => {
                let store = FileOffsetStore::new(store, config.overlay.storage_key.clone());
                print_json(&store.load().map_err(|e| err(e.into()))?)
            }
            OffsetAction::Reset { store } => {
                let mut store = FileOffsetStore::new(store, config.overlay.storage_key.clone());
                let removed = store.clear().map_err(|e| err(e.into()))?;
                print_json(&serde_json::json!({ "removed": removed }))
            }
        },
        Command::Config => print_json(&config),
    }
}

fn err(e: ToolError) -> String {
    e.to_string()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| format!("encode output: {e}"))?;
    println!("{text}");
    Ok(())
}
