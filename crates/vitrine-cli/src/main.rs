//! CLI entry point for the Vitrine recommender (for dev and testing).
//!
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG`, default `info`).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;
use vitrine_core::{app_data_dir, set_data_path, status, Filters, Recommender, Settings, DEFAULT_TOP_K};

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(about = "Vitrine: content-based product recommendations")]
struct Cli {
    /// Product catalog CSV (overrides config and VITRINE_DATA_PATH).
    #[arg(long, global = true, value_name = "PATH")]
    data_path: Option<PathBuf>,
    /// Index cache directory (overrides config and VITRINE_INDEX_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    index_dir: Option<PathBuf>,
    /// Ollama embedding model (overrides config and VITRINE_EMBEDDING_MODEL).
    #[arg(long, global = true)]
    model: Option<String>,
    /// Ollama base URL (overrides config and VITRINE_OLLAMA_URL).
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where Vitrine stores its config and index (app data directory).
    DataDir,
    /// Remember the catalog CSV in the config file.
    SetDataPath {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Load the catalog and build (or load) the index cache.
    BuildIndex,
    /// Recommend catalog items for a free-text prompt.
    Recommend {
        prompt: String,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Keyword filter as field=value; repeatable.
        #[arg(long = "filter", value_name = "FIELD=VALUE", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Look up one item by its uniq_id.
    Item { uniq_id: String },
    /// Catalog statistics.
    Analytics,
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    if field.trim().is_empty() {
        return Err(format!("empty field name in '{s}'"));
    }
    Ok((field.trim().to_string(), value.to_string()))
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings::resolve();
        if let Some(p) = &self.data_path {
            settings.data_path = p.clone();
        }
        if let Some(d) = &self.index_dir {
            settings.index_dir = d.clone();
        }
        if let Some(m) = &self.model {
            settings.embedding_model = m.clone();
        }
        if let Some(u) = &self.ollama_url {
            settings.ollama_url = u.clone();
        }
        settings
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error: {}", e),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("Vitrine backend");
            println!("  core: {}", status());
            println!("  catalog: {}", settings.data_path.display());
            println!("  index: {}", settings.index_dir.display());
            println!("  model: {}", settings.embedding_model);
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => {
                eprintln!("Could not determine app data directory.");
                return ExitCode::FAILURE;
            }
        },
        Commands::SetDataPath { path } => {
            if let Err(e) = set_data_path(&path) {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
            println!("Catalog set to {}", path.display());
        }
        command => {
            // Everything else needs the catalog and index loaded.
            let reco = match Recommender::open(&settings).await {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match command {
                Commands::Recommend { prompt, top_k, filters } => {
                    let filters: Filters = filters.into_iter().collect();
                    match reco.recommend(&prompt, top_k, &filters).await {
                        Ok(items) => print_json(&json!({ "items": items })),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            return ExitCode::FAILURE;
                        }
                    }
                }
                Commands::Item { uniq_id } => print_json(&serde_json::Value::Object(reco.item(&uniq_id))),
                Commands::Analytics => print_json(&reco.analytics()),
                _ => println!(
                    "Indexed {} item(s), {} dimensions, cache in {}",
                    reco.index().len(),
                    reco.index().dim(),
                    settings.index_dir.display()
                ),
            }
        }
    }
    ExitCode::SUCCESS
}
