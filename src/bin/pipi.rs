//! pipi command line: run the movie service or a one-shot extraction
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

use pipi::config::{Loader, PipiConfig, LOCAL_CONFIG_FILE};
use pipi::extractors::{AmazonPrimeExtractor, ExtractionRequest};
use pipi::fetch::{FileFetcher, HttpFetcher};
use pipi::server::{self, AppState};

#[derive(Parser)]
#[command(name = "pipi")]
#[command(about = "Scrape movie details from product pages")]
#[command(version)]
struct Cli {
    /// Configuration file layered over the built-in defaults; `./pipi.toml`
    /// is used when present
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `pipi=trace`
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,

        /// Serve saved pages from this directory instead of the network
        #[arg(long, value_name = "DIR")]
        pages_dir: Option<PathBuf>,
    },
    /// Extract fields from a document and print them as JSON
    Extract {
        /// JSON file with the field declarations
        request: PathBuf,

        /// HTML document; read from stdin when omitted
        input: Option<PathBuf>,

        /// Print every capture instead of the resolved fields
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config)?;

    match cli.command {
        Command::Serve { .. } => run_server(config).await,
        Command::Extract { request, input, raw } => run_extract(&request, input.as_deref(), raw),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PipiConfig> {
    let loader = match &cli.config {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file(LOCAL_CONFIG_FILE),
    };
    let mut loader = loader
        .with_environment()
        .set_override_option("log.level", cli.log_level.clone())?;

    if let Command::Serve { bind, pages_dir } = &cli.command {
        loader = loader
            .set_override_option("server.bind", bind.map(|addr| addr.to_string()))?
            .set_override_option(
                "fetch.pages_dir",
                pages_dir.as_ref().map(|dir| dir.display().to_string()),
            )?;
    }

    loader.build().context("failed to load configuration")
}

fn init_logging(config: &PipiConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log.level)
            .with_context(|| format!("invalid log level {:?}", config.log.level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run_server(config: PipiConfig) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting pipi");

    let base_url = Url::parse(&config.fetch.product_base_url)
        .with_context(|| format!("invalid product base url {:?}", config.fetch.product_base_url))?;
    let extractor = AmazonPrimeExtractor::new();

    let router = match &config.fetch.pages_dir {
        Some(dir) => {
            tracing::info!(pages_dir = %dir.display(), "serving saved pages");
            server::router(AppState::new(FileFetcher::new(dir), extractor, base_url))
        }
        None => {
            let fetcher = HttpFetcher::new(&config.fetch.options())?;
            server::router(AppState::new(fetcher, extractor, base_url))
        }
    };

    server::serve(config.server.bind, router)
        .await
        .with_context(|| format!("server on {} failed", config.server.bind))
}

fn run_extract(request: &std::path::Path, input: Option<&std::path::Path>, raw: bool) -> anyhow::Result<()> {
    let request: ExtractionRequest = {
        let json = std::fs::read_to_string(request)
            .with_context(|| format!("failed to read {}", request.display()))?;
        serde_json::from_str(&json).with_context(|| format!("invalid request {}", request.display()))?
    };

    let html = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut html = String::new();
            std::io::stdin()
                .read_to_string(&mut html)
                .context("failed to read stdin")?;
            html
        }
    };

    let store = request.parser().parse_html(&html)?;
    tracing::debug!(fields = store.len(), captures = store.capture_count(), "extraction finished");

    let output = if raw {
        serde_json::to_string_pretty(&store)?
    } else {
        serde_json::to_string_pretty(&request.resolve(&store))?
    };
    println!("{}", output);
    Ok(())
}
