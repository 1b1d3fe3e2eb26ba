//! Review Harvest entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::sync::broadcast::error::RecvError;

use review_harvest::{Harvester, Product};
use review_harvest_cli::catalog::{default_catalog, load_catalog, parse_product_arg, select};
use review_harvest_cli::summary::{progress_line, render_summary};
use review_harvest_cli::{ChromiumProvider, CliConfig, JsonFileSink, Overrides};

#[derive(Parser)]
#[command(
    name = "review-harvest",
    about = "Harvest storefront product reviews, tier by tier, into JSON files",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest reviews for every configured product (default).
    Run(RunArgs),

    /// List the products that would be harvested.
    Products {
        /// JSON catalog file replacing the configured products.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON.
    Config,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   review-harvest completions bash > ~/.local/share/bash-completion/completions/review-harvest
    ///   review-harvest completions zsh > ~/.zfunc/_review-harvest
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Product to harvest as NAME=URL (repeatable). Replaces the catalog.
    #[arg(long = "product", value_name = "NAME=URL")]
    products: Vec<String>,

    /// JSON catalog file replacing the configured products.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Only harvest the named products (repeatable).
    #[arg(long)]
    only: Vec<String>,

    /// Run the browser without a window.
    #[arg(long)]
    headless: bool,

    /// Directory for reviews_<product>.json files.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Consecutive cycles without new reviews before pagination stops.
    #[arg(long)]
    max_stall_attempts: Option<u32>,

    /// Page load timeout in milliseconds.
    #[arg(long)]
    page_timeout_ms: Option<u64>,

    /// Element wait timeout in milliseconds.
    #[arg(long)]
    element_timeout_ms: Option<u64>,

    /// Print the full report as JSON instead of the summary.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            let mut config = CliConfig::load(cli.config.as_deref())?;
            config.apply_overrides(&Overrides {
                headless: args.headless,
                output_dir: args.output_dir.clone(),
                max_stall_attempts: args.max_stall_attempts,
                page_timeout_ms: args.page_timeout_ms,
                element_timeout_ms: args.element_timeout_ms,
            });
            let products = resolve_products(&config, &args)?;
            if !run(config, products, args.json).await? {
                std::process::exit(1);
            }
        }

        Commands::Products { catalog } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            let args = RunArgs {
                catalog,
                ..RunArgs::default()
            };
            for product in resolve_products(&config, &args)? {
                println!("{:<20} {}", product.name, product.url);
            }
        }

        Commands::Config => {
            let config = CliConfig::load(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "review-harvest", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// `--product` beats `--catalog`, which beats the config file's products,
/// which beat the built-in catalog. `--only` filters the result.
fn resolve_products(config: &CliConfig, args: &RunArgs) -> Result<Vec<Product>> {
    let products = if !args.products.is_empty() {
        args.products
            .iter()
            .map(|arg| parse_product_arg(arg))
            .collect::<Result<Vec<_>>>()?
    } else if let Some(path) = &args.catalog {
        load_catalog(path)?
    } else if !config.products.is_empty() {
        config.products.clone()
    } else {
        default_catalog()
    };
    select(products, &args.only)
}

/// Harvest every product. Returns whether all of them succeeded.
async fn run(config: CliConfig, products: Vec<Product>, json: bool) -> Result<bool> {
    let provider = ChromiumProvider::new()?;
    let sink = JsonFileSink::new(&config.output_dir);
    tracing::info!(
        products = products.len(),
        output_dir = %config.output_dir.display(),
        headless = config.harvest.headless,
        "starting harvest"
    );

    let mut harvester = Harvester::new(config.harvest, provider, sink);
    let mut events = harvester.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => eprintln!("{}", progress_line(&event)),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "progress printer fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let report = harvester.harvest_all(&products).await;
    drop(harvester);
    let _ = printer.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_summary(&report));
    }
    Ok(report.failed() == 0)
}
