mod export;
mod fetch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use storecrawl_core::{load_checkpoint, Retailer};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "storecrawl-cli")]
#[command(about = "Retailer store-locator crawling toolkit")]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, global = true, env = "STORECRAWL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the supported retailers
    Retailers,
    /// Fetch one page through the configured proxy mode
    Fetch {
        url: String,
        /// YAML file with a `proxy:` block
        #[arg(long)]
        config: Option<PathBuf>,
        /// Ask the scraper API to render JavaScript
        #[arg(long)]
        render_js: bool,
        /// Use the plain retrying GET instead of the proxy client
        #[arg(long, conflicts_with_all = ["config", "render_js"])]
        plain: bool,
        /// Query parameter as `key=value`; repeatable
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
        /// Write the body here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show a saved checkpoint
    Checkpoint { path: PathBuf },
    /// Convert a JSON array of store records to CSV or JSON
    Export {
        input: PathBuf,
        /// Output file; `.csv` writes CSV, anything else pretty JSON
        output: PathBuf,
        /// Tag every record with this retailer
        #[arg(long)]
        retailer: Option<Retailer>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got \"{raw}\""))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Some(Commands::Retailers) => {
            for retailer in Retailer::ALL {
                println!("{retailer}");
            }
        }
        Some(Commands::Fetch {
            url,
            config,
            render_js,
            plain,
            params,
            output,
        }) => {
            let request = fetch::FetchRequest {
                url,
                config,
                render_js,
                plain,
                params,
                output,
            };
            fetch::run_fetch(request).await?;
        }
        Some(Commands::Checkpoint { path }) => {
            match load_checkpoint::<serde_json::Value>(&path)? {
                Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                None => println!("no checkpoint at {}", path.display()),
            }
        }
        Some(Commands::Export {
            input,
            output,
            retailer,
        }) => {
            export::run_export(&input, &output, retailer)?;
        }
        None => println!("storecrawl-cli ready; see --help"),
    }

    Ok(())
}
