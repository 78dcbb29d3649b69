use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use symscan::config::ScanConfig;
use symscan::output::print_outcome;
use symscan::request::{parse_symbol_list, ReadSymbolRequest};
use symscan::search::SymbolSearch;

#[derive(Parser)]
#[command(name = "symscan")]
#[command(about = "Find code blocks by symbol name across dozens of file types")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Comma-separated symbols, `*` matches any identifier characters
    symbols: Option<String>,

    /// Files, directories or globs to search
    paths: Vec<String>,

    /// Maximum number of blocks to show
    #[arg(short, long)]
    limit: Option<usize>,

    /// Strip comments and blank lines from blocks
    #[arg(short, long)]
    compact: bool,

    /// Base directory for relative paths
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Show scores in headers and enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find blocks defining the given symbols
    Read {
        /// Comma-separated symbols, `*` matches any identifier characters
        symbols: String,

        /// Files, directories or globs to search
        paths: Vec<String>,

        /// Maximum number of blocks to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Strip comments and blank lines from blocks
        #[arg(short, long)]
        compact: bool,
    },
    /// Run a JSON request read from a file or stdin
    Request {
        /// Request file (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Print the effective configuration as JSON
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ScanConfig::load()?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    if cli.debug {
        config.debug = true;
    }
    init_logging(config.debug);

    match cli.command {
        Some(Commands::Read {
            symbols,
            paths,
            limit,
            compact,
        }) => run_read(config, &symbols, paths, limit, compact, !cli.no_color),
        Some(Commands::Request { file }) => run_request(config, file),
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        None => match cli.symbols {
            Some(symbols) => run_read(
                config,
                &symbols,
                cli.paths,
                cli.limit,
                cli.compact,
                !cli.no_color,
            ),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        },
    }
}

fn run_read(
    config: ScanConfig,
    symbols: &str,
    paths: Vec<String>,
    limit: Option<usize>,
    compact: bool,
    color: bool,
) -> Result<()> {
    let mut request = ReadSymbolRequest::new(parse_symbol_list(symbols))
        .with_paths(paths)
        .with_compact(compact);
    if let Some(limit) = limit {
        request = request.with_limit(limit);
    }

    let debug = config.debug;
    let search = SymbolSearch::new(config)?;
    let outcome = search.search(&request)?;
    print_outcome(&outcome, debug, compact, color).context("Failed to write results")?;
    Ok(())
}

fn run_request(config: ScanConfig, file: Option<PathBuf>) -> Result<()> {
    let json = match file {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
    };

    let request: ReadSymbolRequest =
        serde_json::from_str(&json).context("Failed to parse request JSON")?;
    let search = SymbolSearch::new(config)?;
    println!("{}", search.read_symbol(&request)?);
    Ok(())
}

/// Logs go to stderr so stdout only carries results
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
