//! search-crawler CLI - multi-engine web search from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use search_crawler::{SearchConfig, SearchOrchestrator, SearchResult, ToolRegistry};

/// Search several web engines and return readable result text
#[derive(Parser)]
#[command(name = "search-crawler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one engine, or all eligible engines when none is given
    Search(SearchArgs),

    /// Search every engine supporting a language concurrently
    Integrated(IntegratedArgs),

    /// Search Google through a browser with human-like input
    Google(GoogleArgs),

    /// Fetch a URL and print its readable text
    Fetch {
        /// Absolute http(s) URL
        url: String,
    },

    /// List configured search engines
    Engines,

    /// Print tool definitions as JSON
    Tools,

    /// Serve tools as JSON lines over stdin/stdout
    Serve,
}

#[derive(Parser)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Engine name (e.g. Bing, Naver)
    #[arg(short, long)]
    engine: Option<String>,

    /// Language code (e.g. ko, en)
    #[arg(short, long)]
    language: Option<String>,

    /// Print raw HTML instead of cleaned text
    #[arg(long)]
    keep_markup: bool,
}

#[derive(Parser)]
struct IntegratedArgs {
    /// Search query
    query: String,

    /// Language code (e.g. ko, en)
    #[arg(short, long)]
    language: Option<String>,

    /// Print raw HTML instead of cleaned text
    #[arg(long)]
    keep_markup: bool,
}

#[derive(Parser)]
struct GoogleArgs {
    /// Search query
    query: String,

    /// Print raw HTML instead of cleaned text
    #[arg(long)]
    keep_markup: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries results and the stdio transport, so logs go to stderr.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = SearchConfig::load(cli.config.as_deref())?;
    let orchestrator = Arc::new(SearchOrchestrator::from_config(&config));
    let format = cli.format;

    match cli.command {
        Commands::Search(args) => match args.engine {
            Some(engine) => {
                let result = orchestrator
                    .run_single_engine_search(
                        &args.query,
                        &engine,
                        args.language.as_deref(),
                        args.keep_markup,
                    )
                    .await?;
                print_result(&result, format)
            }
            None => {
                let results = orchestrator
                    .run_integrated_search(&args.query, args.language.as_deref(), args.keep_markup)
                    .await?;
                print_results(&results, format)
            }
        },
        Commands::Integrated(args) => {
            let results = orchestrator
                .run_integrated_search(&args.query, args.language.as_deref(), args.keep_markup)
                .await?;
            print_results(&results, format)
        }
        Commands::Google(args) => {
            let result = orchestrator
                .run_dedicated_protected_engine_search(&args.query, args.keep_markup)
                .await?;
            print_result(&result, format)
        }
        Commands::Fetch { url } => {
            let content = orchestrator.fetch_url(&url).await?;
            match format {
                OutputFormat::Text => println!("{}\n\n{}", content.url, content.text_content),
                OutputFormat::Json => print_json(&content)?,
            }
            Ok(())
        }
        Commands::Engines => list_engines(&orchestrator, format),
        Commands::Tools => print_json(&ToolRegistry::list_tools()),
        Commands::Serve => {
            let tools = ToolRegistry::new(orchestrator);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            tools.serve(stdin, tokio::io::stdout()).await?;
            Ok(())
        }
    }
}

fn list_engines(orchestrator: &SearchOrchestrator, format: OutputFormat) -> Result<()> {
    let engines = orchestrator.registry().all();
    if let OutputFormat::Json = format {
        return print_json(&engines);
    }

    if engines.is_empty() {
        println!("No search engines configured.");
        return Ok(());
    }

    println!("Available search engines:\n");
    for engine in engines {
        let marker = if engine.matches_name(orchestrator.protected_engine()) {
            " (browser only)"
        } else {
            ""
        };
        println!(
            "  {:<12} [{}]{}",
            engine.name,
            engine.supported_languages.join(", "),
            marker
        );
    }
    println!();
    println!("Usage: search-crawler search \"query\" -e Bing -l en");
    Ok(())
}

fn print_result(result: &SearchResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Text => print_results(std::slice::from_ref(result), format),
    }
}

fn print_results(results: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(results),
        OutputFormat::Text => {
            if results.is_empty() {
                println!("No engines were eligible for this search.");
            }
            for result in results {
                println!("== {} ==", result.engine_name);
                if let Some(url) = &result.search_url {
                    println!("URL: {}", url);
                }
                match (&result.result_text, &result.error) {
                    (_, Some(error)) => println!("Error: {}", error),
                    (Some(text), None) => println!("{}", preview(text, 500)),
                    (None, None) => {}
                }
                println!();
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}
