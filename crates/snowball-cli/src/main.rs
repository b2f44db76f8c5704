//! Snowball CLI - Iterative set expansion from the command line
//!
//! Usage:
//!   snowball <google api key> <google engine id> <relation 1-4> <threshold> <seed query> <k>
//!
//! Both terminal states (target reached, candidates exhausted) exit with
//! status 1.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use snowball_core::{AppConfig, LoggingConfig, Relation};
use snowball_expansion::{ExpansionConfig, ExpansionOutcome, IterativeSetExpansion, Termination};
use snowball_web::{create_oracle, create_tagger, GoogleSearch, HttpFetcher};
use std::path::PathBuf;
use std::sync::Arc;

const USAGE: &str = "Format: snowball <google api key> <google engine id> <relation to extract> \
                     <confidence threshold> <seed query> <number of tuples to output>";

#[derive(Parser, Debug)]
#[command(name = "snowball")]
#[command(about = "Relation extraction by iterative set expansion")]
#[command(version)]
struct Cli {
    /// Google Custom Search JSON API key
    api_key: String,

    /// Google Programmable Search engine id
    engine_id: String,

    /// Relation to extract: 1 Schools_Attended, 2 Work_For, 3 Live_In, 4 Top_Member_Employees
    #[arg(value_parser = clap::value_parser!(u8).range(1..=4))]
    relation: u8,

    /// Extraction confidence threshold, between 0 and 1
    #[arg(value_parser = parse_threshold)]
    threshold: f32,

    /// Seed query, a plausible tuple for the relation
    #[arg(allow_hyphen_values = true)]
    query: String,

    /// Number of tuples to collect
    #[arg(value_parser = parse_target)]
    k: usize,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_threshold(value: &str) -> Result<f32, String> {
    let threshold: f32 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!("threshold must be between 0 and 1, got {threshold}"));
    }
    Ok(threshold)
}

fn parse_target(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(k) if k > 0 => Ok(k),
        _ => Err(format!("`{value}` is not a positive integer")),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    // stdout carries the report
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Message printed for a command line that failed to parse, with its exit status
fn usage_failure(error: &clap::Error) -> (String, i32) {
    (format!("{error}\nInvalid input arguments.\n{USAGE}"), 1)
}

/// Both terminal states exit with status 1
fn exit_status(termination: Termination) -> i32 {
    match termination {
        Termination::Success | Termination::Exhausted => 1,
    }
}

fn print_parameters(cli: &Cli, relation: Relation) {
    println!("___________");
    println!("Parameters:");
    println!("Client Key       = {}", cli.api_key);
    println!("Engine Key       = {}", cli.engine_id);
    println!("Relation         = {}", relation.as_str());
    println!("Threshold        = {}", cli.threshold);
    println!("Query            = {}", cli.query);
    println!("# of Tuples      = {}", cli.k);
}

fn print_report(outcome: &ExpansionOutcome) {
    println!(
        "================== ALL RELATIONS for {} ( {} ) =================",
        outcome.relation.as_str(),
        outcome.ranked().len()
    );
    for line in outcome.report_lines() {
        println!("{line}");
    }
    println!("Total # of iterations = {}", outcome.iterations);

    if outcome.termination == Termination::Exhausted {
        println!("No unused tuples left to query with; stopping before reaching the target.");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let (message, status) = usage_failure(&e);
            eprintln!("{message}");
            std::process::exit(status);
        }
    };

    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let relation = Relation::from_id(cli.relation)
        .with_context(|| format!("unknown relation id {}", cli.relation))?;
    print_parameters(&cli, relation);

    let search = GoogleSearch::from_config(&cli.api_key, &cli.engine_id, &config.search)?;
    let fetcher = HttpFetcher::from_config(&config.fetch)?;
    let tagger = create_tagger(&config.tagger)?;
    let oracle = create_oracle(&config.oracle)?;

    let expansion_config = ExpansionConfig::new(relation, cli.threshold, &cli.query, cli.k)
        .with_window_size(config.extraction.window_size)
        .with_fetch_timeout(config.fetch.timeout());

    let mut expansion = IterativeSetExpansion::new(
        Arc::new(search),
        Arc::new(fetcher),
        tagger,
        oracle,
        expansion_config,
    );

    let outcome = match expansion.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Expansion failed");
            return Err(e.into());
        }
    };

    print_report(&outcome);
    tracing::info!(
        run_id = %outcome.run_id,
        termination = %outcome.termination,
        duration_ms = outcome.duration_ms(),
        "Run complete"
    );

    std::process::exit(exit_status(outcome.termination));
}
