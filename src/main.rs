//! objql - run SQL-like predicates over a collection of people

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use log::info;
use objql::reflect::{accessor_strategy, AttributeResolver};
use objql::sample::{generate_people, load_people, Person};
use objql::Query;
use std::path::PathBuf;

/// Which accessor strategies to bind identifiers with
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    /// Accessor methods first, then fields
    Auto,
    /// Accessor methods only
    Property,
    /// Fields only
    Field,
}

/// objql - filter people with a SQL-like predicate
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Predicate to evaluate, e.g. "age >= 50 AND name LIKE '_ob'"
    #[arg(short, long)]
    query: String,

    /// JSON file holding an array of people
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of people to generate when no input file is given
    #[arg(short, long, default_value = "20")]
    generate: usize,

    /// Seed for generated people
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Accessor strategy used to bind identifiers
    #[arg(long, value_enum, default_value = "auto")]
    strategy: Strategy,

    /// Print the expression tree and the bound accessors
    #[arg(short, long)]
    explain: bool,

    /// Only print the number of matches
    #[arg(short, long)]
    count_only: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let resolver = match args.strategy {
        Strategy::Auto => AttributeResolver::new(),
        Strategy::Property | Strategy::Field => {
            let name = if args.strategy == Strategy::Field {
                "field"
            } else {
                "property"
            };
            AttributeResolver::with_strategies(accessor_strategy(name).into_iter().collect())
        }
    };

    let people = match &args.input {
        Some(path) => load_people(path)?,
        None => generate_people(args.generate, args.seed),
    };
    info!("Loaded {} people", people.len());

    let query = Query::<Person>::with_resolver(&args.query, &resolver)
        .with_context(|| format!("Failed to build query '{}'", args.query))?;

    if args.explain {
        println!("{}", query.expression());
        for (identifier, getter) in query.bound().accessors() {
            println!("  {} -> {} [{}]", identifier, getter, getter.return_kind());
        }
    }

    let selected = query.select(&people).context("Query evaluation failed")?;
    info!("Selected {} of {} people", selected.len(), people.len());

    if args.count_only {
        println!("{}", selected.len());
    } else {
        for person in selected {
            println!("{}", serde_json::to_string(person)?);
        }
    }

    Ok(())
}
