//! Gigopt - Fiverr gig optimization from the command line
//!
//! Runs keyword research, competitor analysis, profile analysis, and gig
//! generation against external APIs, with cached responses and persistent
//! favorites/history.

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use gigopt::cli::{CacheAction, Cli, Command, FavoritesAction};
use gigopt::config::Config;
use gigopt::optimizer::GigOptimizer;

/// Pretty-prints a result as JSON on stdout
fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gigopt=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let optimizer = GigOptimizer::from_config(&config).bypass_cache(cli.no_cache);

    match cli.command {
        Command::Research { keywords } => {
            let results = optimizer.analyze_keywords(&keywords).await;
            let mut failures = 0;
            for (keyword, result) in results {
                match result {
                    Ok(analysis) => {
                        println!("# {keyword}");
                        print_json(&analysis)?;
                    }
                    Err(e) => {
                        eprintln!("{keyword}: {e}");
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                return Err(format!("{failures} keyword(s) failed").into());
            }
        }
        Command::Competitors { keyword } => {
            let data = optimizer.competitor_gigs(&keyword).await?;
            print_json(&data)?;
        }
        Command::Profile { username } => {
            let report = optimizer.analyze_profile(&username).await?;
            print_json(&report)?;
        }
        Command::Reviews { category } => {
            let data = optimizer.category_reviews(&category).await?;
            print_json(&data)?;
        }
        Command::Create { keyword } => {
            let listing = optimizer.generate_gig(&keyword).await?;
            print_json(&listing)?;
        }
        Command::Favorites { action } => match action {
            FavoritesAction::Add { keyword } => {
                optimizer.state().add_favorite(&keyword)?;
                println!("Added '{keyword}' to favorites");
            }
            FavoritesAction::Remove { keyword } => {
                optimizer.state().remove_favorite(&keyword)?;
                println!("Removed '{keyword}' from favorites");
            }
            FavoritesAction::List => {
                for keyword in optimizer.state().favorites() {
                    println!("{keyword}");
                }
            }
        },
        Command::History => {
            print_json(&optimizer.state().analysis_history())?;
        }
        Command::Cache { action } => match action {
            CacheAction::Clear => {
                optimizer.cache().invalidate_all();
                println!("Cache cleared");
            }
            CacheAction::Evict => {
                let removed = optimizer.cache().evict_expired();
                println!("Evicted {removed} expired entries");
            }
        },
    }

    Ok(())
}
