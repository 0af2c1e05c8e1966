//! Command-line interface for the gig optimizer
//!
//! Parsing only; command execution lives in the binary.

use clap::{Parser, Subcommand};

/// Fiverr gig optimization from the command line
#[derive(Parser, Debug)]
#[command(name = "gigopt")]
#[command(about = "Keyword research, competitor analysis, and AI-generated gig listings")]
#[command(version)]
pub struct Cli {
    /// Skip cache reads and fetch fresh data (results are still cached)
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run keyword research for one or more keywords
    Research {
        /// Keywords to analyze; several run concurrently
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// Scrape competitor gigs for a search keyword
    Competitors {
        /// The search keyword
        keyword: String,
    },
    /// Analyze a seller's profile and gigs
    Profile {
        /// The seller's username
        username: String,
    },
    /// Aggregate buyer-review statistics for a category
    Reviews {
        /// The category to research, e.g. "logo design"
        category: String,
    },
    /// Generate a complete gig listing for a keyword
    Create {
        /// The main keyword the gig targets
        keyword: String,
    },
    /// Manage favorite keywords
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show past keyword analyses
    History,
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Operations on the favorites list
#[derive(Subcommand, Debug)]
pub enum FavoritesAction {
    /// Add a keyword to favorites
    Add { keyword: String },
    /// Remove a keyword from favorites
    Remove { keyword: String },
    /// List favorite keywords
    List,
}

/// Operations on the response cache
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove every cached response
    Clear,
    /// Purge only expired entries
    Evict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_accepts_multiple_keywords() {
        let cli = Cli::parse_from(["gigopt", "research", "logo design", "seo"]);
        match cli.command {
            Command::Research { keywords } => {
                assert_eq!(keywords, vec!["logo design", "seo"]);
            }
            other => panic!("Expected Research, got {other:?}"),
        }
    }

    #[test]
    fn test_research_requires_at_least_one_keyword() {
        let result = Cli::try_parse_from(["gigopt", "research"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_cache_flag_is_global() {
        let cli = Cli::parse_from(["gigopt", "competitors", "logo", "--no-cache"]);
        assert!(cli.no_cache);

        let cli = Cli::parse_from(["gigopt", "competitors", "logo"]);
        assert!(!cli.no_cache);
    }

    #[test]
    fn test_reviews_takes_a_category() {
        let cli = Cli::parse_from(["gigopt", "reviews", "logo design"]);
        match cli.command {
            Command::Reviews { category } => assert_eq!(category, "logo design"),
            other => panic!("Expected Reviews, got {other:?}"),
        }
    }

    #[test]
    fn test_favorites_subcommands_parse() {
        let cli = Cli::parse_from(["gigopt", "favorites", "add", "seo"]);
        match cli.command {
            Command::Favorites {
                action: FavoritesAction::Add { keyword },
            } => assert_eq!(keyword, "seo"),
            other => panic!("Expected Favorites Add, got {other:?}"),
        }

        let cli = Cli::parse_from(["gigopt", "favorites", "list"]);
        assert!(matches!(
            cli.command,
            Command::Favorites {
                action: FavoritesAction::List
            }
        ));
    }

    #[test]
    fn test_cache_subcommands_parse() {
        let cli = Cli::parse_from(["gigopt", "cache", "clear"]);
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheAction::Clear
            }
        ));

        let cli = Cli::parse_from(["gigopt", "cache", "evict"]);
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheAction::Evict
            }
        ));
    }
}
