//! Core data models for the gig optimizer
//!
//! This module contains the types exchanged with the upstream services:
//! keyword research and gig listings produced by the text-generation API, and
//! marketplace data recovered from scraped pages.

pub mod generation;
pub mod scraper;

pub use generation::{GenerationClient, GenerationError};
pub use scraper::{ScraperClient, ScraperError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A keyword suggestion with its market signals
///
/// Demand/competition stay free-form strings ("High", "Medium", "Low"): the
/// generation API is not guaranteed to stick to a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedKeyword {
    /// The suggested keyword
    pub keyword: String,
    /// Estimated buyer demand
    #[serde(default)]
    pub demand: String,
    /// Estimated seller competition
    #[serde(default)]
    pub competition: String,
    /// Typical price range, e.g. "$50-100"
    #[serde(default)]
    pub price_range: String,
}

/// Market-level signals for a keyword or category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    /// Overall direction, e.g. "Growing"
    #[serde(default)]
    pub trend: String,
    /// Who buys these services
    #[serde(default)]
    pub target_audience: String,
    /// Rough market size description
    #[serde(default)]
    pub market_size: String,
    /// Regions where demand concentrates
    #[serde(default)]
    pub top_regions: Vec<String>,
}

/// Full keyword research result from the generation API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    /// Related keyword suggestions
    #[serde(default)]
    pub related_keywords: Vec<RelatedKeyword>,
    /// Market-level signals
    pub market_analysis: MarketAnalysis,
    /// Free-text commentary from the model
    #[serde(default)]
    pub raw_insights: String,
}

/// A single gig as it appears in marketplace search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigCard {
    /// Gig title
    pub title: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Displayed price, kept verbatim (e.g. "$50")
    #[serde(default)]
    pub price: String,
    /// Average rating
    #[serde(default)]
    pub rating: String,
    /// Review count
    #[serde(default)]
    pub reviews: String,
    /// Advertised delivery time
    #[serde(default)]
    pub delivery_time: String,
    /// Seller-chosen tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Competitor gigs scraped for a search keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigSearchData {
    /// The keyword that was searched
    pub keyword: String,
    /// Gigs found on the results page
    pub gigs: Vec<GigCard>,
    /// Number of gigs found
    pub total_gigs: usize,
    /// Distinct tags across all gigs
    pub categories: Vec<String>,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Seller profile data scraped from a public profile page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    /// The seller's username
    pub username: String,
    /// Languages listed on the profile
    #[serde(default)]
    pub languages: Vec<String>,
    /// Skills listed on the profile
    #[serde(default)]
    pub skills: Vec<String>,
    /// "Member since" text, if found
    #[serde(default)]
    pub member_since: String,
    /// Advertised response time, if found
    #[serde(default)]
    pub response_time: String,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

/// A seller's own gigs scraped from their gigs page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGigsData {
    /// The seller's username
    pub username: String,
    /// The seller's gigs
    pub gigs: Vec<GigCard>,
    /// Number of gigs found
    pub total_gigs: usize,
    /// Distinct tags across all gigs
    pub categories: Vec<String>,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

/// Where a seller's gigs sit in the category tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryInsights {
    /// The category the gigs fit best
    #[serde(default)]
    pub primary_category: String,
    /// Adjacent subcategories worth listing under
    #[serde(default)]
    pub subcategories: Vec<String>,
    /// How well the gigs fit their category, 0-100
    #[serde(default)]
    pub market_fit_score: f64,
    /// Underserved niches in the category
    #[serde(default)]
    pub category_opportunities: Vec<String>,
}

/// SWOT-style competitive read of a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
    #[serde(default)]
    pub unique_selling_points: Vec<String>,
}

/// A suggested rewrite of a gig title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleSuggestion {
    /// The title as it appears today
    #[serde(default)]
    pub current: String,
    /// The suggested replacement
    #[serde(default)]
    pub optimized: String,
    /// Why the replacement should perform better
    #[serde(default)]
    pub reasoning: String,
}

/// Concrete changes a seller can make to their listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSuggestions {
    /// Title rewrite for the seller's lead gig
    #[serde(default)]
    pub title: TitleSuggestion,
    /// Improvements to gig descriptions
    #[serde(default)]
    pub description_improvements: Vec<String>,
    /// Keywords the listings should target
    #[serde(default)]
    pub seo_keywords: Vec<String>,
    /// Where the pricing should sit, e.g. "Mid-market"
    #[serde(default)]
    pub pricing_position: String,
}

/// How the seller compares to the rest of the category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPosition {
    /// Percentile of the seller's pricing, 0-100
    #[serde(default)]
    pub price_percentile: f64,
    /// Percentile of the seller's rating, 0-100
    #[serde(default)]
    pub rating_percentile: f64,
    /// Rough share of the category, e.g. "Small"
    #[serde(default)]
    pub market_share_estimate: String,
    /// Room to grow, e.g. "High"
    #[serde(default)]
    pub growth_potential: String,
}

/// Recommended tasks grouped by time horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    #[serde(default)]
    pub immediate: Vec<String>,
    #[serde(default)]
    pub short_term: Vec<String>,
    #[serde(default)]
    pub long_term: Vec<String>,
}

/// Full AI analysis of a seller's profile and gigs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileAnalysis {
    #[serde(default)]
    pub category_insights: CategoryInsights,
    #[serde(default)]
    pub competitive_analysis: CompetitiveAnalysis,
    #[serde(default)]
    pub optimization_suggestions: OptimizationSuggestions,
    #[serde(default)]
    pub market_position: MarketPosition,
    #[serde(default)]
    pub action_plan: ActionPlan,
}

/// Everything the profile command produces: the scraped data plus the
/// AI analysis run over it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// The scraped profile
    pub profile: ProfileData,
    /// The seller's scraped gigs
    pub gigs: UserGigsData,
    /// AI analysis of the above
    pub analysis: ProfileAnalysis,
}

/// A single buyer review scraped from a category page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Star rating, typically 1-5
    #[serde(default)]
    pub rating: f64,
    /// Review text
    #[serde(default)]
    pub comment: String,
    /// Buyer's country, when the page exposes it
    #[serde(default)]
    pub buyer_country: Option<String>,
}

/// Review counts bucketed by rating
///
/// Positive is 4 stars and up, neutral 3 to 4, negative below 3; every
/// rating lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

/// A keyword with how often it appears across reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

/// A buyer country with how many reviews came from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub count: usize,
}

/// Aggregated review statistics for a marketplace category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReviewData {
    /// The category the reviews were scraped from
    pub category: String,
    /// Number of reviews found
    pub total_reviews: usize,
    /// Mean rating, 0 when no reviews were found
    pub average_rating: f64,
    /// Review counts bucketed by rating
    pub sentiment_distribution: SentimentDistribution,
    /// Most frequent meaningful words across review texts
    pub common_keywords: Vec<KeywordCount>,
    /// Countries buyers most often review from
    pub top_buyer_countries: Vec<CountryCount>,
    /// When this data was fetched
    pub fetched_at: DateTime<Utc>,
}

/// One pricing tier of a generated gig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigPackage {
    /// Package display name
    pub name: String,
    /// Price in dollars
    #[serde(default)]
    pub price: f64,
    /// Delivery time in days
    #[serde(default)]
    pub delivery_time: u32,
    /// What the package includes
    #[serde(default)]
    pub features: Vec<String>,
    /// Package description
    #[serde(default)]
    pub description: String,
}

/// The three standard pricing tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigPackages {
    pub basic: GigPackage,
    pub standard: GigPackage,
    pub premium: GigPackage,
}

/// A question/answer pair for the gig's FAQ section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

/// A complete AI-generated gig listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigListing {
    /// SEO-optimized gig title
    pub title: String,
    /// Gig description
    pub description: String,
    /// Search tags to attach to the gig
    #[serde(default)]
    pub search_tags: Vec<String>,
    /// Pricing tiers
    pub packages: GigPackages,
    /// What the seller needs from the buyer
    #[serde(default)]
    pub requirements: Vec<String>,
    /// FAQ entries
    #[serde(default)]
    pub faq: Vec<FaqItem>,
    /// Suggested portfolio samples
    #[serde(default)]
    pub portfolio_suggestions: Vec<String>,
    /// Potential extra services to upsell
    #[serde(default)]
    pub upsell_opportunities: Vec<String>,
}
