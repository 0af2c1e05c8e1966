//! Orchestration of cache, upstream clients, and persistent state
//!
//! The optimizer checks the cache first, falls back to the upstream client on
//! a miss, and writes the result back with the configured TTL. Batch analyses
//! run as independent concurrent tasks that share nothing but the cache
//! manager. The optimizer never formats user-facing text; the binary does
//! the printing.

use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheManager, JsonFileStore};
use crate::client::{request_signature, ApiClient, HttpTransport, Transport};
use crate::config::{Config, ConfigError};
use crate::data::{
    CategoryReviewData, GenerationClient, GenerationError, GigListing, GigSearchData,
    KeywordAnalysis, ProfileData, ProfileReport, ScraperClient, ScraperError, UserGigsData,
};
use crate::state::{StateError, StateManager};

/// Errors surfaced by optimizer operations
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// A required API key is missing
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The generation API call failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The scraping call failed
    #[error(transparent)]
    Scrape(#[from] ScraperError),

    /// Persisting state failed
    #[error(transparent)]
    State(#[from] StateError),

    /// Serializing a result for history failed
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Composes the cache manager, upstream clients, and state store
pub struct GigOptimizer<T: Transport = HttpTransport> {
    generation: Option<GenerationClient<T>>,
    scraper: Option<ScraperClient<T>>,
    cache: CacheManager,
    state: StateManager,
    ttl_seconds: u64,
    bypass_cache: bool,
}

impl GigOptimizer<HttpTransport> {
    /// Builds an optimizer from configuration
    ///
    /// Clients are created only for the API keys that are present; operations
    /// needing an absent key fail with a `ConfigError` when invoked.
    pub fn from_config(config: &Config) -> Self {
        let make_client =
            || ApiClient::new(config.retry.clone(), config.request_timeout);

        let generation = config
            .openai_api_key
            .as_deref()
            .map(|key| GenerationClient::new(make_client(), key, &config.model));
        let scraper = config
            .scraper_api_key
            .as_deref()
            .map(|key| ScraperClient::new(make_client(), key));

        let cache = match &config.cache_file {
            Some(path) => CacheManager::with_store(
                Arc::new(JsonFileStore::new(path.clone())),
                config.cache_max_entries,
            ),
            None => CacheManager::new(),
        };

        Self {
            generation,
            scraper,
            cache,
            state: StateManager::new(config.state_file.clone()),
            ttl_seconds: config.cache_ttl_seconds,
            bypass_cache: false,
        }
    }
}

impl<T: Transport> GigOptimizer<T> {
    /// Builds an optimizer from explicit parts
    pub fn new(
        generation: Option<GenerationClient<T>>,
        scraper: Option<ScraperClient<T>>,
        cache: CacheManager,
        state: StateManager,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            generation,
            scraper,
            cache,
            state,
            ttl_seconds,
            bypass_cache: false,
        }
    }

    /// Skips cache reads; results are still written back
    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    /// Returns the underlying cache manager
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Returns the underlying state store
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    fn generation(&self) -> Result<&GenerationClient<T>, OptimizerError> {
        self.generation
            .as_ref()
            .ok_or(OptimizerError::Config(ConfigError::MissingKey(
                "OPENAI_API_KEY",
            )))
    }

    fn scraper(&self) -> Result<&ScraperClient<T>, OptimizerError> {
        self.scraper
            .as_ref()
            .ok_or(OptimizerError::Config(ConfigError::MissingKey(
                "SCRAPER_API_KEY",
            )))
    }

    fn cached<V: serde::de::DeserializeOwned>(&self, key: &str) -> Option<V> {
        if self.bypass_cache {
            return None;
        }
        self.cache.get(key)
    }

    /// Keyword research, cache-first; results are recorded in the history
    pub async fn analyze_keyword(&self, keyword: &str) -> Result<KeywordAnalysis, OptimizerError> {
        let key = request_signature("keyword_analysis", &[("keyword", keyword)]);
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        debug!(keyword, "cache miss, calling generation API");
        let analysis = self.generation()?.analyze_keyword(keyword).await?;
        self.cache.set(&key, &analysis, self.ttl_seconds);
        self.state
            .add_to_history(keyword, serde_json::to_value(&analysis)?)?;
        Ok(analysis)
    }

    /// Analyzes several keywords concurrently
    ///
    /// Each keyword is an independent task; tasks share no mutable state
    /// beyond the cache manager. One keyword failing does not abort the rest.
    pub async fn analyze_keywords(
        &self,
        keywords: &[String],
    ) -> Vec<(String, Result<KeywordAnalysis, OptimizerError>)> {
        let tasks = keywords.iter().map(|keyword| async move {
            (keyword.clone(), self.analyze_keyword(keyword).await)
        });
        join_all(tasks).await
    }

    /// Competitor gigs for a search keyword, cache-first
    pub async fn competitor_gigs(&self, keyword: &str) -> Result<GigSearchData, OptimizerError> {
        let key = request_signature("search_gigs", &[("keyword", keyword)]);
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        debug!(keyword, "cache miss, scraping search results");
        let data = self.scraper()?.fetch_search_gigs(keyword).await?;
        self.cache.set(&key, &data, self.ttl_seconds);
        Ok(data)
    }

    /// Full profile analysis: scraped data plus AI insights over it
    ///
    /// Profile and gigs are fetched concurrently, each cache-first; the
    /// generation API then analyzes the pair, with the analysis itself
    /// cached under its own key.
    pub async fn analyze_profile(&self, username: &str) -> Result<ProfileReport, OptimizerError> {
        let (profile, gigs) =
            tokio::join!(self.fetch_profile(username), self.fetch_user_gigs(username));
        let (profile, gigs) = (profile?, gigs?);

        let key = request_signature("profile_analysis", &[("username", username)]);
        let analysis = match self.cached(&key) {
            Some(analysis) => analysis,
            None => {
                debug!(username, "cache miss, analyzing profile");
                let analysis = self.generation()?.analyze_profile(&profile, &gigs).await?;
                self.cache.set(&key, &analysis, self.ttl_seconds);
                analysis
            }
        };

        Ok(ProfileReport {
            profile,
            gigs,
            analysis,
        })
    }

    /// Aggregated buyer-review statistics for a category, cache-first
    pub async fn category_reviews(
        &self,
        category: &str,
    ) -> Result<CategoryReviewData, OptimizerError> {
        let key = request_signature("category_reviews", &[("category", category)]);
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        debug!(category, "cache miss, scraping category reviews");
        let data = self.scraper()?.fetch_category_reviews(category).await?;
        self.cache.set(&key, &data, self.ttl_seconds);
        Ok(data)
    }

    async fn fetch_profile(&self, username: &str) -> Result<ProfileData, OptimizerError> {
        let key = request_signature("profile", &[("username", username)]);
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let profile = self.scraper()?.fetch_profile(username).await?;
        self.cache.set(&key, &profile, self.ttl_seconds);
        Ok(profile)
    }

    async fn fetch_user_gigs(&self, username: &str) -> Result<UserGigsData, OptimizerError> {
        let key = request_signature("user_gigs", &[("username", username)]);
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let gigs = self.scraper()?.fetch_user_gigs(username).await?;
        self.cache.set(&key, &gigs, self.ttl_seconds);
        Ok(gigs)
    }

    /// Generates a complete gig listing for a keyword
    ///
    /// Market analysis runs first (cache-first) to inform the listing; the
    /// result is cached and recorded under generated gigs.
    pub async fn generate_gig(&self, keyword: &str) -> Result<GigListing, OptimizerError> {
        let key = request_signature("gig_listing", &[("keyword", keyword)]);
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let analysis = self.analyze_keyword(keyword).await?;
        let listing = self
            .generation()?
            .generate_gig(keyword, &analysis.market_analysis)
            .await?;

        self.cache.set(&key, &listing, self.ttl_seconds);
        self.state
            .add_generated_gig(keyword, serde_json::to_value(&listing)?)?;
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RawResponse, RequestDescriptor, RetryPolicy, TransportError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Transport replaying scripted 200-OK bodies
    #[derive(Clone)]
    struct ScriptedTransport {
        bodies: Arc<Mutex<VecDeque<String>>>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedTransport {
        fn new(bodies: Vec<String>) -> Self {
            Self {
                bodies: Arc::new(Mutex::new(bodies.into())),
                calls: Arc::new(AtomicU32::new(0)),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(
            &self,
            _descriptor: &RequestDescriptor,
        ) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self
                .bodies
                .lock()
                .unwrap()
                .pop_front()
                .expect("Transport called more times than scripted");
            Ok(RawResponse {
                status: 200,
                retry_after: None,
                body,
            })
        }
    }

    /// Wraps a keyword-analysis JSON payload in a chat-completion envelope
    fn completion_body(payload: &str) -> String {
        serde_json::to_string(&serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": payload}}]
        }))
        .unwrap()
    }

    const ANALYSIS_PAYLOAD: &str = r#"{
        "related_keywords": [{"keyword": "logo design", "demand": "High", "competition": "High", "price_range": "$50-100"}],
        "market_analysis": {"trend": "Growing", "target_audience": "Startups", "market_size": "Large", "top_regions": ["US"]},
        "raw_insights": "insights"
    }"#;

    const LISTING_PAYLOAD: &str = r#"{
        "title": "I will design a logo",
        "description": "desc",
        "search_tags": ["logo"],
        "packages": {
            "basic": {"name": "Basic", "price": 10, "delivery_time": 3, "features": [], "description": ""},
            "standard": {"name": "Standard", "price": 20, "delivery_time": 5, "features": [], "description": ""},
            "premium": {"name": "Premium", "price": 30, "delivery_time": 7, "features": [], "description": ""}
        }
    }"#;

    const PROFILE_ANALYSIS_PAYLOAD: &str = r#"{
        "category_insights": {"primary_category": "Logo Design", "subcategories": ["Brand Style Guides"], "market_fit_score": 82, "category_opportunities": ["3D logos"]},
        "competitive_analysis": {"strengths": ["Fast delivery"], "weaknesses": [], "opportunities": [], "threats": [], "unique_selling_points": []},
        "optimization_suggestions": {"title": {"current": "I will design a logo", "optimized": "I will design a modern minimalist logo", "reasoning": "Adds style keywords"}, "description_improvements": [], "seo_keywords": ["logo"], "pricing_position": "Mid-market"},
        "market_position": {"price_percentile": 60, "rating_percentile": 75, "market_share_estimate": "Small", "growth_potential": "High"},
        "action_plan": {"immediate": ["Update the gig title"], "short_term": [], "long_term": []}
    }"#;

    // Carries both profile fields and a gigs array, so the same body serves
    // the profile fetch and the gigs fetch regardless of completion order
    const PROFILE_PAGE: &str = r#"<script type="application/json">{
        "seller": {"languages": ["English"], "skills": [{"name": "logo design"}], "memberSince": "Jan 2020", "responseTime": "1 hour"},
        "gigs": [{"title": "I will design a logo", "tags": ["logo"]}]
    }</script>"#;

    fn optimizer_with(
        transport: ScriptedTransport,
        temp_dir: &TempDir,
    ) -> GigOptimizer<ScriptedTransport> {
        let policy = RetryPolicy::new(1, 10, 100, false);
        let api = ApiClient::with_transport(transport, policy);
        let generation = GenerationClient::new(api.clone(), "sk-test", "gpt-4");
        let scraper = ScraperClient::new(api, "sk-scraper");
        GigOptimizer::new(
            Some(generation),
            Some(scraper),
            CacheManager::new(),
            StateManager::new(temp_dir.path().join("state.json")),
            3600,
        )
    }

    #[tokio::test]
    async fn test_analyze_keyword_hits_cache_on_second_call() {
        let temp_dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(vec![completion_body(ANALYSIS_PAYLOAD)]);
        let optimizer = optimizer_with(transport.clone(), &temp_dir);

        let first = optimizer.analyze_keyword("logo design").await.unwrap();
        let second = optimizer.analyze_keyword("logo design").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.calls(), 1, "Second call must come from cache");
    }

    #[tokio::test]
    async fn test_analyze_keyword_records_history() {
        let temp_dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(vec![completion_body(ANALYSIS_PAYLOAD)]);
        let optimizer = optimizer_with(transport, &temp_dir);

        optimizer.analyze_keyword("logo design").await.unwrap();

        let history = optimizer.state().analysis_history();
        assert!(history.contains_key("logo design"));
    }

    #[tokio::test]
    async fn test_bypass_cache_refetches_but_still_writes_back() {
        let temp_dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(vec![
            completion_body(ANALYSIS_PAYLOAD),
            completion_body(ANALYSIS_PAYLOAD),
        ]);
        let optimizer = optimizer_with(transport.clone(), &temp_dir).bypass_cache(true);

        optimizer.analyze_keyword("logo design").await.unwrap();
        optimizer.analyze_keyword("logo design").await.unwrap();

        assert_eq!(transport.calls(), 2, "Bypass must skip cache reads");
        assert_eq!(optimizer.cache().len(), 1, "Results are still cached");
    }

    #[tokio::test]
    async fn test_generate_gig_reuses_cached_market_analysis() {
        let temp_dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(vec![
            completion_body(ANALYSIS_PAYLOAD),
            completion_body(LISTING_PAYLOAD),
        ]);
        let optimizer = optimizer_with(transport.clone(), &temp_dir);

        // Prime the analysis cache, then generate
        optimizer.analyze_keyword("logo design").await.unwrap();
        let listing = optimizer.generate_gig("logo design").await.unwrap();

        assert_eq!(listing.title, "I will design a logo");
        assert_eq!(
            transport.calls(),
            2,
            "Analysis must come from cache during generation"
        );
        assert!(optimizer
            .state()
            .generated_gigs()
            .contains_key("logo design"));
    }

    #[tokio::test]
    async fn test_competitor_gigs_parses_scraped_page() {
        let temp_dir = TempDir::new().unwrap();
        let page = r#"<script type="application/json">{"gigs":[{"title":"I will design a logo","tags":["logo"]}]}</script>"#;
        let transport = ScriptedTransport::new(vec![page.to_string()]);
        let optimizer = optimizer_with(transport, &temp_dir);

        let data = optimizer.competitor_gigs("logo").await.unwrap();

        assert_eq!(data.total_gigs, 1);
        assert_eq!(data.gigs[0].title, "I will design a logo");
        assert_eq!(data.categories, vec!["logo"]);
    }

    #[tokio::test]
    async fn test_analyze_profile_runs_generation_over_scraped_data() {
        let temp_dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(vec![
            PROFILE_PAGE.to_string(),
            PROFILE_PAGE.to_string(),
            completion_body(PROFILE_ANALYSIS_PAYLOAD),
        ]);
        let optimizer = optimizer_with(transport.clone(), &temp_dir);

        let report = optimizer.analyze_profile("Annie ").await.unwrap();

        assert_eq!(report.profile.username, "annie");
        assert_eq!(report.profile.languages, vec!["English"]);
        assert_eq!(report.gigs.total_gigs, 1);
        assert_eq!(
            report.analysis.category_insights.primary_category,
            "Logo Design"
        );
        assert_eq!(report.analysis.action_plan.immediate, vec!["Update the gig title"]);
        assert_eq!(transport.calls(), 3, "Two scrapes plus one analysis call");
    }

    #[tokio::test]
    async fn test_analyze_profile_is_fully_cached_on_second_call() {
        let temp_dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(vec![
            PROFILE_PAGE.to_string(),
            PROFILE_PAGE.to_string(),
            completion_body(PROFILE_ANALYSIS_PAYLOAD),
        ]);
        let optimizer = optimizer_with(transport.clone(), &temp_dir);

        let first = optimizer.analyze_profile("annie").await.unwrap();
        let second = optimizer.analyze_profile("annie").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            transport.calls(),
            3,
            "Profile, gigs, and analysis must all come from cache"
        );
    }

    #[tokio::test]
    async fn test_category_reviews_aggregates_scraped_page() {
        let temp_dir = TempDir::new().unwrap();
        let page = r#"<script type="application/json">{"reviews":[
            {"rating":5.0,"comment":"Amazing logo work","buyer_country":"US"},
            {"rating":3.0,"comment":"Decent result"},
            {"rating":1.0,"comment":"Poor communication","buyer_country":"US"}
        ]}</script>"#;
        let transport = ScriptedTransport::new(vec![page.to_string()]);
        let optimizer = optimizer_with(transport.clone(), &temp_dir);

        let data = optimizer.category_reviews("logo design").await.unwrap();

        assert_eq!(data.total_reviews, 3);
        assert_eq!(data.average_rating, 3.0);
        assert_eq!(data.sentiment_distribution.positive, 1);
        assert_eq!(data.sentiment_distribution.neutral, 1);
        assert_eq!(data.sentiment_distribution.negative, 1);
        assert_eq!(data.top_buyer_countries[0].country, "US");

        // Second call is served from cache
        let again = optimizer.category_reviews("logo design").await.unwrap();
        assert_eq!(again, data);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_analysis_runs_all_keywords() {
        let temp_dir = TempDir::new().unwrap();
        let transport = ScriptedTransport::new(vec![
            completion_body(ANALYSIS_PAYLOAD),
            completion_body(ANALYSIS_PAYLOAD),
        ]);
        let optimizer = optimizer_with(transport, &temp_dir);

        let keywords = vec!["logo design".to_string(), "seo".to_string()];
        let results = optimizer.analyze_keywords(&keywords).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
    }

    #[tokio::test]
    async fn test_missing_generation_key_is_typed_error() {
        let temp_dir = TempDir::new().unwrap();
        let optimizer: GigOptimizer<ScriptedTransport> = GigOptimizer::new(
            None,
            None,
            CacheManager::new(),
            StateManager::new(temp_dir.path().join("state.json")),
            3600,
        );

        let error = optimizer.analyze_keyword("seo").await.unwrap_err();
        assert!(matches!(error, OptimizerError::Config(_)));
    }
}
