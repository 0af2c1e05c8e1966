//! Web-data retrieval client (ScraperAPI-style)
//!
//! Fetches rendered marketplace pages through a scraping proxy and recovers
//! structured data from the JSON documents the pages embed in
//! `<script type="application/json">` tags, the same payloads the original
//! pages hydrate from. No DOM parsing: the embedded JSON carries everything
//! the optimizer needs.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use super::{
    CategoryReviewData, CountryCount, GigCard, GigSearchData, KeywordCount, ProfileData, Review,
    SentimentDistribution, UserGigsData,
};
use crate::client::{ApiClient, ApiError, HttpTransport, RequestDescriptor, Transport};

/// Default scraping proxy endpoint
const DEFAULT_BASE_URL: &str = "http://api.scraperapi.com";

/// Errors that can occur when fetching marketplace pages
#[derive(Debug, Error)]
pub enum ScraperError {
    /// The HTTP call failed after retries
    #[error("scrape request failed: {0}")]
    Request(#[from] ApiError),
}

/// Client for fetching marketplace pages through a scraping proxy
///
/// Generic over the transport so tests can script responses; production code
/// uses the default HTTP transport.
#[derive(Debug, Clone)]
pub struct ScraperClient<T: Transport = HttpTransport> {
    api: ApiClient<T>,
    api_key: String,
    base_url: String,
}

impl<T: Transport> ScraperClient<T> {
    /// Creates a client for the given scraping-proxy API key
    pub fn new(api: ApiClient<T>, api_key: impl Into<String>) -> Self {
        Self {
            api,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the proxy base URL (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the proxied request for a target page
    fn page_descriptor(&self, target_url: &str) -> RequestDescriptor {
        RequestDescriptor::get(&self.base_url)
            .with_param("api_key", &self.api_key)
            .with_param("url", target_url)
            .with_param("render", "true")
    }

    /// Fetches the rendered HTML of a target page
    async fn fetch_page(&self, target_url: &str) -> Result<String, ScraperError> {
        debug!(target_url, "fetching page through scraping proxy");
        let response = self.api.send(&self.page_descriptor(target_url)).await?;
        Ok(response.body)
    }

    /// Fetches competitor gigs for a search keyword
    pub async fn fetch_search_gigs(&self, keyword: &str) -> Result<GigSearchData, ScraperError> {
        let url = format!("https://www.fiverr.com/search/gigs?query={keyword}");
        let html = self.fetch_page(&url).await?;

        let gigs = extract_gigs(&html);
        let categories = distinct_tags(&gigs);
        Ok(GigSearchData {
            keyword: keyword.to_string(),
            total_gigs: gigs.len(),
            gigs,
            categories,
            fetched_at: Utc::now(),
        })
    }

    /// Fetches a seller's public profile
    pub async fn fetch_profile(&self, username: &str) -> Result<ProfileData, ScraperError> {
        let username = username.trim().to_lowercase();
        let url = format!("https://www.fiverr.com/{username}");
        let html = self.fetch_page(&url).await?;

        let documents = embedded_json_documents(&html);
        Ok(ProfileData {
            languages: collect_strings(&documents, &["languages", "language"]),
            skills: collect_strings(&documents, &["skills", "skill"]),
            member_since: find_string(&documents, &["memberSince", "member_since"])
                .unwrap_or_default(),
            response_time: find_string(&documents, &["responseTime", "response_time"])
                .unwrap_or_default(),
            username,
            fetched_at: Utc::now(),
        })
    }

    /// Fetches a seller's own gigs
    pub async fn fetch_user_gigs(&self, username: &str) -> Result<UserGigsData, ScraperError> {
        let username = username.trim().to_lowercase();
        let url = format!("https://www.fiverr.com/{username}/gigs");
        let html = self.fetch_page(&url).await?;

        let gigs = extract_gigs(&html);
        let categories = distinct_tags(&gigs);
        Ok(UserGigsData {
            username,
            total_gigs: gigs.len(),
            gigs,
            categories,
            fetched_at: Utc::now(),
        })
    }

    /// Fetches buyer reviews for a category and aggregates their statistics
    pub async fn fetch_category_reviews(
        &self,
        category: &str,
    ) -> Result<CategoryReviewData, ScraperError> {
        let slug = category.trim().to_lowercase().replace(' ', "-");
        let url = format!("https://www.fiverr.com/categories/{slug}/reviews");
        let html = self.fetch_page(&url).await?;

        Ok(aggregate_reviews(category, extract_reviews(&html)))
    }
}

/// Extracts every `<script type="application/json">` payload from a page
fn embedded_json_documents(html: &str) -> Vec<Value> {
    let mut documents = Vec::new();
    let mut rest = html;

    while let Some(tag_start) = rest.find("<script type=\"application/json\"") {
        let after_tag = &rest[tag_start..];
        let Some(content_start) = after_tag.find('>') else {
            break;
        };
        let content = &after_tag[content_start + 1..];
        let Some(content_end) = content.find("</script>") else {
            break;
        };

        // Pages sometimes entity-escape quotes inside the payload
        let raw = content[..content_end].trim().replace("&quot;", "\"");
        if let Ok(value) = serde_json::from_str::<Value>(&raw) {
            documents.push(value);
        }

        rest = &content[content_end..];
    }

    documents
}

/// Finds gig cards anywhere in the embedded documents
fn extract_gigs(html: &str) -> Vec<GigCard> {
    for document in embedded_json_documents(html) {
        if let Some(items) = find_array(&document, "gigs") {
            let gigs: Vec<GigCard> = items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect();
            if !gigs.is_empty() {
                return gigs;
            }
        }
    }
    Vec::new()
}

/// Depth-first search for an array under the given key
fn find_array<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get(key) {
                return Some(items);
            }
            map.values().find_map(|v| find_array(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_array(v, key)),
        _ => None,
    }
}

/// Depth-first search for a string under any of the given keys
fn find_string(documents: &[Value], keys: &[&str]) -> Option<String> {
    fn walk(value: &Value, keys: &[&str]) -> Option<String> {
        match value {
            Value::Object(map) => {
                for key in keys {
                    if let Some(Value::String(s)) = map.get(*key) {
                        return Some(s.clone());
                    }
                }
                map.values().find_map(|v| walk(v, keys))
            }
            Value::Array(items) => items.iter().find_map(|v| walk(v, keys)),
            _ => None,
        }
    }
    documents.iter().find_map(|doc| walk(doc, keys))
}

/// Collects string arrays found under any of the given keys
fn collect_strings(documents: &[Value], keys: &[&str]) -> Vec<String> {
    for document in documents {
        for key in keys {
            if let Some(items) = find_array(document, key) {
                let strings: Vec<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.clone()),
                        // Some payloads nest the text under a "name" field
                        Value::Object(map) => match map.get("name") {
                            Some(Value::String(s)) => Some(s.clone()),
                            _ => None,
                        },
                        _ => None,
                    })
                    .collect();
                if !strings.is_empty() {
                    return strings;
                }
            }
        }
    }
    Vec::new()
}

/// Finds review items anywhere in the embedded documents
fn extract_reviews(html: &str) -> Vec<Review> {
    for document in embedded_json_documents(html) {
        if let Some(items) = find_array(&document, "reviews") {
            let reviews: Vec<Review> = items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect();
            if !reviews.is_empty() {
                return reviews;
            }
        }
    }
    Vec::new()
}

/// Rolls a set of reviews up into category-level statistics
fn aggregate_reviews(category: &str, reviews: Vec<Review>) -> CategoryReviewData {
    let total_reviews = reviews.len();
    let average_rating = if total_reviews == 0 {
        0.0
    } else {
        reviews.iter().map(|r| r.rating).sum::<f64>() / total_reviews as f64
    };

    let mut sentiment = SentimentDistribution::default();
    for review in &reviews {
        if review.rating >= 4.0 {
            sentiment.positive += 1;
        } else if review.rating >= 3.0 {
            sentiment.neutral += 1;
        } else {
            sentiment.negative += 1;
        }
    }

    CategoryReviewData {
        category: category.to_string(),
        total_reviews,
        average_rating,
        sentiment_distribution: sentiment,
        common_keywords: review_keywords(&reviews, 10),
        top_buyer_countries: top_countries(&reviews, 5),
        fetched_at: Utc::now(),
    }
}

/// Words too common to tell categories apart
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "been", "because", "could", "every", "from", "good",
    "great", "have", "just", "more", "much", "really", "should", "some", "than", "that", "them",
    "then", "there", "they", "this", "very", "were", "what", "when", "will", "with", "would",
    "your",
];

/// Most frequent meaningful words across review texts
///
/// Ties break alphabetically so the output is deterministic.
fn review_keywords(reviews: &[Review], limit: usize) -> Vec<KeywordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for review in reviews {
        for word in review.comment.split(|c: char| !c.is_alphanumeric()) {
            let word = word.to_lowercase();
            if word.len() >= 4 && !STOPWORDS.contains(&word.as_str()) {
                *counts.entry(word).or_default() += 1;
            }
        }
    }

    let mut keywords: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect();
    keywords.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    keywords.truncate(limit);
    keywords
}

/// Countries buyers most often review from, most frequent first
fn top_countries(reviews: &[Review], limit: usize) -> Vec<CountryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for review in reviews {
        if let Some(country) = review.buyer_country.as_deref() {
            if !country.is_empty() {
                *counts.entry(country).or_default() += 1;
            }
        }
    }

    let mut countries: Vec<CountryCount> = counts
        .into_iter()
        .map(|(country, count)| CountryCount {
            country: country.to_string(),
            count,
        })
        .collect();
    countries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.country.cmp(&b.country)));
    countries.truncate(limit);
    countries
}

/// Distinct tags across a set of gigs, in first-seen order
fn distinct_tags(gigs: &[GigCard]) -> Vec<String> {
    let mut tags = Vec::new();
    for gig in gigs {
        for tag in &gig.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }
    tags
}
