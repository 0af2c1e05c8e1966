//! Text-generation API client (OpenAI-style chat completions)
//!
//! Sends system+user prompts to a chat-completions endpoint through the
//! resilient API client and parses the model's JSON replies into typed
//! results. Prompts ask the model for a fixed JSON shape; parsing is tolerant
//! of dropped optional fields.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::{GigListing, KeywordAnalysis, MarketAnalysis, ProfileAnalysis, ProfileData, UserGigsData};
use crate::client::{ApiClient, ApiError, HttpTransport, RequestDescriptor, Transport};

/// Default chat-completions endpoint
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors that can occur when calling the generation API
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The HTTP call failed after retries
    #[error("generation request failed: {0}")]
    Request(#[from] ApiError),

    /// The response envelope or the model's JSON payload did not parse
    #[error("failed to parse generation response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API returned no choices
    #[error("generation response contained no choices")]
    EmptyResponse,
}

/// Response envelope for chat completions
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Client for the text-generation API
///
/// Generic over the transport so tests can script responses; production code
/// uses the default HTTP transport.
#[derive(Debug, Clone)]
pub struct GenerationClient<T: Transport = HttpTransport> {
    api: ApiClient<T>,
    api_key: String,
    model: String,
    base_url: String,
}

impl<T: Transport> GenerationClient<T> {
    /// Creates a client for the given API key and model name
    pub fn new(api: ApiClient<T>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (for proxies or testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sends one system+user exchange and returns the raw reply text
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "response_format": {"type": "json_object"},
        });

        let descriptor = RequestDescriptor::post(format!("{}/chat/completions", self.base_url), body)
            .with_header("Authorization", format!("Bearer {}", self.api_key))
            .with_header("Content-Type", "application/json");

        debug!(model = %self.model, "sending chat completion request");
        let response = self.api.send(&descriptor).await?;

        let completion: ChatCompletionResponse = response.json()?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }

    /// Performs keyword research for a search keyword
    pub async fn analyze_keyword(&self, keyword: &str) -> Result<KeywordAnalysis, GenerationError> {
        let system = r#"You are an expert in Fiverr gig keyword research.
Return your analysis in the following JSON format:
{
    "related_keywords": [
        {"keyword": "string", "demand": "High|Medium|Low", "competition": "High|Medium|Low", "price_range": "string (e.g. $50-100)"}
    ],
    "market_analysis": {
        "trend": "Growing|Stable|Declining",
        "target_audience": "string",
        "market_size": "string",
        "top_regions": ["string"]
    },
    "raw_insights": "string"
}"#;
        let user = format!("Analyze the Fiverr market for '{keyword}' services");

        let content = self.complete(system, &user).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Analyzes a seller's profile and gigs
    ///
    /// The scraped data is serialized into the user message; the model
    /// returns category insights, a SWOT read, optimization suggestions,
    /// market position, and an action plan.
    pub async fn analyze_profile(
        &self,
        profile: &ProfileData,
        gigs: &UserGigsData,
    ) -> Result<ProfileAnalysis, GenerationError> {
        let system = r#"You are an expert in Fiverr profile optimization and market analysis.
Analyze the profile and gig data and return your insights in the following JSON format:
{
    "category_insights": {
        "primary_category": "string",
        "subcategories": ["string"],
        "market_fit_score": number,
        "category_opportunities": ["string"]
    },
    "competitive_analysis": {
        "strengths": ["string"],
        "weaknesses": ["string"],
        "opportunities": ["string"],
        "threats": ["string"],
        "unique_selling_points": ["string"]
    },
    "optimization_suggestions": {
        "title": {"current": "string", "optimized": "string", "reasoning": "string"},
        "description_improvements": ["string"],
        "seo_keywords": ["string"],
        "pricing_position": "string"
    },
    "market_position": {
        "price_percentile": number,
        "rating_percentile": number,
        "market_share_estimate": "string",
        "growth_potential": "string"
    },
    "action_plan": {
        "immediate": ["string"],
        "short_term": ["string"],
        "long_term": ["string"]
    }
}"#;
        let context = json!({"profile": profile, "gigs": gigs});
        let user = format!("Perform a comprehensive analysis of this Fiverr profile data: {context}");

        let content = self.complete(system, &user).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Generates a complete gig listing, informed by prior market analysis
    pub async fn generate_gig(
        &self,
        keyword: &str,
        market: &MarketAnalysis,
    ) -> Result<GigListing, GenerationError> {
        let system = format!(
            r#"You are an expert Fiverr gig creator.
Use these market insights to inform your decisions:
- Target Audience: {audience}
- Market Trend: {trend}
- Market Size: {size}

Return your response in the following JSON format:
{{
    "title": "string (catchy, SEO-optimized title)",
    "description": "string (compelling description with keywords)",
    "search_tags": ["string"],
    "packages": {{
        "basic": {{"name": "string", "price": number, "delivery_time": number, "features": ["string"], "description": "string"}},
        "standard": {{"name": "string", "price": number, "delivery_time": number, "features": ["string"], "description": "string"}},
        "premium": {{"name": "string", "price": number, "delivery_time": number, "features": ["string"], "description": "string"}}
    }},
    "requirements": ["string"],
    "faq": [{{"question": "string", "answer": "string"}}],
    "portfolio_suggestions": ["string"],
    "upsell_opportunities": ["string"]
}}"#,
            audience = market.target_audience,
            trend = market.trend,
            size = market.market_size,
        );
        let user = format!("Create a professional, high-converting Fiverr gig for '{keyword}' services");

        let content = self.complete(&system, &user).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completion_envelope_parses() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"ok\":true}"}, "finish_reason": "stop"}
            ]
        }"#;

        let completion: ChatCompletionResponse =
            serde_json::from_str(json).expect("Failed to parse envelope");

        assert_eq!(completion.choices.len(), 1);
        assert_eq!(completion.choices[0].message.content, "{\"ok\":true}");
    }

    #[test]
    fn test_empty_choices_maps_to_empty_response_error() {
        let completion = ChatCompletionResponse { choices: vec![] };
        let result = completion
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse);
        assert!(matches!(result, Err(GenerationError::EmptyResponse)));
    }
}
