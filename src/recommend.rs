//! "Recommend me a coffee" suggestions from a generative-language API.
//!
//! Recommendations never fail: a missing key or an upstream error yields a
//! fixed message the storefront can show as is.

use async_trait::async_trait;
use reqwest::Client;
use roastery_core::{Category, Product};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RecommendConfig;

pub const UNAVAILABLE_MESSAGE: &str =
    "AI recommendations are currently unavailable. Please browse our collection!";

pub const FALLBACK_MESSAGE: &str =
    "I'm having a little trouble thinking right now. Maybe try searching for 'fruity' or 'chocolatey' notes?";

const TEMPERATURE: f64 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 250;

#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, preference: &str, catalog: &[Product]) -> String;
}

/// Always answers with the same text.
#[derive(Debug, Clone)]
pub struct StaticRecommender(pub String);

impl StaticRecommender {
    pub fn unavailable() -> Self {
        Self(UNAVAILABLE_MESSAGE.to_string())
    }
}

#[async_trait]
impl Recommender for StaticRecommender {
    async fn recommend(&self, _preference: &str, _catalog: &[Product]) -> String {
        self.0.clone()
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiRecommender {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    shop_name: String,
}

impl GeminiRecommender {
    pub fn new(config: &RecommendConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            shop_name: "Gilka Coffee".to_string(),
        })
    }

    /// Name the barista introduces themselves as working for.
    pub fn with_shop_name(mut self, name: impl Into<String>) -> Self {
        self.shop_name = name.into();
        self
    }

    fn prompt(&self, preference: &str, catalog: &[Product]) -> String {
        let coffees: Vec<&Product> = catalog
            .iter()
            .filter(|p| p.category == Category::Coffee)
            .collect();
        let catalog_json = serde_json::to_string(&coffees).unwrap_or_else(|_| "[]".to_string());
        format!(
            "You are a professional barista at {}. Based on this user preference: \"{}\", \
             recommend 1-2 coffees from our catalog.\n\
             Catalog: {}.\n\
             Respond with a friendly tone, explaining why these choices fit their taste.",
            self.shop_name, preference, catalog_json
        )
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status, text));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| e.to_string())?;
        let text = generated.text();
        if text.trim().is_empty() {
            return Err("empty response".to_string());
        }
        Ok(text)
    }
}

#[async_trait]
impl Recommender for GeminiRecommender {
    async fn recommend(&self, preference: &str, catalog: &[Product]) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return UNAVAILABLE_MESSAGE.to_string();
        };

        let prompt = self.prompt(preference, catalog);
        match self.generate(api_key, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Recommendation request failed: {}", e);
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roastery_core::ContentDocument;

    fn recommender(api_key: Option<&str>) -> GeminiRecommender {
        let config = RecommendConfig {
            api_key: api_key.map(String::from),
            // Nothing listens here
            endpoint: "http://127.0.0.1:9".to_string(),
            ..RecommendConfig::default()
        };
        GeminiRecommender::new(&config, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let catalog = ContentDocument::bundled().products;
        let text = recommender(None).recommend("fruity", &catalog).await;
        assert_eq!(text, UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_upstream_failure_falls_back() {
        let catalog = ContentDocument::bundled().products;
        let text = recommender(Some("key")).recommend("fruity", &catalog).await;
        assert_eq!(text, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_prompt_lists_only_coffee() {
        let catalog = ContentDocument::bundled().products;
        let prompt = recommender(None)
            .with_shop_name("Test Roasters")
            .prompt("chocolatey", &catalog);

        assert!(prompt.contains("barista at Test Roasters"));
        assert!(prompt.contains("\"chocolatey\""));
        for product in &catalog {
            assert_eq!(
                prompt.contains(&format!("\"id\":\"{}\"", product.id)),
                product.category == Category::Coffee,
                "{}",
                product.name
            );
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 250);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Try "},{"text":"the Yirgacheffe."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), "Try the Yirgacheffe.");
        assert_eq!(GenerateResponse::default().text(), "");
    }

    #[tokio::test]
    async fn test_static_recommender() {
        let text = StaticRecommender("hello".to_string())
            .recommend("anything", &[])
            .await;
        assert_eq!(text, "hello");
    }
}
