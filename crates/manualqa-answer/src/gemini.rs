//! Gemini `generateContent` client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use manualqa_core::config::ModelSettings;
use manualqa_core::traits::Generator;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
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
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_settings(models: &ModelSettings) -> Result<Self> {
        let api_key = models
            .gemini_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("no Gemini API key: set GEMINI_API_KEY or models.gemini_api_key"))?;
        Self::new(&models.gemini_endpoint, &models.llm_name, api_key)
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest { contents: vec![Content { parts: vec![RequestPart { text: prompt }] }] };
        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "calling Gemini");
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini returned {status}: {detail}"));
        }
        let parsed: GenerateResponse = response.json().await.context("invalid Gemini response")?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;
    let text: String = content.parts.into_iter().map(|p| p.text).collect();
    Ok(text.trim().to_string())
}
