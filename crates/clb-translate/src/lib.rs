//! Google Translate adapter.
//!
//! Uses the public `translate_a/single` endpoint (the one the web widget uses);
//! no API key, source language auto-detected.

use std::time::Duration;

use async_trait::async_trait;

use clb_core::{errors::Error, ports::Translator, Result};

pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const MAX_INPUT_CHARS: usize = 4_500;

#[derive(Clone, Debug)]
pub struct GoogleTranslator {
    endpoint: String,
    http: reqwest::Client,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::External(format!("translate http client: {e}")))?;
        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            http,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target: &str) -> Result<String> {
        let text: String = text.chars().take(MAX_INPUT_CHARS).collect();

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target),
                ("dt", "t"),
                ("q", text.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::External(format!("translate request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "translate failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("translate json error: {e}")))?;

        let out = extract_translation(&v);
        if out.trim().is_empty() {
            return Err(Error::External(
                "translate returned empty text".to_string(),
            ));
        }

        tracing::debug!(target_lang = target, chars = out.chars().count(), "translated");
        Ok(out)
    }
}

/// Join the translated segments: response shape is `[[["seg", "orig", ..], ..], ..]`.
fn extract_translation(v: &serde_json::Value) -> String {
    v.get(0)
        .and_then(|s| s.as_array())
        .map(|segments| {
            segments
                .iter()
                .filter_map(|seg| seg.get(0).and_then(|t| t.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default()
}
