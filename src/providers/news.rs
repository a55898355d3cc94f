//! Headline search through the RapidAPI Google News endpoint.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::NewsSettings;

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Non-empty headline titles for `query`, in provider order.
    async fn search_headlines(&self, query: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchItem {
    title: String,
}

pub struct GoogleNewsClient {
    http: reqwest::Client,
    base_url: String,
    host: String,
    api_key: String,
}

impl GoogleNewsClient {
    pub fn new(settings: &NewsSettings, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            host: settings.host.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

fn titles(body: &str) -> Result<Vec<String>> {
    let parsed: SearchResponse =
        serde_json::from_str(body).context("Failed to parse news response")?;
    Ok(parsed
        .items
        .into_iter()
        .map(|item| item.title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect())
}

#[async_trait]
impl NewsProvider for GoogleNewsClient {
    async fn search_headlines(&self, query: &str) -> Result<Vec<String>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(&[("keyword", query), ("lr", "en-US")])
            .send()
            .await
            .context("Failed to fetch news")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read news response body")?;

        if !status.is_success() {
            return Err(anyhow!("News API error (status {}): {}", status, body));
        }
        titles(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_titles_are_dropped() {
        let body = r#"{"status":"success","items":[
            {"title":"Arsenal edge Chelsea","snippet":"..."},
            {"title":"   "},
            {"snippet":"no title"}
        ]}"#;
        assert_eq!(titles(body).unwrap(), vec!["Arsenal edge Chelsea".to_string()]);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(titles("<html>").is_err());
    }
}
