//! Recent fan posts from the X (Twitter) v2 recent-search endpoint.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SocialSettings;

/// Posts requested per search; the endpoint accepts 10 to 100.
const MAX_RESULTS: &str = "25";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialPost {
    pub text: String,
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
}

#[async_trait]
pub trait SocialProvider: Send + Sync {
    /// Recent English-language original posts mentioning `team`, newest first.
    async fn recent_posts(&self, team: &str) -> Result<Vec<SocialPost>>;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchResponse {
    data: Vec<Tweet>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Tweet {
    text: String,
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PublicMetrics {
    retweet_count: u64,
    reply_count: u64,
    like_count: u64,
}

pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl TwitterClient {
    pub fn new(settings: &SocialSettings, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            bearer_token: settings.bearer_token.clone(),
        })
    }
}

/// Quoted so multi-word names match as a phrase.
fn search_query(team: &str) -> String {
    format!("\"{}\" lang:en -is:retweet", team.trim().replace('"', ""))
}

/// No matches comes back as a body without `data`, which is an empty list here.
fn posts(body: &str) -> Result<Vec<SocialPost>> {
    let parsed: SearchResponse =
        serde_json::from_str(body).context("Failed to parse social search response")?;
    Ok(parsed
        .data
        .into_iter()
        .filter(|t| !t.text.trim().is_empty())
        .map(|t| SocialPost {
            text: t.text,
            likes: t.public_metrics.like_count,
            reposts: t.public_metrics.retweet_count,
            replies: t.public_metrics.reply_count,
        })
        .collect())
}

#[async_trait]
impl SocialProvider for TwitterClient {
    async fn recent_posts(&self, team: &str) -> Result<Vec<SocialPost>> {
        let url = format!("{}/tweets/search/recent", self.base_url);
        let query = search_query(team);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", MAX_RESULTS),
                ("tweet.fields", "public_metrics"),
            ])
            .send()
            .await
            .context("Failed to search social posts")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read social search response body")?;

        if !status.is_success() {
            return Err(anyhow!("Social search error (status {}): {}", status, body));
        }
        posts(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_quotes_the_team_and_drops_reposts() {
        assert_eq!(
            search_query(" Manchester \"United\" "),
            "\"Manchester United\" lang:en -is:retweet"
        );
    }

    #[test]
    fn metrics_are_read_and_blank_posts_dropped() {
        let body = r#"{"data":[
            {"id":"1","text":"What a finish from Saka","public_metrics":
                {"retweet_count":4,"reply_count":2,"like_count":30,"quote_count":1}},
            {"id":"2","text":"  "},
            {"id":"3","text":"Poor defending again"}
        ],"meta":{"result_count":3}}"#;
        let found = posts(body).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].likes, 30);
        assert_eq!(found[0].reposts, 4);
        assert_eq!(found[1].likes, 0);
    }

    #[test]
    fn no_results_is_empty() {
        let found = posts(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(found.is_empty());
    }
}
