//! Service configuration, read once at startup.
//!
//! Secrets come from env vars and fall back to Docker secret files under
//! `/run/secrets`. Everything else has a default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use crate::freshness::FreshnessConfig;

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Debug, Clone)]
pub struct FootballSettings {
    pub base_url: String,
    pub api_key: String,
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone)]
pub struct NewsSettings {
    pub base_url: String,
    pub host: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct SocialSettings {
    pub base_url: String,
    pub bearer_token: String,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub football: FootballSettings,
    pub news: NewsSettings,
    /// `None` when no bearer token is configured; fan sentiment is then skipped.
    pub social: Option<SocialSettings>,
    pub llm: LlmSettings,
    /// Applies to the football, news and social providers.
    pub upstream_timeout: Duration,
    pub llm_timeout: Duration,
    /// Most headlines handed to the generator per match.
    pub headline_cap: usize,
    pub freshness: FreshnessConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let football_key = secret(&lookup, "FOOTBALL_API_KEY", "football_api_key")?;
        let rapid_key = secret(&lookup, "RAPID_API_KEY", "rapid_api_key")?;
        let openai_key = secret(&lookup, "OPENAI_API_KEY", "openai_api_key")?;
        for (name, value) in [
            ("FOOTBALL_API_KEY", &football_key),
            ("RAPID_API_KEY", &rapid_key),
            ("OPENAI_API_KEY", &openai_key),
        ] {
            reject_placeholder(name, value)?;
        }
        let twitter_token =
            optional_secret(&lookup, "TWITTER_BEARER_TOKEN", "twitter_bearer_token")?;
        if let Some(token) = &twitter_token {
            reject_placeholder("TWITTER_BEARER_TOKEN", token)?;
        }

        let database_url = secret(&lookup, "DATABASE_URL", "database_url")?;
        let redis_url = secret(&lookup, "REDIS_URL", "redis_url")?;

        let defaults = FreshnessConfig::default();
        let freshness = FreshnessConfig {
            live: secs(&lookup, "TTL_LIVE_SECS", defaults.live),
            scheduled: secs(&lookup, "TTL_SCHEDULED_SECS", defaults.scheduled),
            finished: secs(&lookup, "TTL_FINISHED_SECS", defaults.finished),
            default: secs(&lookup, "TTL_DEFAULT_SECS", defaults.default),
            squad: secs(&lookup, "TTL_SQUAD_SECS", defaults.squad),
            news: secs(&lookup, "TTL_NEWS_SECS", defaults.news),
            social: secs(&lookup, "TTL_SOCIAL_SECS", defaults.social),
            leagues: secs(&lookup, "TTL_LEAGUES_SECS", defaults.leagues),
            standings: secs(&lookup, "TTL_STANDINGS_SECS", defaults.standings),
        };
        freshness
            .validate()
            .map_err(|e| anyhow!("Invalid cache TTL configuration: {}", e))?;

        Ok(Self {
            http_port: parsed(&lookup, "HTTP_PORT", 8080),
            database_url,
            redis_url,
            football: FootballSettings {
                base_url: text(
                    &lookup,
                    "FOOTBALL_BASE_URL",
                    "https://api-football-v1.p.rapidapi.com/v3",
                ),
                api_key: football_key,
                requests_per_minute: parsed(&lookup, "FOOTBALL_REQUESTS_PER_MINUTE", 30),
            },
            news: NewsSettings {
                base_url: text(&lookup, "NEWS_BASE_URL", "https://google-news13.p.rapidapi.com"),
                host: text(&lookup, "NEWS_HOST", "google-news13.p.rapidapi.com"),
                api_key: rapid_key,
            },
            social: twitter_token.map(|bearer_token| SocialSettings {
                base_url: text(&lookup, "TWITTER_BASE_URL", "https://api.twitter.com/2"),
                bearer_token,
            }),
            llm: LlmSettings {
                base_url: text(&lookup, "OPENAI_BASE_URL", "https://api.openai.com/v1"),
                api_key: openai_key,
                model: text(&lookup, "OPENAI_MODEL", "gpt-4o-mini"),
            },
            upstream_timeout: secs(&lookup, "UPSTREAM_TIMEOUT_SECS", Duration::from_secs(10)),
            llm_timeout: secs(&lookup, "LLM_TIMEOUT_SECS", Duration::from_secs(30)),
            headline_cap: parsed(&lookup, "HEADLINE_CAP", 10),
            freshness,
        })
    }
}

/// Env var first, then `/run/secrets/<file>`. Set-but-empty is an error.
fn secret<F>(lookup: &F, var: &str, file: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Some(_) => Err(anyhow!("{} is set but empty", var)),
        None => read_secret_file(&format!("{SECRETS_DIR}/{file}"), file),
    }
}

/// Like [`secret`], but a secret that is neither set nor mounted is `None`.
fn optional_secret<F>(lookup: &F, var: &str, file: &str) -> Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let path = format!("{SECRETS_DIR}/{file}");
    if lookup(var).is_none() && !std::path::Path::new(&path).exists() {
        return Ok(None);
    }
    secret(lookup, var, file).map(Some)
}

/// Read a secret from a Docker secret file
fn read_secret_file(file_path: &str, secret_name: &str) -> Result<String> {
    let value = std::fs::read_to_string(file_path)
        .map(|s| s.trim().to_string())
        .with_context(|| {
            format!(
                "Secret not found: set the env var or mount {} ({})",
                file_path, secret_name
            )
        })?;
    if value.is_empty() {
        return Err(anyhow!("Secret file {} is empty", file_path));
    }
    Ok(value)
}

/// Prevent accidental use of sample/placeholder keys
fn reject_placeholder(name: &str, value: &str) -> Result<()> {
    let lower = value.trim().to_lowercase();
    if lower.contains("change_me") || lower.contains("your_") || lower.starts_with("sample") {
        return Err(anyhow!(
            "{} appears to be a placeholder value; replace with your real key",
            name
        ));
    }
    Ok(())
}

fn text<F>(lookup: &F, var: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed<F, T>(lookup: &F, var: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(var) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {}={:?}, using default {:?}", var, raw, default);
            default
        }),
    }
}

fn secs<F>(lookup: &F, var: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    Duration::from_secs(parsed(lookup, var, default.as_secs()))
}
