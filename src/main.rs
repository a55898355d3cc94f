use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use matchday_debates::cache::redis::RedisCache;
use matchday_debates::cache::BestEffortCache;
use matchday_debates::config::Config;
use matchday_debates::debate::DebateService;
use matchday_debates::feed::FeedService;
use matchday_debates::freshness::FreshnessPolicy;
use matchday_debates::health::HealthState;
use matchday_debates::http::{self, AppState};
use matchday_debates::providers::{
    ApiFootballClient, GoogleNewsClient, OpenAiClient, TwitterClient,
};
use matchday_debates::store::postgres::PgStore;

const CONNECT_RETRIES: u32 = 5;
const LOCK_TABLE_LIMIT: usize = 10_000;

#[tokio::main]
async fn main() -> Result<()> {
    // Local development only; deployed containers use env vars and secret files.
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "matchday_debates=info"
                    .parse()
                    .context("Invalid default log directive")?,
            ),
        )
        .init();

    info!("Matchday debates service v{}", env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        info!("Loaded .env file");
    }

    let config = Config::from_env()?;
    let health = HealthState::new();

    let store = PgStore::connect_with_retry(&config.database_url, CONNECT_RETRIES).await?;
    store.migrate().await?;

    let redis = RedisCache::connect_with_retry(&config.redis_url, CONNECT_RETRIES).await?;
    let cache = BestEffortCache::new(Arc::new(redis), health.clone());

    let football = ApiFootballClient::new(&config.football, config.upstream_timeout)?;
    let news = GoogleNewsClient::new(&config.news, config.upstream_timeout)?;
    let generator = OpenAiClient::new(&config.llm, config.llm_timeout)?;

    let mut feed = FeedService::new(
        Arc::new(football),
        Arc::new(news),
        cache.clone(),
        FreshnessPolicy::new(config.freshness),
        config.headline_cap,
    );
    match &config.social {
        Some(settings) => {
            let social = TwitterClient::new(settings, config.upstream_timeout)?;
            feed = feed.with_social(Arc::new(social));
            info!("Fan sentiment enabled");
        }
        None => warn!("TWITTER_BEARER_TOKEN not configured, fan sentiment disabled"),
    }
    let debates = DebateService::new(
        Arc::new(store),
        feed.clone(),
        Arc::new(generator),
        health.clone(),
    );

    // Periodic lock table cleanup
    let locks = debates.locks().clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            locks.cleanup(LOCK_TABLE_LIMIT).await;
        }
    });

    let app = http::router(AppState {
        feed,
        debates,
        cache,
        health,
    });

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on {}", addr);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                error!("Server error: {:?}", e);
                return Err(e.into());
            }
            warn!("Server stopped");
        }
        _ = ctrl_c => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
