//! Upstream collaborators: fixture data, news search, social posts and content generation.
//!
//! Each is a trait so the core can be driven by test doubles; the concrete
//! clients are thin reqwest wrappers with bounded timeouts and no retries.

pub mod football;
pub mod llm;
pub mod news;
pub mod social;

pub use football::{
    ApiFootballClient, Fixture, FootballProvider, League, LeagueTable, MatchStats, Squad, Standing,
    TeamStats,
};
pub use llm::{ContentGenerator, GeneratedCard, GeneratedDebate, GeneratorError, OpenAiClient};
pub use news::{GoogleNewsClient, NewsProvider};
pub use social::{SocialPost, SocialProvider, TwitterClient};
