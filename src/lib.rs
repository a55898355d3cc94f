//! Football fixture/lineup caching and AI-generated match debates.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod debate;
pub mod error;
pub mod feed;
pub mod freshness;
pub mod health;
pub mod http;
pub mod identity;
pub mod normalize;
pub mod providers;
pub mod reconcile;
pub mod sentiment;
pub mod store;
