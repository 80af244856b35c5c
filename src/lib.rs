//! Fetch a user's timeline, keep the posts that match a date range, a
//! location and a set of keywords, score their sentiment and write them to CSV.

pub mod auth;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod export;
pub mod feeds;
pub mod filter;
pub mod geocode;
pub mod pipeline;
pub mod report;
pub mod sentiment;

pub use auth::Credentials;
pub use config::Config;
pub use error::FeedError;
pub use feeds::twitter::TwitterClient;
pub use pipeline::{Pipeline, RunSummary};
