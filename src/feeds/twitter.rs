use super::{Post, TimelinePage, TimelineQuery, TimelineSource};
use crate::auth::Credentials;
use crate::error::{FeedError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Authenticated handle on the v1.1 REST API.
pub struct TwitterClient {
    credentials: Credentials,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    #[serde(default)]
    screen_name: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

impl TwitterClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_options(credentials, DEFAULT_API_BASE, Duration::from_secs(30))
    }

    pub fn with_options(
        credentials: Credentials,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("feedsent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            credentials,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn timeline_url(&self) -> String {
        format!("{}/statuses/user_timeline.json", self.api_base)
    }
}

/// Query parameters for one `user_timeline` page. Full text is always requested.
fn timeline_params(query: &TimelineQuery, max_id: Option<u64>) -> Vec<(String, String)> {
    let mut params = vec![
        ("screen_name".to_string(), query.screen_name.clone()),
        ("count".to_string(), query.page_size.to_string()),
        ("tweet_mode".to_string(), "extended".to_string()),
    ];
    if let Some(max_id) = max_id {
        params.push(("max_id".to_string(), max_id.to_string()));
    }
    if let Some(since_id) = query.since_id {
        params.push(("since_id".to_string(), since_id.to_string()));
    }
    if let Some(geocode) = &query.geocode {
        params.push(("geocode".to_string(), geocode.to_string()));
    }
    params
}

fn query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a `user_timeline` response body.
///
/// Statuses that lack an id, a timestamp, a text or an author are dropped
/// with a warning; the page cursor still accounts for them.
fn parse_timeline(body: &str) -> Result<TimelinePage> {
    let statuses: Vec<ApiStatus> = serde_json::from_str(body)?;

    let next_max_id = statuses
        .iter()
        .filter_map(|s| s.id)
        .min()
        .and_then(|id| id.checked_sub(1));

    let posts = statuses
        .into_iter()
        .filter_map(|status| match status.into_post() {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!("skipping status: {}", e);
                None
            }
        })
        .collect();

    Ok(TimelinePage { posts, next_max_id })
}

impl ApiStatus {
    fn into_post(self) -> Result<Post> {
        let id = self
            .id
            .ok_or_else(|| FeedError::MalformedPost("missing id".to_string()))?;

        let created_at = self
            .created_at
            .as_deref()
            .ok_or_else(|| FeedError::MalformedPost(format!("{}: missing created_at", id)))
            .and_then(|raw| {
                parse_created_at(raw).ok_or_else(|| {
                    FeedError::MalformedPost(format!("{}: bad created_at {:?}", id, raw))
                })
            })?;

        let text = self
            .full_text
            .or(self.text)
            .ok_or_else(|| FeedError::MalformedPost(format!("{}: missing text", id)))?;

        let user = self
            .user
            .ok_or_else(|| FeedError::MalformedPost(format!("{}: missing user", id)))?;
        let author = user
            .screen_name
            .ok_or_else(|| FeedError::MalformedPost(format!("{}: missing screen_name", id)))?;

        Ok(Post {
            id,
            created_at,
            text,
            author,
            author_location: user.location.unwrap_or_default(),
        })
    }
}

/// Parse the API's `Wed Oct 10 20:19:24 +0000 2018` timestamps.
fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, CREATED_AT_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl TimelineSource for TwitterClient {
    async fn fetch_page(
        &self,
        query: &TimelineQuery,
        max_id: Option<u64>,
    ) -> Result<TimelinePage> {
        let url = self.timeline_url();
        let params = timeline_params(query, max_id);
        let authorization = self
            .credentials
            .authorization_header("GET", &url, &params)?;

        tracing::debug!(user = %query.screen_name, ?max_id, "requesting timeline page");

        let response = self
            .client
            .get(format!("{}?{}", url, query_string(&params)))
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedError::from_status(status, body));
        }

        parse_timeline(&body)
    }
}
