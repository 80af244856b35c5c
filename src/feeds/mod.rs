pub mod paginator;
pub mod twitter;

use crate::error::Result;
use crate::geocode::GeocodeString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One status from a user's timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub author: String,
    /// Free-text location from the author's profile, empty when unset.
    pub author_location: String,
}

impl Post {
    pub fn permalink(&self, host: &str) -> String {
        format!("https://{}/{}/status/{}", host, self.author, self.id)
    }
}

/// Parameters shared by every page request of one timeline walk.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineQuery {
    pub screen_name: String,
    pub page_size: usize,
    pub since_id: Option<u64>,
    pub geocode: Option<GeocodeString>,
}

impl TimelineQuery {
    pub fn new(screen_name: impl Into<String>) -> Self {
        Self {
            screen_name: screen_name.into(),
            page_size: 200,
            since_id: None,
            geocode: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelinePage {
    pub posts: Vec<Post>,
    /// `max_id` for the following request; `None` once the feed is exhausted.
    pub next_max_id: Option<u64>,
}

impl TimelinePage {
    pub fn from_posts(posts: Vec<Post>) -> Self {
        let next_max_id = posts
            .iter()
            .map(|p| p.id)
            .min()
            .and_then(|id| id.checked_sub(1));
        Self { posts, next_max_id }
    }
}

/// A remote, reverse-chronological, `max_id`-paginated timeline.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    async fn fetch_page(&self, query: &TimelineQuery, max_id: Option<u64>)
        -> Result<TimelinePage>;
}


#[cfg(test)]
mod tests {
    use super::testing::post;
    use super::*;

    #[test]
    fn test_permalink() {
        let p = post(1234, (2021, 6, 15), "hello", "");
        assert_eq!(
            p.permalink("twitter.com"),
            "https://twitter.com/nasa/status/1234"
        );
    }

    #[test]
    fn test_page_cursor_is_below_oldest_post() {
        let page = TimelinePage::from_posts(vec![
            post(30, (2021, 1, 3), "c", ""),
            post(10, (2021, 1, 1), "a", ""),
            post(20, (2021, 1, 2), "b", ""),
        ]);
        assert_eq!(page.next_max_id, Some(9));
    }

    #[test]
    fn test_empty_page_has_no_cursor() {
        assert_eq!(TimelinePage::from_posts(Vec::new()).next_max_id, None);
    }
}
