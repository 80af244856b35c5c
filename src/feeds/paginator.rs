use super::{Post, TimelineQuery, TimelineSource};
use crate::error::Result;
use std::collections::VecDeque;

/// Lazily walks a timeline one page at a time.
///
/// A page is only requested once the previous one has been fully consumed,
/// so a caller that stops early never pays for the rest of the feed. When
/// `limit` is set, at most that many posts are yielded.
pub struct Paginator<'a> {
    source: &'a dyn TimelineSource,
    query: TimelineQuery,
    limit: Option<usize>,
    buffer: VecDeque<Post>,
    next_max_id: Option<u64>,
    exhausted: bool,
    yielded: usize,
    pages: usize,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn TimelineSource, query: TimelineQuery, limit: Option<usize>) -> Self {
        Self {
            source,
            query,
            limit,
            buffer: VecDeque::new(),
            next_max_id: None,
            exhausted: false,
            yielded: 0,
            pages: 0,
        }
    }

    /// Next post, newest first, or `None` when the feed or the limit is exhausted.
    pub async fn next_post(&mut self) -> Result<Option<Post>> {
        if self.limit.is_some_and(|limit| self.yielded >= limit) {
            return Ok(None);
        }

        while self.buffer.is_empty() {
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }

        let post = self.buffer.pop_front();
        if post.is_some() {
            self.yielded += 1;
        }
        Ok(post)
    }

    /// Drain the remaining sequence into a vector.
    pub async fn collect(mut self) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        while let Some(post) = self.next_post().await? {
            posts.push(post);
        }
        Ok(posts)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let max_id = if self.pages == 0 {
            None
        } else {
            self.next_max_id
        };

        let page = self.source.fetch_page(&self.query, max_id).await?;
        self.pages += 1;

        tracing::debug!(
            user = %self.query.screen_name,
            page = self.pages,
            posts = page.posts.len(),
            "fetched timeline page"
        );

        // A page whose statuses were all skipped still carries a cursor.
        // Only a missing or non-advancing cursor ends the walk.
        let advanced = match (max_id, page.next_max_id) {
            (Some(previous), Some(next)) => next < previous,
            (_, next) => next.is_some(),
        };
        if !advanced {
            self.exhausted = true;
        }
        self.next_max_id = page.next_max_id;
        self.buffer.extend(page.posts);
        Ok(())
    }
}
