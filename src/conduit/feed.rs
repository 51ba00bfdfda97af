// Feed pagination.
// Walks a user's activity feed backwards one page at a time, emitting each page oldest-first.

use std::collections::VecDeque;

use serde_json::{Map, Value, json};

use crate::error::{PhabStatsError, Result};

use super::client::Conduit;
use super::types::{ChronologicalKey, FeedPage, FeedStory, Phid, StoryData};

pub const FEED_METHOD: &str = "feed.query";

/// Lazy cursor over `feed.query` results for one user.
///
/// The service returns newest stories first and `after` selects strictly
/// older ones, so each page is sorted ascending and the next cursor is the
/// page's oldest key. Stories at or above the current cursor were already
/// covered by an earlier page and are dropped; a page with nothing older
/// than the cursor is reported as [`PhabStatsError::CursorStalled`].
pub struct FeedPaginator<'a, C: ?Sized> {
    conduit: &'a C,
    user: Phid,
    cursor: Option<ChronologicalKey>,
    buffer: VecDeque<StoryData>,
    exhausted: bool,
}

impl<'a, C: Conduit + ?Sized> FeedPaginator<'a, C> {
    pub fn new(conduit: &'a C, user: Phid) -> Self {
        Self {
            conduit,
            user,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Whether more stories may be available.
    pub fn has_more(&self) -> bool {
        !self.buffer.is_empty() || !self.exhausted
    }

    pub fn cursor(&self) -> Option<ChronologicalKey> {
        self.cursor
    }

    /// Start again from the newest story.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    /// Fetch the next page, sorted oldest-first. `None` once the feed is exhausted.
    pub fn next_page(&mut self) -> Result<Option<Vec<FeedStory>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut params = Map::new();
        params.insert("filterPHIDs".to_string(), json!([self.user.as_str()]));
        params.insert(
            "after".to_string(),
            self.cursor.map_or(Value::Null, |key| json!(key)),
        );

        let page: FeedPage = serde_json::from_value(self.conduit.call(FEED_METHOD, params)?)?;
        let mut stories = page.into_stories();
        stories.sort_by_key(|story| story.chronological_key);

        let Some(oldest) = stories.first().map(|story| story.chronological_key) else {
            self.exhausted = true;
            return Ok(None);
        };

        if let Some(cursor) = self.cursor {
            if oldest >= cursor {
                self.exhausted = true;
                return Err(PhabStatsError::CursorStalled { cursor: cursor.0 });
            }
            stories.retain(|story| story.chronological_key < cursor);
        }

        tracing::debug!(user = %self.user, stories = stories.len(), oldest = %oldest, "fetched feed page");
        self.cursor = Some(oldest);
        Ok(Some(stories))
    }
}

impl<C: Conduit + ?Sized> Iterator for FeedPaginator<'_, C> {
    type Item = Result<StoryData>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(story) = self.buffer.pop_front() {
                return Some(Ok(story));
            }

            match self.next_page() {
                Ok(Some(stories)) => self.buffer.extend(stories.into_iter().map(|s| s.data)),
                Ok(None) => return None,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
