// Transaction search pagination.
// Yields the comments one author left on one object, following the server's cursor.

use std::collections::VecDeque;

use serde_json::{Map, Value, json};

use crate::error::Result;

use super::client::Conduit;
use super::types::{Comment, Phid, TransactionPage};

pub const TRANSACTION_SEARCH_METHOD: &str = "transaction.search";

/// Lazy cursor over `transaction.search` comments by one author on one object.
///
/// A null `after` cursor ends the sequence even when the page carried data.
/// Removed comments have no text and are never yielded.
pub struct CommentPaginator<'a, C: ?Sized> {
    conduit: &'a C,
    object: Phid,
    author: Phid,
    cursor: Option<String>,
    buffer: VecDeque<Comment>,
    exhausted: bool,
}

impl<'a, C: Conduit + ?Sized> CommentPaginator<'a, C> {
    pub fn new(conduit: &'a C, object: Phid, author: Phid) -> Self {
        Self {
            conduit,
            object,
            author,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    pub fn has_more(&self) -> bool {
        !self.buffer.is_empty() || !self.exhausted
    }

    /// Start again from the first page.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    /// Fetch the next page of matching comments, which may be empty after filtering.
    pub fn next_page(&mut self) -> Result<Option<Vec<Comment>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut params = Map::new();
        params.insert(
            "objectIdentifier".to_string(),
            json!(self.object.as_str()),
        );
        params.insert(
            "after".to_string(),
            self.cursor.as_deref().map_or(Value::Null, |after| json!(after)),
        );

        let page: TransactionPage = serde_json::from_value(
            self.conduit.call(TRANSACTION_SEARCH_METHOD, params)?,
        )?;

        if page.data.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        match page.cursor.after {
            Some(after) => self.cursor = Some(after),
            None => self.exhausted = true,
        }

        let comments: Vec<Comment> = page
            .data
            .into_iter()
            .filter(|transaction| transaction.is_comment() && transaction.author_phid == self.author)
            .flat_map(|transaction| transaction.comments)
            .filter(|comment| !comment.removed)
            .collect();

        tracing::debug!(object = %self.object, comments = comments.len(), "fetched transaction page");
        Ok(Some(comments))
    }
}

impl<C: Conduit + ?Sized> Iterator for CommentPaginator<'_, C> {
    type Item = Result<Comment>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(comment) = self.buffer.pop_front() {
                return Some(Ok(comment));
            }

            match self.next_page() {
                Ok(Some(comments)) => self.buffer.extend(comments),
                Ok(None) => return None,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
