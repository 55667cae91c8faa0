//! Cursor-paginated link discovery
//!
//! [`PageWalker`] walks one remote listing page by page and turns every item
//! into a canonical item link. Links are deduplicated by value within a walk and
//! the walk stops as soon as the optional limit is reached.
//!
//! The walk ends on the first of:
//! - a page with no items
//! - a page contributing no new links (whatever its continuation flag says)
//! - a page reporting no more results
//! - the configured page ceiling


use crate::config::{Config, RetryConfig};
use crate::error::{Result, WalkError};
use crate::lookup::{is_truthy, pick, pick_string, response_body, value_as_string};
use crate::retry::with_retry;
use crate::types::ListingMode;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Candidate locations of the item list within a page body
pub const ITEM_LIST_PATHS: &[&str] = &["notes", "note_list", "noteList", "items"];
/// Candidate locations of an item's id
pub const NOTE_ID_PATHS: &[&str] = &[
    "note_id",
    "noteId",
    "id",
    "note.note_id",
    "note.noteId",
    "note.id",
];
/// Candidate locations of an item's share token
pub const XSEC_TOKEN_PATHS: &[&str] = &[
    "xsec_token",
    "xsecToken",
    "note.xsec_token",
    "note.xsecToken",
];
/// Candidate locations of the next-page cursor
pub const CURSOR_PATHS: &[&str] = &["cursor", "next_cursor", "nextCursor"];
/// Candidate locations of the continuation flag
pub const HAS_MORE_PATHS: &[&str] = &["has_more", "hasMore"];

/// Parameters of one listing page request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// Listing to read
    pub mode: ListingMode,
    /// Publisher the listing belongs to
    pub subject_id: String,
    /// Opaque cursor; empty for the first page
    pub cursor: String,
    /// Items requested per page
    pub page_size: u32,
}

/// Remote source of listing pages
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one raw page. Errors should be classified by
    /// [`IsRetryable`](crate::retry::IsRetryable) so transient ones get retried.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Value>;
}

/// Enumerates the item links of one listing
pub struct PageWalker {
    source: Arc<dyn ListingSource>,
    retry: RetryConfig,
    page_size: u32,
    max_pages: usize,
    web_base_url: String,
}

impl PageWalker {
    /// Create a walker reading from `source` with the configured paging and retry policy
    pub fn new(source: Arc<dyn ListingSource>, config: &Config) -> Self {
        Self {
            source,
            retry: config.retry.clone(),
            page_size: config.walk.page_size,
            max_pages: config.walk.max_pages,
            web_base_url: config.request.web_base_url.clone(),
        }
    }

    /// Walk the listing from its start and return unique links in discovery order.
    ///
    /// `limit` of `None` (or zero) means no limit. A page that exhausts its
    /// retries fails the whole walk; links gathered so far are dropped and only
    /// their count is reported in the error.
    pub async fn run(
        &self,
        mode: ListingMode,
        subject_id: &str,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<String>, WalkError> {
        let limit = limit.filter(|l| *l > 0);
        let mut cursor = String::new();
        let mut seen = HashSet::new();
        let mut links: Vec<String> = Vec::new();
        let mut page = 0;

        loop {
            if page >= self.max_pages {
                tracing::warn!(
                    mode = %mode,
                    subject_id,
                    max_pages = self.max_pages,
                    collected = links.len(),
                    "Listing still reports more results, stopping at page ceiling"
                );
                break;
            }
            page += 1;

            let request = PageRequest {
                mode,
                subject_id: subject_id.to_string(),
                cursor: cursor.clone(),
                page_size: self.page_size,
            };

            let fetch = with_retry(&self.retry, || self.source.fetch_page(&request));
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(WalkError::Cancelled { collected: links.len() });
                }
                response = fetch => response,
            };
            let response = response.map_err(|e| WalkError::PageFetch {
                page,
                collected: links.len(),
                reason: e.to_string(),
            })?;

            let body = response_body(&response);
            let items = pick(body, ITEM_LIST_PATHS)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            if items.is_empty() {
                tracing::debug!(mode = %mode, page, "Listing page is empty, walk finished");
                break;
            }

            let mut fresh = 0;
            for item in items {
                let Some(note_id) = pick_string(item, NOTE_ID_PATHS) else {
                    continue;
                };
                let token = pick_string(item, XSEC_TOKEN_PATHS);
                let link = canonical_url(&self.web_base_url, &note_id, token.as_deref());

                if !seen.insert(link.clone()) {
                    continue;
                }
                links.push(link);
                fresh += 1;

                if let Some(limit) = limit
                    && links.len() >= limit
                {
                    links.truncate(limit);
                    tracing::debug!(mode = %mode, page, limit, "Link limit reached");
                    return Ok(links);
                }
            }

            tracing::debug!(
                mode = %mode,
                page,
                items = items.len(),
                fresh,
                collected = links.len(),
                "Listing page processed"
            );

            if fresh == 0 {
                tracing::debug!(mode = %mode, page, "Page added no new links, walk finished");
                break;
            }

            if let Some(next) = pick(body, CURSOR_PATHS) {
                cursor = value_as_string(next).unwrap_or_default();
            }

            let has_more = pick(body, HAS_MORE_PATHS).is_some_and(is_truthy);
            if !has_more {
                break;
            }
        }

        Ok(links)
    }
}

/// Build the canonical link for an item, embedding the share token when present
pub fn canonical_url(web_base_url: &str, note_id: &str, xsec_token: Option<&str>) -> String {
    let base = format!(
        "{}/discovery/item/{}",
        web_base_url.trim_end_matches('/'),
        note_id
    );

    match xsec_token {
        Some(token) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("source", "webshare")
                .append_pair("xhsshare", "pc_web")
                .append_pair("xsec_token", token)
                .append_pair("xsec_source", "pc_share")
                .finish();
            format!("{base}?{query}")
        }
        None => base,
    }
}

/// Item id of a link: the last non-empty path segment
pub fn note_id_from_link(link: &str) -> Option<String> {
    if let Ok(url) = url::Url::parse(link) {
        return url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string);
    }

    link.split(['?', '#'])
        .next()?
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}
