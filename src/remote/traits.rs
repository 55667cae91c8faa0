//! Collaborator traits consumed by the batch pipeline

use crate::types::{ItemMeta, NoteDetail, SessionOptions};
use crate::walker::ListingSource;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::Arc;

/// Fetches the raw page of a single item
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Fetch the page behind an item link
    ///
    /// # Errors
    ///
    /// Network failures and non-2xx answers; both are retryable.
    async fn fetch_detail(&self, link: &str) -> crate::Result<String>;
}

/// Maps a publisher link to a stable subject id
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Resolve `profile_url` (a profile link, or a share text containing a short link)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`](crate::Error::Resolution) when no id can be found.
    async fn resolve(&self, profile_url: &str) -> crate::Result<String>;
}

/// Turns a raw item page into structured fields
pub trait NoteExtractor: Send + Sync {
    /// Parse one item page
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`](crate::Error::Extraction) when the page does
    /// not carry the expected fields.
    fn parse(&self, raw: &str) -> crate::Result<NoteDetail>;
}

/// Downloads the media files of one item
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download every URL, reporting one success flag per URL in input order
    async fn download(&self, urls: &[String], meta: &ItemMeta) -> crate::Result<Vec<bool>>;
}

/// Presence facts for already-downloaded items
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether `item_id` was downloaded before
    async fn exists(&self, item_id: &str) -> crate::Result<bool>;

    /// Remember that `item_id` was downloaded
    async fn record(&self, item_id: &str) -> crate::Result<()>;
}

/// Produces the site-specific signature headers for listing requests
pub trait RequestSigner: Send + Sync {
    /// Headers to add to a GET of `url` with `query`
    fn sign(&self, url: &str, query: &[(&str, String)], cookie: Option<&str>)
    -> crate::Result<HeaderMap>;
}

/// Remote collaborators bound to one task's cookie and proxy
#[derive(Clone)]
pub struct Session {
    /// Listing pages
    pub listing: Arc<dyn ListingSource>,
    /// Item pages
    pub detail: Arc<dyn DetailSource>,
    /// Publisher link resolution
    pub resolver: Arc<dyn ProfileResolver>,
    /// Media files
    pub media: Arc<dyn MediaDownloader>,
}

/// Opens a [`Session`] for each task
pub trait SessionFactory: Send + Sync {
    /// Build the collaborators for one task
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) when the options cannot be
    /// applied (for example an unusable proxy).
    fn open(&self, options: &SessionOptions) -> crate::Result<Session>;
}
