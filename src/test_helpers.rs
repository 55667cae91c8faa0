//! In-memory fakes for the remote collaborators

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::remote::{
    DetailSource, MediaDownloader, NoteExtractor, ProfileResolver, RecordStore, Session,
    SessionFactory,
};
use crate::types::{ContentType, ItemMeta, NoteDetail, SessionOptions};
use crate::walker::{ListingSource, PageRequest, note_id_from_link};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Config with zero pacing so tests run instantly
pub(crate) fn fast_config() -> Config {
    let mut config = Config::default();
    config.retry = RetryConfig {
        max_attempts: 2,
        delay: Duration::ZERO,
        courtesy_delay: Duration::ZERO,
    };
    config
}

/// Listing that serves fixed pages of ids, cursor `c<n>` addressing page `n`
pub(crate) struct FakeListing {
    pages: Vec<Vec<String>>,
    fail_from_page: Option<usize>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeListing {
    pub(crate) fn new(pages: &[&[&str]]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|p| p.iter().map(|s| s.to_string()).collect())
                .collect(),
            fail_from_page: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Every page answers only after `delay`
    pub(crate) fn slow(pages: &[&[&str]], delay: Duration) -> Arc<Self> {
        let mut listing = Self::new(pages);
        if let Some(inner) = Arc::get_mut(&mut listing) {
            inner.delay = delay;
        }
        listing
    }

    /// Pages at index `page` and beyond always answer HTTP 500
    pub(crate) fn failing_from(pages: &[&[&str]], page: usize) -> Arc<Self> {
        let mut listing = Self::new(pages);
        if let Some(inner) = Arc::get_mut(&mut listing) {
            inner.fail_from_page = Some(page);
        }
        listing
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for FakeListing {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let index: usize = request
            .cursor
            .trim_start_matches('c')
            .parse()
            .unwrap_or(0);

        if self.fail_from_page.is_some_and(|from| index >= from) {
            return Err(Error::RemoteStatus {
                status: 500,
                url: format!("fake://listing/{index}"),
            });
        }

        let notes: Vec<Value> = self
            .pages
            .get(index)
            .map(|ids| ids.iter().map(|id| json!({"note_id": id})).collect())
            .unwrap_or_default();

        Ok(json!({
            "data": {
                "notes": notes,
                "cursor": format!("c{}", index + 1),
                "has_more": index + 1 < self.pages.len(),
            }
        }))
    }
}

/// Item pages keyed by item id, in the [`FakeExtractor`] format
pub(crate) struct FakeDetail {
    pages: HashMap<String, String>,
    delay: Duration,
    requested: Mutex<Vec<String>>,
}

impl FakeDetail {
    /// `items` is `(id, page)`; ids without a page answer HTTP 500
    pub(crate) fn new(items: &[(&str, &str)]) -> Arc<Self> {
        Self::slow(items, Duration::ZERO)
    }

    pub(crate) fn slow(items: &[(&str, &str)], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            pages: items
                .iter()
                .map(|(id, page)| (id.to_string(), page.to_string()))
                .collect(),
            delay,
            requested: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DetailSource for FakeDetail {
    async fn fetch_detail(&self, link: &str) -> Result<String> {
        let id = note_id_from_link(link).unwrap_or_default();
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(id.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.pages.get(&id).cloned().ok_or(Error::RemoteStatus {
            status: 500,
            url: link.to_string(),
        })
    }
}

/// Parses pages of the form `video:<id>`, `image:<id>` or `empty:<id>`
pub(crate) struct FakeExtractor;

impl NoteExtractor for FakeExtractor {
    fn parse(&self, raw: &str) -> Result<NoteDetail> {
        let (kind, id) = raw
            .split_once(':')
            .ok_or_else(|| Error::Extraction(format!("unparsable page '{raw}'")))?;

        let (content_type, image_urls, video_urls) = match kind {
            "video" => (
                ContentType::Video,
                Vec::new(),
                vec![format!("https://cdn.test/{id}.mp4")],
            ),
            "image" => (
                ContentType::Image,
                vec![
                    format!("https://cdn.test/{id}_1.jpg"),
                    format!("https://cdn.test/{id}_2.jpg"),
                ],
                Vec::new(),
            ),
            "empty" => (ContentType::Image, Vec::new(), Vec::new()),
            other => return Err(Error::Extraction(format!("unknown kind '{other}'"))),
        };

        Ok(NoteDetail {
            note_id: id.to_string(),
            title: format!("title {id}"),
            author_id: "author".into(),
            author_name: "Author".into(),
            content_type,
            image_urls,
            video_urls,
        })
    }
}

/// Media downloader that succeeds for every URL not listed as failing
#[derive(Default)]
pub(crate) struct FakeMedia {
    failing: HashSet<String>,
    downloaded: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing(urls: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            downloaded: Mutex::new(Vec::new()),
        })
    }

    /// Item ids handed to the downloader, in order
    pub(crate) fn downloaded(&self) -> Vec<String> {
        self.downloaded.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MediaDownloader for FakeMedia {
    async fn download(&self, urls: &[String], meta: &ItemMeta) -> Result<Vec<bool>> {
        if let Ok(mut downloaded) = self.downloaded.lock() {
            downloaded.push(meta.note_id.clone());
        }
        Ok(urls.iter().map(|u| !self.failing.contains(u)).collect())
    }
}

/// Record store kept in memory
#[derive(Default)]
pub(crate) struct MemoryRecords {
    ids: Mutex<HashSet<String>>,
}

impl MemoryRecords {
    pub(crate) fn with(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            ids: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
        })
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.ids.lock().map(|ids| ids.contains(id)).unwrap_or(false)
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn exists(&self, item_id: &str) -> Result<bool> {
        Ok(self.contains(item_id))
    }

    async fn record(&self, item_id: &str) -> Result<()> {
        if let Ok(mut ids) = self.ids.lock() {
            ids.insert(item_id.to_string());
        }
        Ok(())
    }
}

/// Resolver with a fixed answer
pub(crate) enum FakeResolver {
    Resolves(String),
    Fails,
    Panics,
}

#[async_trait]
impl ProfileResolver for FakeResolver {
    async fn resolve(&self, profile_url: &str) -> Result<String> {
        match self {
            FakeResolver::Resolves(id) => Ok(id.clone()),
            FakeResolver::Fails => Err(Error::Resolution(format!(
                "no publisher id found in '{profile_url}'"
            ))),
            FakeResolver::Panics => panic!("resolver exploded"),
        }
    }
}

pub(crate) fn session(
    listing: Arc<FakeListing>,
    detail: Arc<FakeDetail>,
    media: Arc<FakeMedia>,
    resolver: FakeResolver,
) -> Session {
    Session {
        listing,
        detail,
        resolver: Arc::new(resolver),
        media,
    }
}

/// Hands out the same session for every task, remembering the options it saw
pub(crate) struct FakeSessionFactory {
    session: Session,
    opened: Mutex<Vec<SessionOptions>>,
}

impl FakeSessionFactory {
    pub(crate) fn new(session: Session) -> Arc<Self> {
        Arc::new(Self {
            session,
            opened: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn opened(&self) -> Vec<SessionOptions> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl SessionFactory for FakeSessionFactory {
    fn open(&self, options: &SessionOptions) -> Result<Session> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(options.clone());
        }
        Ok(self.session.clone())
    }
}
