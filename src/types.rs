//! Core types for xhs-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a batch task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(#[schema(value_type = String)] pub Uuid);

impl TaskId {
    /// Allocate a fresh random TaskId
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Which remote listing a batch task walks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    /// Everything a publisher has posted
    Posted,
    /// Items the signed-in user liked
    Liked,
    /// Items the signed-in user saved
    Saved,
}

impl ListingMode {
    /// All modes, in API order
    pub const ALL: [ListingMode; 3] = [ListingMode::Posted, ListingMode::Liked, ListingMode::Saved];

    /// Path of the listing endpoint, relative to the API base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            ListingMode::Posted => "/api/sns/web/v1/user_posted",
            ListingMode::Liked => "/api/sns/web/v1/note/like/page",
            ListingMode::Saved => "/api/sns/web/v2/note/collect/page",
        }
    }

    /// Whether tasks in this mode only download video items
    pub fn video_only(&self) -> bool {
        !matches!(self, ListingMode::Posted)
    }

    /// Lowercase name used in task documents and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingMode::Posted => "posted",
            ListingMode::Liked => "liked",
            ListingMode::Saved => "saved",
        }
    }
}

impl std::fmt::Display for ListingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle state
///
/// `pending → running → {completed | failed}`; `failed` is also reachable from
/// `pending`. Terminal states are final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, link discovery not finished yet
    Pending,
    /// Links known, items being processed
    Running,
    /// Every link was processed
    Completed,
    /// Task stopped early; see the task's errors
    Failed,
}

impl TaskStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-task counters
///
/// `success + fail + skip + filtered <= all` once `all` is fixed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    /// Links discovered for the task
    pub all: u64,
    /// Items downloaded and recorded
    pub success: u64,
    /// Items that could not be fetched, parsed or downloaded
    pub fail: u64,
    /// Items already present in the record store
    pub skip: u64,
    /// Items excluded by the task's content filter
    pub filtered: u64,
}

impl Statistics {
    /// Counters for a task with `all` links and nothing processed yet
    pub fn with_total(all: u64) -> Self {
        Self {
            all,
            ..Default::default()
        }
    }

    /// Number of links handled so far, whatever the outcome
    pub fn processed(&self) -> u64 {
        self.success + self.fail + self.skip + self.filtered
    }
}

/// Snapshot of a batch task, as returned by the status query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Task identifier
    pub task_id: TaskId,
    /// Listing walked by the task
    pub mode: ListingMode,
    /// Lifecycle state
    pub status: TaskStatus,
    /// When the task was created
    pub started_at: DateTime<Utc>,
    /// When the task reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    /// Latest counters
    pub progress: Statistics,
    /// Final counters (equal to `progress` once terminal)
    pub summary: Statistics,
    /// Failure messages, oldest first
    pub errors: Vec<String>,
}

/// Body of a batch task creation request
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchRequest {
    /// Publisher profile link or xhslink.com short link
    pub profile_url: String,
    /// Cookie for this task (falls back to the configured cookie)
    #[serde(default)]
    pub cookie: Option<String>,
    /// Proxy for this task, http(s)/socks5 (falls back to the configured proxy)
    #[serde(default)]
    pub proxy: Option<String>,
    /// Maximum number of items to process
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Normalised credentials and routing for one task's outbound calls
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Cookie header value
    pub cookie: Option<String>,
    /// Proxy URL
    pub proxy: Option<String>,
}

const PROXY_SCHEMES: [&str; 4] = ["http://", "https://", "socks5://", "socks5h://"];

impl SessionOptions {
    /// Build session options from request values, falling back to defaults.
    ///
    /// Blank values and the literal placeholder `"string"` count as absent;
    /// proxies with an unsupported scheme are dropped.
    pub fn resolve(
        cookie: Option<&str>,
        proxy: Option<&str>,
        default_cookie: Option<&str>,
        default_proxy: Option<&str>,
    ) -> Self {
        let cookie = normalize(cookie).or_else(|| normalize(default_cookie));
        let proxy = normalize_proxy(proxy).or_else(|| normalize_proxy(default_proxy));
        Self { cookie, proxy }
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("string") {
        return None;
    }
    Some(value.to_string())
}

fn normalize_proxy(value: Option<&str>) -> Option<String> {
    normalize(value).filter(|p| PROXY_SCHEMES.iter().any(|scheme| p.starts_with(scheme)))
}

/// Content type of an item, as classified from its extracted fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Single video
    Video,
    /// Image set
    Image,
    /// Anything else
    Unknown,
}

/// Structured fields extracted from an item page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteDetail {
    /// Item id
    pub note_id: String,
    /// Title (may be empty)
    pub title: String,
    /// Publisher id
    pub author_id: String,
    /// Publisher display name
    pub author_name: String,
    /// Classified content type
    pub content_type: ContentType,
    /// Image URLs, in display order
    pub image_urls: Vec<String>,
    /// Video stream URLs, best first
    pub video_urls: Vec<String>,
}

impl NoteDetail {
    /// URLs to download for this item's content type.
    ///
    /// Videos yield only the preferred stream.
    pub fn download_urls(&self) -> Vec<String> {
        match self.content_type {
            ContentType::Video => self.video_urls.iter().take(1).cloned().collect(),
            ContentType::Image => self.image_urls.clone(),
            ContentType::Unknown => Vec::new(),
        }
    }

    /// Metadata handed to the media downloader
    pub fn meta(&self) -> ItemMeta {
        ItemMeta {
            note_id: self.note_id.clone(),
            author_id: self.author_id.clone(),
            title: self.title.clone(),
            content_type: self.content_type,
        }
    }
}

/// What the media downloader needs to know about an item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemMeta {
    /// Item id
    pub note_id: String,
    /// Publisher id
    pub author_id: String,
    /// Title
    pub title: String,
    /// Content type
    pub content_type: ContentType,
}

/// Events emitted as tasks move through their lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task registered
    TaskCreated {
        /// Task ID
        id: TaskId,
        /// Listing mode
        mode: ListingMode,
    },

    /// Link discovery finished, item processing begins
    TaskStarted {
        /// Task ID
        id: TaskId,
        /// Number of links discovered
        total: u64,
    },

    /// Counters changed after an item was handled
    TaskProgress {
        /// Task ID
        id: TaskId,
        /// Full counter snapshot
        progress: Statistics,
    },

    /// Every link was processed
    TaskCompleted {
        /// Task ID
        id: TaskId,
        /// Final counters
        summary: Statistics,
    },

    /// Task stopped early
    TaskFailed {
        /// Task ID
        id: TaskId,
        /// Failure reason
        error: String,
        /// Counters at the time of failure
        summary: Statistics,
    },
}
