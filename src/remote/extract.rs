//! Item page extraction from the embedded page state

use super::traits::NoteExtractor;
use crate::error::{Error, Result};
use crate::lookup::{deep_get, first_text, pick};
use crate::types::{ContentType, NoteDetail};
use regex::Regex;
use serde_json::Value;

const STATE_PATTERN: &str = r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.*?\})\s*</script>";
const UNDEFINED_PATTERN: &str = r"([:\[,]\s*)undefined\b";

/// Host serving original video files addressed by `originVideoKey`
const VIDEO_ORIGIN_HOST: &str = "https://sns-video-bd.xhscdn.com";

/// Reads the `window.__INITIAL_STATE__` object item pages embed
///
/// Desktop pages keep the note under `note.noteDetailMap.<id>.note`, mobile
/// pages under `noteData.data.noteData`; both are understood.
pub struct InitialStateExtractor {
    state: Regex,
    undefined: Regex,
}

impl InitialStateExtractor {
    /// Compile the page-state patterns
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Other(format!("invalid state pattern: {e}")))
        };
        Ok(Self {
            state: compile(STATE_PATTERN)?,
            undefined: compile(UNDEFINED_PATTERN)?,
        })
    }

    fn page_state(&self, html: &str) -> Result<Value> {
        let raw = self
            .state
            .captures(html)
            .and_then(|c| c.get(1))
            .ok_or_else(|| Error::Extraction("page carries no initial state".into()))?
            .as_str();

        // the state is a JS literal, not strict JSON
        let normalised = self.undefined.replace_all(raw, "${1}null");
        serde_json::from_str(&normalised)
            .map_err(|e| Error::Extraction(format!("initial state is not valid JSON: {e}")))
    }
}

impl NoteExtractor for InitialStateExtractor {
    fn parse(&self, raw: &str) -> Result<NoteDetail> {
        let state = self.page_state(raw)?;
        let note = locate_note(&state)
            .ok_or_else(|| Error::Extraction("no note found in initial state".into()))?;

        let note_id = first_text(note, &["noteId", "note_id", "id"])
            .ok_or_else(|| Error::Extraction("note has no id".into()))?;

        let content_type = match pick(note, &["type"]).and_then(Value::as_str) {
            Some("video") => ContentType::Video,
            Some("normal") => ContentType::Image,
            _ => ContentType::Unknown,
        };

        Ok(NoteDetail {
            title: first_text(note, &["title", "desc"]).unwrap_or_default(),
            author_id: first_text(note, &["user.userId", "user.user_id"]).unwrap_or_default(),
            author_name: first_text(note, &["user.nickname", "user.nickName"])
                .unwrap_or_default(),
            image_urls: image_urls(note),
            video_urls: video_urls(note),
            note_id,
            content_type,
        })
    }
}

fn locate_note(state: &Value) -> Option<&Value> {
    if let Some(Value::Object(details)) = deep_get(state, "note.noteDetailMap") {
        let found = details
            .values()
            .filter_map(|entry| entry.get("note"))
            .find(|note| note.as_object().is_some_and(|n| !n.is_empty()));
        if found.is_some() {
            return found;
        }
    }
    pick(state, &["noteData.data.noteData"]).filter(|n| n.is_object())
}

fn image_urls(note: &Value) -> Vec<String> {
    let Some(images) = pick(note, &["imageList", "image_list"]).and_then(Value::as_array) else {
        return Vec::new();
    };
    images
        .iter()
        .filter_map(|image| {
            first_text(
                image,
                &["urlDefault", "url_default", "url", "infoList.1.url", "infoList.0.url"],
            )
        })
        .collect()
}

fn video_urls(note: &Value) -> Vec<String> {
    let mut urls = Vec::new();

    if let Some(key) = first_text(note, &["video.consumer.originVideoKey"]) {
        urls.push(format!("{VIDEO_ORIGIN_HOST}/{key}"));
    }

    for codec in ["h264", "h265", "av1", "h266"] {
        let path = format!("video.media.stream.{codec}");
        let Some(streams) = deep_get(note, &path).and_then(Value::as_array) else {
            continue;
        };
        for stream in streams {
            if let Some(url) = first_text(stream, &["masterUrl", "master_url"])
                && !urls.contains(&url)
            {
                urls.push(url);
            }
        }
    }

    urls
}
