//! Shared fixtures for the end-to-end tests

use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use xhs_dl::Config;

/// Config pointing every remote base URL at `server_uri`, with storage under `root`
pub fn offline_config(server_uri: &str, root: &Path) -> Config {
    let mut config = Config::default();
    config.request.api_base_url = server_uri.to_string();
    config.request.web_base_url = server_uri.to_string();
    config.retry.max_attempts = 2;
    config.retry.delay = Duration::ZERO;
    config.retry.courtesy_delay = Duration::ZERO;
    config.download.download_dir = root.join("downloads");
    config.persistence.database_path = root.join("xhs-dl.db");
    config
}

/// One listing page in the platform's response envelope
pub fn listing_page(notes: &[(&str, Option<&str>)], cursor: &str, has_more: bool) -> Value {
    let notes: Vec<Value> = notes
        .iter()
        .map(|(id, token)| match token {
            Some(token) => json!({ "note_id": id, "xsec_token": token }),
            None => json!({ "note_id": id }),
        })
        .collect();
    json!({
        "code": 0,
        "success": true,
        "data": { "notes": notes, "cursor": cursor, "has_more": has_more }
    })
}

/// Detail page embedding `note` as its initial state
pub fn detail_page(note_id: &str, note: Value) -> String {
    let state = json!({ "note": { "noteDetailMap": { note_id: { "note": note } } } });
    format!(
        "<html><body><script>window.__INITIAL_STATE__={state}</script></body></html>"
    )
}
