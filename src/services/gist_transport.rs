//! GitHub Gist backup transport for LinkTrove.
//!
//! Stores the backup document as a single file in a private Gist: created on
//! first upload, patched afterwards. The Gist's `updated_at` timestamp is
//! the remote-modified time the reconciler compares against.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use zeroize::Zeroizing;

use crate::services::sync_reconciler::BackupTransport;
use crate::types::errors::SyncError;
use crate::types::sync::RemoteMeta;

const API_BASE: &str = "https://api.github.com";
const BACKUP_FILE: &str = "linktrove-backup.json";
const GIST_DESCRIPTION: &str = "LinkTrove backup";

/// Gist-backed implementation of [`BackupTransport`].
pub struct GistTransport {
    client: Client,
    token: Zeroizing<String>,
    gist_id: Option<String>,
}

impl GistTransport {
    /// Creates a transport. `gist_id` is `None` until the first upload has
    /// created the backup Gist; persist [`gist_id`](Self::gist_id) after
    /// pushes so later sessions reuse the same file.
    pub fn new(token: String, gist_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            token: Zeroizing::new(token),
            gist_id,
        }
    }

    pub fn gist_id(&self) -> Option<&str> {
        self.gist_id.as_deref()
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token.as_str()))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "linktrove")
    }

    fn check_status(status: StatusCode) -> Result<(), SyncError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SyncError::AuthFailed(format!("GitHub returned {}", status)));
        }
        if !status.is_success() {
            return Err(SyncError::NetworkError(format!("GitHub returned {}", status)));
        }
        Ok(())
    }

    fn fetch_gist(&self, gist_id: &str) -> Result<serde_json::Value, SyncError> {
        let url = format!("{}/gists/{}", API_BASE, gist_id);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .map_err(|e| SyncError::NetworkError(e.to_string()))?;
        Self::check_status(response.status())?;
        response
            .json()
            .map_err(|e| SyncError::SerializationError(e.to_string()))
    }

    fn remote_meta(gist: &serde_json::Value) -> Result<RemoteMeta, SyncError> {
        let updated_at = gist
            .get("updated_at")
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp_ms)
            .ok_or_else(|| {
                SyncError::SerializationError(String::from("gist missing updated_at"))
            })?;
        Ok(RemoteMeta {
            modified_at: updated_at,
            checksum: None,
        })
    }

    fn file_body(&self, gist: &serde_json::Value) -> Result<String, SyncError> {
        let file = gist
            .get("files")
            .and_then(|files| files.get(BACKUP_FILE))
            .ok_or_else(|| {
                SyncError::SerializationError(format!("gist has no {} file", BACKUP_FILE))
            })?;

        // Gist bodies over the inline size limit arrive truncated; the raw
        // URL always serves the full content.
        if file.get("truncated").and_then(|v| v.as_bool()).unwrap_or(false) {
            let raw_url = file
                .get("raw_url")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    SyncError::SerializationError(String::from("truncated file has no raw_url"))
                })?;
            let response = self
                .request(reqwest::Method::GET, raw_url)
                .send()
                .map_err(|e| SyncError::NetworkError(e.to_string()))?;
            Self::check_status(response.status())?;
            return response
                .text()
                .map_err(|e| SyncError::NetworkError(e.to_string()));
        }

        file.get("content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| SyncError::SerializationError(String::from("gist file has no content")))
    }
}

impl BackupTransport for GistTransport {
    fn upload(&mut self, body: &str, _now_ms: i64) -> Result<RemoteMeta, SyncError> {
        let payload = serde_json::json!({
            "description": GIST_DESCRIPTION,
            "public": false,
            "files": { BACKUP_FILE: { "content": body } },
        });

        let (method, url) = match &self.gist_id {
            Some(id) => (reqwest::Method::PATCH, format!("{}/gists/{}", API_BASE, id)),
            None => (reqwest::Method::POST, format!("{}/gists", API_BASE)),
        };

        let response = self
            .request(method, &url)
            .json(&payload)
            .send()
            .map_err(|e| SyncError::NetworkError(e.to_string()))?;
        Self::check_status(response.status())?;

        let gist: serde_json::Value = response
            .json()
            .map_err(|e| SyncError::SerializationError(e.to_string()))?;
        if self.gist_id.is_none() {
            self.gist_id = gist
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
        Self::remote_meta(&gist)
    }

    fn head(&mut self) -> Result<Option<RemoteMeta>, SyncError> {
        let Some(gist_id) = self.gist_id.clone() else {
            return Ok(None);
        };
        let gist = self.fetch_gist(&gist_id)?;
        Self::remote_meta(&gist).map(Some)
    }

    fn download(&mut self) -> Result<(RemoteMeta, String), SyncError> {
        let gist_id = self.gist_id.clone().ok_or_else(|| {
            SyncError::NetworkError(String::from("no backup gist to download"))
        })?;
        let gist = self.fetch_gist(&gist_id)?;
        let meta = Self::remote_meta(&gist)?;
        let body = self.file_body(&gist)?;
        Ok((meta, body))
    }
}

/// Parses an ISO-8601 UTC timestamp ("2024-05-01T10:30:00Z") into unix
/// milliseconds. Fractional seconds are truncated.
fn parse_timestamp_ms(value: &str) -> Option<i64> {
    let (date, time) = value.split_once('T')?;
    let time = time.trim_end_matches('Z');

    let mut date_parts = date.splitn(3, '-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: i64 = date_parts.next()?.parse().ok()?;
    let day: i64 = date_parts.next()?.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    let mut time_parts = time.splitn(3, ':');
    let hour: i64 = time_parts.next()?.parse().ok()?;
    let minute: i64 = time_parts.next()?.parse().ok()?;
    let second: i64 = time_parts
        .next()?
        .split('.')
        .next()?
        .parse()
        .ok()?;

    // Days-from-epoch calculation (UTC), civil-date arithmetic
    let mut y = year;
    let mut m = month;
    if m <= 2 {
        y -= 1;
        m += 12;
    }
    let days = 365 * y + y / 4 - y / 100 + y / 400 + (153 * (m - 3) + 2) / 5 + day - 719469;
    Some((days * 86400 + hour * 3600 + minute * 60 + second) * 1000)
}
