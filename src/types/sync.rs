use serde::{Deserialize, Serialize};

/// Persisted description of background backup state.
///
/// Written only by the sync reconciler; the UI treats it as read-only and
/// renders transient toasts from transitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncStatus {
    pub connected: bool,
    pub syncing: bool,
    /// True from the first qualifying local change until the debounced push
    /// completes (successfully or not).
    pub pending_push: bool,
    pub auto: bool,
    pub last_uploaded_at: Option<i64>,
    pub last_downloaded_at: Option<i64>,
    pub last_checksum: Option<String>,
    pub error: Option<String>,
}

/// Metadata the backup remote reports about the stored file.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMeta {
    /// Last-modified time in unix milliseconds.
    pub modified_at: i64,
    pub checksum: Option<String>,
}
