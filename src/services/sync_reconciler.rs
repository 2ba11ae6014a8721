//! Background sync reconciler for LinkTrove.
//!
//! Debounces local mutations into a single backup upload, detects a newer
//! remote on connect and restores it wholesale, and publishes every state
//! transition to the persisted sync status record. Errors are captured into
//! that record instead of propagating — background sync must never crash a
//! foreground interaction.
//!
//! The reconciler is clock-injected: callers pass `now_ms` into every
//! time-sensitive entry point and drive [`poll`](SyncReconciler::poll) from
//! whatever timer the host runs. Debounce and suppression windows are
//! explicit state machines, not scattered timer handles.

use std::sync::Arc;

use base64::Engine;
use ring::digest;

use crate::database::{Database, TransactionMode};
use crate::managers::meta_store::MetaStore;
use crate::services::backup;
use crate::types::backup::ExportDocument;
use crate::types::errors::SyncError;
use crate::types::sync::{RemoteMeta, SyncStatus};

/// Meta key the status record is persisted under.
pub const SYNC_STATUS_KEY: &str = "sync.status";
/// Debounce window: rapid local changes inside this window collapse into
/// one upload.
pub const DEBOUNCE_MS: i64 = 2000;
/// Suppression window after the reconciler's own writes, so a restore does
/// not observe itself as a fresh local change and loop.
pub const SUPPRESS_MS: i64 = 1500;

/// Abstraction over the remote backup file.
pub trait BackupTransport {
    /// Uploads the document body, returning the remote's new metadata.
    fn upload(&mut self, body: &str, now_ms: i64) -> Result<RemoteMeta, SyncError>;
    /// Fetches remote metadata without the body. `None` when no backup exists yet.
    fn head(&mut self) -> Result<Option<RemoteMeta>, SyncError>;
    /// Downloads metadata and body.
    fn download(&mut self) -> Result<(RemoteMeta, String), SyncError>;
}

/// Reconciler connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected { auto: bool },
}

/// Trailing-edge debounce over local changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushDebounce {
    Idle,
    Pending { deadline_ms: i64 },
}

/// Post-write suppression of storage-change reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suppression {
    Idle,
    Suppressed { until_ms: i64 },
}

/// Background backup reconciler over a pluggable transport.
pub struct SyncReconciler<T: BackupTransport> {
    db: Arc<Database>,
    transport: T,
    state: ConnectionState,
    debounce: PushDebounce,
    suppression: Suppression,
    status: SyncStatus,
}

impl<T: BackupTransport> SyncReconciler<T> {
    /// Creates a reconciler, resuming the persisted status record if one exists.
    pub fn new(db: Arc<Database>, transport: T) -> Self {
        let status = MetaStore::new(db.connection())
            .get_json::<SyncStatus>(SYNC_STATUS_KEY)
            .ok()
            .flatten()
            .unwrap_or_default();

        let state = if status.connected {
            ConnectionState::Connected { auto: status.auto }
        } else {
            ConnectionState::Disconnected
        };

        Self {
            db,
            transport,
            state,
            debounce: PushDebounce::Idle,
            suppression: Suppression::Idle,
            status,
        }
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn transport_ref(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Hands the transport back, e.g. to reconnect it from another database.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Persists the status record. Failures here are swallowed — the status
    /// record is advisory display state and must not take sync down with it.
    fn publish_status(&self) {
        let meta = MetaStore::new(self.db.connection());
        let _ = meta.set_json(SYNC_STATUS_KEY, &self.status);
    }

    fn suppressed(&self, now_ms: i64) -> bool {
        matches!(self.suppression, Suppression::Suppressed { until_ms } if now_ms < until_ms)
    }

    fn suppress(&mut self, now_ms: i64) {
        self.suppression = Suppression::Suppressed {
            until_ms: now_ms + SUPPRESS_MS,
        };
    }

    /// Connects to the remote and reconciles: when the remote file is
    /// strictly newer than the last known download, its content overwrites
    /// local state wholesale. A failure on a fresh connect leaves the
    /// reconciler disconnected; a failure while already connected records
    /// the error but keeps the connection.
    pub fn connect(&mut self, now_ms: i64) -> bool {
        let was_connected = self.status.connected;
        self.state = ConnectionState::Connecting;
        self.status.syncing = true;
        self.status.error = None;
        self.publish_status();

        let result = self.transport.head();
        match result {
            Ok(remote) => {
                if let Some(meta) = remote {
                    let remote_newer = self
                        .status
                        .last_downloaded_at
                        .map_or(true, |t| meta.modified_at > t);
                    if remote_newer {
                        self.restore_remote(now_ms);
                    }
                }
                let auto = if was_connected { self.status.auto } else { true };
                self.state = ConnectionState::Connected { auto };
                self.status.connected = true;
                self.status.auto = auto;
                self.status.syncing = false;
                self.publish_status();
                true
            }
            Err(e) => {
                self.status.error = Some(e.to_string());
                self.status.syncing = false;
                if was_connected {
                    self.state = ConnectionState::Connected {
                        auto: self.status.auto,
                    };
                } else {
                    self.state = ConnectionState::Disconnected;
                    self.status.connected = false;
                }
                self.publish_status();
                false
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.status.connected = false;
        self.status.syncing = false;
        self.status.pending_push = false;
        self.debounce = PushDebounce::Idle;
        self.publish_status();
    }

    /// Toggles automatic push-on-change.
    pub fn set_auto(&mut self, auto: bool) {
        if let ConnectionState::Connected { .. } = self.state {
            self.state = ConnectionState::Connected { auto };
        }
        self.status.auto = auto;
        self.publish_status();
    }

    /// Reacts to a local storage change: arms (or re-arms) the debounce and
    /// marks the push pending. Changes inside the suppression window are the
    /// reconciler's own writes and are ignored.
    pub fn note_local_change(&mut self, now_ms: i64) {
        if !self.status.connected || !self.status.auto {
            return;
        }
        if self.suppressed(now_ms) {
            return;
        }
        self.debounce = PushDebounce::Pending {
            deadline_ms: now_ms + DEBOUNCE_MS,
        };
        if !self.status.pending_push {
            self.status.pending_push = true;
            self.publish_status();
        }
    }

    /// Drives the debounce: fires the collapsed push once its deadline has
    /// passed. Returns true when an upload was attempted.
    pub fn poll(&mut self, now_ms: i64) -> bool {
        if let Suppression::Suppressed { until_ms } = self.suppression {
            if now_ms >= until_ms {
                self.suppression = Suppression::Idle;
            }
        }
        match self.debounce {
            PushDebounce::Pending { deadline_ms } if now_ms >= deadline_ms => {
                self.push(now_ms);
                true
            }
            _ => false,
        }
    }

    /// Uploads the current dataset. `pending_push` clears whether the upload
    /// succeeds or fails; a failure is recorded, not retried here — the next
    /// local change re-arms the cycle.
    fn push(&mut self, now_ms: i64) {
        self.debounce = PushDebounce::Idle;
        self.status.syncing = true;
        self.publish_status();

        let result = self.export_body();
        let outcome = result.and_then(|(body, checksum)| {
            self.transport
                .upload(&body, now_ms)
                .map(|meta| (meta, checksum))
        });

        match outcome {
            Ok((meta, checksum)) => {
                self.status.last_uploaded_at = Some(meta.modified_at.max(now_ms));
                self.status.last_checksum = Some(checksum);
                self.status.error = None;
            }
            Err(e) => {
                self.status.error = Some(e.to_string());
            }
        }

        self.status.syncing = false;
        self.status.pending_push = false;
        self.suppress(now_ms);
        self.publish_status();
    }

    fn export_body(&self) -> Result<(String, String), SyncError> {
        let doc = self
            .db
            .with_transaction(TransactionMode::ReadOnly, backup::export)
            .map_err(|e| SyncError::DatabaseError(e.to_string()))?;
        let body = serde_json::to_string_pretty(&doc)?;
        let checksum = payload_checksum(&body);
        Ok((body, checksum))
    }

    /// Downloads the remote document and overwrites local state with it.
    fn restore_remote(&mut self, now_ms: i64) {
        let result = self.transport.download().and_then(|(meta, body)| {
            let doc: ExportDocument = serde_json::from_str(&body)?;
            self.db
                .with_transaction(TransactionMode::ReadWrite, |conn| {
                    backup::import(conn, &doc)
                })
                .map_err(|e| SyncError::DatabaseError(e.to_string()))?;
            Ok((meta, payload_checksum(&body)))
        });

        match result {
            Ok((meta, checksum)) => {
                self.status.last_downloaded_at = Some(meta.modified_at);
                self.status.last_checksum = Some(checksum);
                self.status.error = None;
                // The restore itself fires storage-change events; ignore them.
                self.suppress(now_ms);
            }
            Err(e) => {
                self.status.error = Some(e.to_string());
            }
        }
        self.publish_status();
    }
}

/// SHA-256 of the payload body, base64-encoded.
pub fn payload_checksum(body: &str) -> String {
    let hash = digest::digest(&digest::SHA256, body.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hash.as_ref())
}
