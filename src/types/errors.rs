use std::fmt;

// === WebpageError ===

/// Errors related to webpage (card) store operations.
#[derive(Debug)]
pub enum WebpageError {
    /// The URL is missing, unparseable, or not http/https.
    InvalidUrl(String),
    /// Webpage with the given ID was not found.
    NotFound(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for WebpageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebpageError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            WebpageError::NotFound(id) => write!(f, "Webpage not found: {}", id),
            WebpageError::DatabaseError(msg) => write!(f, "Webpage database error: {}", msg),
        }
    }
}

impl std::error::Error for WebpageError {}

impl From<rusqlite::Error> for WebpageError {
    fn from(e: rusqlite::Error) -> Self {
        WebpageError::DatabaseError(e.to_string())
    }
}

// === GroupError ===

/// Errors related to group (subcategory) store operations.
#[derive(Debug)]
pub enum GroupError {
    /// Group with the given ID was not found.
    NotFound(String),
    /// The owning collection was not found.
    CategoryNotFound(String),
    /// Deletion would leave the collection with zero groups.
    LastGroup(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupError::NotFound(id) => write!(f, "Group not found: {}", id),
            GroupError::CategoryNotFound(id) => write!(f, "Collection not found: {}", id),
            GroupError::LastGroup(id) => {
                write!(f, "Cannot delete the last group of collection: {}", id)
            }
            GroupError::DatabaseError(msg) => write!(f, "Group database error: {}", msg),
        }
    }
}

impl std::error::Error for GroupError {}

impl From<rusqlite::Error> for GroupError {
    fn from(e: rusqlite::Error) -> Self {
        GroupError::DatabaseError(e.to_string())
    }
}

// === CollectionError ===

/// Errors related to collection (category) and organization store operations.
#[derive(Debug)]
pub enum CollectionError {
    /// Collection with the given ID was not found.
    NotFound(String),
    /// The owning organization was not found.
    OrganizationNotFound(String),
    /// Deletion would leave the organization with zero live collections.
    LastCollection(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::NotFound(id) => write!(f, "Collection not found: {}", id),
            CollectionError::OrganizationNotFound(id) => {
                write!(f, "Organization not found: {}", id)
            }
            CollectionError::LastCollection(id) => {
                write!(f, "Cannot delete the last collection of organization: {}", id)
            }
            CollectionError::DatabaseError(msg) => {
                write!(f, "Collection database error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CollectionError {}

impl From<rusqlite::Error> for CollectionError {
    fn from(e: rusqlite::Error) -> Self {
        CollectionError::DatabaseError(e.to_string())
    }
}

// === MetaError ===

/// Errors related to the key-value metadata store.
#[derive(Debug)]
pub enum MetaError {
    /// Database operation failed.
    DatabaseError(String),
    /// Failed to serialize or deserialize a stored value.
    SerializationError(String),
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaError::DatabaseError(msg) => write!(f, "Meta database error: {}", msg),
            MetaError::SerializationError(msg) => {
                write!(f, "Meta serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for MetaError {}

impl From<rusqlite::Error> for MetaError {
    fn from(e: rusqlite::Error) -> Self {
        MetaError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for MetaError {
    fn from(e: serde_json::Error) -> Self {
        MetaError::SerializationError(e.to_string())
    }
}

// === BackupError ===

/// Errors related to export/import of the backup document.
#[derive(Debug)]
pub enum BackupError {
    /// The document's schema version is not supported.
    UnsupportedSchema(u32),
    /// Failed to serialize or deserialize the document.
    SerializationError(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::UnsupportedSchema(v) => {
                write!(f, "Unsupported backup schema version: {}", v)
            }
            BackupError::SerializationError(msg) => {
                write!(f, "Backup serialization error: {}", msg)
            }
            BackupError::DatabaseError(msg) => write!(f, "Backup database error: {}", msg),
        }
    }
}

impl std::error::Error for BackupError {}

impl From<rusqlite::Error> for BackupError {
    fn from(e: rusqlite::Error) -> Self {
        BackupError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(e: serde_json::Error) -> Self {
        BackupError::SerializationError(e.to_string())
    }
}

// === SyncError ===

/// Errors related to the background backup reconciler.
///
/// The reconciler captures these into its status record instead of
/// propagating them into foreground call paths.
#[derive(Debug)]
pub enum SyncError {
    /// A network error occurred while talking to the backup remote.
    NetworkError(String),
    /// The remote rejected the credentials.
    AuthFailed(String),
    /// Failed to serialize or deserialize the backup payload.
    SerializationError(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NetworkError(msg) => write!(f, "Sync network error: {}", msg),
            SyncError::AuthFailed(msg) => write!(f, "Sync authentication failed: {}", msg),
            SyncError::SerializationError(msg) => {
                write!(f, "Sync serialization error: {}", msg)
            }
            SyncError::DatabaseError(msg) => write!(f, "Sync database error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::SerializationError(e.to_string())
    }
}

// === DragError ===

/// Errors related to the drag-and-drop mutation protocol.
///
/// Session-level oddities (double-fired drops, vanished cards, self-drops)
/// are deliberately not errors; they resolve to no-op commit outcomes.
#[derive(Debug)]
pub enum DragError {
    /// A drag payload string could not be decoded.
    InvalidPayload(String),
    /// The commit-side store mutation failed.
    CommitFailed(String),
}

impl fmt::Display for DragError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragError::InvalidPayload(msg) => write!(f, "Invalid drag payload: {}", msg),
            DragError::CommitFailed(msg) => write!(f, "Drop commit failed: {}", msg),
        }
    }
}

impl std::error::Error for DragError {}

impl From<rusqlite::Error> for DragError {
    fn from(e: rusqlite::Error) -> Self {
        DragError::CommitFailed(e.to_string())
    }
}
