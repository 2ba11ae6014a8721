// LinkTrove services
// Services coordinate across stores: whole-dataset backup documents, the
// drag-and-drop mutation protocol, and the background sync reconciler.

pub mod backup;
pub mod drag_drop;
pub mod gist_transport;
pub mod sync_reconciler;
