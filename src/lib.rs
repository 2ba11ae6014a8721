//! LinkTrove Core — ordered bookmark collection engine.
//!
//! Per-group, order-preserving card lists over an embedded SQLite store,
//! mutated through a drag-and-drop protocol and reconciled against a remote
//! backup file by a debounced background sync service.
//!
//! This library crate exposes all modules for use by the binary and
//! integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod services;
pub mod types;
