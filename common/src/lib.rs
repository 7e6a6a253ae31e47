//! Backend contract and reference backends for nskv.
//!
//! A backend is the minimal ordered key-value store the key-value layer sits
//! on: batch get, batch existence check, ordered key and entry scans within
//! inclusive bounds, and atomic application of a write batch. Backends know
//! nothing about scopes; every key they see is absolute.

pub mod backend;
pub mod scan;

pub use backend::config::BackendConfig;
pub use backend::factory::create_backend;
pub use backend::{
    Backend, BackendError, BackendResult, KeyIterator, Record, RecordIterator, WriteOp,
};
pub use scan::{ScanBounds, scan_match};
