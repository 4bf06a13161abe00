//! Storage layer for casefile
//!
//! Provides the whole-file JSON record store, atomic file writes and the
//! in-process lock shared with the backup scheduler.

pub mod file_io;
pub mod lock;
pub mod records;

pub use file_io::{copy_file_atomic, read_json_opt, write_json_atomic};
pub use lock::FileLock;
pub use records::RecordStore;

use crate::error::CaseResult;
use crate::models::Document;

/// Keyed document persistence
///
/// Callers that only need load/find/save/delete should depend on this trait
/// rather than on [`RecordStore`], so the backing format can change without
/// touching them.
pub trait RecordRepository<R: Document> {
    /// Reload the collection from durable storage
    fn load_all(&self) -> CaseResult<Vec<R>>;

    /// Find a loaded document by id
    fn find_by_id(&self, id: &str) -> Option<R>;

    /// Insert or replace a document
    fn save(&self, record: R) -> CaseResult<()>;

    /// Remove a document, returning whether it existed
    fn delete(&self, id: &str) -> CaseResult<bool>;
}
