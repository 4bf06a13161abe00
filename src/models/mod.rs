//! Core data models for casefile

pub mod ids;
pub mod record;

pub use ids::RecordId;
pub use record::{Document, Record};
