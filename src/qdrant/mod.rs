//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use filters::{FieldMatch, build_match_filter};
pub use payload::{chunk_point_id, compute_chunk_hash};
pub use types::{PointUpsert, QdrantError, ScoredPoint};
