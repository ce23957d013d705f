//! Mapping between chunks, Qdrant points, and search hits.

use crate::{
    extraction::Chunk,
    indexing::types::{DocumentInfo, SearchHit, StoredChunk},
    qdrant::{PointUpsert, ScoredPoint, chunk_point_id, compute_chunk_hash},
};
use serde_json::{Map, Value};
use std::cmp::Ordering;

pub(crate) const FIELD_DOCUMENT_ID: &str = "document_id";
pub(crate) const FIELD_CHUNK_INDEX: &str = "chunk_index";

/// Build one point per chunk, keyed by `(document_id, chunk_index)`.
pub(crate) fn build_points(
    document: &DocumentInfo,
    chunks: &[Chunk],
    vectors: Vec<Vec<f32>>,
) -> Vec<PointUpsert> {
    chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| PointUpsert {
            id: chunk_point_id(&document.document_id, chunk.index),
            vector,
            payload: chunk_payload(document, chunk),
        })
        .collect()
}

fn chunk_payload(document: &DocumentInfo, chunk: &Chunk) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(
        FIELD_DOCUMENT_ID.into(),
        Value::String(document.document_id.clone()),
    );
    payload.insert(FIELD_CHUNK_INDEX.into(), Value::from(chunk.index));
    payload.insert("char_start".into(), Value::from(chunk.char_start));
    payload.insert("char_end".into(), Value::from(chunk.char_end));
    payload.insert("text".into(), Value::String(chunk.text.clone()));
    payload.insert(
        "chunk_hash".into(),
        Value::String(compute_chunk_hash(&chunk.text)),
    );
    payload.insert("filename".into(), Value::String(document.filename.clone()));
    payload.insert(
        "storage_path".into(),
        Value::String(document.storage_path.clone()),
    );
    payload.insert(
        "uploaded_at".into(),
        Value::String(document.uploaded_at.clone()),
    );
    payload.insert("page_count".into(), Value::from(document.page_count));
    payload.insert("file_size".into(), Value::from(document.file_size));
    payload.insert("checksum".into(), Value::String(document.checksum.clone()));
    if let Some(title) = &document.title {
        payload.insert("title".into(), Value::String(title.clone()));
    }
    if let Some(abstract_text) = &document.abstract_text {
        payload.insert("abstract".into(), Value::String(abstract_text.clone()));
    }
    payload
}

fn get_string(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value.clone()),
        _ => None,
    }
}

fn get_usize(payload: &Map<String, Value>, key: &str) -> Option<usize> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|value| usize::try_from(value).ok())
}

/// Recover the document description stored on any of its chunks.
pub(crate) fn document_from_payload(payload: &Map<String, Value>) -> Option<DocumentInfo> {
    Some(DocumentInfo {
        document_id: get_string(payload, FIELD_DOCUMENT_ID)?,
        filename: get_string(payload, "filename").unwrap_or_default(),
        storage_path: get_string(payload, "storage_path").unwrap_or_default(),
        uploaded_at: get_string(payload, "uploaded_at").unwrap_or_default(),
        page_count: get_usize(payload, "page_count").unwrap_or_default(),
        file_size: get_usize(payload, "file_size").unwrap_or_default(),
        checksum: get_string(payload, "checksum").unwrap_or_default(),
        title: get_string(payload, "title"),
        abstract_text: get_string(payload, "abstract"),
    })
}

pub(crate) fn stored_chunk_from_payload(payload: &Map<String, Value>) -> Option<StoredChunk> {
    Some(StoredChunk {
        chunk_index: get_usize(payload, FIELD_CHUNK_INDEX)?,
        char_start: get_usize(payload, "char_start").unwrap_or_default(),
        char_end: get_usize(payload, "char_end").unwrap_or_default(),
        text: match payload.get("text") {
            Some(Value::String(text)) => text.clone(),
            _ => String::new(),
        },
    })
}

/// Map a scored point to a hit; points missing the record key are dropped.
pub(crate) fn hit_from_point(point: ScoredPoint) -> Option<SearchHit> {
    let payload = point.payload?;
    let document_id = get_string(&payload, FIELD_DOCUMENT_ID)?;
    let chunk_index = get_usize(&payload, FIELD_CHUNK_INDEX)?;
    Some(SearchHit {
        document_id,
        chunk_index,
        score: point.score,
        text: match payload.get("text") {
            Some(Value::String(text)) => text.clone(),
            _ => String::new(),
        },
        filename: get_string(&payload, "filename"),
        title: get_string(&payload, "title"),
    })
}

/// Sort by descending score, then ascending chunk index and document id, and keep `limit`.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| left.chunk_index.cmp(&right.chunk_index))
            .then_with(|| left.document_id.cmp(&right.document_id))
    });
    hits.truncate(limit);
    hits
}

/// Order chunks by their position in the document.
pub(crate) fn order_chunks(mut chunks: Vec<StoredChunk>) -> Vec<StoredChunk> {
    chunks.sort_by(|left, right| match left.chunk_index.cmp(&right.chunk_index) {
        Ordering::Equal => left.char_start.cmp(&right.char_start),
        other => other,
    });
    chunks.dedup_by_key(|chunk| chunk.chunk_index);
    chunks
}
