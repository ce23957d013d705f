//! Fixed-size, fixed-overlap character windows.
//!
//! Windows are measured in Unicode scalar values rather than bytes so that offsets stay stable
//! regardless of encoding. A window of `size` characters starts every `size - overlap`
//! characters; the last window ends exactly at the end of the text and may be shorter.

use super::{Chunk, ExtractionError};

/// Validated chunk window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    /// Target chunk size in characters.
    pub size: usize,
    /// Characters shared between adjacent chunks.
    pub overlap: usize,
}

impl ChunkSettings {
    /// Build settings, rejecting a zero size or an overlap that is not smaller than the size.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ExtractionError> {
        let settings = Self { size, overlap };
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> Result<(), ExtractionError> {
        if self.size == 0 || self.overlap >= self.size {
            return Err(ExtractionError::InvalidChunking {
                size: self.size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }
}

/// Number of chunks [`chunk_text`] produces for a text of `char_len` characters.
pub fn expected_chunk_count(char_len: usize, settings: ChunkSettings) -> usize {
    if char_len == 0 {
        0
    } else if char_len <= settings.size {
        1
    } else {
        (char_len - settings.overlap).div_ceil(settings.step())
    }
}

/// Split `text` into overlapping windows attributed to `document_id`.
///
/// Returns an empty vector for empty input.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    settings: ChunkSettings,
) -> Result<Vec<Chunk>, ExtractionError> {
    settings.validate()?;

    // Byte offset of every character boundary, including the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(expected_chunk_count(char_len, settings));
    if char_len == 0 {
        return Ok(chunks);
    }

    let mut start = 0;
    loop {
        let end = (start + settings.size).min(char_len);
        chunks.push(Chunk {
            document_id: document_id.to_string(),
            index: chunks.len(),
            char_start: start,
            char_end: end,
            text: text[boundaries[start]..boundaries[end]].to_string(),
        });
        if end == char_len {
            break;
        }
        start += settings.step();
    }

    Ok(chunks)
}
