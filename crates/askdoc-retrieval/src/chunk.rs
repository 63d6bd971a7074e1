//! Fixed-size overlapping text chunking
//!
//! Splits a document's text into chunks of at most `chunk_size` characters
//! where consecutive chunks share exactly `overlap` characters. Chunk
//! boundaries are measured in characters, not bytes, so multi-byte text
//! never splits inside a code point.

use askdoc_core::{AskdocError, Chunk, Result};

/// Chunking parameters
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Splits text into overlapping chunks
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    step: usize,
}

impl Chunker {
    /// Create a chunker, validating that `overlap < chunk_size`.
    pub fn new(config: ChunkConfig) -> Result<Self> {
        if config.overlap >= config.chunk_size {
            return Err(AskdocError::InvalidChunkConfig {
                chunk_size: config.chunk_size,
                overlap: config.overlap,
            });
        }

        Ok(Self {
            size: config.chunk_size,
            step: config.chunk_size - config.overlap,
        })
    }

    /// Lazily split `text` into chunk slices.
    ///
    /// The iterator is finite and `Clone`, so a split can be restarted or
    /// walked twice without re-borrowing the text. Empty input yields an
    /// empty sequence.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            pos: 0,
            size: self.size,
            step: self.step,
            done: text.is_empty(),
        }
    }

    /// Split `text` and materialize indexed [`Chunk`] values for ingestion.
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        self.split(text)
            .enumerate()
            .map(|(i, piece)| Chunk::new(i as u32, piece))
            .collect()
    }
}

/// Lazy chunk iterator produced by [`Chunker::split`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    pos: usize,
    size: usize,
    step: usize,
    done: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }

        let rest = &self.text[self.pos..];
        let mut end = rest.len();
        let mut step_offset = None;

        for (n, (offset, _)) in rest.char_indices().enumerate() {
            if n == self.step {
                step_offset = Some(offset);
            }
            if n == self.size {
                end = offset;
                break;
            }
        }

        let piece = &rest[..end];

        // A chunk that reaches the end of the text is the last one; a
        // further window would be fully contained in it.
        match step_offset {
            Some(offset) if end < rest.len() => self.pos += offset,
            _ => self.done = true,
        }

        Some(piece)
    }
}
