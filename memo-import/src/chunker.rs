//! Line-aware sliding-window chunking.
//!
//! Lines are packed until the next one would push a chunk past
//! `max_chars`; the emitted chunk's tail (the suffix whose length first
//! reaches `overlap_chars`, at line granularity) carries into the next
//! chunk. Over-long lines are pre-split into `max_chars`-wide segments.
//! Chunks remember the inclusive 1-based line span of the original file.

use sha2::{Digest, Sha256};

/// Chunking parameters in tokens; a token is budgeted at 4 chars.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub chunk_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: 400,
            overlap_tokens: 80,
        }
    }
}

impl ChunkerConfig {
    fn max_chars(&self) -> usize {
        (self.chunk_tokens * 4).max(32)
    }

    fn overlap_chars(&self) -> usize {
        self.overlap_tokens * 4
    }
}

/// One emitted chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Inclusive, 1-based, in original file lines.
    pub start_line: usize,
    pub end_line: usize,
    /// Lines joined with `\n`.
    pub text: String,
    /// SHA-256 hex of `text`.
    pub hash: String,
}

/// A line segment tagged with its original line number.
type Segment = (usize, String);

/// Chunk a text. Whitespace-only chunks are discarded.
pub fn chunk_lines(content: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let max_chars = config.max_chars();
    let overlap_chars = config.overlap_chars();

    let mut segments: Vec<Segment> = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        if line.chars().count() > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                segments.push((line_no, piece.iter().collect()));
            }
        } else {
            segments.push((line_no, line.to_string()));
        }
    }

    let mut chunks = Vec::new();
    let mut current: Vec<Segment> = Vec::new();
    let mut current_len = 0usize;

    for (line_no, segment) in segments {
        let seg_len = segment.chars().count();
        let appended_len = if current.is_empty() {
            seg_len
        } else {
            current_len + 1 + seg_len
        };

        if !current.is_empty() && appended_len > max_chars {
            emit(&mut chunks, &current);
            current = carry_tail(&current, overlap_chars);
            current_len = if current.is_empty() {
                seg_len
            } else {
                joined_len(&current) + 1 + seg_len
            };
            current.push((line_no, segment));
        } else {
            current_len = appended_len;
            current.push((line_no, segment));
        }
    }
    if !current.is_empty() {
        emit(&mut chunks, &current);
    }
    chunks
}

fn emit(chunks: &mut Vec<Chunk>, segments: &[Segment]) {
    let text: String = segments
        .iter()
        .map(|(_, s)| s.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if text.trim().is_empty() {
        return;
    }
    let digest = Sha256::digest(text.as_bytes());
    chunks.push(Chunk {
        start_line: segments[0].0,
        end_line: segments[segments.len() - 1].0,
        hash: digest.iter().map(|b| format!("{b:02x}")).collect(),
        text,
    });
}

/// The suffix of `segments` whose total length first reaches
/// `overlap_chars`, kept at line granularity.
fn carry_tail(segments: &[Segment], overlap_chars: usize) -> Vec<Segment> {
    if overlap_chars == 0 {
        return Vec::new();
    }
    let mut carried = 0usize;
    let mut start = segments.len();
    while start > 0 && carried < overlap_chars {
        start -= 1;
        carried += segments[start].1.chars().count();
    }
    segments[start..].to_vec()
}

fn joined_len(segments: &[Segment]) -> usize {
    if segments.is_empty() {
        return 0;
    }
    let chars: usize = segments.iter().map(|(_, s)| s.chars().count()).sum();
    chars + segments.len() - 1
}
