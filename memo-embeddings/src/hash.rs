//! Deterministic bag-of-tokens backend.
//!
//! Hashes tokens into dimension buckets and L2-normalises the counts. No
//! model files, fully deterministic, texts sharing most tokens land close
//! in cosine space. Used by tests and as an explicitly selected fallback —
//! never silently substituted for a configured model.

use memo_core::MemoResult;

use crate::backend::EmbeddingBackend;

/// Hash-bucket embedding backend.
pub struct HashBackend {
    dimensions: usize,
    model_id: String,
}

impl HashBackend {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model_id: format!("hash-{dimensions}"),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a(&token.to_lowercase());
            buckets[(h as usize) % self.dimensions] += 1.0;
            // A second, shifted bucket softens collisions.
            buckets[((h >> 7) as usize) % self.dimensions] += 0.5;
        }

        let norm: f32 = buckets.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut buckets {
                *v /= norm;
            }
        } else {
            buckets[0] = 1.0;
        }
        buckets
    }
}

impl EmbeddingBackend for HashBackend {
    fn embed(&self, text: &str) -> MemoResult<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn fnv1a(s: &str) -> u32 {
    let mut h: u32 = 0x811c9dc5;
    for b in s.as_bytes() {
        h ^= *b as u32;
        h = h.wrapping_mul(0x01000193);
    }
    h
}
