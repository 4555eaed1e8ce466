//! ONNX Runtime backend.
//!
//! Loads the configured model via `ort` and its tokenizer via `tokenizers`
//! from `<storagePath>/models/<model-id>/`. Pipeline: tokenise → forward →
//! mean-pool over non-padding tokens (attention mask) → L2-normalise.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use memo_core::errors::EmbeddingError;
use memo_core::MemoResult;

use crate::backend::EmbeddingBackend;

/// ONNX-based embedding backend.
#[derive(Debug)]
pub struct OnnxBackend {
    /// `Session::run` needs `&mut self`; the Mutex restores `&self` access.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
    model_id: String,
}

impl OnnxBackend {
    /// Directory a model id resolves to under the storage root.
    pub fn model_dir(storage_path: &Path, model_id: &str) -> PathBuf {
        storage_path.join("models").join(model_id.replace('/', "--"))
    }

    /// Load model + tokenizer. The model's hidden width must match
    /// `dimensions` — checked on first inference.
    pub fn load(model_dir: &Path, model_id: &str, dimensions: usize) -> MemoResult<Self> {
        let model_path = ["model_quantized.onnx", "model.onnx"]
            .iter()
            .map(|name| model_dir.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| EmbeddingError::ModelLoadFailed {
                path: model_dir.display().to_string(),
                reason: "no model.onnx or model_quantized.onnx".to_string(),
            })?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| EmbeddingError::ModelLoadFailed {
                path: tokenizer_path.display().to_string(),
                reason: e.to_string(),
            })?;

        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(2)?))
            .and_then(|mut b| b.commit_from_file(&model_path))
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                path: model_path.display().to_string(),
                reason: e.to_string(),
            })?;

        debug!(model = model_id, path = %model_path.display(), "ONNX model loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
            model_id: model_id.to_string(),
        })
    }

    fn infer(&self, text: &str) -> MemoResult<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("tokenize: {e}"),
            })?;
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = input_ids.len();

        let ids_tensor = Tensor::from_array((vec![1i64, seq_len as i64], input_ids))
            .map_err(tensor_err)?;
        let mask_tensor =
            Tensor::from_array((vec![1i64, seq_len as i64], attention_mask.clone()))
                .map_err(tensor_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("session lock poisoned: {e}"),
            })?;
        let outputs = session
            .run(ort::inputs![ids_tensor, mask_tensor])
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: e.to_string(),
            })?;

        let (_name, output) =
            outputs
                .iter()
                .next()
                .ok_or_else(|| EmbeddingError::InferenceFailed {
                    reason: "no output tensor".to_string(),
                })?;
        let (shape, data) =
            output
                .try_extract_tensor::<f32>()
                .map_err(|e| EmbeddingError::InferenceFailed {
                    reason: format!("tensor extraction failed: {e}"),
                })?;

        let pooled = match shape.len() {
            // [batch=1, seq, hidden] — mean-pool non-padding positions.
            3 => {
                let seq = shape[1] as usize;
                let hidden = shape[2] as usize;
                let mut sums = vec![0.0f32; hidden];
                let mut kept = 0usize;
                for (s, &mask) in attention_mask.iter().take(seq).enumerate() {
                    if mask == 0 {
                        continue;
                    }
                    kept += 1;
                    for (d, sum) in sums.iter_mut().enumerate() {
                        *sum += data[s * hidden + d];
                    }
                }
                if kept > 0 {
                    for v in &mut sums {
                        *v /= kept as f32;
                    }
                }
                sums
            }
            // [batch=1, hidden] — already pooled.
            2 => data[..shape[1] as usize].to_vec(),
            _ => {
                return Err(EmbeddingError::InferenceFailed {
                    reason: format!("unexpected output shape: {shape:?}"),
                }
                .into())
            }
        };

        if pooled.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: pooled.len(),
            }
            .into());
        }

        Ok(l2_normalize(pooled))
    }
}

fn tensor_err(e: ort::Error) -> EmbeddingError {
    EmbeddingError::InferenceFailed {
        reason: format!("tensor creation error: {e}"),
    }
}

fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

impl EmbeddingBackend for OnnxBackend {
    fn embed(&self, text: &str) -> MemoResult<Vec<f32>> {
        self.infer(text)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_reports_path() {
        let dir = std::env::temp_dir().join("memo-onnx-missing");
        let err = OnnxBackend::load(&dir, "test-model", 768).unwrap_err();
        assert!(err.to_string().contains("memo-onnx-missing"));
    }

    #[test]
    fn model_dir_is_slash_safe() {
        let dir = OnnxBackend::model_dir(Path::new("/data"), "Xenova/nomic-embed-text-v1");
        assert_eq!(
            dir,
            PathBuf::from("/data/models/Xenova--nomic-embed-text-v1")
        );
    }

    #[test]
    fn normalize_produces_unit_vectors() {
        let v = l2_normalize(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }
}
