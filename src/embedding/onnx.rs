//! ONNX-backed speaker encoder.
//!
//! Runs a WeSpeaker-style speaker embedding model (256-dim output) over
//! log mel frames. Gated behind the `onnx` feature; without it the type
//! still exists but every call reports [`DiarizationError::FeatureNotEnabled`].

use std::path::Path;

use super::SpeakerEncoder;
#[cfg(feature = "onnx")]
use super::EMBEDDING_DIM;
use crate::{DiarizationError, Result};

#[cfg(feature = "onnx")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};

#[cfg(feature = "onnx")]
use super::mel::{MelConfig, MelFrontend};
#[cfg(feature = "onnx")]
use crate::l2_normalize;
#[cfg(feature = "onnx")]
use tracing::{debug, info, warn};

/// Mel-frame energy below this is treated as silence and rejected
/// (log scale, matching the frontend's log mel output)
#[cfg(feature = "onnx")]
const MIN_LOG_ENERGY: f32 = -10.0;

/// Speaker encoder backed by an ONNX embedding model
#[cfg(feature = "onnx")]
pub struct OnnxSpeakerEncoder {
    session: Session,
    mel: MelFrontend,
}

#[cfg(feature = "onnx")]
impl OnnxSpeakerEncoder {
    /// Load the embedding model from an ONNX file.
    ///
    /// `n_threads` bounds intra-op parallelism of the inference session;
    /// the pipeline itself stays single-threaded.
    pub fn new(model_path: &Path, n_threads: usize) -> Result<Self> {
        if !model_path.exists() {
            return Err(DiarizationError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| DiarizationError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DiarizationError::ModelLoad(e.to_string()))?
            .with_intra_threads(n_threads)
            .map_err(|e| DiarizationError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| DiarizationError::ModelLoad(e.to_string()))?;

        info!("Loaded speaker embedding model from {:?}", model_path);

        Ok(Self {
            session,
            mel: MelFrontend::new(MelConfig::default()),
        })
    }
}

#[cfg(feature = "onnx")]
impl SpeakerEncoder for OnnxSpeakerEncoder {
    fn encode(&mut self, audio: &[f32]) -> Result<Vec<f32>> {
        let frames = self.mel.compute(audio)?;

        let energy = MelFrontend::mean_energy(&frames);
        if energy < MIN_LOG_ENERGY.exp() {
            debug!("Span too quiet for a reliable embedding ({energy:.2e})");
            return Err(DiarizationError::InvalidAudio(
                "audio span is silent".to_string(),
            ));
        }

        let n_frames = frames.len();
        let n_mels = frames[0].len();

        // Model input shape: [batch, n_frames, n_mels]
        let input_data: Vec<f32> = frames.iter().flat_map(|f| f.iter().copied()).collect();
        let input_shape = [1_usize, n_frames, n_mels];
        let input_tensor = Value::from_array((input_shape, input_data))
            .map_err(|e: ort::Error| DiarizationError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| DiarizationError::Inference(e.to_string()))?;

        // Output shape: [batch, embedding_dim] = [1, 256]
        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| DiarizationError::Inference("no output tensor".to_string()))?;

        let tensor = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| DiarizationError::Inference(e.to_string()))?;

        let mut embedding: Vec<f32> = tensor.1.iter().copied().collect();
        if embedding.len() != EMBEDDING_DIM {
            warn!(
                "Unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                EMBEDDING_DIM
            );
        }

        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

// Stub when the feature is off: construction fails, nothing else runs
#[cfg(not(feature = "onnx"))]
pub struct OnnxSpeakerEncoder;

#[cfg(not(feature = "onnx"))]
impl OnnxSpeakerEncoder {
    pub fn new(_model_path: &Path, _n_threads: usize) -> Result<Self> {
        Err(DiarizationError::FeatureNotEnabled)
    }
}

#[cfg(not(feature = "onnx"))]
impl SpeakerEncoder for OnnxSpeakerEncoder {
    fn encode(&mut self, _audio: &[f32]) -> Result<Vec<f32>> {
        Err(DiarizationError::FeatureNotEnabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "onnx")]
    #[test]
    fn test_model_not_found() {
        let result = OnnxSpeakerEncoder::new(Path::new("/nonexistent/model.onnx"), 1);
        assert!(matches!(result, Err(DiarizationError::ModelNotFound(_))));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_stub_reports_feature_not_enabled() {
        let result = OnnxSpeakerEncoder::new(Path::new("model.onnx"), 1);
        assert!(matches!(result, Err(DiarizationError::FeatureNotEnabled)));
    }
}
