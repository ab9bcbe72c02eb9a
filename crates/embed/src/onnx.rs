//! Pretrained CNN backend (EfficientNet-B0 pooled features) through ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedError, Embedder};

/// Pooled output width of EfficientNet-B0.
pub const ONNX_DIM: usize = 1280;

const INPUT_SIZE: u32 = 224;
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Runs one forward pass per region. The session is serialized behind a
/// mutex because `Session::run` needs exclusive access.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    model_name: String,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OnnxEmbedder {
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self, EmbedError> {
        if !model_path.exists() {
            return Err(EmbedError::ModelNotFound(model_path.display().to_string()));
        }
        let session = Session::builder()?
            .with_intra_threads(intra_threads.max(1))?
            .commit_from_file(model_path)?;
        tracing::info!(path = %model_path.display(), "loaded ONNX embedding model");
        Ok(Self {
            session: Mutex::new(session),
            model_name: model_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "onnx".to_string()),
        })
    }
}

/// Bilinear resize to 224x224, ImageNet normalization, NCHW layout.
pub(crate) fn preprocess(region: &RgbImage) -> Vec<f32> {
    let resized = imageops::resize(region, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (i, px) in resized.pixels().enumerate() {
        for c in 0..3 {
            data[c * plane + i] = (px[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }
    data
}

impl Embedder for OnnxEmbedder {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        ONNX_DIM
    }

    fn embed(&self, region: &RgbImage) -> Result<Vec<f32>, EmbedError> {
        if region.width() == 0 || region.height() == 0 {
            return Err(EmbedError::EmptyRegion);
        }
        let shape = [1usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];
        let input = Tensor::from_array((shape, preprocess(region)))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbedError::Inference("poisoned session lock".into()))?;
        let outputs = session.run(ort::inputs![input])?;
        let (_, raw) = outputs[0].try_extract_tensor::<f32>()?;
        if raw.len() != ONNX_DIM {
            return Err(EmbedError::Inference(format!(
                "expected {ONNX_DIM}-dim output, got {}",
                raw.len()
            )));
        }
        let mut v = raw.to_vec();
        l2_normalize_in_place(&mut v);
        Ok(v)
    }
}
