use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{ArrayD, CowArray};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch};
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};

/// Builds ONNX Runtime sessions with a shared execution provider setup.
pub struct OnnxModel {
    provider: [ExecutionProviderDispatch; 1],
    intra_threads: usize,
}

impl OnnxModel {
    pub fn new(cuda: bool, intra_threads: usize) -> Self {
        let provider = if cuda {
            [CUDAExecutionProvider::default().build().error_on_failure()]
        } else {
            [CPUExecutionProvider::default().build()]
        };
        Self {
            provider,
            intra_threads: intra_threads.max(1),
        }
    }

    pub fn load_model(&self, model_path: impl AsRef<Path>) -> Result<Session> {
        let model_path = model_path.as_ref();
        let session = SessionBuilder::new()?
            .with_execution_providers(self.provider.clone())?
            .with_intra_threads(self.intra_threads)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load model {}", model_path.display()))?;
        log::debug!(
            "loaded {} (inputs: {:?}, outputs: {:?})",
            model_path.display(),
            session.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            session.outputs.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(),
        );
        Ok(session)
    }
}

/// Runs a single-input session and copies every output out as an `f32` tensor, in the order the
/// model declares them.
pub fn run_f32(session: &Session, xs: ArrayD<f32>) -> ort::Result<Vec<ArrayD<f32>>> {
    let xs = CowArray::from(xs);
    let input_data = ort::inputs![xs.view()]?;
    let ys = session.run(input_data)?;
    (0..session.outputs.len())
        .map(|i| Ok(ys[i].try_extract_tensor::<f32>()?.into_owned()))
        .collect()
}
