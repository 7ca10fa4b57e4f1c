pub mod classifier;
pub mod cli;
pub mod detector;
pub mod error;
pub mod landmark;
pub mod mapping;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod postprocess;
pub mod preprocess;
pub mod service;

pub use crate::classifier::{GestureClassifier, KeyPointClassifier};
pub use crate::cli::Args;
pub use crate::detector::{HandDetector, HandsConfig, MediaPipeHands};
pub use crate::error::{ClassifyError, DecodeError, DetectError, NormalizeError, PipelineError};
pub use crate::landmark::{HandLandmarks, LandmarkPoint, calc_landmark_list, pre_process_landmark};
pub use crate::mapping::{GestureLabels, load_labels};
pub use crate::model::OnnxModel;
pub use crate::pipeline::{Pipeline, load_pipelines};
pub use crate::pool::WorkerPool;
pub use crate::service::{AppState, router};
