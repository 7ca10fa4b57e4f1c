//! Error types for each pipeline stage.
//!
//! Every stage returns its own error so the HTTP layer can decide the status code from the variant
//! alone; [`PipelineError`] is the union handed back by [`crate::pipeline::Pipeline`].

use std::error::Error;
use std::fmt;

/// The request payload could not be turned into an image.
#[derive(Debug)]
pub enum DecodeError {
    Base64(base64::DecodeError),
    Image(image::ImageError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Base64(e) => write!(f, "invalid base64 payload: {}", e),
            DecodeError::Image(e) => write!(f, "failed to decode image: {}", e),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Base64(e) => Some(e),
            DecodeError::Image(e) => Some(e),
        }
    }
}

impl From<base64::DecodeError> for DecodeError {
    fn from(e: base64::DecodeError) -> Self {
        DecodeError::Base64(e)
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        DecodeError::Image(e)
    }
}

#[derive(Debug)]
pub enum DetectError {
    Runtime(ort::Error),
    /// The frame could not be resized into the network input.
    Preprocess(String),
    /// A network produced tensors that don't have the expected shape.
    UnexpectedOutput(String),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::Runtime(e) => write!(f, "hand detection failed: {}", e),
            DetectError::Preprocess(msg) => write!(f, "failed to prepare frame: {}", msg),
            DetectError::UnexpectedOutput(msg) => write!(f, "unexpected detector output: {}", msg),
        }
    }
}

impl Error for DetectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DetectError::Runtime(e) => Some(e),
            DetectError::Preprocess(_) | DetectError::UnexpectedOutput(_) => None,
        }
    }
}

impl From<ort::Error> for DetectError {
    fn from(e: ort::Error) -> Self {
        DetectError::Runtime(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeError {
    /// Every landmark coincides with the wrist, so there is no scale to normalize by.
    Degenerate,
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::Degenerate => write!(f, "landmarks have zero extent"),
        }
    }
}

impl Error for NormalizeError {}

#[derive(Debug)]
pub enum ClassifyError {
    InputWidth { expected: usize, actual: usize },
    Runtime(ort::Error),
    EmptyOutput,
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::InputWidth { expected, actual } => write!(
                f,
                "classifier expects {} features, got {}",
                expected, actual
            ),
            ClassifyError::Runtime(e) => write!(f, "classifier failed: {}", e),
            ClassifyError::EmptyOutput => write!(f, "classifier returned no scores"),
        }
    }
}

impl Error for ClassifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClassifyError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ort::Error> for ClassifyError {
    fn from(e: ort::Error) -> Self {
        ClassifyError::Runtime(e)
    }
}

#[derive(Debug)]
pub enum PipelineError {
    Decode(DecodeError),
    Detect(DetectError),
    Classify(ClassifyError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Decode(e) => e.fmt(f),
            PipelineError::Detect(e) => e.fmt(f),
            PipelineError::Classify(e) => e.fmt(f),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Decode(e) => Some(e),
            PipelineError::Detect(e) => Some(e),
            PipelineError::Classify(e) => Some(e),
        }
    }
}

impl From<DecodeError> for PipelineError {
    fn from(e: DecodeError) -> Self {
        PipelineError::Decode(e)
    }
}

impl From<DetectError> for PipelineError {
    fn from(e: DetectError) -> Self {
        PipelineError::Detect(e)
    }
}

impl From<ClassifyError> for PipelineError {
    fn from(e: ClassifyError) -> Self {
        PipelineError::Classify(e)
    }
}
