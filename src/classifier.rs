use anyhow::Result;
use ndarray::{Array1, Axis};
use ort::session::Session;
use ort::value::ValueType;

use crate::error::ClassifyError;
use crate::model::{OnnxModel, run_f32};
use crate::postprocess::argmax_and_max;

/// Maps a feature vector to a gesture class index.
pub trait GestureClassifier: Send {
    fn classify(&mut self, features: &[f32]) -> Result<usize, ClassifyError>;
}

/// The keypoint classifier: a small dense network over the 42 normalized landmark coordinates.
pub struct KeyPointClassifier {
    session: Session,
    input_width: Option<usize>,
}

impl KeyPointClassifier {
    pub fn new(session: Session) -> Self {
        let input_width = session.inputs.first().and_then(|input| match &input.input_type {
            ValueType::Tensor { dimensions, .. } => declared_width(dimensions),
            _ => None,
        });
        Self {
            session,
            input_width,
        }
    }

    pub fn load(onnx: &OnnxModel, model_path: &str) -> Result<Self> {
        Ok(Self::new(onnx.load_model(model_path)?))
    }

    /// Width of the input vector, when the model declares a static one.
    pub fn input_width(&self) -> Option<usize> {
        self.input_width
    }
}

impl GestureClassifier for KeyPointClassifier {
    fn classify(&mut self, features: &[f32]) -> Result<usize, ClassifyError> {
        if let Some(expected) = self.input_width {
            check_width(expected, features)?;
        }

        let xs = Array1::from(features.to_vec()).insert_axis(Axis(0));
        let ys = run_f32(&self.session, xs.into_dyn())?;
        let scores: Vec<f32> = ys
            .first()
            .ok_or(ClassifyError::EmptyOutput)?
            .iter()
            .copied()
            .collect();
        let (index, score) = argmax_and_max(&scores).ok_or(ClassifyError::EmptyOutput)?;
        log::trace!("class {} scored {:.3}", index, score);
        Ok(index)
    }
}

/// Static width of the last input axis; dynamic (`-1`) or missing axes give `None`.
fn declared_width(dimensions: &[i64]) -> Option<usize> {
    match dimensions.last() {
        Some(&width) if width > 0 => Some(width as usize),
        _ => None,
    }
}

fn check_width(expected: usize, features: &[f32]) -> Result<(), ClassifyError> {
    if expected != features.len() {
        return Err(ClassifyError::InputWidth {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_input_width() {
        assert_eq!(declared_width(&[1, 42]), Some(42));
    }

    #[test]
    fn dynamic_input_width_is_unknown() {
        assert_eq!(declared_width(&[-1, -1]), None);
        assert_eq!(declared_width(&[]), None);
    }

    #[test]
    fn feature_count_must_match_input_width() {
        assert!(check_width(42, &[0.0; 42]).is_ok());
        assert!(matches!(
            check_width(42, &[0.0; 40]),
            Err(ClassifyError::InputWidth {
                expected: 42,
                actual: 40
            })
        ));
    }
}
