//! Hand landmark network output decoding.

use ndarray::ArrayD;

use crate::error::DetectError;
use crate::landmark::{HandLandmarks, NUM_LANDMARKS};
use crate::preprocess::Roi;

/// Side length of the landmark network's square input.
pub const INPUT_SIZE: usize = 224;

/// Turns the landmark network's outputs for one ROI into normalized image landmarks.
///
/// Expected outputs, in order: screen landmarks `[1, 63]` (crop pixels), hand presence `[1, 1]`,
/// handedness `[1, 1]`. Further outputs (world landmarks) are ignored.
pub fn extract(
    outputs: &[ArrayD<f32>],
    roi: &Roi,
    image_width: u32,
    image_height: u32,
) -> Result<HandLandmarks, DetectError> {
    let [screen, presence, handedness, ..] = outputs else {
        return Err(DetectError::UnexpectedOutput(format!(
            "landmark network returned {} outputs",
            outputs.len()
        )));
    };
    if screen.len() != NUM_LANDMARKS * 3 {
        return Err(DetectError::UnexpectedOutput(format!(
            "screen landmarks have shape {:?}",
            screen.shape()
        )));
    }
    let presence = single(presence, "presence")?;
    let handedness = single(handedness, "handedness")?;

    let size = INPUT_SIZE as f32;
    let values: Vec<f32> = screen.iter().copied().collect();
    let positions = values
        .chunks_exact(3)
        .map(|lm| {
            let (x, y) = roi.to_image(lm[0] / size, lm[1] / size);
            // z shares the x scale of the crop
            let z = lm[2] / size * roi.size / image_width as f32;
            [x / image_width as f32, y / image_height as f32, z]
        })
        .collect();

    Ok(HandLandmarks::new(positions, presence, handedness))
}

fn single(tensor: &ArrayD<f32>, what: &str) -> Result<f32, DetectError> {
    match tensor.iter().next() {
        Some(&v) if tensor.len() == 1 => Ok(v),
        _ => Err(DetectError::UnexpectedOutput(format!(
            "{} has shape {:?}",
            what,
            tensor.shape()
        ))),
    }
}
