//! Hand landmarks and the feature vector fed to the gesture classifier.

use crate::error::NormalizeError;

/// Number of landmarks the hand landmark network predicts per hand.
pub const NUM_LANDMARKS: usize = 21;

/// Which hand the landmark network believes it saw, as it appears in the (mirrored) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// A landmark position in image pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandmarkPoint {
    pub x: i32,
    pub y: i32,
}

impl LandmarkPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Landmarks of one detected hand.
///
/// Positions are normalized to the image the detector ran on: `x` and `y` range from 0 to 1,
/// `z` is relative depth with the wrist at roughly 0.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    positions: Vec<[f32; 3]>,
    presence: f32,
    raw_handedness: f32,
}

impl HandLandmarks {
    pub fn new(positions: Vec<[f32; 3]>, presence: f32, raw_handedness: f32) -> Self {
        Self {
            positions,
            presence,
            raw_handedness,
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Confidence of the landmark network that the crop actually contains a hand.
    pub fn presence(&self) -> f32 {
        self.presence
    }

    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }
}

/// Scales normalized landmarks to pixel coordinates of a `width` x `height` image.
///
/// Coordinates are truncated and clamped to `width - 1` / `height - 1` on the high side.
pub fn calc_landmark_list(width: u32, height: u32, hand: &HandLandmarks) -> Vec<LandmarkPoint> {
    let max_x = width.saturating_sub(1) as i32;
    let max_y = height.saturating_sub(1) as i32;
    hand.positions()
        .iter()
        .map(|&[x, y, _]| LandmarkPoint {
            x: ((x * width as f32) as i32).min(max_x),
            y: ((y * height as f32) as i32).min(max_y),
        })
        .collect()
}

/// Turns a landmark list into the classifier's feature vector.
///
/// Points are made relative to the first one (the wrist), flattened to `[x0, y0, x1, y1, ...]`
/// and divided by the largest absolute value, so the output has `2 * points.len()` entries in
/// `[-1, 1]`.
///
/// Returns [`NormalizeError::Degenerate`] if all points coincide with the first (or there are
/// none), since there is nothing to scale by.
pub fn pre_process_landmark(points: &[LandmarkPoint]) -> Result<Vec<f32>, NormalizeError> {
    let Some(base) = points.first() else {
        return Err(NormalizeError::Degenerate);
    };

    let relative: Vec<i64> = points
        .iter()
        .flat_map(|p| {
            [
                i64::from(p.x) - i64::from(base.x),
                i64::from(p.y) - i64::from(base.y),
            ]
        })
        .collect();

    let max_value = relative.iter().map(|v| v.abs()).max().unwrap_or(0);
    if max_value == 0 {
        return Err(NormalizeError::Degenerate);
    }

    let max_value = max_value as f64;
    Ok(relative
        .into_iter()
        .map(|v| (v as f64 / max_value) as f32)
        .collect())
}
