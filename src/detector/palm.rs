//! Palm detection output decoding.
//!
//! The palm network is a single shot multibox detector. Each anchor predicts a box and 7 palm
//! keypoints as offsets (in input pixels) from the anchor center, plus a logit score.

use std::f32::consts::PI;
use std::sync::OnceLock;

use ndarray::ArrayD;

use crate::error::DetectError;
use crate::postprocess::{BoxCorners, non_maximum_suppression, sigmoid};
use crate::preprocess::{Letterbox, Roi};

/// Side length of the palm network's square input.
pub const INPUT_SIZE: usize = 192;

const NUM_KEYPOINTS: usize = 7;
const VALUES_PER_ANCHOR: usize = 4 + NUM_KEYPOINTS * 2;
const IOU_THRESHOLD: f32 = 0.3;

// ROI derivation for the landmark network
const ROI_SHIFT_Y: f32 = -0.5;
const ROI_SCALE: f32 = 2.6;

/// Keypoints predicted for each palm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x_center: f32,
    pub y_center: f32,
}

struct LayerInfo {
    boxes_per_cell: usize,
    size: usize,
}

/// Anchor centers for the 24x24 and 12x12 feature maps, 2016 in total.
pub fn anchors() -> &'static [Anchor] {
    static ANCHORS: OnceLock<Vec<Anchor>> = OnceLock::new();
    ANCHORS.get_or_init(|| {
        let layers = [
            LayerInfo { boxes_per_cell: 2, size: 24 },
            LayerInfo { boxes_per_cell: 6, size: 12 },
        ];
        let mut anchors = Vec::new();
        for layer in &layers {
            for y in 0..layer.size {
                for x in 0..layer.size {
                    for _ in 0..layer.boxes_per_cell {
                        anchors.push(Anchor {
                            x_center: (x as f32 + 0.5) / layer.size as f32,
                            y_center: (y as f32 + 0.5) / layer.size as f32,
                        });
                    }
                }
            }
        }
        anchors
    })
}

/// A palm in source image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PalmDetection {
    pub score: f32,
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
    pub keypoints: [(f32, f32); NUM_KEYPOINTS],
}

impl PalmDetection {
    fn corners(&self) -> BoxCorners {
        [
            self.x_center - self.width / 2.0,
            self.y_center - self.height / 2.0,
            self.x_center + self.width / 2.0,
            self.y_center + self.height / 2.0,
        ]
    }

    fn keypoint(&self, kp: Keypoint) -> (f32, f32) {
        self.keypoints[kp as usize]
    }

    /// Rotation that makes the wrist -> middle finger axis point straight up, in `[-pi, pi]`.
    pub fn rotation(&self) -> f32 {
        let (x0, y0) = self.keypoint(Keypoint::Wrist);
        let (x1, y1) = self.keypoint(Keypoint::MiddleFingerMcp);
        normalize_radians(PI / 2.0 - (-(y1 - y0)).atan2(x1 - x0))
    }

    /// The square region around the whole hand that the landmark network should look at.
    pub fn hand_roi(&self) -> Roi {
        let rotation = self.rotation();
        let (sin, cos) = rotation.sin_cos();
        let y_shift = ROI_SHIFT_Y * self.height;
        let size = self.width.max(self.height) * ROI_SCALE;
        Roi {
            x_center: self.x_center - y_shift * sin,
            y_center: self.y_center + y_shift * cos,
            size,
            rotation,
        }
    }
}

fn normalize_radians(angle: f32) -> f32 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

/// Decodes raw network outputs into at most `max_palms` palms, most confident first.
///
/// `boxes` must have shape `[1, 2016, 18]` and `scores` `[1, 2016, 1]`.
pub fn decode(
    boxes: &ArrayD<f32>,
    scores: &ArrayD<f32>,
    letterbox: &Letterbox,
    min_score: f32,
    max_palms: usize,
) -> Result<Vec<PalmDetection>, DetectError> {
    let anchors = anchors();
    let num_anchors = anchors.len();
    if boxes.shape() != [1, num_anchors, VALUES_PER_ANCHOR] {
        return Err(DetectError::UnexpectedOutput(format!(
            "palm boxes have shape {:?}",
            boxes.shape()
        )));
    }
    if scores.shape() != [1, num_anchors, 1] {
        return Err(DetectError::UnexpectedOutput(format!(
            "palm scores have shape {:?}",
            scores.shape()
        )));
    }

    let size = INPUT_SIZE as f32;
    let mut candidates = Vec::new();
    for (index, anchor) in anchors.iter().enumerate() {
        let score = sigmoid(scores[[0, index, 0]]);
        if score < min_score {
            continue;
        }

        let raw = |i: usize| boxes[[0, index, i]];
        let ax = anchor.x_center * size;
        let ay = anchor.y_center * size;
        let (x_center, y_center) = letterbox.to_image(raw(0) + ax, raw(1) + ay);
        let mut keypoints = [(0.0, 0.0); NUM_KEYPOINTS];
        for (k, kp) in keypoints.iter_mut().enumerate() {
            *kp = letterbox.to_image(raw(4 + k * 2) + ax, raw(5 + k * 2) + ay);
        }
        candidates.push(PalmDetection {
            score,
            x_center,
            y_center,
            width: raw(2) / letterbox.scale,
            height: raw(3) / letterbox.scale,
            keypoints,
        });
    }

    let confs: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    let corners: Vec<BoxCorners> = candidates.iter().map(PalmDetection::corners).collect();
    let keep = non_maximum_suppression(&confs, &corners, IOU_THRESHOLD, max_palms);
    log::trace!("{} palm candidates, {} after NMS", candidates.len(), keep.len());

    Ok(keep.into_iter().map(|i| candidates[i].clone()).collect())
}
