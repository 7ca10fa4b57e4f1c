//! Hand landmark detection.
//!
//! [`MediaPipeHands`] runs the two MediaPipe Hands networks exported to ONNX: a palm detector that
//! finds hands in the whole frame, and a landmark network that predicts 21 keypoints inside a
//! rotated crop around each palm. Every frame is processed independently (static image mode).

pub mod hand_landmark;
pub mod palm;

use anyhow::Result;
use image::RgbImage;
use ort::session::Session;

use crate::error::DetectError;
use crate::landmark::HandLandmarks;
use crate::model::{OnnxModel, run_f32};
use crate::preprocess::{PreprocessConfig, Processor, crop_rotated};

/// Finds hands in a frame.
pub trait HandDetector: Send {
    /// Returns the landmarks of every hand found in `image`, most confident palm first.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandsConfig {
    pub max_num_hands: usize,
    /// Minimum palm detector score.
    pub min_detection_confidence: f32,
    /// Minimum hand presence score reported by the landmark network.
    pub min_tracking_confidence: f32,
}

impl Default for HandsConfig {
    fn default() -> Self {
        Self {
            max_num_hands: 2,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.5,
        }
    }
}

pub struct MediaPipeHands {
    palm_model: Session,
    landmark_model: Session,
    processor: Processor,
    config: HandsConfig,
}

impl MediaPipeHands {
    pub fn new(palm_model: Session, landmark_model: Session, config: HandsConfig) -> Self {
        Self {
            palm_model,
            landmark_model,
            processor: Processor::new(PreprocessConfig::square(palm::INPUT_SIZE)),
            config,
        }
    }

    pub fn load(
        onnx: &OnnxModel,
        palm_path: &str,
        landmark_path: &str,
        config: HandsConfig,
    ) -> Result<Self> {
        let palm_model = onnx.load_model(palm_path)?;
        let landmark_model = onnx.load_model(landmark_path)?;
        Ok(Self::new(palm_model, landmark_model, config))
    }
}

impl HandDetector for MediaPipeHands {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
        // 1. Find palms in the whole frame
        let (xs, letterbox) = self.processor.letterbox(image)?;
        let ys = run_f32(&self.palm_model, xs.into_dyn())?;
        let [boxes, scores, ..] = ys.as_slice() else {
            return Err(DetectError::UnexpectedOutput(format!(
                "palm network returned {} outputs",
                ys.len()
            )));
        };
        let palms = palm::decode(
            boxes,
            scores,
            &letterbox,
            self.config.min_detection_confidence,
            self.config.max_num_hands,
        )?;

        // 2. Predict landmarks inside a crop around each palm
        let mut hands = Vec::with_capacity(palms.len());
        for palm in &palms {
            let roi = palm.hand_roi();
            let crop = crop_rotated(image, &roi, hand_landmark::INPUT_SIZE);
            let outputs = run_f32(&self.landmark_model, crop.into_dyn())?;
            let hand = hand_landmark::extract(&outputs, &roi, image.width(), image.height())?;
            if hand.presence() < self.config.min_tracking_confidence {
                log::trace!("dropping hand with presence {:.2}", hand.presence());
                continue;
            }
            hands.push(hand);
        }
        Ok(hands)
    }
}
