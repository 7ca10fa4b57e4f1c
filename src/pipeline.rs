use std::sync::Arc;

use anyhow::{Context, Result};
use image::RgbImage;

use crate::classifier::{GestureClassifier, KeyPointClassifier};
use crate::cli::Args;
use crate::detector::{HandDetector, MediaPipeHands};
use crate::error::{NormalizeError, PipelineError};
use crate::landmark::{calc_landmark_list, pre_process_landmark};
use crate::mapping::{GestureLabels, NO_HAND_LABEL, UNKNOWN_LABEL, load_labels};
use crate::model::OnnxModel;
use crate::preprocess::decode_base64_image;

/// One detector/classifier pair plus the shared label table.
///
/// A pipeline is used by one request at a time; see [`crate::pool::WorkerPool`].
pub struct Pipeline {
    detector: Box<dyn HandDetector>,
    classifier: Box<dyn GestureClassifier>,
    labels: Arc<GestureLabels>,
}

impl Pipeline {
    pub fn new(
        detector: Box<dyn HandDetector>,
        classifier: Box<dyn GestureClassifier>,
        labels: Arc<GestureLabels>,
    ) -> Self {
        Self {
            detector,
            classifier,
            labels,
        }
    }

    /// Full request path: decode the payload, then [`Self::recognize`].
    pub fn process_base64(&mut self, data: &str) -> Result<String, PipelineError> {
        let image = decode_base64_image(data)?;
        log::debug!("decoded {}x{} frame", image.width(), image.height());
        self.recognize(image)
    }

    /// Recognizes the gesture of the first hand in a camera frame.
    ///
    /// The frame is mirrored first, as it comes from a front-facing camera.
    pub fn recognize(&mut self, mut image: RgbImage) -> Result<String, PipelineError> {
        image::imageops::flip_horizontal_in_place(&mut image);

        let hands = self.detector.detect(&image)?;
        log::debug!("found {} hand(s)", hands.len());
        // only the first hand is classified, even when two are visible
        let Some(hand) = hands.first() else {
            return Ok(NO_HAND_LABEL.to_string());
        };
        log::debug!(
            "classifying {:?} hand (presence {:.2})",
            hand.handedness(),
            hand.presence()
        );

        let landmark_list = calc_landmark_list(image.width(), image.height(), hand);
        let features = match pre_process_landmark(&landmark_list) {
            Ok(features) => features,
            Err(NormalizeError::Degenerate) => {
                log::warn!("hand landmarks collapsed onto a single point, skipping classification");
                return Ok(UNKNOWN_LABEL.to_string());
            }
        };

        let hand_sign_id = self.classifier.classify(&features)?;
        Ok(self.labels.label(hand_sign_id).to_string())
    }
}

/// Loads the label table once and `args.workers` independent pipelines sharing it.
pub fn load_pipelines(args: &Args) -> Result<Vec<Pipeline>> {
    let labels = Arc::new(
        load_labels(&args.labels)
            .with_context(|| format!("failed to load labels from {}", args.labels))?,
    );
    log::info!("loaded {} gesture labels", labels.len());

    let onnx = OnnxModel::new(args.cuda, args.intra_threads);
    (0..args.workers.max(1))
        .map(|worker| -> Result<Pipeline> {
            let detector = MediaPipeHands::load(
                &onnx,
                &args.palm_model,
                &args.landmark_model,
                args.hands_config(),
            )?;
            let classifier = KeyPointClassifier::load(&onnx, &args.classifier_model)?;
            if let Some(width) = classifier.input_width() {
                log::debug!("worker {}: classifier takes {} features", worker, width);
            }
            Ok(Pipeline::new(
                Box::new(detector),
                Box::new(classifier),
                Arc::clone(&labels),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifyError, DetectError};
    use crate::landmark::{HandLandmarks, NUM_LANDMARKS};
    use std::sync::Mutex;

    struct FixedHands(Vec<HandLandmarks>);

    impl HandDetector for FixedHands {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl HandDetector for FailingDetector {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
            Err(DetectError::UnexpectedOutput("boom".into()))
        }
    }

    /// Returns `index` and records the features it was called with.
    struct Recording {
        index: usize,
        seen: Arc<Mutex<Vec<Vec<f32>>>>,
    }

    impl GestureClassifier for Recording {
        fn classify(&mut self, features: &[f32]) -> Result<usize, ClassifyError> {
            self.seen.lock().unwrap().push(features.to_vec());
            Ok(self.index)
        }
    }

    fn labels() -> Arc<GestureLabels> {
        Arc::new(GestureLabels::new(vec!["Open".into(), "Close".into(), "Pointer".into()]))
    }

    fn hand(x_offset: f32) -> HandLandmarks {
        let positions = (0..NUM_LANDMARKS)
            .map(|i| [x_offset + i as f32 * 0.01, 0.8 - i as f32 * 0.02, 0.0])
            .collect();
        HandLandmarks::new(positions, 0.9, 0.7)
    }

    fn pipeline(hands: Vec<HandLandmarks>, index: usize) -> (Pipeline, Arc<Mutex<Vec<Vec<f32>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let classifier = Recording {
            index,
            seen: Arc::clone(&seen),
        };
        (
            Pipeline::new(Box::new(FixedHands(hands)), Box::new(classifier), labels()),
            seen,
        )
    }

    fn frame() -> RgbImage {
        RgbImage::new(200, 100)
    }

    #[test]
    fn no_hand() {
        let (mut pipeline, seen) = pipeline(vec![], 0);
        assert_eq!(pipeline.recognize(frame()).unwrap(), NO_HAND_LABEL);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn known_gesture() {
        let (mut pipeline, seen) = pipeline(vec![hand(0.2)], 2);
        assert_eq!(pipeline.recognize(frame()).unwrap(), "Pointer");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 42);
    }

    #[test]
    fn index_past_label_table_is_unknown() {
        let (mut pipeline, _) = pipeline(vec![hand(0.2)], 3);
        assert_eq!(pipeline.recognize(frame()).unwrap(), UNKNOWN_LABEL);
    }

    #[test]
    fn only_first_hand_is_classified() {
        let (mut pipeline, seen) = pipeline(vec![hand(0.1), hand(0.5)], 0);
        pipeline.recognize(frame()).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn degenerate_hand_is_unknown_without_classifying() {
        let flat = HandLandmarks::new(vec![[0.05, 0.1, 0.0]; NUM_LANDMARKS], 0.9, 0.2);
        let (mut pipeline, seen) = pipeline(vec![flat], 0);
        assert_eq!(pipeline.recognize(frame()).unwrap(), UNKNOWN_LABEL);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn detector_failure_is_an_error() {
        let mut pipeline = Pipeline::new(
            Box::new(FailingDetector),
            Box::new(Recording {
                index: 0,
                seen: Arc::default(),
            }),
            labels(),
        );
        assert!(matches!(
            pipeline.recognize(frame()),
            Err(PipelineError::Detect(_))
        ));
    }

    #[test]
    fn bad_payload_is_a_decode_error() {
        let (mut pipeline, _) = pipeline(vec![hand(0.2)], 0);
        assert!(matches!(
            pipeline.process_base64("%%%"),
            Err(PipelineError::Decode(_))
        ));
    }
}
