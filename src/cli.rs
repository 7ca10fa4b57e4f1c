use std::time::Duration;

use clap::Parser;

use crate::detector::HandsConfig;


#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Hand gesture recognition server", long_about = None)]
pub struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, env = "GESTURE_HOST", default_value_t = String::from("0.0.0.0"))]
    pub host: String,

    #[arg(long, env = "GESTURE_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Palm detection ONNX model path
    #[arg(long, env = "GESTURE_PALM_MODEL", default_value_t = String::from("model/palm_detection.onnx"))]
    pub palm_model: String,

    /// Hand landmark ONNX model path
    #[arg(long, env = "GESTURE_LANDMARK_MODEL", default_value_t = String::from("model/hand_landmark.onnx"))]
    pub landmark_model: String,

    /// Keypoint classifier ONNX model path
    #[arg(long, env = "GESTURE_CLASSIFIER_MODEL", default_value_t = String::from("model/keypoint_classifier.onnx"))]
    pub classifier_model: String,

    /// Gesture label CSV, one label per row
    #[arg(long, env = "GESTURE_LABELS", default_value_t = String::from("model/keypoint_classifier_label.csv"))]
    pub labels: String,

    #[arg(long, env = "GESTURE_MAX_HANDS", default_value_t = 2)]
    pub max_hands: usize,

    #[arg(long, env = "GESTURE_MIN_DETECTION_CONFIDENCE", default_value_t = 0.7)]
    pub min_detection_confidence: f32,

    #[arg(long, env = "GESTURE_MIN_TRACKING_CONFIDENCE", default_value_t = 0.5)]
    pub min_tracking_confidence: f32,

    /// Number of independently loaded pipelines serving requests in parallel
    #[arg(long, env = "GESTURE_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Intra-op threads per ONNX Runtime session
    #[arg(long, env = "GESTURE_INTRA_THREADS", default_value_t = 1)]
    pub intra_threads: usize,

    #[arg(long, env = "GESTURE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Run inference with the CUDA execution provider
    #[arg(long, env = "GESTURE_CUDA", default_value_t = false)]
    pub cuda: bool,
}

impl Args {
    pub fn hands_config(&self) -> HandsConfig {
        HandsConfig {
            max_num_hands: self.max_hands,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
