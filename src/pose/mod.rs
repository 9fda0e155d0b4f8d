pub mod classifier;
pub mod detector;
pub mod engine;
pub mod keypoint;
pub mod preprocess;

pub use classifier::{OrtPoseClassifier, PoseClassifier};
pub use detector::{MoveNet, PoseDetector, TrackerType};
pub use engine::PoseEngine;
pub use keypoint::{BodyPart, Keypoint, Person, Rect};
