use anyhow::{Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use crate::camera::Frame;

use super::keypoint::{BodyPart, Keypoint, Person};
use super::preprocess::movenet_input;

/// マルチ人物トラッキングの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerType {
    Off,
    BoundingBox,
    Keypoint,
}

/// 差し替え可能な姿勢検出器
///
/// 返却順はモデル自身のランキング順(先頭が主要人物)。
pub trait PoseDetector: Send {
    fn estimate_poses(&mut self, frame: &Frame) -> Result<Vec<Person>>;

    /// マルチ人物トラッキングに対応しているか
    fn supports_tracking(&self) -> bool {
        false
    }

    /// トラッキング種別の変更。非対応の検出器では何もしない
    fn set_tracker(&mut self, _tracker: TrackerType) {}
}

/// MoveNet の入力サイズ
pub const MOVENET_INPUT_SIZE: usize = 192;

/// MoveNet (ONNX) による単一人物検出器
pub struct MoveNet {
    session: Session,
}

impl MoveNet {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self { session })
    }
}

impl PoseDetector for MoveNet {
    fn estimate_poses(&mut self, frame: &Frame) -> Result<Vec<Person>> {
        let input = movenet_input(frame, MOVENET_INPUT_SIZE);
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["serving_default_input_0" => input_tensor])
            .context("Inference failed")?;

        // MoveNet の出力は [1, 1, 17, 3] (y, x, score)、座標は0-1正規化
        let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
            .try_extract_array()
            .context("Failed to extract output tensor")?;

        let mut keypoints = Vec::with_capacity(BodyPart::COUNT);
        let mut score_sum = 0.0f32;
        for i in 0..BodyPart::COUNT {
            let Some(part) = BodyPart::from_index(i) else {
                continue;
            };
            let y = output[[0, 0, i, 0]] * frame.height as f32;
            let x = output[[0, 0, i, 1]] * frame.width as f32;
            let score = output[[0, 0, i, 2]];
            score_sum += score;
            keypoints.push(Keypoint::new(part, x, y, score));
        }

        let score = score_sum / BodyPart::COUNT as f32;
        Ok(vec![Person {
            id: -1,
            keypoints,
            bounding_box: None,
            score,
        }])
    }
}
