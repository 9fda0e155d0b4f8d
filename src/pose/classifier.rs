use anyhow::{Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::fs;
use std::path::Path;

use super::keypoint::Person;
use super::preprocess::classifier_input;

/// 検出された姿勢をラベル付きスコアへ分類する
pub trait PoseClassifier: Send {
    fn classify(&mut self, person: &Person) -> Result<Vec<(String, f32)>>;
}

/// ONNXモデルとラベルファイルによる分類器
///
/// 入力はキーポイント51要素、出力はラベルごとのスコア。
pub struct OrtPoseClassifier {
    session: Session,
    input_name: String,
    output_name: String,
    labels: Vec<String>,
}

impl OrtPoseClassifier {
    pub fn new<P: AsRef<Path>>(model_path: P, labels_path: P) -> Result<Self> {
        let labels: Vec<String> = fs::read_to_string(labels_path.as_ref())
            .context("Failed to read label file")?
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        if labels.is_empty() {
            anyhow::bail!("Label file is empty");
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load classifier model")?;

        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();

        Ok(Self {
            session,
            input_name,
            output_name,
            labels,
        })
    }
}

impl PoseClassifier for OrtPoseClassifier {
    fn classify(&mut self, person: &Person) -> Result<Vec<(String, f32)>> {
        let input = classifier_input(person);
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .context("Classification failed")?;

        let scores: ndarray::ArrayViewD<f32> = outputs[self.output_name.as_str()]
            .try_extract_array()
            .context("Failed to extract classifier output")?;

        Ok(self
            .labels
            .iter()
            .cloned()
            .zip(scores.iter().copied())
            .collect())
    }
}
