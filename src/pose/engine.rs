//! 検出器・分類器の排他管理
//!
//! estimate / classify と差し替えを単一ロックで直列化する。解放済みの
//! リソースが呼ばれることも、推論中に差し替わることもない。

use anyhow::Result;
use std::sync::{Mutex, MutexGuard};

use crate::camera::Frame;

use super::classifier::PoseClassifier;
use super::detector::{PoseDetector, TrackerType};
use super::keypoint::Person;

/// ロック下で操作するリソーススロット
#[derive(Default)]
pub struct EngineSlots {
    detector: Option<Box<dyn PoseDetector>>,
    classifier: Option<Box<dyn PoseClassifier>>,
}

impl EngineSlots {
    /// 姿勢推定。検出器が未設定なら空を返す(エラーにしない)
    pub fn estimate(&mut self, frame: &Frame) -> Result<Vec<Person>> {
        match self.detector.as_mut() {
            Some(detector) => detector.estimate_poses(frame),
            None => Ok(Vec::new()),
        }
    }

    /// 主要人物の分類。分類器が未設定なら None
    pub fn classify(&mut self, person: &Person) -> Result<Option<Vec<(String, f32)>>> {
        match self.classifier.as_mut() {
            Some(classifier) => Ok(Some(classifier.classify(person)?)),
            None => Ok(None),
        }
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }
}

pub struct PoseEngine {
    slots: Mutex<EngineSlots>,
}

impl Default for PoseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseEngine {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(EngineSlots::default()),
        }
    }

    /// 旧検出器を解放してから新しい検出器を設定する
    pub fn set_detector(&self, detector: Box<dyn PoseDetector>) {
        let mut slots = self.slots.lock().unwrap();
        slots.detector.take();
        slots.detector = Some(detector);
    }

    /// 旧分類器を解放してから差し替える。None で分類を無効化
    pub fn set_classifier(&self, classifier: Option<Box<dyn PoseClassifier>>) {
        let mut slots = self.slots.lock().unwrap();
        slots.classifier.take();
        slots.classifier = classifier;
    }

    /// トラッキング対応の検出器にのみ反映される。反映したら true
    pub fn set_tracker(&self, tracker: TrackerType) -> bool {
        let mut slots = self.slots.lock().unwrap();
        match slots.detector.as_mut() {
            Some(detector) if detector.supports_tracking() => {
                detector.set_tracker(tracker);
                true
            }
            _ => false,
        }
    }

    /// 検出器と分類器を両方解放する
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap();
        slots.detector.take();
        slots.classifier.take();
    }

    /// 推論用のクリティカルセクションに入る
    ///
    /// ガードを保持している間、差し替えはブロックされる。
    pub fn lock(&self) -> MutexGuard<'_, EngineSlots> {
        self.slots.lock().unwrap()
    }
}
