//! 被写体の位置ガイダンス計算
//!
//! 検出された主要人物とフレーム寸法から、目標位置までの距離と
//! 案内メッセージを導出する。状態は持たない。

use crate::pose::{BodyPart, Person};

/// ガイダンス対象とみなす最低信頼度
pub const MIN_CONFIDENCE: f32 = 0.3;
/// 足首合わせモードの目標ライン: フレーム下端からのマージン (px)
pub const ANKLE_TARGET_MARGIN: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceMode {
    /// 胴体中心をフレーム中央へ合わせる
    Centering,
    /// 足首を下端付近の目標ラインへ合わせる
    Adjustment,
}

/// 外部アクチュエータへ送る1文字シグナル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalCode {
    /// 足首合わせモードで被写体を捕捉
    AdjustmentLock,
    /// 中央合わせモードで被写体を捕捉
    CenteringLock,
}

impl SignalCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdjustmentLock => "1",
            Self::CenteringLock => "2",
        }
    }
}

/// 目標までの符号付き距離
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuidanceOffset {
    /// フレーム中心までの距離 (中心 - 胴体中心)
    Centering { dx: f32, dy: f32 },
    /// 目標ラインまでの垂直距離 (正 = 足首が目標より上)
    Ankle { dy: f32 },
}

#[derive(Debug, Clone)]
pub struct Guidance {
    pub mode: GuidanceMode,
    pub offset: GuidanceOffset,
    pub message: String,
    pub signal: SignalCode,
}

/// 1フレーム分のガイダンスを計算する
///
/// 主要人物のスコアが閾値以下、または必要なキーポイントが無い場合は None。
pub fn compute(
    person: &Person,
    frame_width: u32,
    frame_height: u32,
    mode: GuidanceMode,
) -> Option<Guidance> {
    if person.score <= MIN_CONFIDENCE {
        return None;
    }

    match mode {
        GuidanceMode::Adjustment => {
            // 基準足首: 左優先、無ければ右
            let ankle = person
                .get(BodyPart::LeftAnkle)
                .or_else(|| person.get(BodyPart::RightAnkle))?;
            let target_y = frame_height as f32 - ANKLE_TARGET_MARGIN;
            let dy = target_y - ankle.y;
            let message = if ankle.y < target_y {
                format!(
                    "足首が目標ラインより{}px上にあります。下へ移動してください。",
                    dy
                )
            } else {
                format!(
                    "足首が目標ラインより{}px下にあります。上へ移動してください。",
                    -dy
                )
            };
            Some(Guidance {
                mode,
                offset: GuidanceOffset::Ankle { dy },
                message,
                signal: SignalCode::AdjustmentLock,
            })
        }
        GuidanceMode::Centering => {
            let (cx, cy) = person.center()?;
            let dx = frame_width as f32 / 2.0 - cx;
            let dy = frame_height as f32 / 2.0 - cy;
            let message = format!("被写体が中央からX: {}, Y: {}ずれています。", dx, dy);
            Some(Guidance {
                mode,
                offset: GuidanceOffset::Centering { dx, dy },
                message,
                signal: SignalCode::CenteringLock,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;

    fn make_person(score: f32, keypoints: Vec<Keypoint>) -> Person {
        Person {
            id: -1,
            keypoints,
            bounding_box: None,
            score,
        }
    }

    #[test]
    fn test_signal_codes() {
        assert_eq!(SignalCode::AdjustmentLock.as_str(), "1");
        assert_eq!(SignalCode::CenteringLock.as_str(), "2");
    }

    #[test]
    fn test_adjustment_ankle_above_target() {
        // 640x480, 足首 y=400, 目標 480-60=420 → 20px上
        let person = make_person(
            0.9,
            vec![Keypoint::new(BodyPart::LeftAnkle, 100.0, 400.0, 0.8)],
        );
        let g = compute(&person, 640, 480, GuidanceMode::Adjustment).unwrap();
        assert_eq!(g.offset, GuidanceOffset::Ankle { dy: 20.0 });
        assert_eq!(g.signal, SignalCode::AdjustmentLock);
        assert!(g.message.contains("20px上"), "message: {}", g.message);
        assert!(g.message.contains("下へ移動"), "message: {}", g.message);
    }

    #[test]
    fn test_adjustment_ankle_below_target() {
        let person = make_person(
            0.9,
            vec![Keypoint::new(BodyPart::RightAnkle, 100.0, 440.0, 0.8)],
        );
        let g = compute(&person, 640, 480, GuidanceMode::Adjustment).unwrap();
        assert_eq!(g.offset, GuidanceOffset::Ankle { dy: -20.0 });
        assert!(g.message.contains("20px下"), "message: {}", g.message);
        assert!(g.message.contains("上へ移動"), "message: {}", g.message);
    }

    #[test]
    fn test_adjustment_prefers_left_ankle() {
        let person = make_person(
            0.9,
            vec![
                Keypoint::new(BodyPart::RightAnkle, 100.0, 300.0, 0.8),
                Keypoint::new(BodyPart::LeftAnkle, 100.0, 400.0, 0.8),
            ],
        );
        let g = compute(&person, 640, 480, GuidanceMode::Adjustment).unwrap();
        assert_eq!(g.offset, GuidanceOffset::Ankle { dy: 20.0 });
    }

    #[test]
    fn test_adjustment_no_ankle() {
        let person = make_person(0.9, vec![Keypoint::new(BodyPart::Nose, 100.0, 100.0, 0.9)]);
        assert!(compute(&person, 640, 480, GuidanceMode::Adjustment).is_none());
    }

    #[test]
    fn test_centering_offsets() {
        // 640x480, 中心 (300, 200) → 目標 (320, 240), 距離 (20, 40)
        let person = make_person(0.9, vec![Keypoint::new(BodyPart::Nose, 300.0, 200.0, 0.9)]);
        let g = compute(&person, 640, 480, GuidanceMode::Centering).unwrap();
        assert_eq!(g.offset, GuidanceOffset::Centering { dx: 20.0, dy: 40.0 });
        assert_eq!(g.signal, SignalCode::CenteringLock);
        assert!(g.message.contains("X: 20"), "message: {}", g.message);
        assert!(g.message.contains("Y: 40"), "message: {}", g.message);
    }

    #[test]
    fn test_centering_signed_distances() {
        // 中心より右下の被写体は負の距離
        let person = make_person(0.9, vec![Keypoint::new(BodyPart::Nose, 340.0, 250.0, 0.9)]);
        let g = compute(&person, 640, 480, GuidanceMode::Centering).unwrap();
        assert_eq!(
            g.offset,
            GuidanceOffset::Centering {
                dx: -20.0,
                dy: -10.0
            }
        );
    }

    #[test]
    fn test_centering_no_center_parts() {
        let person = make_person(
            0.9,
            vec![Keypoint::new(BodyPart::LeftWrist, 100.0, 100.0, 0.9)],
        );
        assert!(compute(&person, 640, 480, GuidanceMode::Centering).is_none());
    }

    #[test]
    fn test_low_score_suppresses_guidance() {
        let keypoints = vec![
            Keypoint::new(BodyPart::Nose, 300.0, 200.0, 0.9),
            Keypoint::new(BodyPart::LeftAnkle, 100.0, 400.0, 0.9),
        ];
        // 閾値ちょうどでも抑止される
        let person = make_person(MIN_CONFIDENCE, keypoints.clone());
        assert!(compute(&person, 640, 480, GuidanceMode::Centering).is_none());
        assert!(compute(&person, 640, 480, GuidanceMode::Adjustment).is_none());

        let person = make_person(0.31, keypoints);
        assert!(compute(&person, 640, 480, GuidanceMode::Centering).is_some());
    }
}
