/// MoveNet系モデルが扱う17個の身体部位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyPart {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl BodyPart {
    pub const COUNT: usize = 17;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }
}

/// 単一キーポイント (ピクセル座標)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub part: BodyPart,
    pub x: f32,
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: BodyPart, x: f32, y: f32, score: f32) -> Self {
        Self { part, x, y, score }
    }
}

/// バウンディングボックス (ピクセル座標)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// 1人分の検出結果
///
/// 推論ごとに生成され、以後変更されない。キーポイント列は部分的でもよい。
#[derive(Debug, Clone)]
pub struct Person {
    pub id: i32,
    pub keypoints: Vec<Keypoint>,
    /// マルチ人物モデルのみ返す
    pub bounding_box: Option<Rect>,
    pub score: f32,
}

/// 全身判定に使う脚部キーポイントの最低スコア
const LEG_SCORE_MIN: f32 = 0.2;
/// 膝-足首間の最小距離 (px)。これ未満は縮退姿勢として棄却
const LEG_SPAN_MIN: f32 = 50.0;

impl Person {
    /// 部位でキーポイントを探す
    pub fn get(&self, part: BodyPart) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.part == part)
    }

    /// 胴体中心: 鼻・左腰・右腰のうち存在するものの平均座標
    pub fn center(&self) -> Option<(f32, f32)> {
        let center_parts = [BodyPart::Nose, BodyPart::LeftHip, BodyPart::RightHip];
        let points: Vec<&Keypoint> = self
            .keypoints
            .iter()
            .filter(|kp| center_parts.contains(&kp.part))
            .collect();
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f32;
        let x = points.iter().map(|kp| kp.x).sum::<f32>() / n;
        let y = points.iter().map(|kp| kp.y).sum::<f32>() / n;
        Some((x, y))
    }

    /// 両脚が膝から足首まで写っているか
    ///
    /// 脚部4点が存在しスコアが閾値を超え、膝-足首間距離が十分で、
    /// 足首が膝より下(画像座標で大きいy)にあること。
    pub fn is_full_body_detected(&self) -> bool {
        let legs = [
            (BodyPart::LeftKnee, BodyPart::LeftAnkle),
            (BodyPart::RightKnee, BodyPart::RightAnkle),
        ];
        for (knee_part, ankle_part) in legs {
            let (knee, ankle) = match (self.get(knee_part), self.get(ankle_part)) {
                (Some(k), Some(a)) => (k, a),
                _ => return false,
            };
            if knee.score <= LEG_SCORE_MIN || ankle.score <= LEG_SCORE_MIN {
                return false;
            }
            let span = ((knee.x - ankle.x).powi(2) + (knee.y - ankle.y).powi(2)).sqrt();
            if span < LEG_SPAN_MIN {
                return false;
            }
            if ankle.y < knee.y {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_person(keypoints: Vec<Keypoint>) -> Person {
        Person {
            id: -1,
            keypoints,
            bounding_box: None,
            score: 0.9,
        }
    }

    fn standing_legs() -> Vec<Keypoint> {
        vec![
            Keypoint::new(BodyPart::LeftKnee, 200.0, 300.0, 0.8),
            Keypoint::new(BodyPart::RightKnee, 280.0, 300.0, 0.8),
            Keypoint::new(BodyPart::LeftAnkle, 200.0, 400.0, 0.8),
            Keypoint::new(BodyPart::RightAnkle, 280.0, 400.0, 0.8),
        ]
    }

    #[test]
    fn test_body_part_from_index() {
        assert_eq!(BodyPart::from_index(0), Some(BodyPart::Nose));
        assert_eq!(BodyPart::from_index(16), Some(BodyPart::RightAnkle));
        assert_eq!(BodyPart::from_index(17), None);
    }

    #[test]
    fn test_get_finds_part() {
        let person = make_person(vec![Keypoint::new(BodyPart::Nose, 10.0, 20.0, 0.5)]);
        let nose = person.get(BodyPart::Nose).unwrap();
        assert_eq!(nose.x, 10.0);
        assert!(person.get(BodyPart::LeftHip).is_none());
    }

    #[test]
    fn test_center_averages_three_parts() {
        let person = make_person(vec![
            Keypoint::new(BodyPart::Nose, 300.0, 100.0, 0.9),
            Keypoint::new(BodyPart::LeftHip, 270.0, 250.0, 0.9),
            Keypoint::new(BodyPart::RightHip, 330.0, 250.0, 0.9),
        ]);
        let (x, y) = person.center().unwrap();
        assert!((x - 300.0).abs() < 0.001);
        assert!((y - 200.0).abs() < 0.001);
    }

    #[test]
    fn test_center_uses_present_subset() {
        // 鼻だけでも中心は計算される
        let person = make_person(vec![Keypoint::new(BodyPart::Nose, 300.0, 200.0, 0.9)]);
        assert_eq!(person.center(), Some((300.0, 200.0)));
    }

    #[test]
    fn test_center_ignores_other_parts() {
        let person = make_person(vec![
            Keypoint::new(BodyPart::Nose, 100.0, 100.0, 0.9),
            Keypoint::new(BodyPart::LeftShoulder, 900.0, 900.0, 0.9),
        ]);
        assert_eq!(person.center(), Some((100.0, 100.0)));
    }

    #[test]
    fn test_center_none_when_absent() {
        let person = make_person(vec![Keypoint::new(BodyPart::LeftWrist, 50.0, 50.0, 0.9)]);
        assert!(person.center().is_none());
    }

    #[test]
    fn test_full_body_detected() {
        let person = make_person(standing_legs());
        assert!(person.is_full_body_detected());
    }

    #[test]
    fn test_full_body_missing_keypoint() {
        let mut keypoints = standing_legs();
        keypoints.retain(|kp| kp.part != BodyPart::RightAnkle);
        assert!(!make_person(keypoints).is_full_body_detected());
    }

    #[test]
    fn test_full_body_low_score() {
        let mut keypoints = standing_legs();
        keypoints[0].score = 0.2; // 閾値ちょうどは不可
        assert!(!make_person(keypoints).is_full_body_detected());
    }

    #[test]
    fn test_full_body_short_leg_span() {
        let mut keypoints = standing_legs();
        // 左足首を膝のすぐ下へ: 距離 49 < 50
        keypoints[2].y = 349.0;
        assert!(!make_person(keypoints).is_full_body_detected());
    }

    #[test]
    fn test_full_body_ankle_above_knee() {
        let mut keypoints = standing_legs();
        keypoints[2].y = 180.0; // 左足首が膝より上
        keypoints[2].x = 260.0; // 距離条件は満たしたまま
        assert!(!make_person(keypoints).is_full_body_detected());
    }

    #[test]
    fn test_full_body_exact_span_passes() {
        let mut keypoints = standing_legs();
        keypoints[2].y = 350.0; // ちょうど50pxは許容
        assert!(make_person(keypoints).is_full_body_detected());
    }
}
