use crate::pose::BodyPart;

/// 骨格の接続定義 (開始部位, 終了部位)
pub const SKELETON_CONNECTIONS: [(BodyPart, BodyPart); 16] = [
    // 顔
    (BodyPart::LeftEar, BodyPart::LeftEye),
    (BodyPart::LeftEye, BodyPart::Nose),
    (BodyPart::Nose, BodyPart::RightEye),
    (BodyPart::RightEye, BodyPart::RightEar),
    // 上半身
    (BodyPart::LeftShoulder, BodyPart::RightShoulder),
    (BodyPart::LeftShoulder, BodyPart::LeftElbow),
    (BodyPart::LeftElbow, BodyPart::LeftWrist),
    (BodyPart::RightShoulder, BodyPart::RightElbow),
    (BodyPart::RightElbow, BodyPart::RightWrist),
    // 胴体
    (BodyPart::LeftShoulder, BodyPart::LeftHip),
    (BodyPart::RightShoulder, BodyPart::RightHip),
    (BodyPart::LeftHip, BodyPart::RightHip),
    // 下半身
    (BodyPart::LeftHip, BodyPart::LeftKnee),
    (BodyPart::LeftKnee, BodyPart::LeftAnkle),
    (BodyPart::RightHip, BodyPart::RightKnee),
    (BodyPart::RightKnee, BodyPart::RightAnkle),
];

/// キーポイントの色 (RGB)
pub const KEYPOINT_COLOR: u32 = 0x00FF00; // 緑

/// 骨格線の色 (RGB)
pub const SKELETON_COLOR: u32 = 0xFFFF00; // 黄色

/// トラッキング有効時に人物IDごとへ割り当てる色 (RGB)
pub const PERSON_COLORS: [u32; 6] = [
    0xFF0000, // 赤
    0x00FF00, // 緑
    0x0000FF, // 青
    0xFFFF00, // 黄
    0xFF00FF, // マゼンタ
    0x00FFFF, // シアン
];
