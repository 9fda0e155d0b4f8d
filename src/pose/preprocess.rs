use ndarray::{Array2, Array4};

use crate::camera::Frame;
use super::keypoint::{BodyPart, Person};

/// Frame を MoveNet 入力 [1, size, size, 3] (f32, 0.0-255.0) に変換する
///
/// 最近傍補間でリサイズする。
pub fn movenet_input(frame: &Frame, size: usize) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    let width = frame.width as usize;
    let height = frame.height as usize;
    if width == 0 || height == 0 {
        return tensor;
    }

    for y in 0..size {
        let src_y = y * height / size;
        for x in 0..size {
            let src_x = x * width / size;
            let offset = (src_y * width + src_x) * 3;
            for c in 0..3 {
                tensor[[0, y, x, c]] = frame.data[offset + c] as f32;
            }
        }
    }
    tensor
}

/// Person を分類器入力 [1, 51] に変換する
///
/// 部位順に (y, x, score) を17組並べる。欠落部位は0のまま。
pub fn classifier_input(person: &Person) -> Array2<f32> {
    let mut input = Array2::<f32>::zeros((1, BodyPart::COUNT * 3));
    for kp in &person.keypoints {
        let base = kp.part as usize * 3;
        input[[0, base]] = kp.y;
        input[[0, base + 1]] = kp.x;
        input[[0, base + 2]] = kp.score;
    }
    input
}
