use anyhow::{Context, Result};
use log::warn;
use opencv::{
    core::{AlgorithmHint, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoCaptureTrait},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::frame::Frame;

/// フレーム供給側の境界
///
/// `start` で専用スレッドを起動し、到着したフレームごとに `sink` を呼び出す。
/// フレームが取得できなかったティックはスキップされる(エラーではない)。
pub trait FrameSource: Send {
    fn resolution(&self) -> (u32, u32);
    fn start(&mut self, sink: Box<dyn FnMut(Frame) + Send>) -> Result<()>;
    /// キャプチャスレッドを停止して合流する。時間内に停止しない場合はログを出して続行
    fn stop(&mut self);
}

/// キャプチャスレッド合流の最大待ち時間
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// OpenCVカメラによるFrameSource実装
///
/// BGR→RGB変換はここで行い、パイプラインにはRGB8のFrameだけを渡す。
pub struct CameraSource {
    capture: Option<VideoCapture>,
    width: u32,
    height: u32,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CameraSource {
    /// カメラを開く。デバイスが開けない場合は呼び出し元へエラーを返す
    pub fn open(
        index: i32,
        width: Option<u32>,
        height: Option<u32>,
        fps: Option<u32>,
    ) -> Result<Self> {
        let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)
            .context("Failed to open camera")?;

        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", index);
        }

        if let Some(w) = width {
            capture.set(videoio::CAP_PROP_FRAME_WIDTH, w as f64)?;
        }
        if let Some(h) = height {
            capture.set(videoio::CAP_PROP_FRAME_HEIGHT, h as f64)?;
        }
        if let Some(f) = fps {
            capture.set(videoio::CAP_PROP_FPS, f as f64)?;
        }
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        Ok(Self {
            capture: Some(capture),
            width: actual_width,
            height: actual_height,
            stop_flag: Arc::new(AtomicBool::new(false)),
            handle: None,
        })
    }
}

impl FrameSource for CameraSource {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn start(&mut self, mut sink: Box<dyn FnMut(Frame) + Send>) -> Result<()> {
        let mut capture = self.capture.take().context("Capture already started")?;
        self.stop_flag.store(false, Ordering::Release);
        let stop = Arc::clone(&self.stop_flag);

        let handle = thread::spawn(move || {
            let mut bgr = Mat::default();
            while !stop.load(Ordering::Acquire) {
                match capture.read(&mut bgr) {
                    Ok(true) if !bgr.empty() => {}
                    // フレームバッファなし: このティックはスキップ
                    _ => continue,
                }
                match to_rgb_frame(&bgr) {
                    Ok(frame) => sink(frame),
                    Err(e) => warn!("camera: フレーム変換に失敗: {}", e),
                }
            }
        });
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!(
                    "camera: キャプチャスレッドが{}秒以内に停止しませんでした",
                    JOIN_TIMEOUT.as_secs()
                );
            }
        }
    }
}

/// BGR Mat を RGB8 の Frame へ変換する
fn to_rgb_frame(bgr: &Mat) -> Result<Frame> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        bgr,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb.data_bytes()?.to_vec();
    Ok(Frame::new(width, height, data))
}

/// 使用可能なキャプチャデバイスを探す
///
/// 開けて1フレーム読めた最初のインデックスを返す。
pub fn probe_device(max_index: i32) -> Result<i32> {
    for index in 0..max_index {
        let mut cap = match VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32) {
            Ok(c) => c,
            Err(_) => continue,
        };
        if !cap.is_opened().unwrap_or(false) {
            continue;
        }
        let mut frame = Mat::default();
        if matches!(cap.read(&mut frame), Ok(true)) && !frame.empty() {
            return Ok(index);
        }
    }
    anyhow::bail!("No usable camera found (probed 0..{})", max_index)
}
