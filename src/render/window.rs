//! キーポイントオーバーレイ表示
//!
//! minifb のウィンドウはスレッド間で動かせないため、専用の描画スレッドを
//! 持ち、キャプチャスレッド側のハンドルからフレームをチャネルで渡す。
//! 描画が追いつかない間のフレームは捨てる。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use minifb::{Key, Window, WindowOptions};

use crate::camera::Frame;
use crate::guidance::MIN_CONFIDENCE;
use crate::pipeline::Visualizer;
use crate::pose::Person;

use super::skeleton::{KEYPOINT_COLOR, PERSON_COLORS, SKELETON_COLOR, SKELETON_CONNECTIONS};

struct RenderJob {
    frame: Frame,
    persons: Vec<Person>,
    tracking: bool,
}

/// 描画スレッドへのハンドル。Visualizerとしてパイプラインに渡す
pub struct OverlayWindow {
    tx: Option<SyncSender<RenderJob>>,
    open: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl OverlayWindow {
    /// ウィンドウを作成する。作成に失敗した場合はエラーを返す
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<RenderJob>(1);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let open = Arc::new(AtomicBool::new(true));
        let open_ref = Arc::clone(&open);
        let title = title.to_string();

        let handle = thread::spawn(move || {
            let mut window = match Window::new(
                &title,
                width,
                height,
                WindowOptions {
                    resize: false,
                    ..WindowOptions::default()
                },
            ) {
                Ok(w) => {
                    let _ = ready_tx.send(Ok(()));
                    w
                }
                Err(e) => {
                    open_ref.store(false, Ordering::Release);
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
            };

            let mut canvas = Canvas::new(width, height);
            loop {
                if !window.is_open() || window.is_key_down(Key::Escape) {
                    open_ref.store(false, Ordering::Release);
                    break;
                }
                match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(job) => {
                        canvas.draw_frame(&job.frame);
                        for person in job.persons.iter().filter(|p| p.score > MIN_CONFIDENCE) {
                            let color = if job.tracking {
                                PERSON_COLORS
                                    [person.id.unsigned_abs() as usize % PERSON_COLORS.len()]
                            } else {
                                KEYPOINT_COLOR
                            };
                            canvas.draw_person(person, color);
                        }
                        if window
                            .update_with_buffer(&canvas.buffer, width, height)
                            .is_err()
                        {
                            open_ref.store(false, Ordering::Release);
                            break;
                        }
                    }
                    // フレームが無くてもイベント処理のため更新し続ける
                    Err(RecvTimeoutError::Timeout) => window.update(),
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx: Some(tx),
                open,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => anyhow::bail!("Render thread exited before creating the window"),
        }
    }

    /// ウィンドウが開いている間 true を保持するフラグ
    pub fn open_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.open)
    }
}

impl Visualizer for OverlayWindow {
    fn render(&mut self, frame: &Frame, persons: &[Person], tracking: bool) -> Result<()> {
        let Some(tx) = &self.tx else { return Ok(()) };
        let job = RenderJob {
            frame: frame.clone(),
            persons: persons.to_vec(),
            tracking,
        };
        match tx.try_send(job) {
            // 描画スレッドが追いついていない: このフレームは捨てる
            Ok(()) | Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => Ok(()),
        }
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// ピクセルバッファへの描画処理
struct Canvas {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: vec![0u32; width * height],
            width,
            height,
        }
    }

    /// RGB8のFrameをバッファへコピーする。サイズ差はクロップで吸収
    fn draw_frame(&mut self, frame: &Frame) {
        let frame_width = frame.width as usize;
        let frame_height = frame.height as usize;
        for y in 0..self.height.min(frame_height) {
            for x in 0..self.width.min(frame_width) {
                let src = (y * frame_width + x) * 3;
                let r = frame.data[src] as u32;
                let g = frame.data[src + 1] as u32;
                let b = frame.data[src + 2] as u32;
                self.buffer[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }
    }

    /// 骨格線とキーポイントを描画する
    fn draw_person(&mut self, person: &Person, keypoint_color: u32) {
        for (start_part, end_part) in SKELETON_CONNECTIONS.iter() {
            if let (Some(start), Some(end)) = (person.get(*start_part), person.get(*end_part)) {
                self.draw_line(
                    start.x as i32,
                    start.y as i32,
                    end.x as i32,
                    end.y as i32,
                    SKELETON_COLOR,
                );
            }
        }
        for kp in person.keypoints.iter() {
            self.draw_circle(kp.x as i32, kp.y as i32, 4, keypoint_color);
        }
    }

    /// Bresenhamのアルゴリズムで線を描画
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 円を描画(塗りつぶし)
    fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// ピクセルをセット(境界チェック付き)
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }
}
