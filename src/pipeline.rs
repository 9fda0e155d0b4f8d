//! フレーム処理パイプラインの統括
//!
//! キャプチャスレッドからのフレームを直列に処理する:
//! 縦向き回転 → 推論(排他) → FPS報告 → ガイダンス計算 → 配送 → 描画。
//! 開始/停止のライフサイクルと検出器・分類器の差し替え窓口もここが持つ。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use log::error;

use crate::camera::{Frame, FrameSource};
use crate::feedback::FeedbackDispatcher;
use crate::fps::FpsCounter;
use crate::guidance::{self, Guidance, GuidanceMode};
use crate::pose::classifier::PoseClassifier;
use crate::pose::detector::{PoseDetector, TrackerType};
use crate::pose::engine::PoseEngine;
use crate::pose::Person;
use crate::signal::SignalSender;

/// 検出結果の描画先(外部コラボレータ)
pub trait Visualizer: Send {
    fn render(&mut self, frame: &Frame, persons: &[Person], tracking: bool) -> Result<()>;
}

/// キャプチャスレッドと共有する状態
struct Shared {
    engine: PoseEngine,
    fps: FpsCounter,
    dispatcher: FeedbackDispatcher,
    signals: SignalSender,
    mode: Mutex<GuidanceMode>,
    visualizer: Mutex<Option<Box<dyn Visualizer>>>,
    tracking: AtomicBool,
    /// 推論が致命的エラーを返した後は以降のフレームを処理しない
    fatal: AtomicBool,
}

pub struct Pipeline {
    shared: Arc<Shared>,
    source: Option<Box<dyn FrameSource>>,
    fps_timer: Option<(Sender<()>, JoinHandle<()>)>,
    running: bool,
}

impl Pipeline {
    pub fn new(dispatcher: FeedbackDispatcher, signals: SignalSender, mode: GuidanceMode) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine: PoseEngine::new(),
                fps: FpsCounter::new(),
                dispatcher,
                signals,
                mode: Mutex::new(mode),
                visualizer: Mutex::new(None),
                tracking: AtomicBool::new(false),
                fatal: AtomicBool::new(false),
            }),
            source: None,
            fps_timer: None,
            running: false,
        }
    }

    /// フレーム供給元を接続する。resume のたびに必要
    pub fn attach_source(&mut self, source: Box<dyn FrameSource>) {
        self.source = Some(source);
    }

    pub fn set_visualizer(&self, visualizer: Box<dyn Visualizer>) {
        *self.shared.visualizer.lock().unwrap() = Some(visualizer);
    }

    /// 次のフレームから有効になる
    pub fn set_detector(&self, detector: Box<dyn PoseDetector>) {
        self.shared.engine.set_detector(detector);
    }

    pub fn set_classifier(&self, classifier: Option<Box<dyn PoseClassifier>>) {
        self.shared.engine.set_classifier(classifier);
    }

    /// トラッキング対応の検出器が入っている場合のみ有効化される
    pub fn set_tracker(&self, tracker: TrackerType) {
        let enabled = tracker != TrackerType::Off && self.shared.engine.set_tracker(tracker);
        self.shared.tracking.store(enabled, Ordering::Release);
    }

    pub fn set_mode(&self, mode: GuidanceMode) {
        *self.shared.mode.lock().unwrap() = mode;
    }

    pub fn current_fps(&self) -> u32 {
        self.shared.fps.current()
    }

    /// キャプチャとFPSタイマーを開始する
    pub fn resume(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        let source = self.source.as_mut().context("No frame source attached")?;
        self.shared.fatal.store(false, Ordering::Release);

        // 1秒ごとにFPS区間を確定する
        let (timer_tx, timer_rx) = mpsc::channel::<()>();
        let shared = Arc::clone(&self.shared);
        let timer = thread::spawn(move || loop {
            match timer_rx.recv_timeout(Duration::from_secs(1)) {
                Err(RecvTimeoutError::Timeout) => shared.fps.rollover(),
                _ => break,
            }
        });
        self.fps_timer = Some((timer_tx, timer));

        let shared = Arc::clone(&self.shared);
        source.start(Box::new(move |frame| {
            if shared.fatal.load(Ordering::Acquire) {
                return;
            }
            if let Err(e) = process_frame(&shared, frame) {
                error!("pipeline: フレーム処理に失敗、以降のフレームを停止します: {:#}", e);
                shared.fatal.store(true, Ordering::Release);
            }
        }))?;

        self.running = true;
        Ok(())
    }

    /// 停止して資源を解放する。複数回呼んでも安全
    pub fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
        self.shared.engine.clear();
        if let Some((timer_tx, timer)) = self.fps_timer.take() {
            drop(timer_tx);
            let _ = timer.join();
        }
        self.shared.fps.reset();
        self.running = false;
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.close();
    }
}

/// 1フレーム分の処理。キャプチャスレッド上で直列に実行される
fn process_frame(shared: &Shared, frame: Frame) -> Result<()> {
    let frame = frame.rotate90();

    // 推論・分類・FPS加算を同一クリティカルセクションで行う
    let (persons, classification, interval_start) = {
        let mut slots = shared.engine.lock();
        let persons = slots.estimate(&frame)?;
        let classification = match persons.first() {
            Some(primary) => slots.classify(primary)?,
            None => None,
        };
        let interval_start = shared.fps.tick();
        (persons, classification, interval_start)
    };

    if interval_start {
        shared.dispatcher.report_fps(shared.fps.current());
    }

    if let Some(primary) = persons.first() {
        shared
            .dispatcher
            .report_detected(Some(primary.score), classification);

        let mode = *shared.mode.lock().unwrap();
        if let Some(Guidance {
            message, signal, ..
        }) = guidance::compute(primary, frame.width, frame.height, mode)
        {
            shared.dispatcher.report_distance(message);
            shared.signals.send(signal);
        }
    }

    if let Some(visualizer) = shared.visualizer.lock().unwrap().as_mut() {
        let tracking = shared.tracking.load(Ordering::Acquire);
        visualizer.render(&frame, &persons, tracking)?;
    }

    Ok(())
}
