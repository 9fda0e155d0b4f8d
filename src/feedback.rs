//! リスナーへのフィードバック配送
//!
//! 配送先スレッド(UIスレッド相当)を1つに固定する。配送先スレッド上からの
//! 呼び出しは同期的にリスナーへ渡し、他スレッドからの呼び出しはFIFOキューに
//! 積んで配送先スレッドの drain/poll で引き渡す。

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// パイプラインからの通知を受け取るリスナー
///
/// すべて fire-and-forget。配送先スレッド上でのみ呼ばれる。
pub trait PipelineListener: Send + Sync {
    fn on_fps(&self, fps: u32);
    fn on_detected_info(&self, score: Option<f32>, labels: Option<&[(String, f32)]>);
    fn on_distance_update(&self, message: &str);
}

enum FeedbackEvent {
    Fps(u32),
    DetectedInfo {
        score: Option<f32>,
        labels: Option<Vec<(String, f32)>>,
    },
    Distance(String),
}

fn dispatch(listener: &dyn PipelineListener, event: FeedbackEvent) {
    match event {
        FeedbackEvent::Fps(fps) => listener.on_fps(fps),
        FeedbackEvent::DetectedInfo { score, labels } => {
            listener.on_detected_info(score, labels.as_deref())
        }
        FeedbackEvent::Distance(message) => listener.on_distance_update(&message),
    }
}

/// 配送ハンドル。任意のスレッドへクローンして渡せる
#[derive(Clone)]
pub struct FeedbackDispatcher {
    listener: Arc<dyn PipelineListener>,
    tx: Sender<FeedbackEvent>,
    consumer: ThreadId,
}

/// 消費側。`channel` を呼んだスレッドで drain/poll を回す
pub struct FeedbackQueue {
    listener: Arc<dyn PipelineListener>,
    rx: Receiver<FeedbackEvent>,
}

/// 呼び出したスレッドを配送先として登録し、送信側と消費側のペアを作る
pub fn channel(listener: Arc<dyn PipelineListener>) -> (FeedbackDispatcher, FeedbackQueue) {
    let (tx, rx) = mpsc::channel();
    let dispatcher = FeedbackDispatcher {
        listener: Arc::clone(&listener),
        tx,
        consumer: thread::current().id(),
    };
    let queue = FeedbackQueue { listener, rx };
    (dispatcher, queue)
}

impl FeedbackDispatcher {
    pub fn report_fps(&self, fps: u32) {
        self.deliver(FeedbackEvent::Fps(fps));
    }

    pub fn report_detected(&self, score: Option<f32>, labels: Option<Vec<(String, f32)>>) {
        self.deliver(FeedbackEvent::DetectedInfo { score, labels });
    }

    pub fn report_distance(&self, message: String) {
        self.deliver(FeedbackEvent::Distance(message));
    }

    fn deliver(&self, event: FeedbackEvent) {
        if thread::current().id() == self.consumer {
            dispatch(&*self.listener, event);
        } else {
            // 消費側が既に終了していた場合は破棄(ベストエフォート)
            let _ = self.tx.send(event);
        }
    }
}

impl FeedbackQueue {
    /// キュー済みイベントをすべて配送する。配送した件数を返す
    pub fn drain(&self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            dispatch(&*self.listener, event);
            delivered += 1;
        }
        delivered
    }

    /// 最大 timeout までイベントの到着を待ち、到着分をすべて配送する
    pub fn poll(&self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => {
                dispatch(&*self.listener, event);
                1 + self.drain()
            }
            Err(_) => 0,
        }
    }
}
