//! フレームレート計測
//!
//! 1秒区間のフレーム数を数え、区間終了時に確定値へ切り替える。
//! キャプチャスレッドとタイマースレッドの2箇所からしか触らない。

use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct FpsCounter {
    /// 現区間で処理済みのフレーム数
    processed: AtomicU32,
    /// 直前区間の確定値
    reported: AtomicU32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 処理済みフレームを1つ数える。区間の最初のフレームなら true
    pub fn tick(&self) -> bool {
        self.processed.fetch_add(1, Ordering::AcqRel) == 0
    }

    /// 1秒タイマーから呼ぶ。現区間のカウントを確定値にして0へ戻す
    pub fn rollover(&self) {
        let count = self.processed.swap(0, Ordering::AcqRel);
        self.reported.store(count, Ordering::Release);
    }

    /// 直前区間のFPS
    pub fn current(&self) -> u32 {
        self.reported.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.processed.store(0, Ordering::Release);
        self.reported.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_reports_interval_start_once() {
        let counter = FpsCounter::new();
        assert!(counter.tick());
        assert!(!counter.tick());
        assert!(!counter.tick());
    }

    #[test]
    fn test_rollover_publishes_previous_window() {
        let counter = FpsCounter::new();
        for _ in 0..30 {
            counter.tick();
        }
        assert_eq!(counter.current(), 0);
        counter.rollover();
        assert_eq!(counter.current(), 30);
        // 新区間の最初のフレームで再び true
        assert!(counter.tick());
    }

    #[test]
    fn test_empty_window_reports_zero() {
        let counter = FpsCounter::new();
        counter.tick();
        counter.rollover();
        assert_eq!(counter.current(), 1);
        // フレームが来なかった区間は0
        counter.rollover();
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let counter = FpsCounter::new();
        counter.tick();
        counter.rollover();
        counter.tick();
        counter.reset();
        assert_eq!(counter.current(), 0);
        assert!(counter.tick());
    }
}
