//! 外部アクチュエータへのシグナル送信
//!
//! 改行区切りの1行テキストを固定アドレスへ送る。接続は初回送信時に確立して
//! 使い回し、失敗したら破棄して次回の送信で張り直す。送信はワーカースレッド
//! 1本と有限キューで行い、失敗がパイプラインへ伝播することはない。

use std::io::Write;
use std::net::TcpStream;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::guidance::SignalCode;

/// 送信待ちシグナルの上限。超過分は破棄する
const QUEUE_LIMIT: usize = 32;

pub struct SignalSender {
    tx: Option<SyncSender<SignalCode>>,
    worker: Option<JoinHandle<()>>,
}

impl SignalSender {
    /// ワーカーを起動する。接続はまだ開かない
    pub fn new(addr: &str) -> Self {
        let (tx, rx) = mpsc::sync_channel::<SignalCode>(QUEUE_LIMIT);
        let target = addr.to_string();

        let worker = thread::spawn(move || {
            let mut conn: Option<TcpStream> = None;
            while let Ok(code) = rx.recv() {
                if conn.is_none() {
                    match TcpStream::connect(&target) {
                        Ok(stream) => conn = Some(stream),
                        Err(e) => {
                            warn!("signal: {}への接続に失敗: {}", target, e);
                            continue;
                        }
                    }
                }
                if let Some(stream) = conn.as_mut() {
                    let line = format!("{}\n", code.as_str());
                    let sent = stream
                        .write_all(line.as_bytes())
                        .and_then(|_| stream.flush());
                    if let Err(e) = sent {
                        warn!("signal: 送信に失敗、接続を破棄: {}", e);
                        conn = None;
                    }
                }
            }
        });

        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// シグナルをキューへ積む。満杯なら破棄してパイプラインは止めない
    pub fn send(&self, code: SignalCode) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send(code) {
            Ok(()) => {}
            Err(TrySendError::Full(code)) => {
                debug!("signal: キュー満杯のため{}を破棄", code.as_str());
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl Drop for SignalSender {
    fn drop(&mut self) {
        // チャネルを閉じてワーカーを終了させる
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read};
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn test_sends_newline_terminated_codes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sender = SignalSender::new(&addr);

        sender.send(SignalCode::AdjustmentLock);
        sender.send(SignalCode::CenteringLock);
        sender.send(SignalCode::AdjustmentLock);

        // 接続は1本を使い回す
        let (conn, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(conn);
        let mut lines = Vec::new();
        for _ in 0..3 {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            lines.push(line);
        }
        assert_eq!(lines, vec!["1\n", "2\n", "1\n"]);
    }

    #[test]
    fn test_connect_failure_does_not_block_or_panic() {
        // 接続拒否されるポートへ大量送信しても戻ってくる
        let sender = SignalSender::new("127.0.0.1:1");
        for _ in 0..100 {
            sender.send(SignalCode::CenteringLock);
        }
        drop(sender);
    }

    #[test]
    fn test_reconnects_after_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let sender = SignalSender::new(&addr);

        sender.send(SignalCode::AdjustmentLock);
        let (mut conn, _) = listener.accept().unwrap();
        let mut buf = [0u8; 2];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"1\n");
        drop(conn);

        // 旧接続の切断をワーカーが検知するまで送り続ける
        listener.set_nonblocking(true).unwrap();
        let mut reconnected = None;
        for _ in 0..100 {
            sender.send(SignalCode::CenteringLock);
            thread::sleep(Duration::from_millis(20));
            if let Ok((conn, _)) = listener.accept() {
                reconnected = Some(conn);
                break;
            }
        }
        let mut conn = reconnected.expect("worker should reconnect after the peer closes");
        conn.set_nonblocking(false).unwrap();
        let mut byte = [0u8; 1];
        conn.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], b'2');
    }
}
