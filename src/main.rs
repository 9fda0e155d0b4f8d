use anyhow::Result;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use stance_guide::camera::{probe_device, CameraSource};
use stance_guide::config::Config;
use stance_guide::feedback::{self, PipelineListener};
use stance_guide::pipeline::Pipeline;
use stance_guide::pose::{MoveNet, OrtPoseClassifier};
use stance_guide::render::OverlayWindow;
use stance_guide::signal::SignalSender;

const CONFIG_PATH: &str = "config.toml";

/// コンソールへ出力するリスナー
struct ConsoleListener;

impl PipelineListener for ConsoleListener {
    fn on_fps(&self, fps: u32) {
        println!("FPS: {}", fps);
    }

    fn on_detected_info(&self, score: Option<f32>, labels: Option<&[(String, f32)]>) {
        if let Some(score) = score {
            print!("Score: {:.2}", score);
        }
        if let Some(labels) = labels {
            if let Some((label, confidence)) = labels
                .iter()
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            {
                print!("  Pose: {} ({:.2})", label, confidence);
            }
        }
        println!();
    }

    fn on_distance_update(&self, message: &str) {
        println!("{}", message);
    }
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Stance Guide ({}) ===", env!("GIT_VERSION"));
    println!("モード: {}", config.app.mode);
    println!("シグナル送信先: {}", config.signal.addr);
    println!();

    let index = if config.camera.index >= 0 {
        config.camera.index
    } else {
        probe_device(5)?
    };
    let source = CameraSource::open(
        index,
        Some(config.camera.width),
        Some(config.camera.height),
        Some(config.camera.fps),
    )?;
    let (width, height) = source.resolution();
    println!("Camera {}: {}x{}", index, width, height);

    let listener = Arc::new(ConsoleListener);
    let (dispatcher, queue) = feedback::channel(listener as Arc<dyn PipelineListener>);
    let signals = SignalSender::new(&config.signal.addr);

    let mut pipeline = Pipeline::new(dispatcher, signals, config.app.guidance_mode());
    pipeline.set_detector(Box::new(MoveNet::new(&config.app.model)?));
    println!("Model loaded: {}", config.app.model);

    if let (Some(model), Some(labels)) = (&config.app.classifier, &config.app.classifier_labels) {
        pipeline.set_classifier(Some(Box::new(OrtPoseClassifier::new(model, labels)?)));
        println!("Classifier loaded: {}", model);
    }

    pipeline.attach_source(Box::new(source));

    // 縦向き表示のため幅と高さを入れ替える
    let window_open = if config.debug.view {
        let window = OverlayWindow::new("Stance Guide", height as usize, width as usize)?;
        let open = window.open_handle();
        pipeline.set_visualizer(Box::new(window));
        Some(open)
    } else {
        None
    };

    pipeline.resume()?;
    println!("開始しました。ウィンドウを閉じるかEscで終了します。");
    println!();

    // メインスレッドが配送先: フィードバックを引き取りつつ終了を待つ
    loop {
        queue.poll(Duration::from_millis(100));
        if let Some(open) = &window_open {
            if !open.load(Ordering::Acquire) {
                break;
            }
        }
    }

    println!("終了します");
    pipeline.close();
    Ok(())
}
