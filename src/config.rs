use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::guidance::GuidanceMode;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// ガイダンスモード ("centering" | "adjustment")
    #[serde(default = "default_mode")]
    pub mode: String,
    /// 姿勢検出モデルのパス
    #[serde(default = "default_model")]
    pub model: String,
    /// 分類器モデルのパス(省略時は分類なし)
    #[serde(default)]
    pub classifier: Option<String>,
    /// 分類ラベルファイルのパス
    #[serde(default)]
    pub classifier_labels: Option<String>,
}

fn default_mode() -> String { "centering".to_string() }
fn default_model() -> String { "models/movenet_lightning.onnx".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            model: default_model(),
            classifier: None,
            classifier_labels: None,
        }
    }
}

impl AppConfig {
    /// モード文字列を解釈する。不明な値は centering 扱い
    pub fn guidance_mode(&self) -> GuidanceMode {
        match self.mode.as_str() {
            "adjustment" => GuidanceMode::Adjustment,
            _ => GuidanceMode::Centering,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラインデックス。負の値でプローブによる自動選択
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_fps() -> u32 { 30 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignalConfig {
    /// シグナル送信先 (host:port)
    #[serde(default = "default_signal_addr")]
    pub addr: String,
}

fn default_signal_addr() -> String { "192.168.1.198:5555".to_string() }

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            addr: default_signal_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    /// オーバーレイウィンドウを表示するか
    #[serde(default = "default_view")]
    pub view: bool,
}

fn default_view() -> bool { true }

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            view: default_view(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込みに失敗した場合は既定値を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("config: 読み込みに失敗、既定値を使用します: {}", e);
                Config::default()
            }
        }
    }
}
