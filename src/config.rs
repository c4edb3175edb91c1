use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::exam::TimerMode;

const MIN_COUNTDOWN_MINUTES: u32 = 1;
const MIN_TICK_INTERVAL_MS: u64 = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer_mode: TimerMode,
    #[serde(default = "default_countdown_minutes")]
    pub countdown_minutes: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_converter_program")]
    pub converter_program: String,
    #[serde(default)]
    pub converter_args: Vec<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_countdown_minutes() -> u32 {
    60
}
fn default_tick_interval_ms() -> u64 {
    1_000
}
fn default_converter_program() -> String {
    "mammoth".to_string()
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("readex")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer_mode: TimerMode::default(),
            countdown_minutes: default_countdown_minutes(),
            tick_interval_ms: default_tick_interval_ms(),
            converter_program: default_converter_program(),
            converter_args: Vec::new(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.normalize();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("readex")
            .join("config.toml")
    }

    /// Clamp values a hand-edited file may have pushed out of range.
    pub fn normalize(&mut self) {
        self.countdown_minutes = self.countdown_minutes.max(MIN_COUNTDOWN_MINUTES);
        self.tick_interval_ms = self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS);
        if self.converter_program.trim().is_empty() {
            self.converter_program = default_converter_program();
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}
