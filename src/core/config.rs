use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the player delivers video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoMode {
    /// Render directly into a native window owned by the embedder.
    Embedded { window_id: u64 },
    /// Write raw frames to a named pipe for in-process decoding.
    Pipe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player executable, looked up on PATH unless absolute.
    pub player_path: PathBuf,
    pub video_mode: VideoMode,
    /// Optional `-vo` driver override for embedded mode.
    pub video_output: Option<String>,
    /// Directory the decode fifo is created in.
    pub fifo_directory: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            player_path: PathBuf::from("mplayer"),
            video_mode: VideoMode::Pipe,
            video_output: None,
            fifo_directory: std::env::temp_dir(),
        }
    }
}

impl PlayerConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path).map_err(|e| {
                anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e)
            })?;

            // A config that no longer parses is replaced with defaults rather
            // than blocking startup.
            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config)
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), creating new one with defaults", e);
                    let new_config = Self::default();
                    new_config.save_to(config_path)?;
                    log::info!("Created new config file at {}", config_path.display());
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save_to(config_path)?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mplayer-host")
            .join("config.json")
    }
}
