use serde::{Deserialize, Serialize};
use shared::MediaKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub version: f32,
    pub model: ModelConfig,
    pub upload: UploadConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    #[serde(default = "default_web_search")]
    pub web_search: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub use_tool_trace: bool,
}

fn default_web_search() -> bool {
    true
}

impl UploadConfig {
    pub fn extensions_for(&self, kind: MediaKind) -> &[String] {
        match kind {
            MediaKind::Image => &self.image_extensions,
            MediaKind::Video => &self.video_extensions,
        }
    }
}

impl AnalysisConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = match std::env::var("ANALYSIS_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => match std::env::var("CARGO_MANIFEST_DIR") {
                Ok(manifest_dir) => Path::new(&manifest_dir).join("../config/analysis.yaml"),
                Err(_) => PathBuf::from("config/analysis.yaml"),
            },
        };
        Self::from_path(&config_path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading analysis config from {}", path.display());
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_yaml::from_str(config_str)?;
        Ok(config)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: 1.0,
            model: ModelConfig {
                id: "gemini-2.5-flash".into(),
                endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
                api_key_env: "GEMINI_API_KEY".into(),
                timeout_secs: 120,
                web_search: true,
            },
            upload: UploadConfig {
                image_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
                video_extensions: vec!["mp4".into(), "mov".into(), "avi".into()],
                max_bytes: 20 * 1024 * 1024,
            },
            scoring: ScoringConfig::default(),
        }
    }
}
