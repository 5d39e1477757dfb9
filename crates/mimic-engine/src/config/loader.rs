use super::schema::EngineConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the engine config: the first readable candidate wins, and
    /// with no file present the built-in policy applies. A working-directory
    /// `mimic.yaml` shadows the user-level `~/.mimic/config.yaml` so a
    /// deployment can pin its own thresholds.
    pub async fn load_default() -> Result<EngineConfig, ConfigError> {
        for path in Self::candidate_paths() {
            if path.exists() {
                return Self::load_from(&path).await;
            }
        }
        Ok(EngineConfig::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from("mimic.yaml")];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".mimic").join("config.yaml"));
        }
        candidates
    }

    pub async fn load_from(path: &Path) -> Result<EngineConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
