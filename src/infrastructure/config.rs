use crate::domain::config::SeqComConfig;
use crate::domain::error::{SeqComError, SeqComResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager
///
/// Layers a project-local `.seqcom/config.toml` (found by walking up from
/// the working directory) over the global `~/.config/seqcom/config.toml`;
/// the project file wins field by field through serde defaults.
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new() -> SeqComResult<Self> {
        Ok(Self {
            global_config_path: Self::global_config_path()?,
            project_config_path: Self::find_project_config_path(),
        })
    }

    /// Load configuration, falling back to defaults when no file exists.
    pub fn load_config(&self) -> SeqComResult<SeqComConfig> {
        let mut config = SeqComConfig::default();

        if self.global_config_path.exists() {
            config = Self::load_from_path(&self.global_config_path)?;
        }

        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                config = Self::load_from_path(project_path)?;
            }
        }

        Ok(config)
    }

    /// Load configuration from an explicit file path.
    pub fn load_from_path(path: &Path) -> SeqComResult<SeqComConfig> {
        let content = fs::read_to_string(path).map_err(|e| SeqComError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| SeqComError::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
        })
    }

    /// Write the configuration to the global path, creating directories as
    /// needed.
    pub fn save_config(&self, config: &SeqComConfig) -> SeqComResult<()> {
        if let Some(parent) = self.global_config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SeqComError::Config {
                message: format!("failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| SeqComError::Config {
            message: format!("failed to serialize configuration: {}", e),
        })?;

        fs::write(&self.global_config_path, content).map_err(|e| SeqComError::Config {
            message: format!(
                "failed to write {}: {}",
                self.global_config_path.display(),
                e
            ),
        })
    }

    fn global_config_path() -> SeqComResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| SeqComError::Config {
            message: "could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("seqcom").join("config.toml"))
    }

    /// Walk up from the working directory looking for `.seqcom/config.toml`.
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(".seqcom").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }
}
