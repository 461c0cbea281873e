//! Per-user file locations

use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "blueprintflow";

/// Where settings, logs and both stores live for the current user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl UserPaths {
    /// Resolve from the OS conventions, honouring `BLUEPRINTFLOW_CONFIG_DIR`
    /// and `BLUEPRINTFLOW_DATA_DIR`
    pub fn from_system() -> Result<Self> {
        let config_dir = match env::var("BLUEPRINTFLOW_CONFIG_DIR") {
            Ok(custom) => PathBuf::from(custom),
            Err(_) => dirs::config_dir()
                .ok_or_else(|| Error::InvalidArgument("Could not determine config directory".to_string()))?
                .join(APP_DIR),
        };
        let data_dir = match env::var("BLUEPRINTFLOW_DATA_DIR") {
            Ok(custom) => PathBuf::from(custom),
            Err(_) => dirs::data_dir()
                .ok_or_else(|| Error::InvalidArgument("Could not determine data directory".to_string()))?
                .join(APP_DIR),
        };
        Ok(Self { config_dir, data_dir })
    }

    /// Put everything under one root directory
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("blueprintflow.log")
    }

    pub fn vector_store_dir(&self) -> PathBuf {
        self.data_dir.join("vectordb")
    }

    pub fn graph_store_dir(&self) -> PathBuf {
        self.data_dir.join("graphdb")
    }

    /// Create the config and data directories
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_under_root() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UserPaths::with_root(temp_dir.path());
        paths.ensure_dirs().unwrap();

        assert!(paths.config_dir().is_dir());
        assert!(paths.data_dir().is_dir());
        assert!(paths.settings_file().ends_with("config/settings.toml"));
        assert!(paths.log_file().ends_with("data/blueprintflow.log"));
        assert!(paths.vector_store_dir().starts_with(paths.data_dir()));
        assert!(paths.graph_store_dir().ends_with("graphdb"));
    }
}
