//! Loading settings from TOML

use super::{eq_struct, ModelConfig, ModelTask, Settings};
use crate::error::{Error, Result};
use crate::paths::UserPaths;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// The bundled default settings document
pub const DEFAULT_SETTINGS: &str = include_str!("default_settings.toml");

const SETTINGS_EXTENSION: &str = "toml";

#[derive(Debug, Deserialize)]
struct SettingsDocument {
    models: BTreeMap<String, ModelConfig>,
}

impl TryFrom<SettingsDocument> for Settings {
    type Error = Error;

    fn try_from(document: SettingsDocument) -> Result<Self> {
        let mut models = BTreeMap::new();
        for (name, config) in document.models {
            let task = name
                .parse::<ModelTask>()
                .map_err(|_| Error::ConfigStructureMismatch)?;
            models.insert(task, config);
        }
        Ok(Settings::new(models))
    }
}

fn default_document() -> Result<toml::Table> {
    Ok(DEFAULT_SETTINGS.parse::<toml::Table>()?)
}

/// Load settings from `path`, or the bundled default when `path` is `None`.
///
/// A given path must name an existing `.toml` file whose structure matches
/// the default document.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let default = default_document()?;
    let document = match path {
        None => default,
        Some(path) => {
            if !path.is_file() {
                return Err(Error::InvalidArgument(format!(
                    "Settings file {} does not exist",
                    path.display()
                )));
            }
            if path.extension().and_then(|e| e.to_str()) != Some(SETTINGS_EXTENSION) {
                return Err(Error::InvalidArgument(format!(
                    "Settings file {} is not a .{} file",
                    path.display(),
                    SETTINGS_EXTENSION
                )));
            }

            let loaded = fs::read_to_string(path)?.parse::<toml::Table>()?;
            if !eq_struct(&loaded, &default) {
                return Err(Error::ConfigStructureMismatch);
            }
            debug!("Loaded settings from {}", path.display());
            loaded
        }
    };

    let document: SettingsDocument = toml::Value::Table(document).try_into()?;
    Settings::try_from(document)
}

/// Load the current user's settings, writing the bundled default first if
/// the user has none yet
pub fn load_user_settings(paths: &UserPaths) -> Result<Settings> {
    let file = paths.settings_file();
    if !file.exists() {
        fs::create_dir_all(paths.config_dir())?;
        fs::write(&file, DEFAULT_SETTINGS)?;
        info!("Wrote default settings to {}", file.display());
    }
    load_settings(Some(&file))
}

/// The process-wide settings, loading them from `path` on first use.
///
/// Once an instance is installed, `path` is ignored.
pub fn global(path: Option<&Path>) -> Result<&'static Settings> {
    let cell = Settings::global_cell();
    if let Some(settings) = cell.get() {
        return Ok(settings);
    }
    let loaded = load_settings(path)?;
    Ok(cell.get_or_init(|| loaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.models().len(), ModelTask::ALL.len());
        let embedding = settings.model(ModelTask::Embedding).unwrap();
        assert_eq!(embedding.provider, "ollama");
        assert_eq!(embedding.api_base, "http://localhost:11434");
    }

    #[test]
    fn test_rejects_bad_paths() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(load_settings(Some(&missing)), Err(Error::InvalidArgument(_))));

        let wrong_extension = temp_dir.path().join("settings.json");
        fs::write(&wrong_extension, DEFAULT_SETTINGS).unwrap();
        assert!(matches!(
            load_settings(Some(&wrong_extension)),
            Err(Error::InvalidArgument(_))
        ));

        assert!(matches!(
            load_settings(Some(temp_dir.path())),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_values_may_differ_from_default() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.toml");
        fs::write(&file, DEFAULT_SETTINGS.replace("nomic-embed-text", "mxbai-embed-large")).unwrap();

        let settings = load_settings(Some(&file)).unwrap();
        assert_eq!(
            settings.model(ModelTask::Embedding).unwrap().identifier,
            "mxbai-embed-large"
        );
    }

    #[test]
    fn test_rejects_structural_changes() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.toml");

        let extra_key = format!("{}\n[models.vision]\nidentifier = \"x\"\nprovider = \"ollama\"\napi_base = \"y\"\n", DEFAULT_SETTINGS);
        fs::write(&file, extra_key).unwrap();
        assert!(matches!(load_settings(Some(&file)), Err(Error::ConfigStructureMismatch)));

        let wrong_type = DEFAULT_SETTINGS.replacen("identifier = \"nomic-embed-text\"", "identifier = 7", 1);
        fs::write(&file, wrong_type).unwrap();
        assert!(matches!(load_settings(Some(&file)), Err(Error::ConfigStructureMismatch)));
    }

    #[test]
    fn test_user_settings_are_seeded() {
        let temp_dir = TempDir::new().unwrap();
        let paths = UserPaths::with_root(temp_dir.path());

        let settings = load_user_settings(&paths).unwrap();
        assert!(paths.settings_file().is_file());
        assert_eq!(settings, load_settings(None).unwrap());
    }
}
