//! JSON-file persistence for the viewer configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use leafview_core::Config;

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Opens the config file at `path`, writing defaults when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        let storage = Self { path };
        if !storage.path.exists() {
            tracing::info!(path = %storage.path.display(), "writing default config");
            storage.save_config(&Config::default())?;
        }
        Ok(storage)
    }

    /// Opens `config.json` inside `dir`.
    pub fn open_in_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::open(dir.as_ref().join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the config; a file that no longer parses falls back to defaults.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read config {}", self.path.display()))?;
        let mut config = match serde_json::from_str::<Config>(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "config unreadable, using defaults");
                Config::default()
            }
        };
        config.normalize();
        Ok(config)
    }

    pub fn save_config(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        config.normalize();
        let json = serde_json::to_string_pretty(&config)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write config {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace config {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use leafview_core::DpiScale;

    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = Storage::open_in_dir(dir.path().join("nested"))?;
        assert!(storage.path().exists());
        assert_eq!(storage.load_config()?, Config::default());
        Ok(())
    }

    #[test]
    fn config_roundtrip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = Storage::open_in_dir(dir.path())?;
        let mut config = storage.load_config()?;
        config.dpi_scale = DpiScale::X150;
        config.zoom.max = 300;
        config.layout.fit_margin = 24;
        storage.save_config(&config)?;

        let loaded = Storage::open_in_dir(dir.path())?.load_config()?;
        assert_eq!(loaded.dpi_scale, DpiScale::X150);
        assert_eq!(loaded.zoom.max, 300);
        assert_eq!(loaded.layout.fit_margin, 24);
        Ok(())
    }

    #[test]
    fn partial_and_broken_files_fall_back() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);

        fs::write(&path, r#"{ "zoom": { "min": 80, "default": 20 } }"#)?;
        let config = Storage::open(&path)?.load_config()?;
        assert_eq!(config.zoom.min, 80);
        assert_eq!(config.zoom.default, 80);
        assert_eq!(config.zoom.max, 200);

        fs::write(&path, "{ not json")?;
        assert_eq!(Storage::open(&path)?.load_config()?, Config::default());
        Ok(())
    }
}
