use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

pub const COLOR_SCHEME_KEY: &str = "color-scheme";

/// Key-value preferences that outlive a single page load.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    /// With `persist` the value is also made visible to later loads and other pages.
    fn set(&mut self, key: &str, value: &str, persist: bool) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
    persisted: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn with(key: &str, value: &str) -> Self {
        let mut s = Self::default();
        s.values.insert(key.to_string(), value.to_string());
        s.persisted.insert(key.to_string(), value.to_string());
        s
    }

    pub fn persisted(&self, key: &str) -> Option<&str> {
        self.persisted.get(key).map(String::as_str)
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str, persist: bool) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        if persist {
            self.persisted.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Settings kept in a JSON object on disk.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSettings {
    /// A missing or unreadable file starts out empty.
    pub fn load(path: &Path) -> Self {
        let values = match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt settings file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read settings file");
                BTreeMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_vec_pretty(&self.values).context("encode settings")?;
        std::fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str, persist: bool) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        if persist {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_settings_persist_only_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs/settings.json");

        let mut settings = FileSettings::load(&path);
        assert_eq!(settings.get(COLOR_SCHEME_KEY), None);

        settings.set(COLOR_SCHEME_KEY, "dark", false).unwrap();
        assert_eq!(settings.get(COLOR_SCHEME_KEY).as_deref(), Some("dark"));
        assert!(!path.exists());

        settings.set(COLOR_SCHEME_KEY, "dark", true).unwrap();
        let reloaded = FileSettings::load(&path);
        assert_eq!(reloaded.get(COLOR_SCHEME_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(FileSettings::load(&path).get(COLOR_SCHEME_KEY), None);
    }

    #[test]
    fn memory_settings_track_persisted_values() {
        let mut settings = MemorySettings::default();
        settings.set(COLOR_SCHEME_KEY, "light", false).unwrap();
        assert_eq!(settings.persisted(COLOR_SCHEME_KEY), None);
        settings.set(COLOR_SCHEME_KEY, "dark", true).unwrap();
        assert_eq!(settings.persisted(COLOR_SCHEME_KEY), Some("dark"));
    }
}
