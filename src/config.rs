//! Persisted placement configuration and the stores that hold it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::placement::density::DensityLevel;
use crate::placement::rules::{ParserConfig, RuleStore};
use crate::placement::PlacementSelection;

/// Everything an operator configures for one site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub rules: RuleStore,
    pub selection: PlacementSelection,
    pub parser: ParserConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<DensityLevel>,
}

impl PlacementConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Host-side persistence of [`PlacementConfig`].
pub trait ConfigStore {
    fn load(&self) -> Result<PlacementConfig, ConfigError>;

    fn store(&self, config: &PlacementConfig) -> Result<(), ConfigError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn load(&self) -> Result<PlacementConfig, ConfigError> {
        (**self).load()
    }

    fn store(&self, config: &PlacementConfig) -> Result<(), ConfigError> {
        (**self).store(config)
    }
}

/// Config kept as one JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<PlacementConfig, ConfigError> {
        if !self.path.exists() {
            log::info!(
                "No placement config at {}, starting from defaults",
                self.path.display()
            );
            return Ok(PlacementConfig::default());
        }
        let json = fs::read_to_string(&self.path)?;
        PlacementConfig::from_json(&json)
    }

    fn store(&self, config: &PlacementConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, config.to_json()?)?;
        log::debug!("Placement config written to {}", self.path.display());
        Ok(())
    }
}

/// In-process store; also counts writes so callers can tell whether a
/// bootstrap persisted anything.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: Mutex<PlacementConfig>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            config: Mutex::new(config),
            writes: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> PlacementConfig {
        self.config
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or_else(|p| *p.into_inner())
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<PlacementConfig, ConfigError> {
        Ok(self.snapshot())
    }

    fn store(&self, config: &PlacementConfig) -> Result<(), ConfigError> {
        match self.config.lock() {
            Ok(mut c) => *c = config.clone(),
            Err(poisoned) => *poisoned.into_inner() = config.clone(),
        }
        match self.writes.lock() {
            Ok(mut w) => *w += 1,
            Err(poisoned) => *poisoned.into_inner() += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::rules::{DisplayMode, DisplayOption};
    use crate::placement::{PageType, PlacementId, PositionId, SelectionMode};

    const SAMPLE: &str = r#"{
        "rules": [
            {"page_type": "post", "placement_id": 7, "display_mode": "after_paragraph", "display_option": "2"},
            {"page_type": "post", "placement_id": 8, "display_mode": "after_widget", "display_option": "sidebar-1:"}
        ],
        "selection": {"mode": "exclusive", "active": {"in_content": 70}},
        "parser": {"unit_tags": ["p", "li"], "parent_filters": ["blockquote", "", "div#a#b"]},
        "density": 9
    }"#;

    #[test]
    fn parses_a_full_document() {
        let config = PlacementConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.rules.len(), 2);
        let rule = config.rules.get(PageType::Post, PlacementId(7)).unwrap();
        assert_eq!(rule.display_mode, DisplayMode::AfterParagraph);
        assert_eq!(rule.display_option, DisplayOption::Index(2));
        assert_eq!(config.selection.mode, SelectionMode::Exclusive);
        assert_eq!(config.selection.active.get("in_content"), Some(PositionId(70)));
        assert_eq!(config.parser.unit_tags, vec!["p", "li"]);
        assert_eq!(config.parser.excerpt_tags, vec!["p"]);
        assert_eq!(config.parser.parent_filters.as_slice().len(), 1);
        assert_eq!(config.density, Some(DensityLevel::MODERATE));
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(PlacementConfig::from_json("{}").unwrap(), PlacementConfig::default());
        assert!(matches!(
            PlacementConfig::from_json("[1, 2"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn json_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("placements.json"));
        assert_eq!(store.load().unwrap(), PlacementConfig::default());

        let config = PlacementConfig::from_json(SAMPLE).unwrap();
        store.store(&config).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn memory_store_counts_writes() {
        let store = MemoryStore::default();
        assert_eq!(store.writes(), 0);
        let mut config = store.load().unwrap();
        config.density = Some(DensityLevel::HIGHEST);
        store.store(&config).unwrap();
        assert_eq!(store.writes(), 1);
        assert_eq!(store.snapshot().density, Some(DensityLevel::HIGHEST));
    }
}
