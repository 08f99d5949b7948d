//! Placement catalog sources.

#[cfg(feature = "remote-catalog")]
pub mod fetch;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::placement::rules::{DisplayMode, PlacementRule};
use crate::placement::{PageType, PlacementCatalog, PlacementDefinition, PlacementId};

/// Backend-recommended rule for a placement, applied where the operator has
/// not configured one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRuleTemplate {
    pub placement_id: PlacementId,
    pub page_types: Vec<PageType>,
    pub display_mode: DisplayMode,
    #[serde(default)]
    pub display_option: String,
}

impl DefaultRuleTemplate {
    /// Default rules this template stands for, one per page type.
    pub fn rules(&self) -> impl Iterator<Item = PlacementRule> + '_ {
        self.page_types.iter().map(move |&page_type| {
            PlacementRule::new(
                page_type,
                self.placement_id,
                self.display_mode,
                &self.display_option,
            )
            .as_default()
        })
    }
}

/// What the catalog backend knows about one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub placements: Vec<PlacementDefinition>,
    #[serde(default)]
    pub default_rules: Vec<DefaultRuleTemplate>,
}

impl CatalogSnapshot {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn catalog(&self) -> PlacementCatalog {
        PlacementCatalog::new(self.placements.clone())
    }
}

pub trait CatalogSource {
    fn load_catalog(&self, domain: &str) -> Result<CatalogSnapshot, CatalogError>;
}

/// A fixed snapshot, served for any domain.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    snapshot: CatalogSnapshot,
}

impl StaticCatalogSource {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path)?;
        Ok(Self::new(CatalogSnapshot::from_json(&json)?))
    }
}

impl CatalogSource for StaticCatalogSource {
    fn load_catalog(&self, _domain: &str) -> Result<CatalogSnapshot, CatalogError> {
        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::rules::DisplayOption;
    use std::io::Write;

    const CATALOG: &str = r#"{
        "placements": [
            {"id": 1, "position_id": 100, "position_type": "content_paragraph", "name": "default_paragraph_1"},
            {"id": 2, "position_id": 200, "position_type": "sidebar", "name": "Sidebar", "is_video": true}
        ],
        "default_rules": [
            {"placement_id": 2, "page_types": ["post", "home"], "display_mode": "after_widget", "display_option": "1"}
        ]
    }"#;

    #[test]
    fn snapshot_parses_and_expands_templates() {
        let snapshot = CatalogSnapshot::from_json(CATALOG).unwrap();
        assert_eq!(snapshot.catalog().len(), 2);
        assert!(snapshot.placements[1].is_video);

        let rules: Vec<_> = snapshot.default_rules[0].rules().collect();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.is_default));
        assert_eq!(rules[1].page_type, PageType::Home);
        assert_eq!(
            rules[0].display_option,
            DisplayOption::Slot { container: None, position: Some(1) }
        );
    }

    #[test]
    fn static_source_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let source = StaticCatalogSource::from_json_file(file.path()).unwrap();
        let snapshot = source.load_catalog("example.org").unwrap();
        assert_eq!(snapshot.placements.len(), 2);

        assert!(matches!(
            StaticCatalogSource::from_json_file(file.path().with_extension("missing")),
            Err(CatalogError::Io(_))
        ));
    }
}
