//! Placement catalog model: definitions, page types and active-placement
//! exclusivity.

pub mod density;
pub mod resolve;
pub mod rules;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name prefix reserved for placements created and managed by the catalog
/// backend rather than by an operator.
pub const MANAGED_NAME_PREFIX: &str = "default_";

/// Position type family whose placements are anchored to content paragraphs.
pub const PARAGRAPH_POSITION_TYPE: &str = "content_paragraph";

/// Opaque placement identity as issued by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(pub u64);

/// Stable numeric handle used in generated markup and tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub u64);

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page classification supplied by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Home,
    Post,
    Page,
    Category,
    Tag,
    Archive,
    Search,
    Attachment,
}

impl PageType {
    pub const ALL: [PageType; 8] = [
        PageType::Home,
        PageType::Post,
        PageType::Page,
        PageType::Category,
        PageType::Tag,
        PageType::Archive,
        PageType::Search,
        PageType::Attachment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Home => "home",
            PageType::Post => "post",
            PageType::Page => "page",
            PageType::Category => "category",
            PageType::Tag => "tag",
            PageType::Archive => "archive",
            PageType::Search => "search",
            PageType::Attachment => "attachment",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        PageType::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| format!("unknown page type '{}'", s))
    }
}

/// Host-side page classifier. The engine only consumes its answer.
pub trait PageClassifier {
    fn current_page_type(&self) -> PageType;
}

impl PageClassifier for PageType {
    fn current_page_type(&self) -> PageType {
        *self
    }
}

/// A single placement as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementDefinition {
    pub id: PlacementId,
    pub position_id: PositionId,
    pub position_type: String,
    pub name: String,
    #[serde(default)]
    pub is_video: bool,
}

impl PlacementDefinition {
    /// Whether the catalog backend owns this placement.
    pub fn is_managed(&self) -> bool {
        self.name.starts_with(MANAGED_NAME_PREFIX)
    }

    pub fn is_paragraph_anchored(&self) -> bool {
        self.position_type.starts_with(PARAGRAPH_POSITION_TYPE)
    }
}

/// Read-only table of placement definitions for one request.
#[derive(Debug, Clone, Default)]
pub struct PlacementCatalog {
    placements: Vec<PlacementDefinition>,
    by_id: HashMap<PlacementId, usize>,
}

impl PlacementCatalog {
    pub fn new(placements: Vec<PlacementDefinition>) -> Self {
        let mut by_id = HashMap::with_capacity(placements.len());
        for (idx, placement) in placements.iter().enumerate() {
            if by_id.insert(placement.id, idx).is_some() {
                log::warn!("Duplicate placement {} in catalog, keeping the last", placement.id);
            }
        }
        Self { placements, by_id }
    }

    pub fn get(&self, id: PlacementId) -> Option<&PlacementDefinition> {
        self.by_id.get(&id).map(|&idx| &self.placements[idx])
    }

    pub fn by_position(&self, position_id: PositionId) -> Option<&PlacementDefinition> {
        self.placements.iter().find(|p| p.position_id == position_id)
    }

    pub fn of_type<'a>(
        &'a self,
        position_type: &'a str,
    ) -> impl Iterator<Item = &'a PlacementDefinition> + 'a {
        self.placements
            .iter()
            .filter(move |p| p.position_type == position_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacementDefinition> {
        self.placements.iter()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// How the active-placement map came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// An operator explicitly picked one placement per position type.
    Exclusive,
    /// No explicit choice; the map holds inherited defaults.
    #[default]
    Implicit,
}

/// One authorised `PositionId` per position type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivePlacementMap(BTreeMap<String, PositionId>);

impl ActivePlacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, position_type: &str) -> Option<PositionId> {
        self.0.get(position_type).copied()
    }

    /// Select `position_id` for `position_type`, replacing any earlier choice.
    pub fn set(&mut self, position_type: impl Into<String>, position_id: PositionId) {
        self.0.insert(position_type.into(), position_id);
    }

    pub fn remove(&mut self, position_type: &str) -> Option<PositionId> {
        self.0.remove(position_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PositionId)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Repoint active ids that no longer exist in `catalog`.
    ///
    /// A stale entry moves to the first managed placement of the same type,
    /// then to the lowest position id of that type, and is dropped when the
    /// type has vanished. Returns whether anything changed.
    pub fn repair(&mut self, catalog: &PlacementCatalog) -> bool {
        let mut changed = false;
        let stale: Vec<(String, PositionId)> = self
            .0
            .iter()
            .filter(|(ty, id)| !catalog.of_type(ty).any(|p| p.position_id == **id))
            .map(|(ty, id)| (ty.clone(), *id))
            .collect();

        for (position_type, old) in stale {
            let replacement = catalog
                .of_type(&position_type)
                .find(|p| p.is_managed())
                .or_else(|| catalog.of_type(&position_type).min_by_key(|p| p.position_id))
                .map(|p| p.position_id);

            match replacement {
                Some(new_id) => {
                    log::info!(
                        "Active placement for '{}' moved from {} to {}",
                        position_type,
                        old,
                        new_id
                    );
                    self.0.insert(position_type, new_id);
                }
                None => {
                    log::info!(
                        "Active placement for '{}' removed; type no longer in catalog",
                        position_type
                    );
                    self.0.remove(&position_type);
                }
            }
            changed = true;
        }
        changed
    }
}

/// Operator selection state persisted alongside the rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSelection {
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub active: ActivePlacementMap,
}
