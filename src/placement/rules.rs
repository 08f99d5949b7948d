//! Placement rules and the parser configuration they run against.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::filter::ParentFilter;
use crate::placement::{PageType, PlacementId};

/// Where a placement goes relative to the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Disabled,
    BeforeContent,
    AfterContent,
    BeforeParagraph,
    AfterParagraph,
    BeforeExcerpt,
    AfterExcerpt,
    AfterWidget,
    BeforeElement,
    AfterElement,
}

impl DisplayMode {
    /// Modes whose option is a 1-based ordinal.
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            DisplayMode::BeforeParagraph
                | DisplayMode::AfterParagraph
                | DisplayMode::BeforeExcerpt
                | DisplayMode::AfterExcerpt
        )
    }

    pub fn is_before(&self) -> bool {
        matches!(
            self,
            DisplayMode::BeforeContent
                | DisplayMode::BeforeParagraph
                | DisplayMode::BeforeExcerpt
                | DisplayMode::BeforeElement
        )
    }
}

/// Mode-dependent rule option, resolved once when the rule is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOption {
    None,
    /// 1-based unit or excerpt ordinal.
    Index(u32),
    /// Widget slot: optional container name and 1-based slot position.
    Slot {
        container: Option<String>,
        position: Option<u32>,
    },
    Selector(String),
    /// Raw text that could not be interpreted for the rule's mode.
    Malformed(String),
}

impl DisplayOption {
    pub fn parse(mode: DisplayMode, raw: &str) -> Self {
        let raw = raw.trim();
        match mode {
            DisplayMode::Disabled | DisplayMode::BeforeContent | DisplayMode::AfterContent => {
                DisplayOption::None
            }
            m if m.is_indexed() => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => DisplayOption::Index(n),
                _ => DisplayOption::Malformed(raw.to_string()),
            },
            DisplayMode::AfterWidget => parse_slot(raw),
            _ => {
                if raw.is_empty() {
                    DisplayOption::Malformed(String::new())
                } else {
                    DisplayOption::Selector(raw.to_string())
                }
            }
        }
    }

    pub fn index(&self) -> Option<u32> {
        match self {
            DisplayOption::Index(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, DisplayOption::Malformed(_))
    }
}

fn parse_slot(raw: &str) -> DisplayOption {
    let (container, position) = match raw.rsplit_once(':') {
        Some((c, p)) => (Some(c.trim()).filter(|c| !c.is_empty()), p.trim()),
        None => (None, raw),
    };
    let position = if position.is_empty() {
        None
    } else {
        match position.parse::<u32>() {
            Ok(n) if n >= 1 => Some(n),
            _ => return DisplayOption::Malformed(raw.to_string()),
        }
    };
    DisplayOption::Slot {
        container: container.map(str::to_string),
        position,
    }
}

impl fmt::Display for DisplayOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayOption::None => Ok(()),
            DisplayOption::Index(n) => write!(f, "{}", n),
            DisplayOption::Slot { container, position } => {
                match (container, position) {
                    (Some(c), Some(p)) => write!(f, "{}:{}", c, p),
                    (Some(c), None) => write!(f, "{}:", c),
                    (None, Some(p)) => write!(f, "{}", p),
                    (None, None) => Ok(()),
                }
            }
            DisplayOption::Selector(s) | DisplayOption::Malformed(s) => f.write_str(s),
        }
    }
}

/// Persisted shape of a rule; `display_option` stays a string on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPlacementRule {
    page_type: PageType,
    placement_id: PlacementId,
    display_mode: DisplayMode,
    #[serde(default)]
    display_option: String,
    #[serde(default)]
    is_default: bool,
}

/// Where one placement renders on one page type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPlacementRule", into = "RawPlacementRule")]
pub struct PlacementRule {
    pub page_type: PageType,
    pub placement_id: PlacementId,
    pub display_mode: DisplayMode,
    pub display_option: DisplayOption,
    pub is_default: bool,
}

impl PlacementRule {
    pub fn new(
        page_type: PageType,
        placement_id: PlacementId,
        display_mode: DisplayMode,
        display_option: &str,
    ) -> Self {
        Self {
            page_type,
            placement_id,
            display_mode,
            display_option: DisplayOption::parse(display_mode, display_option),
            is_default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

impl From<RawPlacementRule> for PlacementRule {
    fn from(raw: RawPlacementRule) -> Self {
        Self {
            page_type: raw.page_type,
            placement_id: raw.placement_id,
            display_mode: raw.display_mode,
            display_option: DisplayOption::parse(raw.display_mode, &raw.display_option),
            is_default: raw.is_default,
        }
    }
}

impl From<PlacementRule> for RawPlacementRule {
    fn from(rule: PlacementRule) -> Self {
        Self {
            page_type: rule.page_type,
            placement_id: rule.placement_id,
            display_mode: rule.display_mode,
            display_option: rule.display_option.to_string(),
            is_default: rule.is_default,
        }
    }
}

/// Ordered rule collection with at most one rule per (page type, placement).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PlacementRule>", into = "Vec<PlacementRule>")]
pub struct RuleStore {
    rules: Vec<PlacementRule>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rule`, replacing an existing rule for the same pair in place.
    /// Returns the replaced rule, if any.
    pub fn upsert(&mut self, rule: PlacementRule) -> Option<PlacementRule> {
        match self.position(rule.page_type, rule.placement_id) {
            Some(idx) => Some(std::mem::replace(&mut self.rules[idx], rule)),
            None => {
                self.rules.push(rule);
                None
            }
        }
    }

    /// Insert `rule` only if its pair is not configured yet.
    pub fn insert_if_absent(&mut self, rule: PlacementRule) -> bool {
        if self.position(rule.page_type, rule.placement_id).is_some() {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn remove(&mut self, page_type: PageType, placement_id: PlacementId) -> Option<PlacementRule> {
        self.position(page_type, placement_id)
            .map(|idx| self.rules.remove(idx))
    }

    /// Drop default rules matching `pred`. Returns how many were removed.
    pub fn remove_defaults_where(&mut self, mut pred: impl FnMut(&PlacementRule) -> bool) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| !(r.is_default && pred(r)));
        before - self.rules.len()
    }

    pub fn get(&self, page_type: PageType, placement_id: PlacementId) -> Option<&PlacementRule> {
        self.position(page_type, placement_id).map(|idx| &self.rules[idx])
    }

    pub fn for_page_type(&self, page_type: PageType) -> impl Iterator<Item = &PlacementRule> {
        self.rules.iter().filter(move |r| r.page_type == page_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacementRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn position(&self, page_type: PageType, placement_id: PlacementId) -> Option<usize> {
        self.rules
            .iter()
            .position(|r| r.page_type == page_type && r.placement_id == placement_id)
    }
}

impl From<Vec<PlacementRule>> for RuleStore {
    fn from(rules: Vec<PlacementRule>) -> Self {
        let mut store = RuleStore::new();
        for rule in rules {
            if let Some(old) = store.upsert(rule) {
                log::warn!(
                    "Duplicate rule for placement {} on '{}' page, keeping the later one",
                    old.placement_id,
                    old.page_type
                );
            }
        }
        store
    }
}

impl From<RuleStore> for Vec<PlacementRule> {
    fn from(store: RuleStore) -> Self {
        store.rules
    }
}

/// Operator-supplied parent filters, compiled once at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ParentFilterSet(Vec<ParentFilter>);

impl ParentFilterSet {
    pub fn as_slice(&self) -> &[ParentFilter] {
        &self.0
    }
}

impl From<Vec<String>> for ParentFilterSet {
    fn from(raw: Vec<String>) -> Self {
        let filters = raw
            .iter()
            .filter_map(|s| match ParentFilter::parse(s) {
                Some(f) => Some(f),
                None => {
                    log::warn!("Ignoring unusable parent filter '{}'", s);
                    None
                }
            })
            .collect();
        Self(filters)
    }
}

impl From<ParentFilterSet> for Vec<String> {
    fn from(set: ParentFilterSet) -> Self {
        set.0.iter().map(|f| f.to_string()).collect()
    }
}

fn default_tags() -> Vec<String> {
    vec!["p".to_string()]
}

/// How content is cut into units before unit-relative insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default = "default_tags")]
    pub unit_tags: Vec<String>,
    #[serde(default = "default_tags")]
    pub excerpt_tags: Vec<String>,
    #[serde(default)]
    pub parent_filters: ParentFilterSet,
    #[serde(default)]
    pub min_word_count: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            unit_tags: default_tags(),
            excerpt_tags: default_tags(),
            parent_filters: ParentFilterSet::default(),
            min_word_count: 0,
        }
    }
}
