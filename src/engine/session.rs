//! Per-request bootstrap: load the config, fetch the catalog, reconcile the
//! two and hand out render cycles.

use std::collections::BTreeSet;

use crate::config::{ConfigStore, PlacementConfig};
use crate::engine::embed::Embed;
use crate::engine::pipeline::{RenderCycle, RenderInputs};
use crate::error::ConfigError;
use crate::net::{CatalogSnapshot, CatalogSource, DefaultRuleTemplate};
use crate::placement::density::DensityLevel;
use crate::placement::rules::{DisplayMode, PlacementRule, RuleStore};
use crate::placement::{PageType, PlacementCatalog, PositionId, SelectionMode};

/// Page types that get density rules when nothing else names one.
const DENSITY_FALLBACK_PAGES: [PageType; 2] = [PageType::Post, PageType::Page];

pub struct PlacementSession<S: ConfigStore> {
    store: S,
    domain: String,
    config: PlacementConfig,
    catalog: PlacementCatalog,
    templates: Vec<DefaultRuleTemplate>,
}

impl<S: ConfigStore> PlacementSession<S> {
    pub fn load(source: &dyn CatalogSource, store: S, domain: &str) -> Result<Self, ConfigError> {
        let mut config = store.load()?;

        let snapshot = source.load_catalog(domain).unwrap_or_else(|e| {
            log::warn!("Placement catalog unavailable for {}: {}", domain, e);
            CatalogSnapshot::default()
        });
        let catalog = snapshot.catalog();
        let templates = snapshot.default_rules;

        let mut changed = false;
        if catalog.is_empty() {
            log::debug!("Empty catalog for {}, leaving config untouched", domain);
        } else {
            changed |= config.selection.active.repair(&catalog);
            changed |= apply_templates(&mut config.rules, &catalog, &templates);
            if let Some(level) = config.density {
                changed |= synthesize_density(&mut config.rules, &catalog, &templates, level);
            }
        }

        let session = Self {
            store,
            domain: domain.to_string(),
            config,
            catalog,
            templates,
        };
        if changed {
            session.persist()?;
        }
        Ok(session)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PlacementCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&self) -> Result<(), ConfigError> {
        self.store.store(&self.config)
    }

    /// Make `position_id` the only active placement of `position_type`.
    pub fn select_active(&mut self, position_type: &str, position_id: PositionId) -> Result<(), ConfigError> {
        let placement = self
            .catalog
            .by_position(position_id)
            .ok_or(ConfigError::UnknownPosition(position_id))?;
        if placement.position_type != position_type {
            return Err(ConfigError::PositionTypeMismatch {
                position_id,
                expected: position_type.to_string(),
                actual: placement.position_type.clone(),
            });
        }

        let selection = &mut self.config.selection;
        selection.active.set(position_type, position_id);
        selection.mode = SelectionMode::Exclusive;
        log::info!("Position {} selected for '{}'", position_id, position_type);
        self.persist()
    }

    /// Store an operator rule, replacing whatever the pair had before.
    pub fn upsert_rule(&mut self, rule: PlacementRule) -> Result<Option<PlacementRule>, ConfigError> {
        if self.catalog.get(rule.placement_id).is_none() {
            return Err(ConfigError::UnknownPlacement(rule.placement_id));
        }
        let old = self.config.rules.upsert(rule);
        self.persist()?;
        Ok(old)
    }

    pub fn set_density(&mut self, level: DensityLevel) -> Result<(), ConfigError> {
        self.config.density = Some(level);
        synthesize_density(&mut self.config.rules, &self.catalog, &self.templates, level);
        self.persist()
    }

    /// Start a render cycle for one page of type `page_type`.
    pub fn render<'a>(&'a self, page_type: PageType, embed: &'a dyn Embed) -> RenderCycle<'a> {
        let inputs = RenderInputs {
            catalog: &self.catalog,
            rules: &self.config.rules,
            selection: &self.config.selection,
            parser: &self.config.parser,
        };
        RenderCycle::new(page_type, inputs, embed)
    }
}

/// Add template rules where the (page type, placement) pair has none.
fn apply_templates(
    rules: &mut RuleStore,
    catalog: &PlacementCatalog,
    templates: &[DefaultRuleTemplate],
) -> bool {
    let mut changed = false;
    for template in templates {
        if catalog.get(template.placement_id).is_none() {
            log::warn!(
                "Default rule template names unknown placement {}",
                template.placement_id
            );
            continue;
        }
        for rule in template.rules() {
            changed |= rules.insert_if_absent(rule);
        }
    }
    changed
}

/// Regenerate default paragraph rules of managed paragraph placements from
/// the density sequence. The n-th such placement (catalog order) goes after
/// unit `indices[n] + 1`. Operator rules are never touched.
fn synthesize_density(
    rules: &mut RuleStore,
    catalog: &PlacementCatalog,
    templates: &[DefaultRuleTemplate],
    level: DensityLevel,
) -> bool {
    let indices = level.indices();
    let mut changed = false;

    let managed = catalog
        .iter()
        .filter(|p| p.is_managed() && p.is_paragraph_anchored());
    for (n, placement) in managed.enumerate() {
        let mut pages: BTreeSet<PageType> = rules
            .iter()
            .filter(|r| r.placement_id == placement.id)
            .map(|r| r.page_type)
            .collect();
        pages.extend(
            templates
                .iter()
                .filter(|t| t.placement_id == placement.id)
                .flat_map(|t| t.page_types.iter().copied()),
        );
        if pages.is_empty() {
            pages.extend(DENSITY_FALLBACK_PAGES);
        }

        let option = indices.get(n).map(|idx| (idx + 1).to_string());
        for page_type in pages {
            let existing = rules.get(page_type, placement.id).cloned();
            if existing.as_ref().is_some_and(|r| !r.is_default) {
                continue;
            }
            match &option {
                Some(option) => {
                    let rule = PlacementRule::new(page_type, placement.id, DisplayMode::AfterParagraph, option)
                        .as_default();
                    if existing.as_ref() != Some(&rule) {
                        rules.upsert(rule);
                        changed = true;
                    }
                }
                None => {
                    changed |= rules.remove(page_type, placement.id).is_some();
                }
            }
        }
    }

    if changed {
        log::info!("Density level {} applied to paragraph placements", level.get());
    }
    changed
}
