use std::fmt;

use crate::dom::{Element, Unit};

/// Ancestor pattern that excludes units nested beneath a matching element.
///
/// Written like a compound CSS selector without combinators: `blockquote`,
/// `#comments`, `.sidebar`, `div#main.wide`. Every present part must match
/// the same ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentFilter {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl ParentFilter {
    /// Parse a selector-like filter. Returns `None` for empty or unusable
    /// input so that a blank filter can never exclude every unit.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.contains(char::is_whitespace) {
            return None;
        }

        let mut filter = ParentFilter::default();
        let mut rest = raw;

        let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
        if tag_end > 0 {
            let tag = &rest[..tag_end];
            if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return None;
            }
            filter.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while let Some(sigil) = rest.chars().next() {
            let body = &rest[1..];
            let len = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..len];
            if name.is_empty() {
                return None;
            }
            match sigil {
                '#' if filter.id.is_none() => filter.id = Some(name.to_string()),
                '.' => filter.classes.push(name.to_string()),
                _ => return None,
            }
            rest = &body[len..];
        }

        if filter.is_empty() {
            None
        } else {
            Some(filter)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty()
    }

    /// Whether `element` satisfies every part of this filter.
    pub fn matches(&self, element: &Element) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| element.has_class(c))
    }
}

impl fmt::Display for ParentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        Ok(())
    }
}

/// A unit is excluded when any filter matches any of its ancestors.
pub fn is_excluded(unit: &Unit, filters: &[ParentFilter]) -> bool {
    unit.lineage
        .iter()
        .any(|ancestor| filters.iter().any(|f| f.matches(ancestor)))
}
