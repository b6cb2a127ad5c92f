//! Name-based exclusion of album and track variants.
//!
//! When a parent is included, children whose name marks them as a live,
//! acoustic or instrumental variant are excluded outright instead of being
//! proxy-included.  Undoing the parent releases those exclusions again.  For
//! tracks the undo table also matches `"- single"`, the include table does
//! not.

use serde::{Deserialize, Serialize};

use crate::item::{CatalogItem, InclusionStatus, ItemType};

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExclusionRule {
    pub item_type: ItemType,
    pub patterns: Vec<String>,
}

impl ExclusionRule {
    pub fn new(item_type: ItemType, patterns: &[&str]) -> Self {
        Self {
            item_type,
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    fn matches(&self, item: &CatalogItem) -> bool {
        if item.item_type != self.item_type {
            return false;
        }
        let name = item.name.to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| name.contains(&pattern.to_lowercase()))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeuristicRules {
    /// Consulted right after a parent inclusion was propagated.
    pub include: Vec<ExclusionRule>,
    /// Consulted when a parent inclusion is undone.
    pub undo: Vec<ExclusionRule>,
}

impl Default for HeuristicRules {
    fn default() -> Self {
        const ALBUM: &[&str] = &["live", "acoustic", "instrumental"];
        const TRACK: &[&str] = &["- live", "- acoustic", "- instrumental"];
        const TRACK_UNDO: &[&str] = &["- live", "- acoustic", "- instrumental", "- single"];

        Self {
            include: vec![
                ExclusionRule::new(ItemType::Album, ALBUM),
                ExclusionRule::new(ItemType::Track, TRACK),
            ],
            undo: vec![
                ExclusionRule::new(ItemType::Album, ALBUM),
                ExclusionRule::new(ItemType::Track, TRACK_UNDO),
            ],
        }
    }
}

impl HeuristicRules {
    pub fn none() -> Self {
        Self {
            include: Vec::new(),
            undo: Vec::new(),
        }
    }

    pub fn matches_include(&self, item: &CatalogItem) -> bool {
        self.include.iter().any(|rule| rule.matches(item))
    }

    pub fn matches_undo(&self, item: &CatalogItem) -> bool {
        self.undo.iter().any(|rule| rule.matches(item))
    }

    /// Turn a freshly proxy-included variant into an explicit exclusion.
    pub fn exclude(&self, item: &mut CatalogItem) -> bool {
        if item.status == InclusionStatus::ProxyIncluded && self.matches_include(item) {
            item.status = InclusionStatus::Excluded;
            true
        } else {
            false
        }
    }

    /// Reverse `exclude` after the parent inclusion was undone.  Explicit
    /// exclusions cannot be told apart from heuristic ones, so every matching
    /// exclusion is released.
    pub fn release(&self, item: &mut CatalogItem) -> bool {
        if item.status == InclusionStatus::Excluded && self.matches_undo(item) {
            item.status = InclusionStatus::Unset;
            true
        } else {
            false
        }
    }
}
