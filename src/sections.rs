//! Section layout - the ordered set of navigable page regions
//!
//! A layout is built once from the page structure and never changes. Order
//! matters twice: the last section is the one forced active at the bottom of
//! the page, and score ties are broken in favour of the earlier section.

use crate::error::TrackerError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A navigable page region and its position in navigation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub id: String,
    pub order: u32,
}

impl SectionDescriptor {
    pub fn new(id: impl Into<String>, order: u32) -> Self {
        Self { id: id.into(), order }
    }
}

/// Section ids of the portfolio page, in sidebar order
pub const PORTFOLIO_SECTIONS: [&str; 8] = [
    "about",
    "technical-skills",
    "soft-skills",
    "languages",
    "experience",
    "education",
    "portfolio",
    "contact",
];

/// Validated, order-sorted list of sections
#[derive(Debug, Clone)]
pub struct SectionLayout {
    sections: Vec<SectionDescriptor>,
    index: FxHashMap<String, usize>,
}

impl SectionLayout {
    /// Build a layout from ids; navigation order is the iteration order
    pub fn from_ids<I, S>(ids: I) -> Result<Self, TrackerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptors = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| SectionDescriptor::new(id, i as u32))
            .collect();
        Self::from_descriptors(descriptors)
    }

    /// Build a layout from explicit descriptors, sorted by `order`
    pub fn from_descriptors(mut sections: Vec<SectionDescriptor>) -> Result<Self, TrackerError> {
        if sections.is_empty() {
            return Err(TrackerError::EmptyLayout);
        }

        sections.sort_by_key(|s| s.order);

        for pair in sections.windows(2) {
            if pair[0].order == pair[1].order {
                return Err(TrackerError::DuplicateOrder {
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                    order: pair[0].order,
                });
            }
        }

        let mut index = FxHashMap::default();
        for (position, section) in sections.iter().enumerate() {
            if section.id.is_empty() {
                return Err(TrackerError::InvalidConfig("section id must not be empty".to_string()));
            }
            if index.insert(section.id.clone(), position).is_some() {
                return Err(TrackerError::DuplicateSection(section.id.clone()));
            }
        }

        Ok(Self { sections, index })
    }

    /// Default portfolio page layout
    pub fn portfolio() -> Self {
        let sections = PORTFOLIO_SECTIONS
            .iter()
            .enumerate()
            .map(|(i, id)| SectionDescriptor::new(*id, i as u32))
            .collect::<Vec<_>>();
        let index = sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        Self { sections, index }
    }

    pub fn first(&self) -> &SectionDescriptor {
        &self.sections[0]
    }

    pub fn last(&self) -> &SectionDescriptor {
        &self.sections[self.sections.len() - 1]
    }

    /// Position in navigation order (0-based)
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Section at a navigation position; panics when out of range
    pub fn at(&self, position: usize) -> &SectionDescriptor {
        &self.sections[position]
    }

    pub fn get(&self, id: &str) -> Option<&SectionDescriptor> {
        self.position(id).map(|i| &self.sections[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionDescriptor> {
        self.sections.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Always false; an empty layout cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
