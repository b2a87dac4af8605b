//! Administrative ancestry comparison.
//!
//! A record's `parent` map carries one `<layer>_id` entry per ancestor and,
//! by convention, an entry for its own layer pointing at itself. That
//! self-reference says nothing about another record at the same layer (two
//! distinct records trivially differ there), so a key that is the own layer
//! of *both* records is skipped. When only one side owns the key the entry
//! is compared normally: a region's own id against a localadmin's
//! `region_id` tells whether the localadmin sits inside that region.

use hashbrown::HashMap;

use crate::models::PlaceRecord;

const ID_SUFFIX: &str = "_id";

/// Outcome of comparing two ancestries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hierarchy {
    Compatible,
    Conflicting,
}

/// Ancestor identifiers of one record, keyed by layer name
#[derive(Debug, Clone, Default)]
pub struct Ancestry {
    ids: HashMap<String, Vec<String>>,
    own_layer: Option<String>,
}

impl Ancestry {
    /// Collect `<layer>_id` entries; keys without the suffix (names,
    /// abbreviations) are not identifiers and are ignored.
    pub fn from_record(record: &PlaceRecord) -> Self {
        let ids = record
            .parent
            .iter()
            .flat_map(|parent| parent.iter())
            .filter_map(|(key, value)| {
                let layer = key.strip_suffix(ID_SUFFIX)?.trim().to_ascii_lowercase();
                let ids = value.identifiers();
                (!layer.is_empty() && !ids.is_empty()).then_some((layer, ids))
            })
            .collect();

        let own_layer = record
            .layer
            .as_deref()
            .map(|layer| layer.trim().to_ascii_lowercase())
            .filter(|layer| !layer.is_empty());

        Self { ids, own_layer }
    }

    /// The record's identifier at its own layer, if it carries one
    pub fn self_ids(&self) -> Option<&[String]> {
        let own = self.own_layer.as_deref()?;
        self.ids.get(own).map(Vec::as_slice)
    }

    fn owns(&self, layer: &str) -> bool {
        self.own_layer.as_deref() == Some(layer)
    }

    /// Compare two ancestries; symmetric in its arguments
    pub fn compare(&self, other: &Ancestry) -> Hierarchy {
        let conflict = self.ids.iter().any(|(layer, ids)| {
            if self.owns(layer) && other.owns(layer) {
                return false;
            }
            other
                .ids
                .get(layer)
                .is_some_and(|other_ids| ids_differ(ids, other_ids))
        });

        if conflict {
            Hierarchy::Conflicting
        } else {
            Hierarchy::Compatible
        }
    }

    /// Both records carry a self-reference at the same layer and they differ
    pub fn distinct_identity(&self, other: &Ancestry) -> bool {
        match (self.self_ids(), other.self_ids()) {
            (Some(a), Some(b)) => self.own_layer == other.own_layer && ids_differ(a, b),
            _ => false,
        }
    }
}

/// Identifier lists disagree when they share no value
fn ids_differ(a: &[String], b: &[String]) -> bool {
    !a.iter().any(|id| b.contains(id))
}
