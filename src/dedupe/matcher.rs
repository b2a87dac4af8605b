//! Pairwise duplicate decision.

use geo::{Distance, Haversine, Point};
use hashbrown::HashSet;

use super::config::{LayerClass, Policy};
use super::hierarchy::{Ancestry, Hierarchy};
use super::names::{fold, name_tokens, names_match};
use crate::models::{AddressParts, PlaceRecord};
use crate::request::DedupeMode;

/// Everything the matcher needs from one record, computed once per request
#[derive(Debug, Clone)]
pub struct Candidate {
    pub tokens: HashSet<String>,
    pub layer: Option<LayerClass>,
    pub ancestry: Ancestry,
    pub point: Option<Point<f64>>,
    pub address: AddressKey,
    pub has_postal_code: bool,
    pub source: String,
}

impl Candidate {
    pub fn new(record: &PlaceRecord, policy: &Policy) -> Self {
        Self {
            tokens: name_tokens(record),
            layer: record.layer.as_deref().and_then(|raw| policy.classify(raw)),
            ancestry: Ancestry::from_record(record),
            point: record.center_point.and_then(|center| center.to_point()),
            address: record
                .address_parts
                .as_ref()
                .map(AddressKey::from_parts)
                .unwrap_or_default(),
            has_postal_code: record
                .address_parts
                .as_ref()
                .and_then(AddressParts::postal_code)
                .is_some(),
            source: record.source.clone(),
        }
    }
}

/// Folded address fields; absent fields are no evidence either way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressKey {
    number: Option<String>,
    street: Option<String>,
    postal_code: Option<String>,
    unit: Option<String>,
}

impl AddressKey {
    fn from_parts(parts: &AddressParts) -> Self {
        let folded = |value: Option<&str>| value.map(fold).filter(|v| !v.is_empty());
        Self {
            number: folded(parts.number.as_deref()),
            street: folded(parts.street.as_deref()),
            postal_code: folded(parts.postal_code()),
            unit: folded(parts.unit.as_deref()),
        }
    }

    /// Some field is present on both sides with different values
    fn conflicts(&self, other: &AddressKey) -> bool {
        fn differ(a: &Option<String>, b: &Option<String>) -> bool {
            matches!((a, b), (Some(a), Some(b)) if a != b)
        }
        differ(&self.number, &other.number)
            || differ(&self.street, &other.street)
            || differ(&self.postal_code, &other.postal_code)
            || differ(&self.unit, &other.unit)
    }
}

/// Why a pair did or did not match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    /// A layer is missing or unrecognized
    Unclassified,
    NameMismatch,
    LayerMismatch,
    HierarchyConflict,
    AddressConflict,
    /// Same fine-grained layer, same name, but no evidence of being one place
    DistinctPlaces,
}

/// Decides whether two candidates belong in the same duplicate group
pub struct Matcher<'p> {
    policy: &'p Policy,
    mode: DedupeMode,
}

impl<'p> Matcher<'p> {
    pub fn new(policy: &'p Policy, mode: DedupeMode) -> Self {
        Self { policy, mode }
    }

    pub fn is_match(&self, a: &Candidate, b: &Candidate) -> bool {
        self.compare(a, b) == Verdict::Match
    }

    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Verdict {
        let (Some(layer_a), Some(layer_b)) = (a.layer, b.layer) else {
            return Verdict::Unclassified;
        };

        if !names_match(&a.tokens, &b.tokens) {
            return Verdict::NameMismatch;
        }

        if !layer_a.canonical.is_synonymous(layer_b.canonical) {
            return Verdict::LayerMismatch;
        }

        if a.ancestry.compare(&b.ancestry) == Hierarchy::Conflicting {
            return Verdict::HierarchyConflict;
        }

        if a.address.conflicts(&b.address) {
            return Verdict::AddressConflict;
        }

        let layer = layer_a.canonical;
        if layer == layer_b.canonical && self.policy.is_fine_tier(layer) {
            let confirmed = self.within_radius(a, b) || !a.ancestry.distinct_identity(&b.ancestry);
            if !confirmed {
                return Verdict::DistinctPlaces;
            }
        }

        Verdict::Match
    }

    /// Geo mode and both centers within the configured radius
    fn within_radius(&self, a: &Candidate, b: &Candidate) -> bool {
        if self.mode != DedupeMode::Geo {
            return false;
        }
        match (a.point, b.point) {
            (Some(pa), Some(pb)) => Haversine.distance(pa, pb) <= self.policy.radius_meters(),
            _ => false,
        }
    }
}
