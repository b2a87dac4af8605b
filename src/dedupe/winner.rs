//! Survivor selection within a duplicate group.

use super::config::Policy;
use super::matcher::Candidate;

/// Sort key for survivor selection. Field order is priority order, so the
/// derived `Ord` compares layer first and source trust last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Preference {
    layer: usize,
    curated: bool,
    postal_code: bool,
    trust: usize,
}

impl Preference {
    pub fn of(candidate: &Candidate, policy: &Policy) -> Self {
        Self {
            layer: candidate
                .layer
                .map(|class| policy.layer_rank(class.canonical))
                .unwrap_or(0),
            curated: candidate.layer.is_some_and(|class| class.curated),
            postal_code: candidate.has_postal_code,
            trust: policy.trust_rank(&candidate.source),
        }
    }
}

/// Pick the survivor among `members` (indices into `candidates`, in input
/// order). Only a strictly better record displaces the current best, so
/// full ties keep the first one seen.
pub fn select_winner(members: &[usize], candidates: &[Candidate], policy: &Policy) -> Option<usize> {
    let mut best: Option<(usize, Preference)> = None;

    for &idx in members {
        let preference = Preference::of(&candidates[idx], policy);
        match best {
            Some((_, current)) if current >= preference => {}
            _ => best = Some((idx, preference)),
        }
    }

    best.map(|(idx, _)| idx)
}
