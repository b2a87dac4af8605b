//! Collapses duplicate places in a ranked result list.
//!
//! Records are compared pairwise; matching is symmetric but not transitive,
//! so duplicate groups are the connected components of the match graph.
//! Each group keeps one survivor, survivors keep their input order, and the
//! list is cut to the requested page size.

use serde::Serialize;
use tracing::debug;

use super::config::{ConfigError, DedupeConfig, Policy};
use super::matcher::{Candidate, Matcher};
use super::winner::select_winner;
use crate::models::PlaceRecord;
use crate::request::{DedupeMode, RequestContext};

/// Per-invocation counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DedupeStats {
    /// Records handed in
    pub input: usize,
    /// Groups with more than one member
    pub duplicate_groups: usize,
    /// Records left after collapsing groups
    pub survivors: usize,
    /// Records left after truncation
    pub returned: usize,
    pub mode: DedupeMode,
}

/// Survivors plus the counters describing how they were produced
#[derive(Debug, Clone)]
pub struct Merged {
    pub records: Vec<PlaceRecord>,
    pub stats: DedupeStats,
}

/// Stateless deduplicator; one instance can serve concurrent requests
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    policy: Policy,
}

impl Deduplicator {
    pub fn new(config: &DedupeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            policy: config.compile()?,
        })
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Deduplicate and truncate `records` for one request
    pub fn merge(&self, records: Vec<PlaceRecord>, ctx: &RequestContext) -> Vec<PlaceRecord> {
        self.merge_with_stats(records, ctx).records
    }

    pub fn merge_with_stats(&self, records: Vec<PlaceRecord>, ctx: &RequestContext) -> Merged {
        let input = records.len();
        let (keep, duplicate_groups) = self.survivor_mask(&records, ctx.dedupe);

        let mut survivors: Vec<PlaceRecord> = records
            .into_iter()
            .zip(keep)
            .filter_map(|(record, keep)| keep.then_some(record))
            .collect();
        let survivor_count = survivors.len();
        survivors.truncate(ctx.limit());

        let stats = DedupeStats {
            input,
            duplicate_groups,
            survivors: survivor_count,
            returned: survivors.len(),
            mode: ctx.dedupe,
        };

        debug!(
            "Deduplicated {} results into {} ({} groups merged, returning {}, mode {}, text {:?})",
            stats.input,
            stats.survivors,
            stats.duplicate_groups,
            stats.returned,
            stats.mode,
            ctx.text.as_deref().unwrap_or("")
        );

        Merged {
            records: survivors,
            stats,
        }
    }

    /// Which input positions survive, and how many groups were merged
    fn survivor_mask(&self, records: &[PlaceRecord], mode: DedupeMode) -> (Vec<bool>, usize) {
        let candidates: Vec<Candidate> = records
            .iter()
            .map(|record| Candidate::new(record, &self.policy))
            .collect();
        let matcher = Matcher::new(&self.policy, mode);

        let mut keep = vec![true; records.len()];
        let mut merged_groups = 0;

        for group in duplicate_groups(&candidates, &matcher) {
            if group.len() < 2 {
                continue;
            }
            let Some(winner) = select_winner(&group, &candidates, &self.policy) else {
                continue;
            };
            merged_groups += 1;

            debug!(
                "Merged duplicate group [{}] into {}",
                group
                    .iter()
                    .map(|&idx| records[idx].gid())
                    .collect::<Vec<_>>()
                    .join(", "),
                records[winner].gid()
            );

            for &idx in &group {
                keep[idx] = idx == winner;
            }
        }

        (keep, merged_groups)
    }
}

/// Connected components of the match graph, each sorted by input position
fn duplicate_groups(candidates: &[Candidate], matcher: &Matcher<'_>) -> Vec<Vec<usize>> {
    let n = candidates.len();
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            if matcher.is_match(&candidates[i], &candidates[j]) {
                edges[i].push(j);
                edges[j].push(i);
            }
        }
    }

    let mut assigned = vec![false; n];
    let mut groups = Vec::new();

    for start in 0..n {
        if assigned[start] {
            continue;
        }
        assigned[start] = true;

        // Keep adding anything connected to the group
        let mut group = vec![start];
        let mut frontier = vec![start];
        while let Some(current) = frontier.pop() {
            for &next in &edges[current] {
                if !assigned[next] {
                    assigned[next] = true;
                    group.push(next);
                    frontier.push(next);
                }
            }
        }

        group.sort_unstable();
        groups.push(group);
    }

    groups
}
