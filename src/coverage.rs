// PathSample: coverage-driven path sampling over equipment networks
// Copyright (C) 2023-2026 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Coverage Tracker
//!
//! Two bitsets over the dense node/link index spaces built by [`crate::scope::Scope`], plus a
//! bounded history of recent coverage samples used for plateau detection. This is the sole
//! owner of the bitsets; every other component receives read-only views.
//!
//! `coverage()` is monotonically non-decreasing across [`CoverageTracker::apply`] calls, and a
//! bit once set is never cleared for the lifetime of a tracker.

use std::collections::VecDeque;

use bitvec::prelude::*;

use crate::model::{LinkIdx, NodeIdx, Path};
use crate::scope::Scope;

/// Result of applying a path's in-scope nodes/links to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyResult {
    /// Number of node bits newly flipped.
    pub nodes_added: usize,
    /// Number of link bits newly flipped.
    pub links_added: usize,
    /// Change in the overall coverage fraction caused by this path.
    pub improvement: f64,
}

impl ApplyResult {
    /// Total number of bits newly flipped, nodes and links combined.
    pub fn total_added(&self) -> usize {
        self.nodes_added + self.links_added
    }
}

/// Tracks which nodes and links have been visited by at least one accepted path this run.
#[derive(Debug, Clone)]
pub struct CoverageTracker {
    nodes: BitVec<u64, Lsb0>,
    links: BitVec<u64, Lsb0>,
    history: VecDeque<f64>,
    history_size: usize,
    best_coverage: f64,
    attempts_without_improvement: u64,
    min_improvement: f64,
}

impl CoverageTracker {
    /// Create a tracker sized to `scope`'s node/link counts, with all bits cleared.
    pub fn new(scope: &Scope, history_size: usize, min_improvement: f64) -> Self {
        Self {
            nodes: bitvec![u64, Lsb0; 0; scope.node_count()],
            links: bitvec![u64, Lsb0; 0; scope.link_count()],
            history: VecDeque::with_capacity(history_size.max(1)),
            history_size: history_size.max(1),
            best_coverage: 0.0,
            attempts_without_improvement: 0,
            min_improvement,
        }
    }

    /// `N`, the size of the node index space.
    pub fn node_universe(&self) -> usize {
        self.nodes.len()
    }

    /// `L`, the size of the link index space.
    pub fn link_universe(&self) -> usize {
        self.links.len()
    }

    /// Whether the node at dense index `idx` has been covered.
    pub fn node_covered(&self, idx: NodeIdx) -> bool {
        self.nodes.get(idx as usize).as_deref().copied().unwrap_or(false)
    }

    /// Whether the link at dense index `idx` has been covered.
    pub fn link_covered(&self, idx: LinkIdx) -> bool {
        self.links.get(idx as usize).as_deref().copied().unwrap_or(false)
    }

    fn in_scope_node_indices<'a>(&self, scope: &'a Scope, path: &'a Path) -> impl Iterator<Item = NodeIdx> + 'a {
        path.nodes.iter().filter_map(move |n| scope.node_index(*n))
    }

    fn in_scope_link_indices<'a>(&self, scope: &'a Scope, path: &'a Path) -> impl Iterator<Item = LinkIdx> + 'a {
        path.links.iter().filter_map(move |l| scope.link_index(*l))
    }

    /// Without mutating state, returns `true` iff at least one node or link in `path` maps to
    /// an index whose bit is currently zero. Out-of-scope ids are skipped, not an error.
    pub fn would_improve(&self, scope: &Scope, path: &Path) -> bool {
        self.in_scope_node_indices(scope, path)
            .any(|i| !self.nodes[i as usize])
            || self
                .in_scope_link_indices(scope, path)
                .any(|i| !self.links[i as usize])
    }

    /// Set bits for each in-scope node/link index in `path`. Returns counts of bits newly
    /// flipped and the resulting change in overall coverage fraction.
    pub fn apply(&mut self, scope: &Scope, path: &Path) -> ApplyResult {
        let before = self.coverage();

        let mut nodes_added = 0usize;
        for i in self.in_scope_node_indices(scope, path).collect::<Vec<_>>() {
            let mut bit = self.nodes.get_mut(i as usize).expect("index within scope");
            if !*bit {
                *bit = true;
                nodes_added += 1;
            }
        }

        let mut links_added = 0usize;
        for i in self.in_scope_link_indices(scope, path).collect::<Vec<_>>() {
            let mut bit = self.links.get_mut(i as usize).expect("index within scope");
            if !*bit {
                *bit = true;
                links_added += 1;
            }
        }

        let after = self.coverage();
        self.best_coverage = self.best_coverage.max(after);

        ApplyResult {
            nodes_added,
            links_added,
            improvement: after - before,
        }
    }

    /// `(popcount_nodes + popcount_links) / (N + L)`. Returns `0` when `N + L = 0`.
    pub fn coverage(&self) -> f64 {
        let total = self.nodes.len() + self.links.len();
        if total == 0 {
            return 0.0;
        }
        let covered = self.nodes.count_ones() + self.links.count_ones();
        covered as f64 / total as f64
    }

    /// Highest coverage fraction observed so far.
    pub fn best_coverage(&self) -> f64 {
        self.best_coverage
    }

    /// Push the current coverage into the bounded FIFO, and recompute
    /// `attempts_without_improvement` against `min_coverage_improvement`.
    pub fn record_observation(&mut self) {
        let current = self.coverage();
        if self.history.len() == self.history_size {
            self.history.pop_front();
        }
        let improved = self
            .history
            .back()
            .map(|prev| current - prev >= self.min_improvement)
            .unwrap_or(current > 0.0);
        self.history.push_back(current);

        if improved {
            self.attempts_without_improvement = 0;
        } else {
            self.attempts_without_improvement += 1;
        }
    }

    /// Number of consecutive observations that failed to improve coverage by at least
    /// `min_coverage_improvement`.
    pub fn attempts_without_improvement(&self) -> u64 {
        self.attempts_without_improvement
    }

    /// `true` iff `attempts_without_improvement >= threshold`.
    pub fn is_plateau(&self, threshold: u64) -> bool {
        self.attempts_without_improvement >= threshold
    }

    /// Reset the plateau counter, e.g. after stepping the relaxation ladder.
    pub fn reset_plateau(&mut self) {
        self.attempts_without_improvement = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, ScopeFilter};
    use crate::model::{LinkId, LinkRecord, NodeId, NodeRecord};

    fn triangle_scope() -> Scope {
        let mut cat = InMemoryCatalog::new();
        for id in [1, 2, 3] {
            cat.add_node(NodeRecord {
                id: NodeId(id),
                utility_no: None,
                data_code: None,
                markers: None,
                reference: None,
                is_virtual: false,
                is_equipment_logical: false,
                is_used: true,
            });
        }
        for (id, s, e) in [(10, 1, 2), (11, 2, 3), (12, 1, 3)] {
            cat.add_link(LinkRecord {
                id: LinkId(id),
                start_node: NodeId(s),
                end_node: NodeId(e),
                bidirected: true,
                cost: Some(1.0),
                length_mm: Some(1.0),
            });
        }
        Scope::resolve(&cat, ScopeFilter::default()).unwrap()
    }

    fn path(nodes: &[u64], links: &[u64]) -> Path {
        Path {
            nodes: nodes.iter().map(|n| NodeId(*n)).collect(),
            links: links.iter().map(|l| LinkId(*l)).collect(),
            total_cost: 0.0,
            total_length_mm: 0.0,
            data_codes: Default::default(),
            utility_nos: Default::default(),
            references: Default::default(),
        }
    }

    #[test]
    fn would_improve_matches_apply() {
        let scope = triangle_scope();
        let mut tracker = CoverageTracker::new(&scope, 10, 0.01);
        let p = path(&[1, 2], &[10]);
        assert!(tracker.would_improve(&scope, &p));
        let result = tracker.apply(&scope, &p);
        assert!(result.total_added() > 0);
        assert!(!tracker.would_improve(&scope, &p));
    }

    #[test]
    fn coverage_is_monotone() {
        let scope = triangle_scope();
        let mut tracker = CoverageTracker::new(&scope, 10, 0.01);
        let mut last = tracker.coverage();
        for p in [path(&[1, 2], &[10]), path(&[2, 3], &[11]), path(&[1, 3], &[12])] {
            tracker.apply(&scope, &p);
            let now = tracker.coverage();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(tracker.coverage(), 1.0);
    }

    #[test]
    fn out_of_scope_ids_are_silently_skipped() {
        let scope = triangle_scope();
        let mut tracker = CoverageTracker::new(&scope, 10, 0.01);
        let p = path(&[1, 999], &[10, 999]);
        // should not panic, and should still count the in-scope bits
        let result = tracker.apply(&scope, &p);
        assert_eq!(result.nodes_added, 1);
        assert_eq!(result.links_added, 1);
    }

    #[test]
    fn plateau_detection() {
        let scope = triangle_scope();
        let mut tracker = CoverageTracker::new(&scope, 10, 0.5);
        for _ in 0..3 {
            tracker.record_observation();
        }
        assert!(tracker.is_plateau(3));
        assert!(!tracker.is_plateau(4));
    }
}
