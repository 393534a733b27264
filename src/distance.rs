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

//! Resolves the ambiguity in what `min_distance_between_nodes` measures: true graph hop
//! distance, or a numeric node-id delta. This crate treats hop distance as correct and
//! exposes the id-delta shortcut only as an explicit `legacy` mode, so callers who need
//! bug-for-bug compatibility with older runs can opt in.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::catalog::Catalog;
use crate::model::NodeId;
use crate::scope::Scope;

/// Something that can estimate the "distance" between two nodes for the diversity-acceptance
/// step of the [`crate::sampler::BiasedSampler`].
pub trait DistanceOracle {
    /// Estimated distance between `a` and `b`. Implementations are free to cap the search and
    /// return a value `>= limit` to mean "at least `limit`, possibly unreachable".
    fn distance(&self, a: NodeId, b: NodeId, limit: u32) -> u32;
}

/// True BFS hop distance over the in-scope adjacency (both link directions considered,
/// regardless of `bidirected`, since "distance" is a looser notion than traversability).
#[derive(Debug, Clone)]
pub struct HopDistanceOracle {
    adjacency: HashMap<NodeId, Vec<NodeId>>,
}

impl HopDistanceOracle {
    /// Build the oracle from every in-scope link, treating all links as undirected for the
    /// purpose of distance estimation.
    pub fn build(catalog: &impl Catalog, scope: &Scope) -> Self {
        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for &link_id in scope.links() {
            if let Some(link) = catalog.link(link_id) {
                adjacency.entry(link.start_node).or_default().push(link.end_node);
                adjacency.entry(link.end_node).or_default().push(link.start_node);
            }
        }
        Self { adjacency }
    }
}

impl DistanceOracle for HopDistanceOracle {
    fn distance(&self, a: NodeId, b: NodeId, limit: u32) -> u32 {
        if a == b {
            return 0;
        }
        let mut visited: HashSet<NodeId> = HashSet::from([a]);
        let mut queue: VecDeque<(NodeId, u32)> = VecDeque::from([(a, 0)]);
        while let Some((node, depth)) = queue.pop_front() {
            if depth >= limit {
                continue;
            }
            if let Some(neighbors) = self.adjacency.get(&node) {
                for &next in neighbors {
                    if next == b {
                        return depth + 1;
                    }
                    if visited.insert(next) {
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }
        limit
    }
}

/// Legacy shortcut: numeric node-id delta. Surfaced only for backward compatibility with runs
/// generated before hop distance was implemented correctly; new runs should prefer
/// [`HopDistanceOracle`].
#[derive(Debug, Clone, Copy)]
pub struct LegacyIdDeltaOracle;

impl DistanceOracle for LegacyIdDeltaOracle {
    fn distance(&self, a: NodeId, b: NodeId, _limit: u32) -> u32 {
        a.0.abs_diff(b.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, ScopeFilter};
    use crate::model::{LinkId, LinkRecord, NodeRecord};

    fn chain_catalog() -> InMemoryCatalog {
        let mut cat = InMemoryCatalog::new();
        for id in 1..=4 {
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
        for (link, s, e) in [(1, 1, 2), (2, 2, 3), (3, 3, 4)] {
            cat.add_link(LinkRecord {
                id: LinkId(link),
                start_node: NodeId(s),
                end_node: NodeId(e),
                bidirected: true,
                cost: Some(1.0),
                length_mm: Some(1.0),
            });
        }
        cat
    }

    #[test]
    fn hop_distance_counts_edges() {
        let cat = chain_catalog();
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let oracle = HopDistanceOracle::build(&cat, &scope);
        assert_eq!(oracle.distance(NodeId(1), NodeId(2), 10), 1);
        assert_eq!(oracle.distance(NodeId(1), NodeId(4), 10), 3);
        assert_eq!(oracle.distance(NodeId(1), NodeId(1), 10), 0);
    }

    #[test]
    fn legacy_oracle_uses_id_delta() {
        let oracle = LegacyIdDeltaOracle;
        assert_eq!(oracle.distance(NodeId(1), NodeId(10), 100), 9);
    }
}
