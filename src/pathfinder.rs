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

//! # Path Finder
//!
//! Bounded breadth-first traversal over the adjacency view rebuilt once per run from the
//! in-scope link table. A link with `bidirected = true` admits traversal in either direction;
//! otherwise only `start -> end`. Neighbors are visited in ascending link-id order so that
//! identical graphs produce identical paths for the same `(s, t)` — the adjacency list is
//! sorted explicitly at build time rather than relying on [`petgraph`]'s own edge order, which
//! is insertion-order dependent.
//!
//! No global visited set is kept across attempts: each call to [`PathFinder::find`] starts
//! fresh, and the Finder does not maintain back-pointers from nodes to links — the adjacency
//! view built here is the only index.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;

use crate::catalog::Catalog;
use crate::model::{LinkId, NodeId, Path};
use crate::scope::Scope;

type Graph = StableDiGraph<NodeId, LinkId, u32>;

/// The subset of a node's catalog fields the Finder needs to populate a [`Path`]'s derived
/// sets (distinct data codes, utility numbers, and references gathered from traversed nodes),
/// cached once at build time so reconstructing a path never re-queries the catalog.
#[derive(Debug, Clone, Default)]
struct NodeMeta {
    data_code: Option<i64>,
    utility_no: Option<i64>,
    reference: Option<String>,
}

/// Discovers bounded-depth paths between two node ids over a run's in-scope link table.
#[derive(Debug, Clone)]
pub struct PathFinder {
    graph: Graph,
    node_index: HashMap<NodeId, NodeIndex<u32>>,
    adjacency: HashMap<NodeIndex<u32>, Vec<(NodeIndex<u32>, LinkId)>>,
    costs: HashMap<LinkId, f64>,
    lengths: HashMap<LinkId, f64>,
    node_meta: HashMap<NodeId, NodeMeta>,
    depth_limit: usize,
}

impl PathFinder {
    /// Build the adjacency view for `scope` from `catalog`, bounding BFS traversals at
    /// `depth_limit` hops (default: 50).
    pub fn build(catalog: &impl Catalog, scope: &Scope, depth_limit: usize) -> Self {
        let mut graph: Graph = StableDiGraph::default();
        let mut node_index = HashMap::new();
        let mut costs = HashMap::new();
        let mut lengths = HashMap::new();

        let mut node_meta = HashMap::new();
        for &node_id in scope.nodes() {
            let idx = graph.add_node(node_id);
            node_index.insert(node_id, idx);
            if let Some(record) = catalog.node(node_id) {
                node_meta.insert(
                    node_id,
                    NodeMeta {
                        data_code: record.data_code,
                        utility_no: record.utility_no,
                        reference: record.reference,
                    },
                );
            }
        }

        // Collect (from, to, link_id) triples first so we can sort per-node adjacency by
        // ascending link id before committing to the graph, independent of insertion order.
        let mut raw_edges: HashMap<NodeIndex<u32>, Vec<(NodeIndex<u32>, LinkId)>> = HashMap::new();

        for &link_id in scope.links() {
            let Some(link) = catalog.link(link_id) else {
                continue;
            };
            let (Some(&start), Some(&end)) = (
                node_index.get(&link.start_node),
                node_index.get(&link.end_node),
            ) else {
                continue;
            };

            costs.insert(link_id, link.cost.unwrap_or(0.0));
            lengths.insert(link_id, link.length_mm.unwrap_or(0.0));

            graph.add_edge(start, end, link_id);
            raw_edges.entry(start).or_default().push((end, link_id));
            if link.bidirected {
                graph.add_edge(end, start, link_id);
                raw_edges.entry(end).or_default().push((start, link_id));
            }
        }

        for neighbors in raw_edges.values_mut() {
            neighbors.sort_unstable_by_key(|(_, link_id)| link_id.0);
        }

        Self {
            graph,
            node_index,
            adjacency: raw_edges,
            costs,
            lengths,
            node_meta,
            depth_limit,
        }
    }

    /// Number of nodes in the adjacency view.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Find a path from `s` to `t`, or `None` if the target is unreachable within
    /// `depth_limit` hops or the frontier is exhausted first.
    pub fn find(&self, s: NodeId, t: NodeId) -> Option<Path> {
        let s_idx = *self.node_index.get(&s)?;
        let t_idx = *self.node_index.get(&t)?;
        if s_idx == t_idx {
            return None;
        }

        let mut visited: HashSet<NodeIndex<u32>> = HashSet::new();
        visited.insert(s_idx);
        let mut prev: HashMap<NodeIndex<u32>, (NodeIndex<u32>, LinkId)> = HashMap::new();
        let mut queue: VecDeque<(NodeIndex<u32>, usize)> = VecDeque::new();
        queue.push_back((s_idx, 0));

        while let Some((node, depth)) = queue.pop_front() {
            if node == t_idx {
                return Some(self.reconstruct(s_idx, t_idx, &prev));
            }
            if depth >= self.depth_limit {
                continue;
            }
            if let Some(neighbors) = self.adjacency.get(&node) {
                for &(next, link_id) in neighbors {
                    if visited.insert(next) {
                        prev.insert(next, (node, link_id));
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }

        None
    }

    fn reconstruct(
        &self,
        s_idx: NodeIndex<u32>,
        t_idx: NodeIndex<u32>,
        prev: &HashMap<NodeIndex<u32>, (NodeIndex<u32>, LinkId)>,
    ) -> Path {
        let mut nodes = vec![t_idx];
        let mut links = Vec::new();
        let mut cur = t_idx;
        while cur != s_idx {
            let (parent, link_id) = prev[&cur];
            links.push(link_id);
            nodes.push(parent);
            cur = parent;
        }
        nodes.reverse();
        links.reverse();

        let total_cost = links.iter().map(|l| self.costs.get(l).copied().unwrap_or(0.0)).sum();
        let total_length_mm = links
            .iter()
            .map(|l| self.lengths.get(l).copied().unwrap_or(0.0))
            .sum();

        let node_ids: Vec<NodeId> = nodes.iter().map(|idx| self.graph[*idx]).collect();

        let mut data_codes = std::collections::BTreeSet::new();
        let mut utility_nos = std::collections::BTreeSet::new();
        let mut references = std::collections::BTreeSet::new();
        for node_id in &node_ids {
            if let Some(meta) = self.node_meta.get(node_id) {
                if let Some(code) = meta.data_code {
                    data_codes.insert(code);
                }
                if let Some(utility) = meta.utility_no {
                    utility_nos.insert(utility);
                }
                if let Some(reference) = &meta.reference {
                    references.insert(reference.clone());
                }
            }
        }

        Path {
            nodes: node_ids,
            links,
            total_cost,
            total_length_mm,
            data_codes,
            utility_nos,
            references,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, ScopeFilter};
    use crate::model::{LinkRecord, NodeRecord};

    fn two_node_catalog() -> InMemoryCatalog {
        let mut cat = InMemoryCatalog::new();
        for id in [1, 2] {
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
        cat.add_link(LinkRecord {
            id: LinkId(10),
            start_node: NodeId(1),
            end_node: NodeId(2),
            bidirected: true,
            cost: Some(3.0),
            length_mm: Some(100.0),
        });
        cat
    }

    #[test]
    fn finds_two_node_path() {
        let cat = two_node_catalog();
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let finder = PathFinder::build(&cat, &scope, 50);
        let path = finder.find(NodeId(1), NodeId(2)).unwrap();
        assert_eq!(path.nodes, vec![NodeId(1), NodeId(2)]);
        assert_eq!(path.links, vec![LinkId(10)]);
        assert_eq!(path.total_cost, 3.0);
        assert_eq!(path.total_length_mm, 100.0);
    }

    #[test]
    fn derived_sets_are_gathered_from_traversed_nodes() {
        let mut cat = InMemoryCatalog::new();
        cat.add_node(NodeRecord {
            id: NodeId(1),
            utility_no: Some(7),
            data_code: Some(1),
            markers: None,
            reference: Some("drawing-A".into()),
            is_virtual: false,
            is_equipment_logical: false,
            is_used: true,
        });
        cat.add_node(NodeRecord {
            id: NodeId(2),
            utility_no: Some(7),
            data_code: Some(2),
            markers: None,
            reference: Some("drawing-B".into()),
            is_virtual: false,
            is_equipment_logical: false,
            is_used: true,
        });
        cat.add_link(LinkRecord {
            id: LinkId(10),
            start_node: NodeId(1),
            end_node: NodeId(2),
            bidirected: true,
            cost: Some(1.0),
            length_mm: Some(1.0),
        });
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let finder = PathFinder::build(&cat, &scope, 50);
        let path = finder.find(NodeId(1), NodeId(2)).unwrap();
        assert_eq!(path.data_codes, [1, 2].into_iter().collect());
        assert_eq!(path.utility_nos, [7].into_iter().collect());
        assert_eq!(
            path.references,
            ["drawing-A".to_string(), "drawing-B".to_string()].into_iter().collect()
        );
    }

    #[test]
    fn no_path_when_disconnected() {
        let mut cat = two_node_catalog();
        cat.links.clear();
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let finder = PathFinder::build(&cat, &scope, 50);
        assert!(finder.find(NodeId(1), NodeId(2)).is_none());
    }

    #[test]
    fn unidirectional_link_blocks_reverse_traversal() {
        let mut cat = two_node_catalog();
        cat.links.get_mut(&LinkId(10)).unwrap().bidirected = false;
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let finder = PathFinder::build(&cat, &scope, 50);
        assert!(finder.find(NodeId(1), NodeId(2)).is_some());
        assert!(finder.find(NodeId(2), NodeId(1)).is_none());
    }

    #[test]
    fn deterministic_tie_break_by_ascending_link_id() {
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
        // Two parallel options from 1: via link 20 to node 3 directly, and link 5 to node 2
        // then on to node 3 via link 6. With link ids sorted ascending, 5 is explored before
        // 20, but since both are one hop to different nodes the BFS still reaches 3 via the
        // shortest route (through 2) only if inserted with equal depth; here we simply check
        // reproducibility of the chosen route across repeated builds.
        cat.add_link(LinkRecord {
            id: LinkId(5),
            start_node: NodeId(1),
            end_node: NodeId(2),
            bidirected: true,
            cost: Some(1.0),
            length_mm: Some(1.0),
        });
        cat.add_link(LinkRecord {
            id: LinkId(6),
            start_node: NodeId(2),
            end_node: NodeId(3),
            bidirected: true,
            cost: Some(1.0),
            length_mm: Some(1.0),
        });
        cat.add_link(LinkRecord {
            id: LinkId(20),
            start_node: NodeId(1),
            end_node: NodeId(3),
            bidirected: true,
            cost: Some(1.0),
            length_mm: Some(1.0),
        });
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let a = PathFinder::build(&cat, &scope, 50).find(NodeId(1), NodeId(3));
        let b = PathFinder::build(&cat, &scope, 50).find(NodeId(1), NodeId(3));
        assert_eq!(a, b);
    }

    #[test]
    fn depth_limit_bounds_traversal() {
        let mut cat = InMemoryCatalog::new();
        for id in 1..=5 {
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
        for (link, s, e) in [(1, 1, 2), (2, 2, 3), (3, 3, 4), (4, 4, 5)] {
            cat.add_link(LinkRecord {
                id: LinkId(link),
                start_node: NodeId(s),
                end_node: NodeId(e),
                bidirected: false,
                cost: Some(1.0),
                length_mm: Some(1.0),
            });
        }
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        assert!(PathFinder::build(&cat, &scope, 4).find(NodeId(1), NodeId(5)).is_some());
        assert!(PathFinder::build(&cat, &scope, 2).find(NodeId(1), NodeId(5)).is_none());
    }
}
