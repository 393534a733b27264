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

//! # Scope Resolver
//!
//! Translates a [`ScopeFilter`] into two dense index spaces (node-id -> index, link-id ->
//! index) that the rest of the pipeline addresses by `u32` rather than by catalog id. Sorted,
//! stable assignment makes the indexing reproducible across runs with identical filters, which
//! in turn makes bitset exports comparable.

use std::collections::HashMap;

use log::debug;

use crate::catalog::{Catalog, ScopeFilter};
use crate::error::ScopeError;
use crate::model::{LinkId, LinkIdx, NodeId, NodeIdx};

/// The resolved, read-only universe a run operates over.
#[derive(Debug, Clone)]
pub struct Scope {
    filter: ScopeFilter,
    node_index: HashMap<NodeId, NodeIdx>,
    link_index: HashMap<LinkId, LinkIdx>,
    nodes_by_index: Vec<NodeId>,
    links_by_index: Vec<LinkId>,
}

impl Scope {
    /// Resolve `filter` against `catalog`, producing a [`Scope`] with stable, sorted dense
    /// indexing.
    ///
    /// Fails with [`ScopeError::Empty`] when the resolved universe has neither nodes nor
    /// links; the driver refuses to start in that case.
    pub fn resolve(catalog: &impl Catalog, filter: ScopeFilter) -> Result<Self, ScopeError> {
        let mut nodes = catalog.nodes_matching(&filter);
        nodes.sort_unstable_by_key(|n| n.0);
        nodes.dedup();

        let mut links = catalog.links_matching(&nodes);
        links.sort_unstable_by_key(|l| l.0);
        links.dedup();

        if nodes.is_empty() && links.is_empty() {
            return Err(ScopeError::Empty);
        }

        debug!(
            "resolved scope: {} nodes, {} links (filter = {:?})",
            nodes.len(),
            links.len(),
            filter
        );

        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as NodeIdx))
            .collect();
        let link_index = links
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as LinkIdx))
            .collect();

        Ok(Self {
            filter,
            node_index,
            link_index,
            nodes_by_index: nodes,
            links_by_index: links,
        })
    }

    /// The filter this scope was resolved from.
    pub fn filter(&self) -> &ScopeFilter {
        &self.filter
    }

    /// Total number of in-scope nodes, `N`.
    pub fn node_count(&self) -> usize {
        self.nodes_by_index.len()
    }

    /// Total number of in-scope links, `L`.
    pub fn link_count(&self) -> usize {
        self.links_by_index.len()
    }

    /// Dense index of a node id, if in scope.
    pub fn node_index(&self, id: NodeId) -> Option<NodeIdx> {
        self.node_index.get(&id).copied()
    }

    /// Dense index of a link id, if in scope.
    pub fn link_index(&self, id: LinkId) -> Option<LinkIdx> {
        self.link_index.get(&id).copied()
    }

    /// Catalog node id for a dense index.
    pub fn node_id(&self, idx: NodeIdx) -> Option<NodeId> {
        self.nodes_by_index.get(idx as usize).copied()
    }

    /// Catalog link id for a dense index.
    pub fn link_id(&self, idx: LinkIdx) -> Option<LinkId> {
        self.links_by_index.get(idx as usize).copied()
    }

    /// All in-scope node ids, in ascending order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes_by_index
    }

    /// All in-scope link ids, in ascending order.
    pub fn links(&self) -> &[LinkId] {
        &self.links_by_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::model::{LinkRecord, NodeRecord};

    fn two_node_catalog() -> InMemoryCatalog {
        let mut cat = InMemoryCatalog::new();
        cat.add_node(NodeRecord {
            id: NodeId(2),
            utility_no: None,
            data_code: None,
            markers: None,
            reference: None,
            is_virtual: false,
            is_equipment_logical: false,
            is_used: true,
        });
        cat.add_node(NodeRecord {
            id: NodeId(1),
            utility_no: None,
            data_code: None,
            markers: None,
            reference: None,
            is_virtual: false,
            is_equipment_logical: false,
            is_used: true,
        });
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
    fn sorted_assignment_is_reproducible() {
        let cat = two_node_catalog();
        let a = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let b = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        assert_eq!(a.node_index(NodeId(1)), b.node_index(NodeId(1)));
        assert_eq!(a.node_index(NodeId(2)), b.node_index(NodeId(2)));
        // ascending sort puts node 1 before node 2 regardless of insertion order
        assert_eq!(a.node_index(NodeId(1)), Some(0));
        assert_eq!(a.node_index(NodeId(2)), Some(1));
    }

    #[test]
    fn empty_scope_is_an_error() {
        let cat = InMemoryCatalog::new();
        let err = Scope::resolve(&cat, ScopeFilter::default()).unwrap_err();
        assert_eq!(err, ScopeError::Empty);
    }

    #[test]
    fn link_in_scope_iff_both_endpoints_in_scope() {
        let cat = two_node_catalog();
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        assert_eq!(scope.link_count(), 1);
        assert_eq!(scope.link_index(LinkId(10)), Some(0));
    }
}
