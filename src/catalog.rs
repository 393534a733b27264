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

//! The read-only external catalog interface.
//!
//! The core never depends on a concrete storage engine: the [`Scope`](crate::scope) resolver
//! and the [`SamplingUniverse`](crate::universe) are built against the [`Catalog`] trait, and
//! every method here is called at most once per run. A caller backs this with whatever
//! storage fits (SQL, a columnar store, or — as in the tests of this crate — plain in-memory
//! maps).

use crate::model::{Equipment, EquipmentId, LinkId, LinkRecord, NodeId, NodeRecord, Poc, Toolset, ToolsetId};

/// Filter describing the sampling universe for a run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScopeFilter {
    /// Restrict to a single fab.
    pub fab_no: Option<i64>,
    /// Restrict to a single phase.
    pub phase_no: Option<i64>,
    /// Restrict to a single model.
    pub model_no: Option<i64>,
    /// Restrict to a single end-to-end group.
    pub e2e_group_no: Option<i64>,
    /// Restrict to a single named toolset.
    pub toolset: Option<String>,
}

/// Read-only access to the equipment/network catalog.
pub trait Catalog {
    /// All node ids satisfying `filter`, in no particular order (the [`Scope`](crate::scope)
    /// resolver is responsible for sorting and deduplicating).
    fn nodes_matching(&self, filter: &ScopeFilter) -> Vec<NodeId>;

    /// All link ids whose both endpoints are contained in `in_scope_nodes`.
    fn links_matching(&self, in_scope_nodes: &[NodeId]) -> Vec<LinkId>;

    /// All toolsets satisfying `filter`.
    fn toolsets(&self, filter: &ScopeFilter) -> Vec<Toolset>;

    /// All active equipments belonging to `toolset`.
    fn equipments_of(&self, toolset: ToolsetId) -> Vec<Equipment>;

    /// All PoCs belonging to `equipment`.
    fn pocs_of(&self, equipment: EquipmentId) -> Vec<Poc>;

    /// Fetch a single node record.
    fn node(&self, id: NodeId) -> Option<NodeRecord>;

    /// Fetch a single link record.
    fn link(&self, id: LinkId) -> Option<LinkRecord>;
}

/// A plain in-memory [`Catalog`], used by this crate's own tests and suitable as a reference
/// implementation for small deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    /// Nodes keyed by id.
    pub nodes: std::collections::HashMap<NodeId, NodeRecord>,
    /// Links keyed by id.
    pub links: std::collections::HashMap<LinkId, LinkRecord>,
    /// Toolsets keyed by id.
    pub toolsets: std::collections::HashMap<ToolsetId, Toolset>,
    /// Equipments keyed by id.
    pub equipments: std::collections::HashMap<EquipmentId, Equipment>,
    /// PoCs keyed by owning equipment.
    pub pocs: std::collections::HashMap<EquipmentId, Vec<Poc>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node record.
    pub fn add_node(&mut self, node: NodeRecord) -> &mut Self {
        self.nodes.insert(node.id, node);
        self
    }

    /// Insert a link record.
    pub fn add_link(&mut self, link: LinkRecord) -> &mut Self {
        self.links.insert(link.id, link);
        self
    }

    /// Insert a toolset.
    pub fn add_toolset(&mut self, toolset: Toolset) -> &mut Self {
        self.toolsets.insert(toolset.id, toolset);
        self
    }

    /// Insert an equipment.
    pub fn add_equipment(&mut self, equipment: Equipment) -> &mut Self {
        self.equipments.insert(equipment.id, equipment);
        self
    }

    /// Insert a PoC under its owning equipment.
    pub fn add_poc(&mut self, poc: Poc) -> &mut Self {
        self.pocs.entry(poc.equipment_id).or_default().push(poc);
        self
    }

}

impl Catalog for InMemoryCatalog {
    fn nodes_matching(&self, filter: &ScopeFilter) -> Vec<NodeId> {
        let matching_toolsets: Vec<_> = self
            .toolsets
            .values()
            .filter(|t| {
                t.is_active
                    && filter.fab_no.map_or(true, |f| t.fab_no == Some(f))
                    && filter.phase_no.map_or(true, |p| t.phase_no == Some(p))
                    && filter.model_no.map_or(true, |m| t.model_no == Some(m))
                    && filter
                        .e2e_group_no
                        .map_or(true, |e| t.e2e_group_no == Some(e))
                    && filter.toolset.as_ref().map_or(true, |n| &t.name == n)
            })
            .map(|t| t.id)
            .collect();

        if self.toolsets.is_empty() {
            // No catalog-level toolset structure at all: fall back to returning every node,
            // letting a caller with a flat node catalog still resolve a scope.
            return self.nodes.keys().copied().collect();
        }

        let eligible_equipment_nodes: std::collections::HashSet<NodeId> = self
            .equipments
            .values()
            .filter(|e| matching_toolsets.contains(&e.toolset_id))
            .flat_map(|e| self.pocs.get(&e.id).into_iter().flatten())
            .map(|p| p.node_id)
            .collect();

        self.nodes
            .values()
            .filter(|n| eligible_equipment_nodes.contains(&n.id))
            .map(|n| n.id)
            .collect()
    }

    fn links_matching(&self, in_scope_nodes: &[NodeId]) -> Vec<LinkId> {
        let in_scope: std::collections::HashSet<_> = in_scope_nodes.iter().copied().collect();
        self.links
            .values()
            .filter(|l| in_scope.contains(&l.start_node) && in_scope.contains(&l.end_node))
            .map(|l| l.id)
            .collect()
    }

    fn toolsets(&self, filter: &ScopeFilter) -> Vec<Toolset> {
        self.toolsets
            .values()
            .filter(|t| {
                t.is_active
                    && filter.fab_no.map_or(true, |f| t.fab_no == Some(f))
                    && filter.phase_no.map_or(true, |p| t.phase_no == Some(p))
                    && filter.model_no.map_or(true, |m| t.model_no == Some(m))
                    && filter
                        .e2e_group_no
                        .map_or(true, |e| t.e2e_group_no == Some(e))
                    && filter.toolset.as_ref().map_or(true, |n| &t.name == n)
            })
            .cloned()
            .collect()
    }

    fn equipments_of(&self, toolset: ToolsetId) -> Vec<Equipment> {
        self.equipments
            .values()
            .filter(|e| e.toolset_id == toolset && e.is_active)
            .cloned()
            .collect()
    }

    fn pocs_of(&self, equipment: EquipmentId) -> Vec<Poc> {
        self.pocs.get(&equipment).cloned().unwrap_or_default()
    }

    fn node(&self, id: NodeId) -> Option<NodeRecord> {
        self.nodes.get(&id).cloned()
    }

    fn link(&self, id: LinkId) -> Option<LinkRecord> {
        self.links.get(&id).cloned()
    }
}
