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

//! # Sampling Universe
//!
//! A cached, filtered catalog of toolsets -> equipments -> PoCs eligible for selection, built
//! once at run start. Per-attempt catalog scans would dominate runtime; a single preloaded
//! universe pays for itself after roughly a hundred attempts.

use std::collections::HashMap;

use log::debug;

use crate::catalog::{Catalog, ScopeFilter};
use crate::error::UniverseError;
use crate::model::{Equipment, EquipmentId, Poc, Toolset, ToolsetId};

/// The preloaded, eligible slice of the catalog a run samples from.
#[derive(Debug, Clone)]
pub struct SamplingUniverse {
    toolsets: Vec<Toolset>,
    equipments_of_toolset: HashMap<ToolsetId, Vec<Equipment>>,
    pocs_of_equipment: HashMap<EquipmentId, Vec<Poc>>,
    toolset_of_equipment: HashMap<EquipmentId, ToolsetId>,
}

impl SamplingUniverse {
    /// Build the universe by querying `catalog` with `filter`.
    ///
    /// Equipments without at least one used PoC are dropped. Toolsets without at least two
    /// remaining equipments are dropped (they cannot form an intra-toolset pair). Fails with
    /// [`UniverseError::TooSmall`] when, after this filtering, fewer than two eligible
    /// toolsets/equipments capable of forming any pair remain.
    pub fn build(catalog: &impl Catalog, filter: &ScopeFilter) -> Result<Self, UniverseError> {
        let mut equipments_of_toolset: HashMap<ToolsetId, Vec<Equipment>> = HashMap::new();
        let mut pocs_of_equipment: HashMap<EquipmentId, Vec<Poc>> = HashMap::new();
        let mut toolset_of_equipment: HashMap<EquipmentId, ToolsetId> = HashMap::new();
        let mut toolsets = Vec::new();

        for toolset in catalog.toolsets(filter) {
            let mut eligible_equipments = Vec::new();
            for equipment in catalog.equipments_of(toolset.id) {
                let used_pocs: Vec<Poc> = catalog
                    .pocs_of(equipment.id)
                    .into_iter()
                    .filter(|p| p.is_used)
                    .collect();
                if used_pocs.is_empty() {
                    continue;
                }
                pocs_of_equipment.insert(equipment.id, used_pocs);
                toolset_of_equipment.insert(equipment.id, toolset.id);
                eligible_equipments.push(equipment);
            }

            if eligible_equipments.len() < 2 {
                continue;
            }

            equipments_of_toolset.insert(toolset.id, eligible_equipments);
            toolsets.push(toolset);
        }

        let total_equipments: usize = equipments_of_toolset.values().map(Vec::len).sum();
        let has_inter_toolset_pair = toolsets.len() >= 2;
        let has_intra_toolset_pair = equipments_of_toolset.values().any(|eqs| eqs.len() >= 2);

        if toolsets.is_empty() || total_equipments < 2 || !(has_inter_toolset_pair || has_intra_toolset_pair) {
            return Err(UniverseError::TooSmall);
        }

        debug!(
            "built sampling universe: {} toolsets, {} equipments",
            toolsets.len(),
            total_equipments
        );

        Ok(Self {
            toolsets,
            equipments_of_toolset,
            pocs_of_equipment,
            toolset_of_equipment,
        })
    }

    /// All eligible toolsets (each has at least two eligible equipments).
    pub fn toolsets(&self) -> &[Toolset] {
        &self.toolsets
    }

    /// Eligible equipments belonging to `toolset`.
    pub fn equipments_of(&self, toolset: ToolsetId) -> &[Equipment] {
        self.equipments_of_toolset
            .get(&toolset)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Used PoCs belonging to `equipment`.
    pub fn pocs_of(&self, equipment: EquipmentId) -> &[Poc] {
        self.pocs_of_equipment
            .get(&equipment)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of eligible equipments across all toolsets.
    pub fn equipment_count(&self) -> usize {
        self.equipments_of_toolset.values().map(Vec::len).sum()
    }

    /// The toolset owning `equipment`, if it is part of this universe.
    pub fn toolset_of_equipment(&self, equipment: EquipmentId) -> Option<ToolsetId> {
        self.toolset_of_equipment.get(&equipment).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::model::{EquipmentId, NodeId, ToolsetId};

    fn two_equipment_catalog() -> InMemoryCatalog {
        let mut cat = InMemoryCatalog::new();
        cat.add_toolset(Toolset {
            id: ToolsetId(1),
            name: "TS1".into(),
            fab_no: None,
            phase_no: None,
            model_no: None,
            e2e_group_no: None,
            is_active: true,
        });
        for (eq, node) in [(1u64, 1u64), (2u64, 2u64)] {
            cat.add_equipment(Equipment {
                id: EquipmentId(eq),
                toolset_id: ToolsetId(1),
                data_code: None,
                is_active: true,
            });
            cat.add_poc(Poc {
                id: crate::model::PocId(eq),
                equipment_id: EquipmentId(eq),
                node_id: NodeId(node),
                utility_no: None,
                reference: None,
                markers: None,
                is_used: true,
                is_loopback: false,
            });
        }
        cat
    }

    #[test]
    fn two_equipments_one_used_poc_each_is_sufficient() {
        let cat = two_equipment_catalog();
        let universe = SamplingUniverse::build(&cat, &ScopeFilter::default()).unwrap();
        assert_eq!(universe.toolsets().len(), 1);
        assert_eq!(universe.equipment_count(), 2);
    }

    #[test]
    fn equipment_without_used_poc_is_dropped() {
        let mut cat = two_equipment_catalog();
        cat.add_equipment(Equipment {
            id: EquipmentId(3),
            toolset_id: ToolsetId(1),
            data_code: None,
            is_active: true,
        });
        // equipment 3 has no PoCs at all
        let universe = SamplingUniverse::build(&cat, &ScopeFilter::default()).unwrap();
        assert_eq!(universe.equipment_count(), 2);
    }

    #[test]
    fn single_equipment_toolset_is_too_small() {
        let mut cat = InMemoryCatalog::new();
        cat.add_toolset(Toolset {
            id: ToolsetId(1),
            name: "TS1".into(),
            fab_no: None,
            phase_no: None,
            model_no: None,
            e2e_group_no: None,
            is_active: true,
        });
        cat.add_equipment(Equipment {
            id: EquipmentId(1),
            toolset_id: ToolsetId(1),
            data_code: None,
            is_active: true,
        });
        cat.add_poc(Poc {
            id: crate::model::PocId(1),
            equipment_id: EquipmentId(1),
            node_id: NodeId(1),
            utility_no: None,
            reference: None,
            markers: None,
            is_used: true,
            is_loopback: false,
        });
        let err = SamplingUniverse::build(&cat, &ScopeFilter::default()).unwrap_err();
        assert_eq!(err, UniverseError::TooSmall);
    }
}
