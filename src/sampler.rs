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

//! # Biased Sampler
//!
//! Chooses a `(PoC_a, PoC_b)` pair under per-toolset/per-equipment attempt caps and
//! diversity weights. Counters are incremented on *selection*, not on success, so that a
//! difficult pair does not dominate the attempt budget: a rejected diversity or distance
//! check still consumes its share of the caps before the next retry.
//!
//! The sampler owns a seedable PRNG ([`StdRng`]) so that runs with the same seed, catalog,
//! and config reproduce identical metrics and paths.

use std::collections::HashMap;
use std::hash::Hash;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::{BiasReduction, RunConfig};
use crate::distance::DistanceOracle;
use crate::model::{EquipmentId, Poc, PocPair, ToolsetId};
use crate::universe::SamplingUniverse;

/// Chooses PoC pairs for the outer sampling loop, respecting hard attempt caps and
/// diversity weights.
#[derive(Debug)]
pub struct BiasedSampler {
    rng: StdRng,
    is_inter_toolset: bool,
    max_attempts_per_toolset: u32,
    max_attempts_per_equipment: u32,
    min_distance_between_nodes: u32,
    utility_diversity_weight: f64,
    phase_diversity_weight: f64,
    outer_retries: u32,
    toolset_attempts: HashMap<ToolsetId, u32>,
    equipment_attempts: HashMap<EquipmentId, u32>,
    poc_attempts: HashMap<crate::model::PocId, u32>,
}

impl BiasedSampler {
    /// Construct a sampler seeded deterministically from `seed`, taking its bias-reduction
    /// knobs from `config`.
    pub fn new(seed: u64, config: &RunConfig) -> Self {
        let bias: &BiasReduction = &config.bias_reduction;
        Self {
            rng: StdRng::seed_from_u64(seed),
            is_inter_toolset: config.is_inter_toolset,
            max_attempts_per_toolset: bias.max_attempts_per_toolset,
            max_attempts_per_equipment: bias.max_attempts_per_equipment,
            min_distance_between_nodes: bias.min_distance_between_nodes,
            utility_diversity_weight: bias.utility_diversity_weight,
            phase_diversity_weight: bias.phase_diversity_weight,
            outer_retries: config.sampler_outer_retries,
            toolset_attempts: HashMap::new(),
            equipment_attempts: HashMap::new(),
            poc_attempts: HashMap::new(),
        }
    }

    /// Current minimum accepted distance between sampled nodes.
    pub fn min_distance(&self) -> u32 {
        self.min_distance_between_nodes
    }

    /// Lower the minimum accepted distance, e.g. as a relaxation-ladder step. Never goes
    /// below `floor`.
    pub fn relax_min_distance(&mut self, step: u32, floor: u32) {
        self.min_distance_between_nodes = self.min_distance_between_nodes.saturating_sub(step).max(floor);
    }

    /// Attempt to produce a [`PocPair`], retrying internally up to the configured outer
    /// retry budget. Returns `None` if no acceptable pair was found within that budget.
    pub fn sample(
        &mut self,
        universe: &SamplingUniverse,
        distance: &impl DistanceOracle,
    ) -> Option<PocPair> {
        for _ in 0..self.outer_retries.max(1) {
            if let Some(pair) = self.try_once(universe, distance) {
                return Some(pair);
            }
        }
        None
    }

    fn try_once(
        &mut self,
        universe: &SamplingUniverse,
        distance: &impl DistanceOracle,
    ) -> Option<PocPair> {
        let (poc_a, phase_a, poc_b, phase_b) = if self.is_inter_toolset {
            self.pick_inter_toolset(universe)?
        } else {
            self.pick_intra_toolset(universe)?
        };

        if poc_a.node_id == poc_b.node_id {
            return None;
        }

        if self.utility_diversity_weight > 0.0
            && self.rng.gen_bool(self.utility_diversity_weight)
            && !differs(poc_a.utility_no, poc_b.utility_no)
        {
            return None;
        }

        if self.phase_diversity_weight > 0.0
            && self.rng.gen_bool(self.phase_diversity_weight)
            && !differs(phase_a, phase_b)
        {
            return None;
        }

        let hop = distance.distance(poc_a.node_id, poc_b.node_id, self.min_distance_between_nodes);
        if hop < self.min_distance_between_nodes {
            return None;
        }

        Some(PocPair {
            start: poc_a,
            end: poc_b,
        })
    }

    fn pick_intra_toolset(&mut self, universe: &SamplingUniverse) -> Option<(Poc, Option<i64>, Poc, Option<i64>)> {
        let toolsets = universe.toolsets();
        if toolsets.is_empty() {
            return None;
        }
        let toolset_ids: Vec<ToolsetId> = toolsets.iter().map(|t| t.id).collect();
        let toolset_id = pick_capped(
            &mut self.rng,
            &toolset_ids,
            &mut self.toolset_attempts,
            self.max_attempts_per_toolset,
        )?;

        let equipments = universe.equipments_of(toolset_id);
        if equipments.len() < 2 {
            return None;
        }
        let equipment_ids: Vec<EquipmentId> = equipments.iter().map(|e| e.id).collect();
        let (eq_a, eq_b) = pick_pair_capped(
            &mut self.rng,
            &equipment_ids,
            &mut self.equipment_attempts,
            self.max_attempts_per_equipment,
        )?;

        let phase = toolsets.iter().find(|t| t.id == toolset_id).and_then(|t| t.phase_no);
        let poc_a = self.pick_poc(universe, eq_a)?;
        let poc_b = self.pick_poc(universe, eq_b)?;
        Some((poc_a, phase, poc_b, phase))
    }

    fn pick_inter_toolset(&mut self, universe: &SamplingUniverse) -> Option<(Poc, Option<i64>, Poc, Option<i64>)> {
        let toolsets = universe.toolsets();
        if toolsets.len() < 2 {
            return None;
        }
        let toolset_ids: Vec<ToolsetId> = toolsets.iter().map(|t| t.id).collect();
        let (ts_a, ts_b) = pick_pair_capped(
            &mut self.rng,
            &toolset_ids,
            &mut self.toolset_attempts,
            self.max_attempts_per_toolset,
        )?;

        let eq_a = self.pick_equipment(universe, ts_a)?;
        let eq_b = self.pick_equipment(universe, ts_b)?;

        let phase_a = toolsets.iter().find(|t| t.id == ts_a).and_then(|t| t.phase_no);
        let phase_b = toolsets.iter().find(|t| t.id == ts_b).and_then(|t| t.phase_no);

        let poc_a = self.pick_poc(universe, eq_a)?;
        let poc_b = self.pick_poc(universe, eq_b)?;
        Some((poc_a, phase_a, poc_b, phase_b))
    }

    fn pick_equipment(&mut self, universe: &SamplingUniverse, toolset: ToolsetId) -> Option<EquipmentId> {
        let equipments = universe.equipments_of(toolset);
        if equipments.is_empty() {
            return None;
        }
        let ids: Vec<EquipmentId> = equipments.iter().map(|e| e.id).collect();
        pick_capped(
            &mut self.rng,
            &ids,
            &mut self.equipment_attempts,
            self.max_attempts_per_equipment,
        )
    }

    /// Picks one PoC from `equipment`. The universe already restricts PoCs to `is_used =
    /// true`, so the spec's "prefer used, otherwise uniform" preference is trivially
    /// satisfied here; selection among the used PoCs is uniform under the same
    /// attempt-cap/reset policy as toolsets and equipments.
    fn pick_poc(&mut self, universe: &SamplingUniverse, equipment: EquipmentId) -> Option<Poc> {
        let pocs = universe.pocs_of(equipment);
        if pocs.is_empty() {
            return None;
        }
        let ids: Vec<crate::model::PocId> = pocs.iter().map(|p| p.id).collect();
        let chosen = pick_capped(
            &mut self.rng,
            &ids,
            &mut self.poc_attempts,
            self.max_attempts_per_equipment,
        )?;
        pocs.iter().find(|p| p.id == chosen).cloned()
    }
}

/// `true` iff `a` and `b` are both present and unequal. Two absent values, or one absent and
/// one present, are not considered "differing" for diversity-acceptance purposes — there is
/// nothing to contrast against.
fn differs(a: Option<i64>, b: Option<i64>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x != y)
}

/// Pick one item uniformly from `items` whose attempt count is below `cap`. If every item is
/// at or above the cap, reset all counters to zero and pick among the full set — step 1/2 of
/// the sampling policy.
fn pick_capped<T: Copy + Eq + Hash>(
    rng: &mut StdRng,
    items: &[T],
    attempts: &mut HashMap<T, u32>,
    cap: u32,
) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let mut available: Vec<T> = items
        .iter()
        .copied()
        .filter(|it| *attempts.get(it).unwrap_or(&0) < cap)
        .collect();
    if available.is_empty() {
        for it in items {
            attempts.insert(*it, 0);
        }
        available = items.to_vec();
    }
    let chosen = *available.choose(rng)?;
    *attempts.entry(chosen).or_insert(0) += 1;
    Some(chosen)
}

/// Pick two distinct items from `items`, each under `pick_capped`'s cap/reset policy.
fn pick_pair_capped<T: Copy + Eq + Hash>(
    rng: &mut StdRng,
    items: &[T],
    attempts: &mut HashMap<T, u32>,
    cap: u32,
) -> Option<(T, T)> {
    if items.len() < 2 {
        return None;
    }
    let first = pick_capped(rng, items, attempts, cap)?;
    let remaining: Vec<T> = items.iter().copied().filter(|it| *it != first).collect();
    let second = pick_capped(rng, &remaining, attempts, cap)?;
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::distance::HopDistanceOracle;
    use crate::model::{Equipment, EquipmentId, NodeId, Poc, PocId, Toolset, ToolsetId};

    fn two_equipment_catalog() -> InMemoryCatalog {
        let mut cat = InMemoryCatalog::new();
        cat.add_toolset(Toolset {
            id: ToolsetId(1),
            name: "TS1".into(),
            fab_no: None,
            phase_no: Some(1),
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
                id: PocId(eq),
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
    fn two_equipment_universe_still_produces_a_pair() {
        let cat = two_equipment_catalog();
        let universe = SamplingUniverse::build(&cat, &crate::catalog::ScopeFilter::default()).unwrap();
        let scope = crate::scope::Scope::resolve(&cat, crate::catalog::ScopeFilter::default()).unwrap();
        let oracle = HopDistanceOracle::build(&cat, &scope);
        let mut config = RunConfig::default();
        config.bias_reduction.min_distance_between_nodes = 0;
        let mut sampler = BiasedSampler::new(42, &config);
        let pair = sampler.sample(&universe, &oracle);
        assert!(pair.is_some());
        let pair = pair.unwrap();
        assert_ne!(pair.start.equipment_id, pair.end.equipment_id);
    }

    #[test]
    fn reproducible_with_same_seed() {
        let cat = two_equipment_catalog();
        let universe = SamplingUniverse::build(&cat, &crate::catalog::ScopeFilter::default()).unwrap();
        let scope = crate::scope::Scope::resolve(&cat, crate::catalog::ScopeFilter::default()).unwrap();
        let oracle = HopDistanceOracle::build(&cat, &scope);
        let mut config = RunConfig::default();
        config.bias_reduction.min_distance_between_nodes = 0;

        let mut a = BiasedSampler::new(7, &config);
        let mut b = BiasedSampler::new(7, &config);
        let pa = a.sample(&universe, &oracle).unwrap();
        let pb = b.sample(&universe, &oracle).unwrap();
        assert_eq!(pa.start.id, pb.start.id);
        assert_eq!(pa.end.id, pb.end.id);
    }

    #[test]
    fn rejects_identical_nodes() {
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
        for eq in [1u64, 2u64] {
            cat.add_equipment(Equipment {
                id: EquipmentId(eq),
                toolset_id: ToolsetId(1),
                data_code: None,
                is_active: true,
            });
            // both equipments share node 1 -- every pair must be rejected
            cat.add_poc(Poc {
                id: PocId(eq),
                equipment_id: EquipmentId(eq),
                node_id: NodeId(1),
                utility_no: None,
                reference: None,
                markers: None,
                is_used: true,
                is_loopback: false,
            });
        }
        let universe = SamplingUniverse::build(&cat, &crate::catalog::ScopeFilter::default()).unwrap();
        let scope = crate::scope::Scope::resolve(&cat, crate::catalog::ScopeFilter::default()).unwrap();
        let oracle = HopDistanceOracle::build(&cat, &scope);
        let mut config = RunConfig::default();
        config.bias_reduction.min_distance_between_nodes = 0;
        config.sampler_outer_retries = 10;
        let mut sampler = BiasedSampler::new(1, &config);
        assert!(sampler.sample(&universe, &oracle).is_none());
    }
}
