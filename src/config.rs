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

//! Run configuration. This crate does not parse a config file itself (that belongs to the
//! caller's CLI/config layer) but every field here round-trips through `serde` so a caller can
//! load it from TOML, JSON, or environment variables with whatever crate fits their stack.

use serde::{Deserialize, Serialize};

use crate::catalog::ScopeFilter;

/// Bias-mitigation knobs for the [`crate::sampler::BiasedSampler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasReduction {
    /// Hard cap on attempts per toolset before its counter is eligible for reset.
    pub max_attempts_per_toolset: u32,
    /// Hard cap on attempts per equipment.
    pub max_attempts_per_equipment: u32,
    /// Minimum acceptable distance between the two sampled nodes.
    pub min_distance_between_nodes: u32,
    /// Probability of requiring the two PoCs to differ in utility.
    pub utility_diversity_weight: f64,
    /// Probability of requiring the two PoCs' equipments to differ in phase.
    pub phase_diversity_weight: f64,
    /// Consecutive non-improving observations before a run is considered plateaued.
    pub plateau_threshold: u64,
    /// Minimum coverage delta between observations to count as "improving".
    pub min_coverage_improvement: f64,
    /// Length of the coverage-history FIFO used for plateau detection.
    pub coverage_history_size: usize,
    /// When `true`, `min_distance_between_nodes` is measured as a numeric node-id delta
    /// instead of true BFS hop distance (kept only for bit-for-bit compatibility with runs
    /// generated before hop distance was implemented).
    pub legacy_distance: bool,
}

impl Default for BiasReduction {
    fn default() -> Self {
        Self {
            max_attempts_per_toolset: 5,
            max_attempts_per_equipment: 3,
            min_distance_between_nodes: 10,
            utility_diversity_weight: 0.3,
            phase_diversity_weight: 0.2,
            plateau_threshold: 50,
            min_coverage_improvement: 0.01,
            coverage_history_size: 10,
            legacy_distance: false,
        }
    }
}

/// Top-level configuration consumed by the [`crate::driver::SamplingDriver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Overall coverage fraction (nodes + links) at which the run stops successfully.
    pub coverage_target: f64,
    /// Scope filter restricting the sampling universe.
    pub scope: ScopeFilter,
    /// When `true`, the sampler draws the two PoCs from distinct toolsets.
    pub is_inter_toolset: bool,
    /// Bias-mitigation knobs.
    pub bias_reduction: BiasReduction,
    /// Number of relaxation-ladder steps allowed before declaring partial success.
    pub max_relaxation_levels: u32,
    /// Hard ceiling on total attempts, regardless of coverage progress.
    pub attempts_ceiling: u64,
    /// Maximum BFS depth the Path Finder will explore.
    pub bfs_depth_limit: usize,
    /// Maximum number of retries the Biased Sampler performs before giving up an attempt.
    pub sampler_outer_retries: u32,
    /// Step by which `min_distance_between_nodes` is decremented at each plateau.
    pub relaxation_step: u32,
    /// Floor below which `min_distance_between_nodes` will not be relaxed further.
    pub relaxation_floor: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            coverage_target: 0.9,
            scope: ScopeFilter::default(),
            is_inter_toolset: false,
            bias_reduction: BiasReduction::default(),
            max_relaxation_levels: 3,
            attempts_ceiling: 100_000,
            bfs_depth_limit: 50,
            sampler_outer_retries: 50,
            relaxation_step: 2,
            relaxation_floor: 1,
        }
    }
}
