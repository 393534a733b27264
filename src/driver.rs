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

//! # Sampling Driver
//!
//! The outer loop: sample -> find -> dedup -> update coverage -> validate -> decide
//! stop/relax/continue. This is the only component that owns every other piece of the
//! pipeline and the only one whose errors can reach a caller — and even then, only for scope
//! or universe construction failures and cooperative stop signals.
//!
//! `apply(P)` on the [`CoverageTracker`] happens-before any subsequent `would_improve(P')`
//! because both calls are made from this single-threaded loop body; the optional
//! `run_parallel` only parallelizes the Path Finder stage and funnels results back through
//! this same sequential acceptance path.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::coverage::CoverageTracker;
use crate::distance::{DistanceOracle, HopDistanceOracle, LegacyIdDeltaOracle};
use crate::error::DriverError;
use crate::hasher::{hash_path, DedupIndex};
use crate::model::{PathRecord, RunId, SamplingMetrics};
use crate::pathfinder::PathFinder;
use crate::persistence::{CoverageSink, CoverageSummary, PathSink, ReviewFlag, TerminationReason, ValidationSink};
use crate::sampler::BiasedSampler;
use crate::scope::Scope;
use crate::universe::SamplingUniverse;
use crate::validator::{AllowedTransitions, Validator, ValidatorConfig};

/// The result of a completed (or stopped) sampling run, returned to the caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Why the run stopped.
    pub termination: TerminationReason,
    /// Accumulated per-run counters.
    pub metrics: SamplingMetrics,
    /// Final overall coverage fraction.
    pub final_coverage: f64,
    /// Wall-clock time spent in the loop.
    pub elapsed: Duration,
    /// The run's identifier.
    pub run_id: RunId,
}

#[derive(Debug, Clone)]
enum AnyDistanceOracle {
    Hop(HopDistanceOracle),
    Legacy(LegacyIdDeltaOracle),
}

impl DistanceOracle for AnyDistanceOracle {
    fn distance(&self, a: crate::model::NodeId, b: crate::model::NodeId, limit: u32) -> u32 {
        match self {
            AnyDistanceOracle::Hop(o) => o.distance(a, b, limit),
            AnyDistanceOracle::Legacy(o) => o.distance(a, b, limit),
        }
    }
}

/// Drives the outer sampling loop until coverage reaches the target, a relaxation ladder is
/// exhausted, or a hard attempt ceiling is hit.
#[derive(Debug)]
pub struct SamplingDriver<'c, C> {
    run_id: RunId,
    catalog: &'c C,
    scope: Scope,
    universe: SamplingUniverse,
    tracker: CoverageTracker,
    sampler: BiasedSampler,
    finder: PathFinder,
    dedup: DedupIndex,
    validator: Validator<'c, C>,
    distance: AnyDistanceOracle,
    config: RunConfig,
    metrics: SamplingMetrics,
    toolsets_seen: std::collections::HashSet<crate::model::ToolsetId>,
    relaxation_levels_used: u32,
}

impl<'c, C: Catalog> SamplingDriver<'c, C> {
    /// Build a driver for `config` against `catalog`. Fails fatally if the scope
    /// resolves empty or the sampling universe is too small to ever produce a pair.
    pub fn new(
        catalog: &'c C,
        config: RunConfig,
        transitions: AllowedTransitions,
        seed: u64,
    ) -> Result<Self, DriverError> {
        let run_id = RunId::new();
        let scope = Scope::resolve(catalog, config.scope.clone())?;
        let universe = SamplingUniverse::build(catalog, &config.scope)?;
        let tracker = CoverageTracker::new(
            &scope,
            config.bias_reduction.coverage_history_size,
            config.bias_reduction.min_coverage_improvement,
        );
        let finder = PathFinder::build(catalog, &scope, config.bfs_depth_limit);
        let distance = if config.bias_reduction.legacy_distance {
            AnyDistanceOracle::Legacy(LegacyIdDeltaOracle)
        } else {
            AnyDistanceOracle::Hop(HopDistanceOracle::build(catalog, &scope))
        };
        let sampler = BiasedSampler::new(seed, &config);
        let validator = Validator::build(catalog, &scope, transitions, ValidatorConfig::default());

        info!(
            "run {run_id}: scope resolved to {} nodes, {} links; universe has {} toolsets, {} equipments",
            scope.node_count(),
            scope.link_count(),
            universe.toolsets().len(),
            universe.equipment_count(),
        );

        Ok(Self {
            run_id,
            catalog,
            scope,
            universe,
            tracker,
            sampler,
            finder,
            dedup: DedupIndex::new(),
            validator,
            distance,
            config,
            metrics: SamplingMetrics::default(),
            toolsets_seen: std::collections::HashSet::new(),
            relaxation_levels_used: 0,
        })
    }

    /// The run's identifier.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Current overall coverage fraction.
    pub fn coverage(&self) -> f64 {
        self.tracker.coverage()
    }

    /// Accumulated metrics so far.
    pub fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }

    /// Run the outer loop to completion (or until cancelled/timed out), writing accepted
    /// paths, coverage, and validation findings through `sink`.
    ///
    /// `cancel` is polled once per iteration boundary: on the first `true` the current
    /// attempt's result is discarded and the run returns immediately with
    /// [`TerminationReason::Cancelled`].
    pub fn run<S>(&mut self, sink: &mut S, cancel: &mut dyn FnMut() -> bool, timeout: Option<Duration>) -> RunOutcome
    where
        S: PathSink + CoverageSink + ValidationSink,
    {
        let start = Instant::now();

        loop {
            if cancel() {
                return self.finish(TerminationReason::Cancelled, start);
            }
            if timeout.is_some_and(|t| start.elapsed() >= t) {
                return self.finish(TerminationReason::TimedOut, start);
            }
            if self.metrics.total_attempts >= self.config.attempts_ceiling {
                return self.finish(TerminationReason::AttemptsCeiling, start);
            }
            if self.tracker.coverage() >= self.config.coverage_target {
                return self.finish(TerminationReason::TargetReached, start);
            }

            if let Some(reason) = self.step(sink) {
                return self.finish(reason, start);
            }
        }
    }

    /// Runs exactly one loop iteration. Returns `Some(reason)` if the run should stop as a
    /// result of this iteration (plateau ladder exhausted).
    fn step<S>(&mut self, sink: &mut S) -> Option<TerminationReason>
    where
        S: PathSink + CoverageSink + ValidationSink,
    {
        self.metrics.total_attempts += 1;

        let Some(pair) = self.sampler.sample(&self.universe, &self.distance) else {
            self.metrics.failed_attempts += 1;
            return self.observe_and_maybe_relax();
        };

        let Some(path) = self.finder.find(pair.start.node_id, pair.end.node_id) else {
            self.metrics.failed_attempts += 1;
            if pair.start.is_used && pair.end.is_used {
                sink.flag_review(ReviewFlag::NoPathBetweenUsedPocs {
                    run_id: self.run_id,
                    start_node: pair.start.node_id,
                    end_node: pair.end.node_id,
                });
            }
            return self.observe_and_maybe_relax();
        };

        self.metrics.paths_found += 1;
        self.accept_path(&pair, path, sink);
        self.observe_and_maybe_relax()
    }

    /// Shared acceptance path used by both the sequential loop and the `parallel` batch
    /// replay: would_improve -> hash/dedup -> persist -> apply -> coverage/toolset bookkeeping
    /// -> validate. Assumes `self.metrics.paths_found` has already been incremented by the
    /// caller for this attempt.
    fn accept_path<S>(&mut self, pair: &crate::model::PocPair, path: crate::model::Path, sink: &mut S)
    where
        S: PathSink + CoverageSink + ValidationSink,
    {
        if !self.tracker.would_improve(&self.scope, &path) {
            debug!("run {}: path found but would not improve coverage", self.run_id);
            return;
        }

        let hash = hash_path(&path);
        if !self.dedup.insert(hash) {
            debug!("run {}: duplicate path (hash {:x})", self.run_id, hash);
            return;
        }

        let newly_covered_nodes: Vec<_> = path
            .nodes
            .iter()
            .filter(|&&n| self.scope.node_index(n).is_some_and(|i| !self.tracker.node_covered(i)))
            .copied()
            .collect();
        let newly_covered_links: Vec<_> = path
            .links
            .iter()
            .filter(|&&l| self.scope.link_index(l).is_some_and(|i| !self.tracker.link_covered(i)))
            .copied()
            .collect();

        let record = PathRecord {
            run_id: self.run_id,
            path: path.clone(),
            hash,
            start_poc: pair.start.id,
            end_poc: pair.end.id,
            start_equipment: pair.start.equipment_id,
            end_equipment: pair.end.equipment_id,
            source: "random".to_string(),
        };

        let path_id = match sink.persist(&record) {
            Ok(id) => Some(id.0),
            Err(err) => {
                warn!("run {}: persistence sink rejected path: {err}", self.run_id);
                None
            }
        };

        self.tracker.apply(&self.scope, &path);
        sink.record_covered(&newly_covered_nodes, &newly_covered_links);
        sink.update_summary(&CoverageSummary {
            run_id: self.run_id,
            total_nodes: self.scope.node_count(),
            total_links: self.scope.link_count(),
            covered_nodes: self.scope.nodes().iter().filter(|&&n| self.scope.node_index(n).is_some_and(|i| self.tracker.node_covered(i))).count(),
            covered_links: self.scope.links().iter().filter(|&&l| self.scope.link_index(l).is_some_and(|i| self.tracker.link_covered(i))).count(),
            coverage_fraction: self.tracker.coverage(),
            unique_paths: self.metrics.unique_paths + 1,
        });

        self.metrics.unique_paths += 1;
        if let Some(toolset) = self.universe.toolset_of_equipment(pair.start.equipment_id) {
            self.toolsets_seen.insert(toolset);
        }
        if let Some(toolset) = self.universe.toolset_of_equipment(pair.end.equipment_id) {
            self.toolsets_seen.insert(toolset);
        }
        self.metrics.toolsets_sampled = self.toolsets_seen.len() as u64;

        let errors = self.validator.validate(self.run_id, path_id, &path, &pair.start, &pair.end);
        if !errors.is_empty() {
            sink.persist_errors(&errors);
            for error in &errors {
                if error.severity == crate::model::Severity::Critical {
                    sink.flag_review(ReviewFlag::CriticalValidationError {
                        run_id: self.run_id,
                        path_id: crate::persistence::PathId(path_id.unwrap_or(0)),
                        error: error.clone(),
                    });
                }
            }
        }
    }

    fn observe_and_maybe_relax(&mut self) -> Option<TerminationReason> {
        self.tracker.record_observation();
        if !self.tracker.is_plateau(self.config.bias_reduction.plateau_threshold) {
            return None;
        }

        if self.relaxation_levels_used >= self.config.max_relaxation_levels {
            return Some(TerminationReason::PlateauExhausted);
        }

        self.relaxation_levels_used += 1;
        self.sampler
            .relax_min_distance(self.config.relaxation_step, self.config.relaxation_floor);
        self.tracker.reset_plateau();
        info!(
            "run {}: plateau detected, relaxing min_distance_between_nodes to {} (level {}/{})",
            self.run_id,
            self.sampler.min_distance(),
            self.relaxation_levels_used,
            self.config.max_relaxation_levels,
        );
        None
    }

    fn finish(&self, termination: TerminationReason, start: Instant) -> RunOutcome {
        info!(
            "run {}: terminated ({termination:?}) after {} attempts, coverage {:.4}",
            self.run_id,
            self.metrics.total_attempts,
            self.tracker.coverage(),
        );
        RunOutcome {
            termination,
            metrics: self.metrics.clone(),
            final_coverage: self.tracker.coverage(),
            elapsed: start.elapsed(),
            run_id: self.run_id,
        }
    }

    /// Reference to the underlying catalog, exposed for callers that need it after a run
    /// (e.g. to re-fetch records for reporting).
    pub fn catalog(&self) -> &'c C {
        self.catalog
    }
}

/// Convenience entry point for callers who don't need direct access to a live
/// [`SamplingDriver`]: builds the driver and runs it to completion, collapsing scope/universe
/// construction failures into a [`TerminationReason::UniverseEmpty`] outcome rather than a
/// separate error channel.
pub fn sample_run<C, S>(
    catalog: &C,
    config: RunConfig,
    transitions: AllowedTransitions,
    seed: u64,
    sink: &mut S,
    cancel: &mut dyn FnMut() -> bool,
    timeout: Option<Duration>,
) -> RunOutcome
where
    C: Catalog,
    S: PathSink + CoverageSink + ValidationSink,
{
    match SamplingDriver::new(catalog, config, transitions, seed) {
        Ok(mut driver) => driver.run(sink, cancel, timeout),
        Err(err) => {
            warn!("run refused to start: {err}");
            RunOutcome {
                termination: TerminationReason::UniverseEmpty,
                metrics: SamplingMetrics::default(),
                final_coverage: 0.0,
                elapsed: Duration::ZERO,
                run_id: RunId::new(),
            }
        }
    }
}

#[cfg(feature = "parallel")]
pub mod parallel {
    //! Additive `rayon`-backed attempt pool: each attempt's Path Finder call runs
    //! independently, but results are funneled back through the single sequential
    //! [`SamplingDriver::step`]-equivalent path so that `would_improve`/`apply` ordering is
    //! preserved exactly.
    use super::*;
    use rayon::prelude::*;

    impl<'c, C: Catalog + Sync> SamplingDriver<'c, C> {
        /// Like [`SamplingDriver::run`], but samples and finds paths for a batch of
        /// `batch_size` attempts concurrently on the `rayon` global pool before funneling the
        /// batch back through the ordinary sequential acceptance path one at a time.
        pub fn run_parallel<S>(
            &mut self,
            sink: &mut S,
            cancel: &mut dyn FnMut() -> bool,
            timeout: Option<Duration>,
            batch_size: usize,
        ) -> RunOutcome
        where
            S: PathSink + CoverageSink + ValidationSink,
        {
            let start = Instant::now();
            let batch_size = batch_size.max(1);

            loop {
                if cancel() {
                    return self.finish(TerminationReason::Cancelled, start);
                }
                if timeout.is_some_and(|t| start.elapsed() >= t) {
                    return self.finish(TerminationReason::TimedOut, start);
                }
                if self.metrics.total_attempts >= self.config.attempts_ceiling {
                    return self.finish(TerminationReason::AttemptsCeiling, start);
                }
                if self.tracker.coverage() >= self.config.coverage_target {
                    return self.finish(TerminationReason::TargetReached, start);
                }

                // `None` slots are attempts whose sampler draw failed outright (no eligible
                // pair); they still count as attempts, same as the sequential loop.
                let samples: Vec<Option<crate::model::PocPair>> = (0..batch_size)
                    .map(|_| self.sampler.sample(&self.universe, &self.distance))
                    .collect();

                // The Path Finder's adjacency view is read-only for the lifetime of the run,
                // so sharing `&self.finder` across threads is sound; only the result
                // collection crosses back to the single-owner acceptance path below.
                let found: Vec<Option<(crate::model::PocPair, Option<crate::model::Path>)>> = samples
                    .into_par_iter()
                    .map(|maybe_pair| {
                        maybe_pair.map(|pair| {
                            let path = self.finder.find(pair.start.node_id, pair.end.node_id);
                            (pair, path)
                        })
                    })
                    .collect();

                for item in found {
                    self.metrics.total_attempts += 1;
                    match item {
                        None => {
                            self.metrics.failed_attempts += 1;
                        }
                        Some((pair, None)) => {
                            self.metrics.failed_attempts += 1;
                            if pair.start.is_used && pair.end.is_used {
                                sink.flag_review(ReviewFlag::NoPathBetweenUsedPocs {
                                    run_id: self.run_id,
                                    start_node: pair.start.node_id,
                                    end_node: pair.end.node_id,
                                });
                            }
                        }
                        Some((pair, Some(path))) => self.accept_if_useful(&pair, path, sink),
                    }

                    if self.metrics.total_attempts >= self.config.attempts_ceiling {
                        return self.finish(TerminationReason::AttemptsCeiling, start);
                    }
                    if let Some(reason) = self.observe_and_maybe_relax() {
                        return self.finish(reason, start);
                    }
                    if self.tracker.coverage() >= self.config.coverage_target {
                        return self.finish(TerminationReason::TargetReached, start);
                    }
                }
            }
        }

        fn accept_if_useful<S>(&mut self, pair: &crate::model::PocPair, path: crate::model::Path, sink: &mut S)
        where
            S: PathSink + CoverageSink + ValidationSink,
        {
            self.metrics.paths_found += 1;
            self.accept_path(pair, path, sink);
        }
    }
}
