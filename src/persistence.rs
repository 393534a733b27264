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

//! External write-side interfaces: the relational persistence layer, coverage/validation
//! sinks, and run-lifecycle bookkeeping are all out of scope for this crate and are
//! expressed here only as traits. A caller backs these with whatever storage fits; this
//! crate's own tests use [`NullSink`], which discards everything and is useful for exercising
//! the driver without a real backend.

use crate::model::{LinkId, NodeId, PathRecord, RunId, ValidationError};

/// Stable identifier for a persisted path, returned by [`PathSink::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId(pub u64);

/// Why a sampling run stopped, reported back as part of [`RunOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// `coverage_target` was reached.
    TargetReached,
    /// The relaxation ladder was exhausted after repeated plateaus.
    PlateauExhausted,
    /// `attempts_ceiling` was hit.
    AttemptsCeiling,
    /// The sampling universe was empty or too small before the loop ever started.
    UniverseEmpty,
    /// The caller's cancellation signal fired mid-loop.
    Cancelled,
    /// The run-wide timeout elapsed mid-loop.
    TimedOut,
}

/// A flag raised for manual review: either a "no path found" between two used PoCs, or a
/// critical validation error on an accepted path.
#[derive(Debug, Clone)]
pub enum ReviewFlag {
    /// The Path Finder found no route between two PoCs that were both marked `is_used`.
    NoPathBetweenUsedPocs {
        /// Owning run.
        run_id: RunId,
        /// Start node of the failed attempt.
        start_node: NodeId,
        /// End node of the failed attempt.
        end_node: NodeId,
    },
    /// A persisted path produced at least one critical [`ValidationError`].
    CriticalValidationError {
        /// Owning run.
        run_id: RunId,
        /// The persisted path's id.
        path_id: PathId,
        /// The triggering error.
        error: ValidationError,
    },
}

/// Updatable per-run coverage summary, mirroring the external `(run_id, totals, covered,
/// percentages, unique_paths)` summary row a caller typically persists alongside a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSummary {
    /// Owning run.
    pub run_id: RunId,
    /// `N`, total in-scope nodes.
    pub total_nodes: usize,
    /// `L`, total in-scope links.
    pub total_links: usize,
    /// Distinct in-scope nodes covered so far.
    pub covered_nodes: usize,
    /// Distinct in-scope links covered so far.
    pub covered_links: usize,
    /// Overall coverage fraction, `(covered_nodes + covered_links) / (total_nodes +
    /// total_links)`.
    pub coverage_fraction: f64,
    /// Number of distinct accepted paths so far.
    pub unique_paths: u64,
}

/// Where discovered, deduplicated paths are written. Idempotent on `(run_id, hash)`: the
/// persistence layer is expected to tolerate a duplicate submission of the same content hash
/// without erroring.
pub trait PathSink {
    /// Persist `record`, returning a stable [`PathId`].
    fn persist(&mut self, record: &PathRecord) -> Result<PathId, crate::error::SinkError>;
}

/// Where newly covered node/link ids and the running summary are written.
pub trait CoverageSink {
    /// Record that `nodes` and `links` were newly covered by the run identified in
    /// `summary.run_id`.
    fn record_covered(&mut self, nodes: &[NodeId], links: &[LinkId]);

    /// Replace the run's summary row with `summary`.
    fn update_summary(&mut self, summary: &CoverageSummary);
}

/// Where validation findings and review flags are written.
pub trait ValidationSink {
    /// Persist a batch of validation findings for one path.
    fn persist_errors(&mut self, errors: &[ValidationError]);

    /// Raise a review flag for out-of-band follow-up.
    fn flag_review(&mut self, flag: ReviewFlag);
}

/// A [`PathSink`] + [`CoverageSink`] + [`ValidationSink`] that discards everything. Useful for
/// tests and for callers who only care about the returned [`RunOutcome`] and in-memory
/// metrics.
#[derive(Debug, Clone, Default)]
pub struct NullSink {
    next_path_id: u64,
}

impl PathSink for NullSink {
    fn persist(&mut self, _record: &PathRecord) -> Result<PathId, crate::error::SinkError> {
        self.next_path_id += 1;
        Ok(PathId(self.next_path_id))
    }
}

impl CoverageSink for NullSink {
    fn record_covered(&mut self, _nodes: &[NodeId], _links: &[LinkId]) {}
    fn update_summary(&mut self, _summary: &CoverageSummary) {}
}

impl ValidationSink for NullSink {
    fn persist_errors(&mut self, _errors: &[ValidationError]) {}
    fn flag_review(&mut self, _flag: ReviewFlag) {}
}
