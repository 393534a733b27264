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

//! Error taxonomy for the sampling pipeline.
//!
//! Per-attempt conditions (`NoPath`, a duplicate hash, a validation finding) are not errors:
//! they are recovered locally and folded into [`crate::model::SamplingMetrics`] or a
//! [`ValidationError`](crate::model::ValidationError) record. Only scope/universe
//! construction failures and cooperative stop signals ever escape
//! [`crate::driver::SamplingDriver::run`].

use thiserror::Error;

/// Scope resolution failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// The resolved scope contains neither nodes nor links.
    #[error("scope resolved to zero nodes and zero links")]
    Empty,
}

/// Sampling universe construction failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UniverseError {
    /// Fewer than two eligible toolsets/equipments exist to form any pair.
    #[error("fewer than two eligible toolsets or equipments are available in scope")]
    TooSmall,
}

/// A write to an external sink failed.
#[derive(Error, Debug)]
#[error("sink error: {0}")]
pub struct SinkError(pub String);

/// Errors that can escape the outer sampling loop.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The scope resolved to an empty universe; the driver refuses to start.
    #[error("scope error: {0}")]
    Scope(#[from] ScopeError),
    /// The sampling universe is too small to ever produce a pair.
    #[error("universe error: {0}")]
    Universe(#[from] UniverseError),
    /// A persistence sink rejected a write.
    #[error("persistence error: {0}")]
    Sink(#[from] SinkError),
    /// The caller's cancellation signal fired.
    #[error("run was cancelled")]
    Cancelled,
    /// The run-wide timeout elapsed.
    #[error("run timed out")]
    TimedOut,
}
