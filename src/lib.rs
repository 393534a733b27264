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

#![deny(missing_docs, missing_debug_implementations)]

//! # PathSample
//!
//! A coverage-driven path sampler over equipment networks. Given a catalog of nodes, links,
//! toolsets, equipments and their points of connection (PoCs), this crate repeatedly samples
//! pairs of PoCs, finds a connecting path, and keeps only the paths that extend overall node
//! and link coverage, until a target coverage fraction is reached or progress plateaus.
//!
//! ## Main Concepts
//!
//! A run starts from a [`catalog::Catalog`] implementation supplied by the caller (this crate
//! ships [`catalog::InMemoryCatalog`] as a small reference/test implementation) and a
//! [`config::RunConfig`]. The [`scope::Scope`] resolver turns the catalog's node/link ids into a
//! dense index space that the [`coverage::CoverageTracker`]'s bitsets are sized against. The
//! [`universe::SamplingUniverse`] preloads the eligible toolset/equipment/PoC hierarchy once per
//! run, and the [`sampler::BiasedSampler`] draws PoC pairs from it under per-toolset and
//! per-equipment attempt caps with diversity and minimum-distance acceptance rules (see
//! [`distance`]). The [`pathfinder::PathFinder`] turns a pair into a concrete [`model::Path`]
//! over a [`petgraph`] adjacency view built once from the in-scope link table; discovered paths
//! are deduplicated within a run by content hash ([`hasher`]) and checked against five families
//! of structural and semantic rules by the [`validator::Validator`].
//!
//! The [`driver::SamplingDriver`] ties all of the above into the outer sampling loop and is the
//! only type most callers need to construct directly. It writes through three small traits —
//! [`persistence::PathSink`], [`persistence::CoverageSink`], [`persistence::ValidationSink`] —
//! so this crate never depends on a concrete storage engine.
//!
//! ## Example usage
//!
//! ```
//! use pathsample::catalog::InMemoryCatalog;
//! use pathsample::config::RunConfig;
//! use pathsample::driver::sample_run;
//! use pathsample::model::{Equipment, EquipmentId, LinkId, LinkRecord, NodeId, NodeRecord, Poc, PocId, Toolset, ToolsetId};
//! use pathsample::persistence::NullSink;
//! use pathsample::validator::AllowedTransitions;
//!
//! let mut catalog = InMemoryCatalog::new();
//! catalog.add_node(NodeRecord {
//!     id: NodeId(1),
//!     utility_no: None,
//!     data_code: None,
//!     markers: None,
//!     reference: None,
//!     is_virtual: false,
//!     is_equipment_logical: false,
//!     is_used: true,
//! });
//! catalog.add_node(NodeRecord {
//!     id: NodeId(2),
//!     utility_no: None,
//!     data_code: None,
//!     markers: None,
//!     reference: None,
//!     is_virtual: false,
//!     is_equipment_logical: false,
//!     is_used: true,
//! });
//! catalog.add_link(LinkRecord {
//!     id: LinkId(10),
//!     start_node: NodeId(1),
//!     end_node: NodeId(2),
//!     bidirected: true,
//!     cost: Some(1.0),
//!     length_mm: Some(10.0),
//! });
//! catalog.add_toolset(Toolset {
//!     id: ToolsetId(1),
//!     name: "TS1".into(),
//!     fab_no: None,
//!     phase_no: None,
//!     model_no: None,
//!     e2e_group_no: None,
//!     is_active: true,
//! });
//! for (eq, node) in [(1u64, 1u64), (2u64, 2u64)] {
//!     catalog.add_equipment(Equipment {
//!         id: EquipmentId(eq),
//!         toolset_id: ToolsetId(1),
//!         data_code: None,
//!         is_active: true,
//!     });
//!     catalog.add_poc(Poc {
//!         id: PocId(eq),
//!         equipment_id: EquipmentId(eq),
//!         node_id: NodeId(node),
//!         utility_no: None,
//!         reference: Some("ref".into()),
//!         markers: Some("mk".into()),
//!         is_used: true,
//!         is_loopback: false,
//!     });
//! }
//!
//! let mut config = RunConfig::default();
//! config.bias_reduction.min_distance_between_nodes = 0;
//! config.bias_reduction.utility_diversity_weight = 0.0;
//! config.bias_reduction.phase_diversity_weight = 0.0;
//!
//! let mut sink = NullSink::default();
//! let outcome = sample_run(&catalog, config, AllowedTransitions::new(), 1, &mut sink, &mut || false, None);
//! assert_eq!(outcome.final_coverage, 1.0);
//! ```
//!
//! ## Optional Features
//!
//! - `parallel` (enabled by default): adds [`rayon`] as a dependency and exposes
//!   [`driver::parallel`], which parallelizes only the Path Finder stage of a batch of attempts
//!   while funneling acceptance back through the same sequential coverage/dedup logic the
//!   non-parallel loop uses.

pub mod catalog;
pub mod config;
pub mod coverage;
pub mod distance;
pub mod driver;
pub mod error;
pub mod hasher;
pub mod model;
pub mod pathfinder;
pub mod persistence;
pub mod sampler;
pub mod scope;
pub mod universe;
pub mod validator;
