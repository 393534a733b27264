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

//! Module containing all type definitions shared across the sampling pipeline.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        /// Opaque catalog identifier.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(x: u64) -> Self {
                Self(x)
            }
        }
    };
}

id_newtype!(NodeId);
id_newtype!(LinkId);
id_newtype!(PocId);
id_newtype!(EquipmentId);
id_newtype!(ToolsetId);

/// Identifies a sampling run. Threaded through every persisted record and log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a fresh, random run id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense index into the node index space built by the [`crate::scope::Scope`] resolver.
pub type NodeIdx = u32;
/// Dense index into the link index space built by the [`crate::scope::Scope`] resolver.
pub type LinkIdx = u32;

/// A node (equipment connection point host) in the catalog graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Catalog identifier.
    pub id: NodeId,
    /// Utility carried by this node, if any (e.g. water, N2, steam).
    pub utility_no: Option<i64>,
    /// Data code classifying the node's equipment type.
    pub data_code: Option<i64>,
    /// Free-form marker string.
    pub markers: Option<String>,
    /// Free-form reference string (e.g. a drawing or equipment reference).
    pub reference: Option<String>,
    /// A virtual node does not correspond to a physical connection point.
    pub is_virtual: bool,
    /// An equipment-logical node represents an equipment's internal connectivity and is
    /// allowed to bridge utilities.
    pub is_equipment_logical: bool,
    /// Whether this node is actively used in the current topology.
    pub is_used: bool,
}

/// A link (edge) connecting two nodes in the catalog graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Catalog identifier.
    pub id: LinkId,
    /// Directed "from" endpoint.
    pub start_node: NodeId,
    /// Directed "to" endpoint.
    pub end_node: NodeId,
    /// Whether the link may also be traversed end -> start.
    pub bidirected: bool,
    /// Traversal cost, treated as zero when absent.
    pub cost: Option<f64>,
    /// Physical length in millimeters, treated as zero when absent.
    pub length_mm: Option<f64>,
}

/// A named grouping of equipments sharing a fab/phase/model context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toolset {
    /// Catalog identifier.
    pub id: ToolsetId,
    /// Human-readable code, e.g. `"ETCH-12"`.
    pub name: String,
    /// Fab filter dimension.
    pub fab_no: Option<i64>,
    /// Phase filter dimension.
    pub phase_no: Option<i64>,
    /// Model filter dimension.
    pub model_no: Option<i64>,
    /// End-to-end group filter dimension.
    pub e2e_group_no: Option<i64>,
    /// Whether the toolset is active in the catalog.
    pub is_active: bool,
}

/// A single piece of equipment, owning one or more PoCs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    /// Catalog identifier.
    pub id: EquipmentId,
    /// Owning toolset.
    pub toolset_id: ToolsetId,
    /// Data code classifying the equipment.
    pub data_code: Option<i64>,
    /// Whether the equipment is active in the catalog.
    pub is_active: bool,
}

/// A Point of Connection: a specific connection port on a piece of equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poc {
    /// Catalog identifier.
    pub id: PocId,
    /// Owning equipment.
    pub equipment_id: EquipmentId,
    /// Node this PoC sits on.
    pub node_id: NodeId,
    /// Utility carried by this PoC, if configured.
    pub utility_no: Option<i64>,
    /// Free-form reference string (e.g. a drawing reference).
    pub reference: Option<String>,
    /// Free-form marker string.
    pub markers: Option<String>,
    /// Whether this PoC is eligible for sampling.
    pub is_used: bool,
    /// Whether this PoC loops back onto the same equipment.
    pub is_loopback: bool,
}

/// An ordered pair of PoCs selected as a sampling attempt's endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PocPair {
    /// Starting PoC.
    pub start: Poc,
    /// Ending PoC.
    pub end: Poc,
}

/// A concrete path discovered between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Ordered node sequence, `nodes[0]` is the source, `nodes[last]` is the target.
    pub nodes: Vec<NodeId>,
    /// Ordered link sequence; `links[i]` connects `nodes[i]` and `nodes[i + 1]`.
    pub links: Vec<LinkId>,
    /// Sum of traversed link costs.
    pub total_cost: f64,
    /// Sum of traversed link lengths, in millimeters.
    pub total_length_mm: f64,
    /// Distinct data codes gathered from traversed nodes.
    pub data_codes: BTreeSet<i64>,
    /// Distinct utility numbers gathered from traversed nodes.
    pub utility_nos: BTreeSet<i64>,
    /// Distinct reference strings gathered from traversed nodes' PoCs.
    pub references: BTreeSet<String>,
}

impl Path {
    /// Number of nodes in the path.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links in the path.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The first node of the path, if any.
    pub fn source(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// The last node of the path, if any.
    pub fn target(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

/// A path together with the bookkeeping needed to persist it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRecord {
    /// Owning run.
    pub run_id: RunId,
    /// The discovered path.
    pub path: Path,
    /// Content hash used for within-run deduplication.
    pub hash: u128,
    /// Start PoC of the attempt that produced this path.
    pub start_poc: PocId,
    /// End PoC of the attempt that produced this path.
    pub end_poc: PocId,
    /// Equipment owning the start PoC.
    pub start_equipment: EquipmentId,
    /// Equipment owning the end PoC.
    pub end_equipment: EquipmentId,
    /// Provenance tag, e.g. `"random"`.
    pub source: String,
}

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Cosmetic / minor.
    Low,
    /// Worth fixing.
    Medium,
    /// Should be fixed soon.
    High,
    /// The path is considered failed.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Which check family produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckScope {
    /// Node/link/endpoint reachability checks.
    Connectivity,
    /// Utility-flow consistency checks.
    Utility,
    /// Material/equipment configuration checks.
    Material,
    /// Quality-assurance checks (PoC configuration).
    Qa,
    /// Structural shape checks (cycles, redundant nodes, length).
    Structural,
    /// Performance / data-quality checks.
    Performance,
}

/// The kind of object a [`ValidationError`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A node.
    Node,
    /// A link.
    Link,
    /// A PoC.
    Poc,
    /// The path as a whole.
    Path,
}

/// A single structural or semantic defect found in a path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Owning run.
    pub run_id: RunId,
    /// Identifier of the persisted path this finding belongs to, if already persisted.
    pub path_id: Option<u64>,
    /// Stable rule identifier, e.g. `"connectivity/link_direction"`.
    pub test_code: &'static str,
    /// Severity of the finding.
    pub severity: Severity,
    /// Check family that produced the finding.
    pub scope: CheckScope,
    /// Free-form error category tag, e.g. `"utility/invalid_transition"`.
    pub error_type: String,
    /// Kind of the object the finding targets.
    pub object_kind: ObjectKind,
    /// Identifier of the targeted object.
    pub object_id: u64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured payload (e.g. the two differing utility numbers).
    pub payload: Option<serde_json::Value>,
}

impl ValidationError {
    /// Dedup key used to collapse repeated findings: `(test_code, object_kind, object_id)`.
    pub fn dedup_key(&self) -> (&'static str, ObjectKind, u64) {
        (self.test_code, self.object_kind, self.object_id)
    }
}

/// Per-run counters updated by the [`crate::driver::SamplingDriver`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplingMetrics {
    /// Total number of attempts made (successful or not).
    pub total_attempts: u64,
    /// Number of attempts that produced a path (new or duplicate).
    pub paths_found: u64,
    /// Number of distinct paths accepted into the dedup index.
    pub unique_paths: u64,
    /// Number of attempts that produced no path or no sampler pair.
    pub failed_attempts: u64,
    /// Number of distinct toolsets that produced at least one accepted path.
    pub toolsets_sampled: u64,
}
