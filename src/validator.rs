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

//! # Validator
//!
//! Given a persisted [`Path`], emits zero or more [`ValidationError`]s covering five check
//! families: connectivity, utility consistency, PoC configuration, structural shape, and
//! performance/data quality. The validator is pure with respect to the graph and catalog — it
//! never mutates them. Aggregated findings are deduplicated by `(test_code, object_kind,
//! object_id)` before being returned; the path "passes" iff nothing critical survives that
//! dedup pass.
//!
//! The allowed-utility-transition table (spec Open Question (a)) is supplied by the caller as
//! an [`AllowedTransitions`] map rather than hardcoded — grounded in
//! `original_source/versioned/managers/v005/validation_manager.py`'s `_is_valid_utility_transition`,
//! whose inline map the source itself labels as something that "would be configurable in a
//! real system".

use std::collections::{HashMap, HashSet};

use crate::catalog::Catalog;
use crate::model::{CheckScope, NodeId, ObjectKind, Path, Poc, RunId, Severity, ValidationError};
use crate::scope::Scope;

/// `(from_utility, to_utility) -> allowed` table consulted by the utility-consistency family.
/// Never hardcoded in this crate; load it from whatever config source fits (spec Open
/// Question (a)).
#[derive(Debug, Clone, Default)]
pub struct AllowedTransitions(HashMap<(i64, i64), bool>);

impl AllowedTransitions {
    /// An empty table: every non-trivial utility transition is rejected unless bridged by an
    /// equipment-logical node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `from -> to` as an allowed utility transition.
    pub fn allow(&mut self, from: i64, to: i64) -> &mut Self {
        self.0.insert((from, to), true);
        self
    }

    /// Whether `from -> to` is an allowed transition.
    pub fn is_allowed(&self, from: i64, to: i64) -> bool {
        self.0.get(&(from, to)).copied().unwrap_or(false)
    }
}

/// Tunables for checks whose thresholds the spec leaves as "a configurable threshold".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorConfig {
    /// Path length (node count) above which a performance warning is raised.
    pub long_path_node_threshold: usize,
    /// Link-to-node ratio above which a complexity warning is raised.
    pub complexity_ratio_threshold: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            long_path_node_threshold: 200,
            complexity_ratio_threshold: 1.5,
        }
    }
}

/// Runs the full check suite over a discovered [`Path`].
#[derive(Debug)]
pub struct Validator<'c, C> {
    catalog: &'c C,
    transitions: AllowedTransitions,
    config: ValidatorConfig,
    /// Total degree (link endpoints touching the node) of every in-scope node, used by the
    /// "redundant node" structural check. Built once at construction from the full in-scope
    /// link table rather than scanned per path.
    degree: HashMap<NodeId, usize>,
}

impl<'c, C: Catalog> Validator<'c, C> {
    /// Build a validator over `scope`'s in-scope links, consulting `transitions` for the
    /// utility-consistency family.
    pub fn build(catalog: &'c C, scope: &Scope, transitions: AllowedTransitions, config: ValidatorConfig) -> Self {
        let mut degree: HashMap<NodeId, usize> = HashMap::new();
        for &link_id in scope.links() {
            if let Some(link) = catalog.link(link_id) {
                *degree.entry(link.start_node).or_insert(0) += 1;
                *degree.entry(link.end_node).or_insert(0) += 1;
            }
        }
        Self {
            catalog,
            transitions,
            config,
            degree,
        }
    }

    /// Validate `path`, whose endpoints were sampled as `start_poc`/`end_poc`. `path_id` is
    /// the id the path was persisted under, if already known.
    pub fn validate(
        &self,
        run_id: RunId,
        path_id: Option<u64>,
        path: &Path,
        start_poc: &Poc,
        end_poc: &Poc,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.check_connectivity(run_id, path_id, path, &mut errors);
        self.check_utility(run_id, path_id, path, &mut errors);
        self.check_poc_configuration(run_id, path_id, start_poc, "start", &mut errors);
        self.check_poc_configuration(run_id, path_id, end_poc, "end", &mut errors);
        self.check_structural(run_id, path_id, path, &mut errors);
        self.check_performance(run_id, path_id, path, &mut errors);

        let mut seen: HashSet<(&'static str, ObjectKind, u64)> = HashSet::new();
        errors.retain(|e| seen.insert(e.dedup_key()));
        errors
    }

    /// `true` iff no error in `errors` has [`Severity::Critical`].
    pub fn passed(errors: &[ValidationError]) -> bool {
        !errors.iter().any(|e| e.severity == Severity::Critical)
    }

    fn push(
        &self,
        errors: &mut Vec<ValidationError>,
        run_id: RunId,
        path_id: Option<u64>,
        test_code: &'static str,
        severity: Severity,
        scope: CheckScope,
        error_type: &str,
        object_kind: ObjectKind,
        object_id: u64,
        message: String,
    ) {
        errors.push(ValidationError {
            run_id,
            path_id,
            test_code,
            severity,
            scope,
            error_type: error_type.to_string(),
            object_kind,
            object_id,
            message,
            payload: None,
        });
    }

    fn check_connectivity(&self, run_id: RunId, path_id: Option<u64>, path: &Path, errors: &mut Vec<ValidationError>) {
        if path.node_count() < 2 {
            self.push(
                errors,
                run_id,
                path_id,
                "connectivity/too_short",
                Severity::Critical,
                CheckScope::Connectivity,
                "too_short",
                ObjectKind::Path,
                0,
                "path must contain at least two nodes".into(),
            );
        }
        if path.links.is_empty() {
            self.push(
                errors,
                run_id,
                path_id,
                "connectivity/no_links",
                Severity::Critical,
                CheckScope::Connectivity,
                "no_links",
                ObjectKind::Path,
                0,
                "path must contain at least one link".into(),
            );
        }
        if path.link_count() != path.node_count().saturating_sub(1) {
            self.push(
                errors,
                run_id,
                path_id,
                "connectivity/count_mismatch",
                Severity::Critical,
                CheckScope::Connectivity,
                "count_mismatch",
                ObjectKind::Path,
                0,
                format!(
                    "link_count ({}) must equal node_count - 1 ({})",
                    path.link_count(),
                    path.node_count().saturating_sub(1)
                ),
            );
        }

        for &node_id in &path.nodes {
            if self.catalog.node(node_id).is_none() {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "connectivity/missing_node",
                    Severity::Critical,
                    CheckScope::Connectivity,
                    "missing_node",
                    ObjectKind::Node,
                    node_id.0,
                    format!("node {node_id} does not exist in the catalog"),
                );
            }
        }

        for (i, &link_id) in path.links.iter().enumerate() {
            let Some(link) = self.catalog.link(link_id) else {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "connectivity/missing_link",
                    Severity::Critical,
                    CheckScope::Connectivity,
                    "missing_link",
                    ObjectKind::Link,
                    link_id.0,
                    format!("link {link_id} does not exist in the catalog"),
                );
                continue;
            };
            let (Some(&from), Some(&to)) = (path.nodes.get(i), path.nodes.get(i + 1)) else {
                continue;
            };
            let forward = link.start_node == from && link.end_node == to;
            let backward = link.bidirected && link.start_node == to && link.end_node == from;
            if !forward && !backward {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "connectivity/direction_mismatch",
                    Severity::High,
                    CheckScope::Connectivity,
                    "direction_mismatch",
                    ObjectKind::Link,
                    link_id.0,
                    format!("link {link_id} does not connect {from} -> {to} in an allowed direction"),
                );
            }
        }
    }

    fn check_utility(&self, run_id: RunId, path_id: Option<u64>, path: &Path, errors: &mut Vec<ValidationError>) {
        let nodes: Vec<_> = path
            .nodes
            .iter()
            .map(|&id| (id, self.catalog.node(id)))
            .collect();

        for (node_id, record) in &nodes {
            let Some(record) = record else { continue };
            let needs_utility = !record.is_virtual && !record.is_equipment_logical && record.is_used;
            if needs_utility && record.utility_no.is_none() {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "utility/missing_utility",
                    Severity::High,
                    CheckScope::Utility,
                    "missing_utility",
                    ObjectKind::Node,
                    node_id.0,
                    format!("node {node_id} should carry a utility but has none"),
                );
            }
        }

        for w in nodes.windows(2) {
            let [(from_id, from), (to_id, to)] = w else { continue };
            let (Some(from), Some(to)) = (from, to) else { continue };
            let (Some(fu), Some(tu)) = (from.utility_no, to.utility_no) else { continue };
            if fu == tu {
                continue;
            }
            let bridged = from.is_equipment_logical || to.is_equipment_logical;
            if !bridged && !self.transitions.is_allowed(fu, tu) {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "utility/invalid_transition",
                    Severity::High,
                    CheckScope::Utility,
                    "invalid_transition",
                    ObjectKind::Node,
                    from_id.0,
                    format!("invalid utility transition {fu} -> {tu} between nodes {from_id} and {to_id}"),
                );
            }
        }

        for w in nodes.windows(3) {
            let [(_, prev), (mid_id, mid), (_, next)] = w else { continue };
            let (Some(prev), Some(mid), Some(next)) = (prev, mid, next) else { continue };
            let (Some(pu), Some(mu), Some(nu)) = (prev.utility_no, mid.utility_no, next.utility_no) else { continue };
            if pu == nu && mu != pu {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "utility/segment_inconsistency",
                    Severity::Medium,
                    CheckScope::Utility,
                    "segment_inconsistency",
                    ObjectKind::Node,
                    mid_id.0,
                    format!("node {mid_id} breaks an otherwise-consistent utility segment ({pu})"),
                );
            }
        }
    }

    fn check_poc_configuration(
        &self,
        run_id: RunId,
        path_id: Option<u64>,
        poc: &Poc,
        which: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        if !poc.is_used {
            self.push(
                errors,
                run_id,
                path_id,
                "poc/not_used",
                Severity::High,
                CheckScope::Qa,
                "not_used",
                ObjectKind::Poc,
                poc.id.0,
                format!("{which} PoC {} is not marked as used", poc.id),
            );
            return;
        }
        if poc.utility_no.is_none() {
            self.push(
                errors,
                run_id,
                path_id,
                "poc/missing_utility",
                Severity::Medium,
                CheckScope::Qa,
                "missing_utility",
                ObjectKind::Poc,
                poc.id.0,
                format!("{which} PoC {} is missing a utility number", poc.id),
            );
        }
        if poc.markers.as_deref().unwrap_or("").is_empty() {
            self.push(
                errors,
                run_id,
                path_id,
                "poc/missing_markers",
                Severity::Medium,
                CheckScope::Qa,
                "missing_markers",
                ObjectKind::Poc,
                poc.id.0,
                format!("{which} PoC {} is missing markers", poc.id),
            );
        }
        if poc.reference.as_deref().unwrap_or("").is_empty() {
            self.push(
                errors,
                run_id,
                path_id,
                "poc/missing_reference",
                Severity::Medium,
                CheckScope::Qa,
                "missing_reference",
                ObjectKind::Poc,
                poc.id.0,
                format!("{which} PoC {} is missing a reference", poc.id),
            );
        }
        if poc.is_loopback {
            self.push(
                errors,
                run_id,
                path_id,
                "poc/loopback_endpoint",
                Severity::Low,
                CheckScope::Qa,
                "loopback_endpoint",
                ObjectKind::Poc,
                poc.id.0,
                format!("{which} PoC {} is a loopback PoC", poc.id),
            );
        }
    }

    fn check_structural(&self, run_id: RunId, path_id: Option<u64>, path: &Path, errors: &mut Vec<ValidationError>) {
        if path.total_length_mm <= 0.0 {
            self.push(
                errors,
                run_id,
                path_id,
                "structural/invalid_length",
                Severity::Medium,
                CheckScope::Structural,
                "invalid_length",
                ObjectKind::Path,
                0,
                format!("invalid path length: {}mm", path.total_length_mm),
            );
        }
        if path.total_cost < 0.0 {
            self.push(
                errors,
                run_id,
                path_id,
                "structural/negative_cost",
                Severity::Low,
                CheckScope::Structural,
                "negative_cost",
                ObjectKind::Path,
                0,
                format!("negative path cost: {}", path.total_cost),
            );
        }

        let mut seen_nodes: HashSet<NodeId> = HashSet::new();
        for &node_id in &path.nodes {
            if !seen_nodes.insert(node_id) {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "structural/potential_cycle",
                    Severity::Medium,
                    CheckScope::Structural,
                    "potential_cycle",
                    ObjectKind::Node,
                    node_id.0,
                    format!("node {node_id} appears more than once in the path"),
                );
            }
        }

        if path.node_count() > 2 {
            for &node_id in &path.nodes[1..path.node_count() - 1] {
                if self.degree.get(&node_id).copied().unwrap_or(0) <= 2 {
                    self.push(
                        errors,
                        run_id,
                        path_id,
                        "structural/redundant_node",
                        Severity::Low,
                        CheckScope::Structural,
                        "redundant_node",
                        ObjectKind::Node,
                        node_id.0,
                        format!("interior node {node_id} has degree <= 2 in the full topology"),
                    );
                }
            }
        }
    }

    fn check_performance(&self, run_id: RunId, path_id: Option<u64>, path: &Path, errors: &mut Vec<ValidationError>) {
        if path.node_count() > self.config.long_path_node_threshold {
            self.push(
                errors,
                run_id,
                path_id,
                "performance/long_path",
                Severity::Low,
                CheckScope::Performance,
                "long_path",
                ObjectKind::Path,
                0,
                format!(
                    "path has {} nodes, above the configured threshold of {}",
                    path.node_count(),
                    self.config.long_path_node_threshold
                ),
            );
        }

        if path.node_count() > 0 {
            let ratio = path.link_count() as f64 / path.node_count() as f64;
            if ratio > self.config.complexity_ratio_threshold {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "performance/unusual_topology",
                    Severity::Low,
                    CheckScope::Performance,
                    "unusual_topology",
                    ObjectKind::Path,
                    0,
                    format!("unusual link-to-node ratio: {ratio:.2}"),
                );
            }
        }

        for &node_id in &path.nodes {
            let Some(record) = self.catalog.node(node_id) else { continue };
            if record.data_code.is_none() {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "performance/missing_data_code",
                    Severity::Info,
                    CheckScope::Performance,
                    "missing_data_code",
                    ObjectKind::Node,
                    node_id.0,
                    format!("node {node_id} has no data code"),
                );
            }
            if record.markers.as_deref().unwrap_or("").is_empty() {
                self.push(
                    errors,
                    run_id,
                    path_id,
                    "performance/missing_markers",
                    Severity::Info,
                    CheckScope::Performance,
                    "missing_markers",
                    ObjectKind::Node,
                    node_id.0,
                    format!("node {node_id} has no markers"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, ScopeFilter};
    use crate::model::{EquipmentId, LinkId, LinkRecord, NodeRecord, PocId};

    fn node(id: u64, utility: Option<i64>, equipment_logical: bool) -> NodeRecord {
        NodeRecord {
            id: NodeId(id),
            utility_no: utility,
            data_code: Some(1),
            markers: Some("m".into()),
            reference: Some("r".into()),
            is_virtual: false,
            is_equipment_logical: equipment_logical,
            is_used: true,
        }
    }

    fn poc(id: u64) -> Poc {
        Poc {
            id: PocId(id),
            equipment_id: EquipmentId(id),
            node_id: NodeId(id),
            utility_no: Some(1),
            reference: Some("ref".into()),
            markers: Some("mk".into()),
            is_used: true,
            is_loopback: false,
        }
    }

    #[test]
    fn valid_two_node_path_has_no_errors() {
        let mut cat = InMemoryCatalog::new();
        cat.add_node(node(1, Some(1), false));
        cat.add_node(node(2, Some(1), false));
        cat.add_link(LinkRecord {
            id: LinkId(10),
            start_node: NodeId(1),
            end_node: NodeId(2),
            bidirected: true,
            cost: Some(3.0),
            length_mm: Some(100.0),
        });
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let validator = Validator::build(&cat, &scope, AllowedTransitions::new(), ValidatorConfig::default());

        let path = Path {
            nodes: vec![NodeId(1), NodeId(2)],
            links: vec![LinkId(10)],
            total_cost: 3.0,
            total_length_mm: 100.0,
            data_codes: Default::default(),
            utility_nos: Default::default(),
            references: Default::default(),
        };
        let errors = validator.validate(RunId::new(), None, &path, &poc(1), &poc(2));
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn invalid_utility_transition_is_flagged() {
        let mut cat = InMemoryCatalog::new();
        cat.add_node(node(1, Some(1), false));
        cat.add_node(node(2, Some(2), false));
        cat.add_node(node(3, Some(2), false));
        cat.add_link(LinkRecord {
            id: LinkId(10),
            start_node: NodeId(1),
            end_node: NodeId(2),
            bidirected: true,
            cost: Some(1.0),
            length_mm: Some(1.0),
        });
        cat.add_link(LinkRecord {
            id: LinkId(11),
            start_node: NodeId(2),
            end_node: NodeId(3),
            bidirected: true,
            cost: Some(1.0),
            length_mm: Some(1.0),
        });
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let validator = Validator::build(&cat, &scope, AllowedTransitions::new(), ValidatorConfig::default());

        let path = Path {
            nodes: vec![NodeId(1), NodeId(2), NodeId(3)],
            links: vec![LinkId(10), LinkId(11)],
            total_cost: 2.0,
            total_length_mm: 2.0,
            data_codes: Default::default(),
            utility_nos: Default::default(),
            references: Default::default(),
        };
        let errors = validator.validate(RunId::new(), None, &path, &poc(1), &poc(3));
        assert!(errors.iter().any(|e| e.test_code == "utility/invalid_transition"));
        assert!(Validator::<InMemoryCatalog>::passed(&errors));
    }

    #[test]
    fn missing_poc_fields_each_produce_an_error() {
        let mut cat = InMemoryCatalog::new();
        cat.add_node(node(1, Some(1), false));
        cat.add_node(node(2, Some(1), false));
        cat.add_link(LinkRecord {
            id: LinkId(10),
            start_node: NodeId(1),
            end_node: NodeId(2),
            bidirected: true,
            cost: Some(1.0),
            length_mm: Some(1.0),
        });
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let validator = Validator::build(&cat, &scope, AllowedTransitions::new(), ValidatorConfig::default());

        let path = Path {
            nodes: vec![NodeId(1), NodeId(2)],
            links: vec![LinkId(10)],
            total_cost: 1.0,
            total_length_mm: 1.0,
            data_codes: Default::default(),
            utility_nos: Default::default(),
            references: Default::default(),
        };
        let mut bare = poc(1);
        bare.utility_no = None;
        bare.markers = None;
        bare.reference = None;
        let errors = validator.validate(RunId::new(), None, &path, &bare, &poc(2));
        assert!(errors.iter().any(|e| e.test_code == "poc/missing_utility"));
        assert!(errors.iter().any(|e| e.test_code == "poc/missing_markers"));
        assert!(errors.iter().any(|e| e.test_code == "poc/missing_reference"));
    }

    #[test]
    fn missing_link_is_critical_and_fails_the_path() {
        let mut cat = InMemoryCatalog::new();
        cat.add_node(node(1, Some(1), false));
        cat.add_node(node(2, Some(1), false));
        let scope = Scope::resolve(&cat, ScopeFilter::default()).unwrap();
        let validator = Validator::build(&cat, &scope, AllowedTransitions::new(), ValidatorConfig::default());

        let path = Path {
            nodes: vec![NodeId(1), NodeId(2)],
            links: vec![LinkId(10)],
            total_cost: 1.0,
            total_length_mm: 1.0,
            data_codes: Default::default(),
            utility_nos: Default::default(),
            references: Default::default(),
        };
        let errors = validator.validate(RunId::new(), None, &path, &poc(1), &poc(2));
        assert!(errors.iter().any(|e| e.test_code == "connectivity/missing_link"));
        assert!(!Validator::<InMemoryCatalog>::passed(&errors));
    }
}
