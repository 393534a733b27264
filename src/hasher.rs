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

//! # Path Hasher & Dedup Index
//!
//! Maps a [`Path`] to a stable 128-bit content hash such that two paths with identical node
//! and link sequences hash identically, and two materially different paths almost certainly do
//! not. The hash is sequence-sensitive (`[A, B]` and `[B, A]` hash differently) and
//! domain-stable across runs: a streaming SHA-256 digest over the little-endian-encoded id
//! sequences, separated by domain tags for `nodes` and `links`, truncated to its first 16
//! bytes.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::model::Path;

/// Compute the content hash identifying `path`.
pub fn hash_path(path: &Path) -> u128 {
    let mut hasher = Sha256::new();
    hasher.update(b"nodes");
    for node in &path.nodes {
        hasher.update(node.0.to_le_bytes());
    }
    hasher.update(b"links");
    for link in &path.links {
        hasher.update(link.0.to_le_bytes());
    }
    let digest = hasher.finalize();
    u128::from_le_bytes(digest[0..16].try_into().expect("sha256 digest is 32 bytes"))
}

/// Per-run set of content hashes already seen, used to decide whether a found path is new.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    seen: HashSet<u128>,
}

impl DedupIndex {
    /// Create an empty dedup index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `hash`, returning `true` if it is new to this run (and thus should be
    /// persisted), `false` if it was already seen (a duplicate; the attempt still counts).
    pub fn insert(&mut self, hash: u128) -> bool {
        self.seen.insert(hash)
    }

    /// Whether `hash` has already been seen this run.
    pub fn contains(&self, hash: u128) -> bool {
        self.seen.contains(&hash)
    }

    /// Number of distinct hashes seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no hash has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
