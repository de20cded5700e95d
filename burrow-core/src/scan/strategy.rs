// How a depth level turns into work units

use crate::tree::{DiscoveryTree, NodeId};
use crate::wordlist::{CandidateSet, PermutationRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Identity of a unit of work: the frontier node it expands, the position of
/// its candidate in the [`CandidateSet`] and the word it tries. Duplicate
/// words under one parent still get distinct keys. Completed keys are stored
/// in the resume snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub parent: NodeId,
    pub candidate: usize,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub key: UnitKey,
    pub url: String,
}

pub trait ScanStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Number of depth levels to expand, starting at the root
    fn levels(&self) -> usize;

    /// Builds every unit for one frontier
    fn units(
        &self,
        tree: &DiscoveryTree,
        frontier: &[NodeId],
        candidates: &CandidateSet,
    ) -> Vec<WorkUnit>;
}

/// Frontier node x word, each kept response becomes a new directory to expand
#[derive(Debug, Clone)]
pub struct RecursiveStrategy {
    base: Url,
    max_depth: usize,
}

impl RecursiveStrategy {
    pub fn new(base: Url, max_depth: usize) -> Self {
        Self { base, max_depth }
    }
}

impl ScanStrategy for RecursiveStrategy {
    fn name(&self) -> &'static str {
        "recursive"
    }

    fn levels(&self) -> usize {
        self.max_depth
    }

    fn units(
        &self,
        tree: &DiscoveryTree,
        frontier: &[NodeId],
        candidates: &CandidateSet,
    ) -> Vec<WorkUnit> {
        let mut units = Vec::with_capacity(frontier.len() * candidates.len());
        for &parent in frontier {
            let prefix = tree.path(parent);
            for (index, candidate) in candidates.iter().enumerate() {
                let word = candidate.join("");
                let mut segments = prefix.clone();
                segments.push(word.as_str());
                let url = build_url(&self.base, &segments);

                units.push(WorkUnit {
                    key: UnitKey {
                        parent,
                        candidate: index,
                        word,
                    },
                    url,
                });
            }
        }
        units
    }
}

/// A single level of placeholder substitutions under the root. A maximum
/// depth of 0 expands nothing.
#[derive(Debug, Clone)]
pub struct ClassicStrategy {
    request: PermutationRequest,
    max_depth: usize,
}

impl ClassicStrategy {
    pub fn new(request: PermutationRequest, max_depth: usize) -> Self {
        Self { request, max_depth }
    }
}

impl ScanStrategy for ClassicStrategy {
    fn name(&self) -> &'static str {
        "classic"
    }

    fn levels(&self) -> usize {
        self.max_depth.min(1)
    }

    fn units(
        &self,
        tree: &DiscoveryTree,
        frontier: &[NodeId],
        candidates: &CandidateSet,
    ) -> Vec<WorkUnit> {
        let Some(root) = tree.root() else {
            return Vec::new();
        };
        if !frontier.contains(&root) {
            return Vec::new();
        }

        candidates
            .iter()
            .enumerate()
            .map(|(index, arrangement)| WorkUnit {
                key: UnitKey {
                    parent: root,
                    candidate: index,
                    word: arrangement.join(","),
                },
                url: self.request.substitute(&arrangement),
            })
            .collect()
    }
}

/// Appends path segments to the base URL's path, keeping one `/` between them
pub fn build_url(base: &Url, segments: &[&str]) -> String {
    let mut url = base.clone();

    let current_path = url.path().to_string();
    let mut path = if current_path.ends_with('/') {
        current_path
    } else {
        format!("{}/", current_path)
    };

    let joined: Vec<&str> = segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect();
    path.push_str(&joined.join("/"));

    url.set_path(&path);
    url.to_string()
}
