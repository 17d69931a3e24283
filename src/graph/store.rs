use std::collections::{HashMap, HashSet};

use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::batch::{AnalysisBatch, ItemKind, Rejected, weight_in_range};
use super::registry::SystemRegistry;
use super::snapshot::LinkRecord;
use crate::util::fuzzy_match_score;

/// An entity observed in one or more systems.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Unique system names in first-seen order. Never empty for a stored node.
    pub systems: Vec<String>,
    pub weight: f64,
}

impl Node {
    pub fn new(id: impl Into<String>, system: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            systems: vec![system.into()],
            weight,
        }
    }

    /// Whether [`GraphStore::replace`] can keep this node: a non-blank id, at
    /// least one non-blank system and a weight the layout can use.
    pub fn is_storable(&self) -> bool {
        !self.id.trim().is_empty()
            && weight_in_range(self.weight)
            && self.systems.iter().any(|system| !system.trim().is_empty())
    }

    pub fn in_system(&self, system: &str) -> bool {
        self.systems.iter().any(|name| name == system)
    }

    fn join_system(&mut self, system: &str) -> bool {
        if self.in_system(system) {
            return false;
        }
        self.systems.push(system.to_owned());
        true
    }

    fn leave_system(&mut self, system: &str) -> bool {
        let before = self.systems.len();
        self.systems.retain(|name| name != system);
        self.systems.len() != before
    }
}

/// A directed, labelled relationship. The whole triple is the identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub label: String,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub nodes_added: usize,
    pub nodes_updated: usize,
    pub links_added: usize,
    pub links_duplicate: usize,
    pub systems_registered: Vec<String>,
    pub rejected: Vec<Rejected>,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.nodes_added > 0
            || self.nodes_updated > 0
            || self.links_added > 0
            || !self.systems_registered.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PruneReport {
    pub system: String,
    pub nodes_detached: usize,
    pub nodes_removed: Vec<String>,
    pub links_removed: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReplaceReport {
    pub nodes: usize,
    pub links: usize,
    pub nodes_dropped: usize,
    pub links_dropped: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: i64,
}

/// The cumulative, deduplicated graph.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    index_by_id: HashMap<String, usize>,
    edges: Vec<Edge>,
    edge_keys: HashSet<Edge>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates a batch. Never removes anything, and applying the same batch
    /// again changes nothing.
    pub fn merge(&mut self, batch: &AnalysisBatch, registry: &mut SystemRegistry) -> MergeReport {
        let mut report = MergeReport::default();

        for (index, incoming) in batch.nodes.iter().enumerate() {
            if let Err(reason) = incoming.validate() {
                warn!(index, reason, "rejected batch node");
                report.rejected.push(Rejected {
                    kind: ItemKind::Node,
                    index,
                    reason: reason.to_owned(),
                });
                continue;
            }

            if !registry.contains(&incoming.system) {
                registry.register_if_absent(&incoming.system);
                report.systems_registered.push(incoming.system.clone());
            }

            if let Some(&slot) = self.index_by_id.get(&incoming.id) {
                let existing = &mut self.nodes[slot];
                let joined = existing.join_system(&incoming.system);
                let heavier = incoming.weight > existing.weight;
                if heavier {
                    existing.weight = incoming.weight;
                }
                if joined || heavier {
                    report.nodes_updated += 1;
                }
            } else {
                self.index_by_id
                    .insert(incoming.id.clone(), self.nodes.len());
                self.nodes.push(Node::new(
                    incoming.id.clone(),
                    incoming.system.clone(),
                    incoming.weight,
                ));
                report.nodes_added += 1;
            }
        }

        for (index, link) in batch.links.iter().enumerate() {
            if let Err(reason) = link.validate() {
                warn!(index, reason, "rejected batch link");
                report.rejected.push(Rejected {
                    kind: ItemKind::Link,
                    index,
                    reason: reason.to_owned(),
                });
                continue;
            }

            let edge = Edge::new(&link.source, &link.target, &link.label);
            if self.insert_edge(edge) {
                report.links_added += 1;
            } else {
                report.links_duplicate += 1;
            }
        }

        debug!(
            nodes_added = report.nodes_added,
            nodes_updated = report.nodes_updated,
            links_added = report.links_added,
            links_duplicate = report.links_duplicate,
            rejected = report.rejected.len(),
            "merged batch"
        );
        report
    }

    /// Detaches every node from `system`, drops nodes left without systems and
    /// every edge with a missing endpoint, then forgets the system.
    pub fn prune_system(&mut self, system: &str, registry: &mut SystemRegistry) -> PruneReport {
        let mut report = PruneReport {
            system: system.to_owned(),
            ..PruneReport::default()
        };

        for node in &mut self.nodes {
            if node.leave_system(system) {
                report.nodes_detached += 1;
            }
        }

        let mut removed = Vec::new();
        self.nodes.retain(|node| {
            if node.systems.is_empty() {
                removed.push(node.id.clone());
                false
            } else {
                true
            }
        });
        report.nodes_removed = removed;
        self.reindex_nodes();

        let edges_before = self.edges.len();
        let index_by_id = &self.index_by_id;
        self.edges.retain(|edge| {
            index_by_id.contains_key(&edge.source) && index_by_id.contains_key(&edge.target)
        });
        report.links_removed = edges_before - self.edges.len();
        self.edge_keys = self.edges.iter().cloned().collect();

        registry.remove(system);

        info!(
            system,
            nodes_detached = report.nodes_detached,
            nodes_removed = report.nodes_removed.len(),
            links_removed = report.links_removed,
            "pruned system"
        );
        report
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index_by_id.clear();
        self.edges.clear();
        self.edge_keys.clear();
    }

    /// Overwrites the whole graph. Link endpoints given as embedded node
    /// objects are reduced to their ids here.
    pub fn replace(&mut self, nodes: Vec<Node>, links: Vec<LinkRecord>) -> ReplaceReport {
        self.clear();
        let mut report = ReplaceReport::default();

        for mut node in nodes {
            let mut seen = HashSet::new();
            node.systems
                .retain(|system| !system.trim().is_empty() && seen.insert(system.clone()));
            if !node.is_storable() || self.index_by_id.contains_key(&node.id) {
                warn!(id = %node.id, "dropped node while replacing graph");
                report.nodes_dropped += 1;
                continue;
            }
            self.index_by_id.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(node);
        }

        for link in links {
            let edge = link.into_edge();
            if edge.source.is_empty() || edge.target.is_empty() || !self.insert_edge(edge) {
                report.links_dropped += 1;
            }
        }

        report.nodes = self.nodes.len();
        report.links = self.edges.len();
        report
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn members_of<'a>(&'a self, system: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |node| node.in_system(system))
    }

    pub fn neighbors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.touches(id))
    }

    /// Fuzzy id lookup, best match first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let matcher = SkimMatcherV2::default();
        let mut hits = self
            .nodes
            .iter()
            .filter_map(|node| {
                fuzzy_match_score(&matcher, &node.id, query).map(|score| SearchHit {
                    id: node.id.clone(),
                    score,
                })
            })
            .collect::<Vec<_>>();

        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        hits
    }

    fn insert_edge(&mut self, edge: Edge) -> bool {
        if self.edge_keys.contains(&edge) {
            return false;
        }
        self.edge_keys.insert(edge.clone());
        self.edges.push(edge);
        true
    }

    fn reindex_nodes(&mut self) {
        self.index_by_id.clear();
        for (index, node) in self.nodes.iter().enumerate() {
            self.index_by_id.insert(node.id.clone(), index);
        }
    }
}
