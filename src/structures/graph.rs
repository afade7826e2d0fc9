//! Weighted graph keyed by integer vertices

use std::collections::BTreeMap;

use crate::model::DataStructure;

/// Outgoing edges of one vertex: `(target, weight)`
pub type Neighbors = Vec<(i32, f64)>;

/// Adjacency-list graph with optional A* heuristics.
///
/// As a [`DataStructure`], `insert` adds an isolated vertex, `remove` drops a
/// vertex with every edge touching it, and `elements` lists vertices in
/// ascending order.
#[derive(Debug, Clone, Default)]
pub struct GraphStructure {
    adjacency: BTreeMap<i32, Neighbors>,
    heuristics: BTreeMap<i32, f64>,
}

impl GraphStructure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_vertex(&self, vertex: i32) -> bool {
        self.adjacency.contains_key(&vertex)
    }

    /// Add an edge, creating missing endpoints. An existing edge gets the new weight.
    pub fn add_edge(&mut self, from: i32, to: i32, weight: f64, bidirectional: bool) {
        self.adjacency.entry(to).or_default();
        upsert_neighbor(self.adjacency.entry(from).or_default(), to, weight);
        if bidirectional {
            upsert_neighbor(self.adjacency.entry(to).or_default(), from, weight);
        }
    }

    /// Remove an edge. Returns whether anything was removed.
    pub fn remove_edge(&mut self, from: i32, to: i32, bidirectional: bool) -> bool {
        let mut removed = false;
        if let Some(neighbors) = self.adjacency.get_mut(&from) {
            removed |= drop_neighbor(neighbors, to);
        }
        if bidirectional {
            if let Some(neighbors) = self.adjacency.get_mut(&to) {
                removed |= drop_neighbor(neighbors, from);
            }
        }
        removed
    }

    #[must_use]
    pub fn adjacency(&self) -> &BTreeMap<i32, Neighbors> {
        &self.adjacency
    }

    #[must_use]
    pub fn neighbors(&self, vertex: i32) -> &[(i32, f64)] {
        self.adjacency.get(&vertex).map_or(&[], Vec::as_slice)
    }

    /// Weight of the edge `from -> to`, if present
    #[must_use]
    pub fn edge_weight(&self, from: i32, to: i32) -> Option<f64> {
        self.neighbors(from)
            .iter()
            .find(|(target, _)| *target == to)
            .map(|(_, w)| *w)
    }

    pub fn set_heuristic(&mut self, vertex: i32, value: f64) {
        self.adjacency.entry(vertex).or_default();
        self.heuristics.insert(vertex, value);
    }

    #[must_use]
    pub fn has_heuristic(&self, vertex: i32) -> bool {
        self.heuristics.contains_key(&vertex)
    }

    /// Heuristic estimate for a vertex; zero when unset
    #[must_use]
    pub fn heuristic(&self, vertex: i32) -> f64 {
        self.heuristics.get(&vertex).copied().unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.adjacency.clear();
        self.heuristics.clear();
    }
}

fn upsert_neighbor(neighbors: &mut Neighbors, target: i32, weight: f64) {
    match neighbors.iter_mut().find(|(t, _)| *t == target) {
        Some(edge) => edge.1 = weight,
        None => neighbors.push((target, weight)),
    }
}

fn drop_neighbor(neighbors: &mut Neighbors, target: i32) -> bool {
    let before = neighbors.len();
    neighbors.retain(|(t, _)| *t != target);
    neighbors.len() != before
}

impl DataStructure for GraphStructure {
    fn insert(&mut self, value: i32) {
        self.adjacency.entry(value).or_default();
    }

    fn remove(&mut self, value: i32) {
        self.adjacency.remove(&value);
        for neighbors in self.adjacency.values_mut() {
            drop_neighbor(neighbors, value);
        }
        self.heuristics.remove(&value);
    }

    fn elements(&self) -> Vec<i32> {
        self.adjacency.keys().copied().collect()
    }

    fn name(&self) -> String {
        "Graph".to_string()
    }

    fn as_graph(&self) -> Option<&GraphStructure> {
        Some(self)
    }

    fn as_graph_mut(&mut self) -> Option<&mut GraphStructure> {
        Some(self)
    }
}
