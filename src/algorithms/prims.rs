use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use crate::model::{Algorithm, DataStructure};
use crate::structures::GraphStructure;

/// One edge of the spanning forest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MstEdge {
    pub from: i32,
    pub to: i32,
    pub weight: f64,
}

impl Eq for MstEdge {}

impl Ord for MstEdge {
    // Min-heap on weight
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.to.cmp(&self.to))
            .then_with(|| other.from.cmp(&self.from))
    }
}

impl PartialOrd for MstEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Prim's minimum spanning forest over a [`GraphStructure`]
#[derive(Debug, Clone, Default)]
pub struct Prims {
    mst: Vec<MstEdge>,
    total_weight: f64,
    disconnected: bool,
}

impl Prims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mst(&self) -> &[MstEdge] {
        &self.mst
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// True when the graph had more than one component
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    fn run(&mut self, graph: &GraphStructure) {
        self.mst.clear();
        self.total_weight = 0.0;
        self.disconnected = false;

        let mut visited = BTreeSet::new();
        let mut components = 0;

        for &root in graph.adjacency().keys() {
            if visited.contains(&root) {
                continue;
            }
            components += 1;
            visited.insert(root);

            let mut frontier: BinaryHeap<MstEdge> = graph
                .neighbors(root)
                .iter()
                .map(|&(to, weight)| MstEdge { from: root, to, weight })
                .collect();

            while let Some(edge) = frontier.pop() {
                if !visited.insert(edge.to) {
                    continue;
                }
                self.total_weight += edge.weight;
                self.mst.push(edge);
                for &(to, weight) in graph.neighbors(edge.to) {
                    if !visited.contains(&to) {
                        frontier.push(MstEdge {
                            from: edge.to,
                            to,
                            weight,
                        });
                    }
                }
            }
        }

        self.disconnected = components > 1;
    }
}

impl Algorithm for Prims {
    fn execute(&mut self, ds: &mut dyn DataStructure) {
        match ds.as_graph() {
            Some(graph) => self.run(graph),
            None => *self = Self::default(),
        }
    }

    fn execute_and_display(&mut self, ds: &mut dyn DataStructure) {
        self.execute(ds);
        if self.mst.is_empty() {
            println!("No spanning tree edges (graph has fewer than two connected vertices).");
            return;
        }
        for edge in &self.mst {
            println!("{} - {} ({})", edge.from, edge.to, edge.weight);
        }
        println!("Total weight: {}", self.total_weight);
        if self.disconnected {
            println!("Graph is disconnected; showing a spanning forest.");
        }
    }

    fn display(&mut self, elements: &[i32]) {
        println!("{}", super::format_values(elements));
    }

    fn name(&self) -> String {
        "Prim".to_string()
    }
}
