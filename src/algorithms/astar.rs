use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::model::{Algorithm, DataStructure};
use crate::structures::GraphStructure;

/// A* shortest path over a [`GraphStructure`].
///
/// Without an explicit start/goal the smallest and largest vertex are used.
/// On any other structure the algorithm does nothing.
#[derive(Debug, Clone, Default)]
pub struct AStar {
    start: Option<i32>,
    goal: Option<i32>,
    path: Vec<i32>,
    cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    vertex: i32,
    f_score: f64,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    // Reversed so BinaryHeap pops the lowest f-score first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AStar {
    #[must_use]
    pub fn new(start: Option<i32>, goal: Option<i32>) -> Self {
        Self {
            start,
            goal,
            ..Self::default()
        }
    }

    pub fn set_start(&mut self, start: i32) {
        self.start = Some(start);
    }

    pub fn set_goal(&mut self, goal: i32) {
        self.goal = Some(goal);
    }

    /// Path found by the last run, start to goal; empty when unreachable
    #[must_use]
    pub fn path(&self) -> &[i32] {
        &self.path
    }

    /// Cost of [`AStar::path`]; infinite when unreachable
    #[must_use]
    pub fn path_cost(&self) -> f64 {
        self.cost
    }

    fn run(&mut self, graph: &GraphStructure) {
        self.path.clear();
        self.cost = 0.0;

        let vertices = graph.adjacency();
        let (Some(start), Some(goal)) = (
            self.start.or_else(|| vertices.keys().next().copied()),
            self.goal.or_else(|| vertices.keys().next_back().copied()),
        ) else {
            return;
        };
        if !graph.has_vertex(start) || !graph.has_vertex(goal) {
            return;
        }

        let mut g_score: BTreeMap<i32, f64> = BTreeMap::new();
        let mut came_from: BTreeMap<i32, i32> = BTreeMap::new();
        let mut closed = BTreeSet::new();
        let mut open = BinaryHeap::new();

        g_score.insert(start, 0.0);
        open.push(Frontier {
            vertex: start,
            f_score: graph.heuristic(start),
        });

        while let Some(Frontier { vertex: current, .. }) = open.pop() {
            if current == goal {
                self.cost = g_score.get(&goal).copied().unwrap_or(0.0);
                self.path = reconstruct(start, goal, &came_from);
                return;
            }
            if !closed.insert(current) {
                continue;
            }

            let base = g_score.get(&current).copied().unwrap_or(f64::INFINITY);
            for &(neighbor, weight) in graph.neighbors(current) {
                if closed.contains(&neighbor) {
                    continue;
                }
                let tentative = base + weight;
                if tentative < g_score.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(neighbor, current);
                    g_score.insert(neighbor, tentative);
                    open.push(Frontier {
                        vertex: neighbor,
                        f_score: tentative + graph.heuristic(neighbor),
                    });
                }
            }
        }

        self.cost = f64::INFINITY;
    }
}

/// Walk predecessors back from `goal`, stopping at `start` or a revisit
fn reconstruct(start: i32, goal: i32, came_from: &BTreeMap<i32, i32>) -> Vec<i32> {
    let mut path = vec![goal];
    let mut seen = BTreeSet::from([goal]);
    let mut cursor = goal;
    while cursor != start {
        let Some(&prev) = came_from.get(&cursor) else {
            break;
        };
        if !seen.insert(prev) {
            break;
        }
        path.push(prev);
        cursor = prev;
    }
    path.reverse();
    path
}

impl Algorithm for AStar {
    fn execute(&mut self, ds: &mut dyn DataStructure) {
        match ds.as_graph() {
            Some(graph) => self.run(graph),
            None => {
                self.path.clear();
                self.cost = 0.0;
            }
        }
    }

    fn execute_and_display(&mut self, ds: &mut dyn DataStructure) {
        self.execute(ds);
        if self.path.is_empty() {
            println!("No path found for the provided start/goal vertices.");
            return;
        }
        print!("A* path: ");
        let path = self.path.clone();
        self.display(&path);
        println!("Total cost: {}", self.cost);
    }

    fn display(&mut self, elements: &[i32]) {
        let hops: Vec<String> = elements.iter().map(ToString::to_string).collect();
        println!("{}", hops.join(" -> "));
    }

    fn name(&self) -> String {
        "A*".to_string()
    }
}
