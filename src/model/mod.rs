//! Capability interfaces shared by built-in and plugin implementations
//!
//! Everything the benchmark session touches goes through [`DataStructure`] and
//! [`Algorithm`]. Built-ins implement them directly; plugin-backed instances
//! implement them by calling into the loaded library.

use std::fmt;
use std::str::FromStr;

use crate::structures::GraphStructure;

/// A container of integers that algorithms can read and mutate
pub trait DataStructure {
    /// Add a value
    fn insert(&mut self, value: i32);

    /// Remove a value; structures decide which occurrence(s)
    fn remove(&mut self, value: i32);

    /// Snapshot copy of the stored values
    fn elements(&self) -> Vec<i32>;

    /// Display name used in benchmark output
    fn name(&self) -> String;

    /// Graph view for graph algorithms
    fn as_graph(&self) -> Option<&GraphStructure> {
        None
    }

    /// Mutable graph view, for adding edges and heuristics
    fn as_graph_mut(&mut self) -> Option<&mut GraphStructure> {
        None
    }
}

/// An algorithm that runs over a [`DataStructure`]
pub trait Algorithm {
    /// Run silently. This is the call that gets timed.
    fn execute(&mut self, ds: &mut dyn DataStructure);

    /// Run while printing intermediate steps
    fn execute_and_display(&mut self, ds: &mut dyn DataStructure);

    /// Print a sequence the way this algorithm presents its state
    fn display(&mut self, elements: &[i32]);

    /// Display name used in benchmark output
    fn name(&self) -> String;
}

/// Error returned when menu input does not name a known kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {input:?}")]
pub struct UnknownKind {
    pub what: &'static str,
    pub input: String,
}

/// Structure kinds offered by the session menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureKind {
    List,
    Heap,
    Graph,
    Custom,
}

impl StructureKind {
    /// Algorithms that make sense for this structure, in menu order
    #[must_use]
    pub fn algorithms(self) -> &'static [AlgorithmKind] {
        match self {
            Self::List => &[
                AlgorithmKind::InsertionSort,
                AlgorithmKind::MergeSort,
                AlgorithmKind::Custom,
            ],
            Self::Heap => &[
                AlgorithmKind::HeapBuild,
                AlgorithmKind::HeapSelection,
                AlgorithmKind::Custom,
            ],
            Self::Graph => &[AlgorithmKind::AStar, AlgorithmKind::Prim, AlgorithmKind::Custom],
            Self::Custom => &[
                AlgorithmKind::InsertionSort,
                AlgorithmKind::MergeSort,
                AlgorithmKind::HeapBuild,
                AlgorithmKind::HeapSelection,
                AlgorithmKind::Custom,
            ],
        }
    }
}

impl FromStr for StructureKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "list" => Ok(Self::List),
            "heap" => Ok(Self::Heap),
            "graph" => Ok(Self::Graph),
            "custom" => Ok(Self::Custom),
            _ => Err(UnknownKind {
                what: "structure",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "List",
            Self::Heap => "Heap",
            Self::Graph => "Graph",
            Self::Custom => "Custom",
        })
    }
}

/// Algorithm kinds offered by the session menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    InsertionSort,
    MergeSort,
    HeapBuild,
    HeapSelection,
    AStar,
    Prim,
    Custom,
}

impl FromStr for AlgorithmKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insertion sort" => Ok(Self::InsertionSort),
            "merge sort" => Ok(Self::MergeSort),
            "heap build" => Ok(Self::HeapBuild),
            "heap selection" => Ok(Self::HeapSelection),
            "a*" => Ok(Self::AStar),
            "prim" => Ok(Self::Prim),
            "custom" => Ok(Self::Custom),
            _ => Err(UnknownKind {
                what: "algorithm",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InsertionSort => "Insertion Sort",
            Self::MergeSort => "Merge Sort",
            Self::HeapBuild => "Heap Build",
            Self::HeapSelection => "Heap Selection",
            Self::AStar => "A*",
            Self::Prim => "Prim",
            Self::Custom => "Custom",
        })
    }
}
