//! Built-in algorithms
//!
//! Each algorithm copies the structure's snapshot and works on the copy, so
//! running a benchmark never mutates the structure itself.

mod astar;
mod heap_build;
mod heap_selection;
mod insertion_sort;
mod merge_sort;
mod prims;

pub use astar::AStar;
pub use heap_build::HeapBuild;
pub use heap_selection::HeapSelection;
pub use insertion_sort::InsertionSort;
pub use merge_sort::MergeSort;
pub use prims::{MstEdge, Prims};

/// Space-separated values on one line
pub(crate) fn format_values(values: &[i32]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
