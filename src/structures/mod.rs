//! Built-in data structures

mod graph;
mod heap;
mod list;

pub use graph::GraphStructure;
pub use heap::HeapStructure;
pub use list::ListStructure;
