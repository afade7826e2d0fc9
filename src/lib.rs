//! RayStruct - data structure and algorithm benchmarking with native plugins
//!
//! Built-in structures and algorithms run next to custom ones written in C++,
//! compiled on the fly and loaded as shared libraries.
//!
//! # Modules
//!
//! - [`model`]: `DataStructure` / `Algorithm` capability traits and menu kinds
//! - [`structures`]: built-in list, heap and graph
//! - [`algorithms`]: built-in sorts, heap operations, A* and Prim
//! - [`plugins`]: validate, compile, load, cache and instantiate custom plugins
//! - [`benchmark`]: execution timing and memory sampling
//! - [`session`]: the interactive benchmark loop
//! - [`config`]: configuration management and serialization

pub mod algorithms;
pub mod benchmark;
pub mod config;
pub mod model;
pub mod plugins;
pub mod session;
pub mod structures;
