//! Native extension pipeline
//!
//! A user-supplied C++ source goes through:
//!
//! 1. [`SourceValidator`]: textual checks against the kind's contract
//! 2. [`Compiler`]: toolchain build into `<root>/<kind>/<stem>_generated.<ext>`
//! 3. [`ExtensionFactory`]: cache lookup or load through a [`DynamicLoader`],
//!    then instance creation through the plugin's factory function
//!
//! Loaded libraries stay mapped until [`ExtensionFactory::cleanup_all`], which
//! also deletes the generated artifacts it owns. Plugin code runs in-process
//! with no isolation.

pub mod abi;
pub mod cache;
pub mod compiler;
pub mod error;
pub mod factory;
pub mod kind;
pub mod layout;
pub mod loader;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CleanupReport, ExtensionCache, LoadedLibrary};
pub use compiler::{CommandOutcome, CommandRunner, CommandSpec, CompiledArtifact, Compiler, ProcessRunner};
pub use error::{BuildError, CompileError, FactoryError, LoadError, ValidationError};
pub use factory::{AlgorithmFactory, Catalog, ExtensionFactory, StructureFactory};
pub use kind::{Algorithms, ExtensionKind, SourceContract, Structures};
pub use layout::{canonical_path, ArtifactLayout, GENERATED_SUFFIX};
pub use loader::{DynamicLoader, NativeLoader};
pub use validator::{CandidateSource, SourceValidator, SOURCE_EXTENSION};
