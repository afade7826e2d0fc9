//! Error types for each stage of the extension pipeline
//!
//! Every variant is recoverable: the session reports it and asks again.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A candidate source failed one of the validator rules
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("not a regular file: {}", .path.display())]
    NotRegularFile { path: PathBuf },

    #[error("expected a .{expected} source file, got {}", .path.display())]
    WrongExtension { path: PathBuf, expected: &'static str },

    #[error("source file is empty: {}", .path.display())]
    EmptyFile { path: PathBuf },

    #[error("could not read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source does not include the interface header {header}")]
    MissingInclude { header: &'static str },

    #[error("source does not derive from the base class (expected `{phrase}`)")]
    MissingBaseClass { phrase: &'static str },

    #[error("source does not override `{method}`")]
    MissingOverride { method: &'static str },

    #[error("source does not declare the exported factory function `{symbol}`")]
    MissingFactorySymbolDeclaration { symbol: &'static str },
}

/// Compilation could not produce a library
#[derive(Debug, Error)]
pub enum CompileError {
    /// The toolchain ran and rejected the source. Diagnostics are verbatim compiler output.
    #[error("compilation failed:\n{diagnostics}")]
    Failed { diagnostics: String },

    #[error("compiler `{program}` not found on PATH")]
    ToolchainNotFound { program: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

/// Opening a library or resolving one of its symbols failed
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("{} does not export `{symbol}`: {reason}", .path.display())]
    MissingSymbol {
        path: PathBuf,
        symbol: String,
        reason: String,
    },

    #[error("failed to close {}: {reason}", .path.display())]
    Close { path: PathBuf, reason: String },
}

/// Creating an instance through an extension factory failed
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("custom {kind} requested without a compiled library path")]
    MissingCustomPath { kind: &'static str },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("plugin's factory returned no instance ({})", .path.display())]
    NullInstance { path: PathBuf },

    /// The factory threw a C++ exception; the library stays loaded.
    #[error("plugin's factory threw ({}): {reason}", .path.display())]
    FactoryThrew { path: PathBuf, reason: String },
}

/// Validate-then-compile failed before a library existed
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
