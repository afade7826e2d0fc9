//! Dynamic library primitives
//!
//! [`DynamicLoader`] is the only place OS loader calls happen. The production
//! implementation is [`NativeLoader`] (libloading, selected per target at build
//! time); tests inject their own implementation.

use std::ffi::c_void;
use std::path::Path;

use libloading::{Library, Symbol};
use tracing::debug;

use super::abi::RawSymbol;

/// open / resolve / close over shared libraries.
///
/// Failures are descriptive strings; callers attach path and symbol context.
pub trait DynamicLoader {
    /// Opaque handle of an open library
    type Handle;

    /// Open the library at `path`
    ///
    /// # Errors
    /// Returns the loader's description of why the library could not be opened.
    fn open(&self, path: &Path) -> Result<Self::Handle, String>;

    /// Resolve `name` in an open library.
    ///
    /// Implementations must not report error state left over from an earlier,
    /// unrelated loader call as the result of this lookup.
    ///
    /// # Errors
    /// Returns the loader's description of why the symbol is unavailable.
    fn resolve_symbol(&self, handle: &Self::Handle, name: &str) -> Result<RawSymbol, String>;

    /// Close a library. Symbols resolved from it must no longer be used.
    ///
    /// # Errors
    /// Returns the loader's description of why the close failed.
    fn close(&self, handle: Self::Handle) -> Result<(), String>;
}

/// OS loader backed by libloading (`dlopen` family on Unix, `LoadLibraryW` on Windows)
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLoader;

impl DynamicLoader for NativeLoader {
    type Handle = Library;

    fn open(&self, path: &Path) -> Result<Library, String> {
        debug!("Opening {}", path.display());
        // SAFETY: loading runs the library's initializers. Plugins are trusted
        // user code; there is no isolation.
        unsafe { Library::new(path) }.map_err(|e| e.to_string())
    }

    fn resolve_symbol(&self, handle: &Library, name: &str) -> Result<RawSymbol, String> {
        let mut symbol_name = Vec::with_capacity(name.len() + 1);
        symbol_name.extend_from_slice(name.as_bytes());
        symbol_name.push(0);

        // libloading resets dlerror before dlsym and reads it right after, so an
        // earlier failure is never reported for this lookup
        // SAFETY: the address is only reinterpreted by ExtensionKind::bind
        let symbol: Symbol<*mut c_void> =
            unsafe { handle.get(&symbol_name) }.map_err(|e| e.to_string())?;
        RawSymbol::new(*symbol).ok_or_else(|| format!("symbol `{name}` resolved to null"))
    }

    fn close(&self, handle: Library) -> Result<(), String> {
        handle.close().map_err(|e| e.to_string())
    }
}
