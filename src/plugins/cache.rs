//! Registry of loaded plugin libraries
//!
//! Each factory owns one [`ExtensionCache`]. Entries are keyed by canonical
//! path and live until [`ExtensionCache::close_all`]; instances never close
//! their library.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::abi::{CreateFailure, Lease};
use super::error::LoadError;
use super::kind::ExtensionKind;
use super::layout::{canonical_path, ArtifactLayout};
use super::loader::DynamicLoader;

/// A successfully opened and bound library
pub struct LoadedLibrary<K: ExtensionKind, L: DynamicLoader> {
    path: PathBuf,
    handle: L::Handle,
    api: K::Api,
    owns_file: bool,
    lease: Lease,
}

impl<K: ExtensionKind, L: DynamicLoader> LoadedLibrary<K, L> {
    /// Canonical path the library was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolved factory and bridge functions
    #[must_use]
    pub fn api(&self) -> K::Api {
        self.api
    }

    /// Whether cleanup deletes the file (generated artifact)
    #[must_use]
    pub fn owns_file(&self) -> bool {
        self.owns_file
    }

    /// Instances created from this library that are still alive
    #[must_use]
    pub fn live_instances(&self) -> usize {
        self.lease.outstanding()
    }

    /// Create an instance through the plugin's factory
    ///
    /// # Errors
    /// [`CreateFailure`] when the factory returned null or threw.
    pub fn instantiate(&self) -> Result<Box<K::Instance>, CreateFailure> {
        // SAFETY: `api` was bound from `handle`, which stays open while any
        // lease clone is alive (see ExtensionCache::close_all)
        unsafe { K::instantiate(self.api, self.lease.clone()) }
    }
}

/// Outcome of [`ExtensionCache::close_all`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Handles closed
    pub closed: usize,
    /// Libraries left mapped because instances were still alive
    pub leaked: Vec<PathBuf>,
    /// Generated artifacts removed from disk
    pub deleted: Vec<PathBuf>,
    /// Generated artifacts kept on disk on request
    pub retained: Vec<PathBuf>,
    /// Problems that did not stop cleanup
    pub warnings: Vec<String>,
}

impl CleanupReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.leaked.is_empty() && self.warnings.is_empty()
    }

    pub fn merge(&mut self, other: CleanupReport) {
        self.closed += other.closed;
        self.leaked.extend(other.leaked);
        self.deleted.extend(other.deleted);
        self.retained.extend(other.retained);
        self.warnings.extend(other.warnings);
    }
}

/// Canonical path → loaded library, for one extension kind
pub struct ExtensionCache<K: ExtensionKind, L: DynamicLoader> {
    loader: L,
    layout: ArtifactLayout,
    retain_artifacts: bool,
    entries: HashMap<PathBuf, LoadedLibrary<K, L>>,
    _kind: PhantomData<K>,
}

impl<K: ExtensionKind, L: DynamicLoader> ExtensionCache<K, L> {
    pub fn new(loader: L, layout: ArtifactLayout) -> Self {
        Self {
            loader,
            layout,
            retain_artifacts: false,
            entries: HashMap::new(),
            _kind: PhantomData,
        }
    }

    /// Keep generated artifacts on disk at cleanup
    pub fn set_retain_artifacts(&mut self, retain: bool) {
        self.retain_artifacts = retain;
    }

    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `path` (any spelling) is already loaded
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&canonical_path(path))
    }

    /// Cached library for `path`, opening and binding it on first use.
    ///
    /// # Errors
    /// Returns [`LoadError`] if the library cannot be opened or lacks a required
    /// symbol. Failures are not cached; the next call tries again.
    pub fn get_or_load(&mut self, path: &Path) -> Result<&LoadedLibrary<K, L>, LoadError> {
        let key = canonical_path(path);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                debug!("Cache hit for {} {}", K::LABEL, entry.key().display());
                Ok(&*entry.into_mut())
            }
            Entry::Vacant(entry) => {
                debug!("Cache miss for {} {}", K::LABEL, entry.key().display());
                let library = load::<K, L>(&self.loader, &self.layout, entry.key())?;
                info!(
                    "Loaded {} library {} (owned: {})",
                    K::LABEL,
                    library.path.display(),
                    library.owns_file
                );
                Ok(&*entry.insert(library))
            }
        }
    }

    /// Close every handle, delete owned artifacts, empty the cache.
    ///
    /// A library with live instances is left mapped (its handle is leaked with
    /// a warning) but still removed from the cache.
    pub fn close_all(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for (path, library) in self.entries.drain() {
            let LoadedLibrary {
                handle,
                owns_file,
                lease,
                ..
            } = library;

            let live = lease.outstanding();
            if live > 0 {
                warn!(
                    "Leaving {} mapped: {} instance(s) still alive",
                    path.display(),
                    live
                );
                std::mem::forget(handle);
                report.leaked.push(path.clone());
            } else {
                match self.loader.close(handle) {
                    Ok(()) => {
                        debug!("Closed {}", path.display());
                        report.closed += 1;
                    }
                    Err(reason) => {
                        let e = LoadError::Close {
                            path: path.clone(),
                            reason,
                        };
                        warn!("{}", e);
                        report.warnings.push(e.to_string());
                    }
                }
            }

            if !owns_file {
                continue;
            }
            if self.retain_artifacts {
                info!("Keeping generated artifact {}", path.display());
                report.retained.push(path);
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Deleted generated artifact {}", path.display());
                    report.deleted.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Generated artifact already gone: {}", path.display());
                }
                Err(e) => {
                    let message = format!("failed to delete {}: {}", path.display(), e);
                    warn!("{}", message);
                    report.warnings.push(message);
                }
            }
        }

        report
    }
}

impl<K: ExtensionKind, L: DynamicLoader> Drop for ExtensionCache<K, L> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            warn!(
                "{} cache dropped with {} library(ies) loaded; cleaning up",
                K::LABEL,
                self.entries.len()
            );
            self.close_all();
        }
    }
}

fn load<K: ExtensionKind, L: DynamicLoader>(
    loader: &L,
    layout: &ArtifactLayout,
    path: &Path,
) -> Result<LoadedLibrary<K, L>, LoadError> {
    let handle = loader.open(path).map_err(|reason| LoadError::Open {
        path: path.to_path_buf(),
        reason,
    })?;

    let bound = K::bind(&mut |symbol: &str| {
        loader
            .resolve_symbol(&handle, symbol)
            .map_err(|reason| LoadError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: symbol.to_string(),
                reason,
            })
    });

    match bound {
        Ok(api) => Ok(LoadedLibrary {
            path: path.to_path_buf(),
            handle,
            api,
            owns_file: layout.owns(K::ARTIFACT_DIR, path),
            lease: Lease::default(),
        }),
        Err(e) => {
            warn!("{}", e);
            if let Err(reason) = loader.close(handle) {
                warn!("Failed to close {} after bind failure: {}", path.display(), reason);
            }
            Err(e)
        }
    }
}
