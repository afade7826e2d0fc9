//! Instance creation for built-in and custom kinds
//!
//! Built-ins are constructed directly. A custom selection goes through the
//! factory's own [`ExtensionCache`]: the library is loaded once per canonical
//! path and every call produces a fresh instance from it.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use super::abi::CreateFailure;
use super::cache::{CleanupReport, ExtensionCache};
use super::error::FactoryError;
use super::kind::{Algorithms, ExtensionKind, Structures};
use super::layout::ArtifactLayout;
use super::loader::{DynamicLoader, NativeLoader};
use crate::algorithms::{AStar, HeapBuild, HeapSelection, InsertionSort, MergeSort, Prims};
use crate::config::AlgorithmConfig;
use crate::model::{Algorithm, AlgorithmKind, DataStructure, StructureKind};
use crate::structures::{GraphStructure, HeapStructure, ListStructure};

/// The menu of one extension kind: which selections are built in
pub trait Catalog: ExtensionKind {
    type Selection: Copy + fmt::Display;
    /// Parameters for the built-in implementations
    type Settings: Default;

    /// Construct a built-in; `None` for the custom selection
    fn builtin(selection: Self::Selection, settings: &Self::Settings) -> Option<Box<Self::Instance>>;
}

impl Catalog for Structures {
    type Selection = StructureKind;
    type Settings = ();

    fn builtin(selection: StructureKind, _settings: &()) -> Option<Box<dyn DataStructure>> {
        match selection {
            StructureKind::List => Some(Box::new(ListStructure::new())),
            StructureKind::Heap => Some(Box::new(HeapStructure::new())),
            StructureKind::Graph => Some(Box::new(GraphStructure::new())),
            StructureKind::Custom => None,
        }
    }
}

impl Catalog for Algorithms {
    type Selection = AlgorithmKind;
    type Settings = AlgorithmConfig;

    fn builtin(selection: AlgorithmKind, settings: &AlgorithmConfig) -> Option<Box<dyn Algorithm>> {
        match selection {
            AlgorithmKind::InsertionSort => Some(Box::new(InsertionSort::new())),
            AlgorithmKind::MergeSort => Some(Box::new(MergeSort::new())),
            AlgorithmKind::HeapBuild => Some(Box::new(HeapBuild::new(settings.min_heap))),
            AlgorithmKind::HeapSelection => Some(Box::new(HeapSelection::new(
                settings.selection_k,
                settings.selection_smallest,
            ))),
            AlgorithmKind::AStar => Some(Box::new(AStar::new(
                settings.astar_start,
                settings.astar_goal,
            ))),
            AlgorithmKind::Prim => Some(Box::new(Prims::new())),
            AlgorithmKind::Custom => None,
        }
    }
}

/// Creates instances of one extension kind
pub struct ExtensionFactory<K: Catalog, L: DynamicLoader = NativeLoader> {
    cache: ExtensionCache<K, L>,
    settings: K::Settings,
}

pub type StructureFactory<L = NativeLoader> = ExtensionFactory<Structures, L>;
pub type AlgorithmFactory<L = NativeLoader> = ExtensionFactory<Algorithms, L>;

impl<K: Catalog> ExtensionFactory<K> {
    /// Factory using the platform loader
    pub fn new(layout: ArtifactLayout) -> Self {
        Self::with_loader(NativeLoader, layout)
    }
}

impl<K: Catalog, L: DynamicLoader> ExtensionFactory<K, L> {
    pub fn with_loader(loader: L, layout: ArtifactLayout) -> Self {
        Self {
            cache: ExtensionCache::new(loader, layout),
            settings: K::Settings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: K::Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &K::Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut K::Settings {
        &mut self.settings
    }

    /// Keep generated artifacts on disk at cleanup
    pub fn set_retain_artifacts(&mut self, retain: bool) {
        self.cache.set_retain_artifacts(retain);
    }

    #[must_use]
    pub fn cache(&self) -> &ExtensionCache<K, L> {
        &self.cache
    }

    /// New instance of `selection`. `custom_path` names the compiled library
    /// and is only consulted for the custom selection.
    ///
    /// # Errors
    /// [`FactoryError::MissingCustomPath`] without a library path,
    /// [`FactoryError::Load`] when the library cannot be loaded,
    /// [`FactoryError::NullInstance`] when its factory returns null, and
    /// [`FactoryError::FactoryThrew`] when its factory throws.
    pub fn create_instance(
        &mut self,
        selection: K::Selection,
        custom_path: Option<&Path>,
    ) -> Result<Box<K::Instance>, FactoryError> {
        if let Some(instance) = K::builtin(selection, &self.settings) {
            debug!("Created built-in {} {}", K::LABEL, selection);
            return Ok(instance);
        }

        let path = custom_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(FactoryError::MissingCustomPath { kind: K::LABEL })?;

        let library = self.cache.get_or_load(path)?;
        match library.instantiate() {
            Ok(instance) => {
                debug!("Created custom {} from {}", K::LABEL, library.path().display());
                Ok(instance)
            }
            Err(CreateFailure::Null) => {
                warn!("Factory in {} returned null", library.path().display());
                Err(FactoryError::NullInstance {
                    path: library.path().to_path_buf(),
                })
            }
            Err(CreateFailure::Threw(reason)) => {
                warn!("Factory in {} threw: {}", library.path().display(), reason);
                Err(FactoryError::FactoryThrew {
                    path: library.path().to_path_buf(),
                    reason,
                })
            }
        }
    }

    /// Close every cached library and delete owned artifacts. Call after all
    /// instances from this factory are dropped.
    pub fn cleanup_all(&mut self) -> CleanupReport {
        let report = self.cache.close_all();
        for warning in &report.warnings {
            warn!("Cleanup: {}", warning);
        }
        report
    }
}
