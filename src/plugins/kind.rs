//! The two extension kinds and their contracts

use crate::model::{Algorithm, DataStructure};

use super::abi::{
    self, AlgorithmApi, CreateFailure, Lease, PluginAlgorithm, PluginStructure, RawSymbol, StructureApi,
};
use super::error::LoadError;

/// What a plugin source must contain, and what its library must export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceContract {
    /// Interface header the source has to include
    pub header: &'static str,
    /// Base class name, as in `class X : public <base_class>`
    pub base_class: &'static str,
    /// Human-readable form of the inheritance rule
    pub base_phrase: &'static str,
    /// Methods the source has to override
    pub overrides: &'static [&'static str],
    /// C-linkage factory function
    pub factory_symbol: &'static str,
}

/// Symbol lookup handed to [`ExtensionKind::bind`].
///
/// The error carries the symbol name that failed plus the loader's reason.
pub type Resolver<'a> = dyn FnMut(&str) -> Result<RawSymbol, LoadError> + 'a;

/// One family of plugins (structures or algorithms)
pub trait ExtensionKind {
    /// Resolved function table kept in the cache
    type Api: Copy;
    /// Capability produced by the plugin's factory
    type Instance: ?Sized;

    /// Singular label for messages ("structure", "algorithm")
    const LABEL: &'static str;
    const CONTRACT: SourceContract;
    /// Reserved generated-artifact subdirectory
    const ARTIFACT_DIR: &'static str;

    /// Resolve the factory symbol first, then the bridge functions.
    ///
    /// # Errors
    /// Returns the first symbol that could not be resolved.
    fn bind(resolve: &mut Resolver<'_>) -> Result<Self::Api, LoadError>;

    /// Call the factory through the guarded create bridge.
    ///
    /// # Errors
    /// [`CreateFailure::Null`] on a null return, [`CreateFailure::Threw`] when
    /// the factory threw.
    ///
    /// # Safety
    /// `api` must come from [`ExtensionKind::bind`] on a library that stays
    /// mapped while `lease` has clones alive.
    unsafe fn instantiate(api: Self::Api, lease: Lease) -> Result<Box<Self::Instance>, CreateFailure>;
}

/// Custom data structures
#[derive(Debug, Clone, Copy, Default)]
pub struct Structures;

/// Custom algorithms
#[derive(Debug, Clone, Copy, Default)]
pub struct Algorithms;

impl ExtensionKind for Structures {
    type Api = StructureApi;
    type Instance = dyn DataStructure;

    const LABEL: &'static str = "structure";
    const CONTRACT: SourceContract = SourceContract {
        header: "DataStructure.hpp",
        base_class: "DataStructure",
        base_phrase: "public DataStructure",
        overrides: &["insert", "remove", "getElements"],
        factory_symbol: "createDataStructure",
    };
    const ARTIFACT_DIR: &'static str = "structures";

    fn bind(resolve: &mut Resolver<'_>) -> Result<Self::Api, LoadError> {
        // SAFETY: each name is paired with the signature declared in DataStructure.hpp
        unsafe {
            Ok(StructureApi {
                factory: resolve(Self::CONTRACT.factory_symbol)?.cast(),
                create: resolve(abi::STRUCTURE_CREATE)?.cast(),
                insert: resolve(abi::STRUCTURE_INSERT)?.cast(),
                remove: resolve(abi::STRUCTURE_REMOVE)?.cast(),
                elements: resolve(abi::STRUCTURE_ELEMENTS)?.cast(),
                name: resolve(abi::STRUCTURE_NAME)?.cast(),
                destroy: resolve(abi::STRUCTURE_DESTROY)?.cast(),
            })
        }
    }

    unsafe fn instantiate(api: Self::Api, lease: Lease) -> Result<Box<Self::Instance>, CreateFailure> {
        PluginStructure::create(api, lease).map(|s| Box::new(s) as Box<dyn DataStructure>)
    }
}

impl ExtensionKind for Algorithms {
    type Api = AlgorithmApi;
    type Instance = dyn Algorithm;

    const LABEL: &'static str = "algorithm";
    const CONTRACT: SourceContract = SourceContract {
        header: "Algorithm.hpp",
        base_class: "Algorithm",
        base_phrase: "public Algorithm",
        overrides: &["execute", "executeAndDisplay", "display"],
        factory_symbol: "createAlgorithm",
    };
    const ARTIFACT_DIR: &'static str = "algorithms";

    fn bind(resolve: &mut Resolver<'_>) -> Result<Self::Api, LoadError> {
        // SAFETY: each name is paired with the signature declared in Algorithm.hpp
        unsafe {
            Ok(AlgorithmApi {
                factory: resolve(Self::CONTRACT.factory_symbol)?.cast(),
                create: resolve(abi::ALGORITHM_CREATE)?.cast(),
                execute: resolve(abi::ALGORITHM_EXECUTE)?.cast(),
                display: resolve(abi::ALGORITHM_DISPLAY)?.cast(),
                name: resolve(abi::ALGORITHM_NAME)?.cast(),
                destroy: resolve(abi::ALGORITHM_DESTROY)?.cast(),
            })
        }
    }

    unsafe fn instantiate(api: Self::Api, lease: Lease) -> Result<Box<Self::Instance>, CreateFailure> {
        PluginAlgorithm::create(api, lease).map(|a| Box::new(a) as Box<dyn Algorithm>)
    }
}
