// Integration tests for the extension pipeline
//
// Toolchain tests compile real plugins and are skipped when g++ is not on PATH.

mod validation_tests {
    use raystruct::config::ToolchainConfig;
    use raystruct::plugins::{
        ArtifactLayout, BuildError, CommandOutcome, CommandRunner, CommandSpec, CompileError,
        Compiler, Structures, ValidationError,
    };
    use std::cell::Cell;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingRunner {
        runs: Cell<usize>,
    }

    impl CommandRunner for CountingRunner {
        fn run(&self, _command: &CommandSpec) -> Result<CommandOutcome, CompileError> {
            self.runs.set(self.runs.get() + 1);
            Ok(CommandOutcome {
                exit_code: Some(0),
                output: String::new(),
            })
        }
    }

    #[test]
    fn test_missing_base_class_never_compiles() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Loose.cpp");
        std::fs::write(
            &source,
            r#"
#include "DataStructure.hpp"
class Loose {
public:
    void insert(int v) {}
    void remove(int v) {}
    std::vector<int> getElements() const { return {}; }
};
extern "C" DataStructure* createDataStructure() { return nullptr; }
"#,
        )
        .unwrap();

        let compiler = Compiler::with_runner(
            CountingRunner::default(),
            ToolchainConfig::default(),
            ArtifactLayout::new(dir.path().join("build")),
        );
        let err = compiler.build::<Structures>(&source).unwrap_err();

        match err {
            BuildError::Validation(ValidationError::MissingBaseClass { phrase }) => {
                assert_eq!(phrase, "public DataStructure")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(compiler.runner().runs.get(), 0);
    }
}

mod loader_tests {
    use raystruct::model::StructureKind;
    use raystruct::plugins::abi::RawSymbol;
    use raystruct::plugins::{
        ArtifactLayout, DynamicLoader, ExtensionFactory, FactoryError, LoadError, StructureFactory,
    };
    use std::cell::Cell;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::tempdir;

    // Never called: the loads below fail before anything is instantiated
    extern "C" fn placeholder() {}

    /// Resolves every symbol except the structure factory
    #[derive(Clone, Default)]
    struct NoFactoryLoader {
        opens: Rc<Cell<usize>>,
    }

    impl DynamicLoader for NoFactoryLoader {
        type Handle = ();

        fn open(&self, _path: &Path) -> Result<(), String> {
            self.opens.set(self.opens.get() + 1);
            Ok(())
        }

        fn resolve_symbol(&self, _handle: &(), name: &str) -> Result<RawSymbol, String> {
            if name == "createDataStructure" {
                return Err(format!("undefined symbol: {name}"));
            }
            RawSymbol::from_fn(placeholder as *const ()).ok_or_else(|| "null".to_string())
        }

        fn close(&self, _handle: ()) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_factory_symbol_is_named() {
        let dir = tempdir().unwrap();
        let lib = dir.path().join("Vendor.so");
        std::fs::write(&lib, b"lib").unwrap();
        let loader = NoFactoryLoader::default();
        let opens = loader.opens.clone();

        let mut factory: StructureFactory<NoFactoryLoader> =
            ExtensionFactory::with_loader(loader, ArtifactLayout::new(dir.path().join("build")));

        for _ in 0..2 {
            let err = factory
                .create_instance(StructureKind::Custom, Some(&lib))
                .err()
                .unwrap();
            match err {
                FactoryError::Load(LoadError::MissingSymbol { symbol, .. }) => {
                    assert_eq!(symbol, "createDataStructure")
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        // Failed loads are retried, not memoized
        assert_eq!(opens.get(), 2);
        assert!(factory.cache().is_empty());
        assert!(factory.create_instance(StructureKind::List, None).is_ok());
    }
}

mod toolchain_tests {
    use raystruct::config::ToolchainConfig;
    use raystruct::model::{AlgorithmKind, DataStructure, StructureKind};
    use raystruct::plugins::{
        AlgorithmFactory, Algorithms, ArtifactLayout, Compiler, ExtensionFactory, FactoryError,
        LoadError, StructureFactory, Structures,
    };
    use raystruct::structures::ListStructure;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    const APPEND_LIST: &str = r#"
#include "DataStructure.hpp"
#include <algorithm>

class AppendList : public DataStructure {
    std::vector<int> items;
public:
    void insert(int value) override { items.push_back(value); }
    void remove(int value) override {
        auto it = std::find(items.begin(), items.end(), value);
        if (it != items.end()) items.erase(it);
    }
    std::vector<int> getElements() const override { return items; }
    std::string getName() const override { return "Append List"; }
};

extern "C" DataStructure* createDataStructure() { return new AppendList(); }
"#;

    fn toolchain_available() -> bool {
        let found = which::which("g++").is_ok();
        if !found {
            eprintln!("g++ not on PATH; skipping");
        }
        found
    }

    fn repo_path(relative: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
    }

    fn setup() -> (TempDir, ArtifactLayout, Compiler) {
        let dir = tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("build"));
        let toolchain = ToolchainConfig {
            include_dir: repo_path("include"),
            ..ToolchainConfig::default()
        };
        let compiler = Compiler::new(toolchain, layout.clone());
        (dir, layout, compiler)
    }

    #[test]
    fn test_invalid_source_fails_without_artifact() {
        if !toolchain_available() {
            return;
        }
        let (dir, _layout, compiler) = setup();
        let source = dir.path().join("Broken.cpp");
        std::fs::write(&source, "#include \"DataStructure.hpp\"\nint broken( {\n").unwrap();

        let artifact = compiler.compile::<Structures>(&source).unwrap();

        assert!(!artifact.success);
        assert!(!artifact.diagnostics.trim().is_empty());
        assert!(!artifact.library_path.exists());
    }

    #[test]
    fn test_custom_list_round_trip() {
        if !toolchain_available() {
            return;
        }
        let (dir, layout, compiler) = setup();
        let source = dir.path().join("AppendList.cpp");
        std::fs::write(&source, APPEND_LIST).unwrap();

        let library = compiler.build::<Structures>(&source).unwrap();
        let mut factory: StructureFactory = ExtensionFactory::new(layout);

        let mut ds = factory
            .create_instance(StructureKind::Custom, Some(&library))
            .unwrap();
        ds.insert(7);
        assert_eq!(ds.elements(), vec![7]);
        assert_eq!(ds.name(), "Append List");

        assert!(factory.cache().contains(&library));
        drop(ds);

        let report = factory.cleanup_all();
        assert_eq!(report.closed, 1);
        assert!(report.is_clean());
        assert!(!library.exists());
    }

    #[test]
    fn test_sample_plugins() {
        if !toolchain_available() {
            return;
        }
        let (_dir, layout, compiler) = setup();

        let structure_lib = compiler
            .build::<Structures>(&repo_path("custom/FrontList.cpp"))
            .unwrap();
        let algorithm_lib = compiler
            .build::<Algorithms>(&repo_path("custom/RadixSort.cpp"))
            .unwrap();

        let mut structures: StructureFactory = ExtensionFactory::new(layout.clone());
        let mut algorithms: AlgorithmFactory = ExtensionFactory::new(layout);

        let mut front = structures
            .create_instance(StructureKind::Custom, Some(&structure_lib))
            .unwrap();
        for v in [3, 1, 2] {
            front.insert(v);
        }
        assert_eq!(front.elements(), vec![2, 1, 3]);
        assert_eq!(front.name(), "Front List");

        let mut radix = algorithms
            .create_instance(AlgorithmKind::Custom, Some(&algorithm_lib))
            .unwrap();
        assert_eq!(radix.name(), "Radix Sort");

        // A plugin algorithm over a built-in structure, through the host table
        let mut list = ListStructure::new();
        for v in [170, 45, 75, 90] {
            list.insert(v);
        }
        radix.execute(&mut list);
        radix.execute(front.as_mut());
        assert_eq!(list.elements(), vec![170, 45, 75, 90]);

        drop(front);
        drop(radix);
        assert!(structures.cleanup_all().is_clean());
        assert!(algorithms.cleanup_all().is_clean());
        assert!(!structure_lib.exists());
        assert!(!algorithm_lib.exists());
    }

    #[test]
    fn test_throwing_constructor_is_an_error() {
        if !toolchain_available() {
            return;
        }
        let (dir, layout, compiler) = setup();
        let source = dir.path().join("Thrower.cpp");
        std::fs::write(
            &source,
            APPEND_LIST
                .replace("class AppendList", "#include <stdexcept>\nclass AppendList")
                .replace(
                    "public:\n",
                    "public:\n    AppendList() { throw std::runtime_error(\"no capacity\"); }\n",
                ),
        )
        .unwrap();

        let library = compiler.build::<Structures>(&source).unwrap();
        let mut factory: StructureFactory = ExtensionFactory::new(layout);

        for _ in 0..2 {
            let err = factory
                .create_instance(StructureKind::Custom, Some(&library))
                .err()
                .unwrap();
            match err {
                FactoryError::FactoryThrew { reason, .. } => assert_eq!(reason, "no capacity"),
                other => panic!("unexpected error: {other}"),
            }
        }

        // The library loaded fine; only its constructor failed
        assert!(factory.cache().contains(&library));
        assert!(factory.cleanup_all().is_clean());
        assert!(!library.exists());
    }

    #[test]
    fn test_compiled_library_without_factory() {
        if !toolchain_available() {
            return;
        }
        let (dir, layout, compiler) = setup();
        let source = dir.path().join("NoFactory.cpp");
        std::fs::write(
            &source,
            APPEND_LIST.replace(
                "extern \"C\" DataStructure* createDataStructure() { return new AppendList(); }",
                "DataStructure* makeList() { return new AppendList(); }",
            ),
        )
        .unwrap();

        // Skip validation: the validator would reject this before compiling
        let library = compiler
            .compile::<Structures>(&source)
            .unwrap()
            .into_library()
            .unwrap();
        let mut factory: StructureFactory = ExtensionFactory::new(layout);

        let err = factory
            .create_instance(StructureKind::Custom, Some(&library))
            .err()
            .unwrap();
        match err {
            FactoryError::Load(LoadError::MissingSymbol { symbol, .. }) => {
                assert_eq!(symbol, "createDataStructure")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(factory.cache().is_empty());
    }
}
