//! Interactive benchmark session
//!
//! One round: pick a structure and an algorithm (compiling custom sources on
//! demand), populate the structure, time the algorithm, show the steps.
//! Instances live for one round; loaded libraries live until shutdown.

use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use rand::Rng;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::benchmark::BenchmarkManager;
use crate::config::Config;
use crate::model::{AlgorithmKind, DataStructure, StructureKind};
use crate::plugins::{
    canonical_path, AlgorithmFactory, Algorithms, ArtifactLayout, CleanupReport, CommandRunner,
    Compiler, DynamicLoader, ExtensionFactory, ExtensionKind, NativeLoader, ProcessRunner,
    StructureFactory, Structures, SOURCE_EXTENSION,
};

const PROMPT: &str = ">>> ";

/// Where session input comes from
pub trait LineSource {
    /// Next line without its terminator; `None` at end of input
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Terminal line editor with history
pub struct Editor {
    inner: DefaultEditor,
}

impl Editor {
    pub fn new() -> Result<Self> {
        let inner = DefaultEditor::new().context("Failed to initialize line editor")?;
        Ok(Self { inner })
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match self.inner.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.inner.add_history_entry(line.as_str());
                }
                Some(line)
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => None,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                None
            }
        }
    }
}

/// One line of population input
#[derive(Debug, Clone, PartialEq)]
pub enum PopulateCommand {
    Values(Vec<i32>),
    /// `rnd`, optionally with the count on the same line
    Random(Option<usize>),
    Edge { from: i32, to: i32, weight: f64 },
    Heuristic { vertex: i32, value: f64 },
    Done,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("empty input")]
    Empty,
    #[error("invalid input {0:?}: enter an integer or one of the commands")]
    Invalid(String),
    #[error("'{0}' is not available for graphs")]
    NotForGraphs(&'static str),
    #[error("edge weight {0:?} must be a finite, non-negative number")]
    InvalidWeight(String),
}

/// Parse a population line. Graph input accepts `u v w` edges and
/// `h v value` heuristics; other structures take integers.
pub fn parse_populate(line: &str, graph: bool) -> Result<PopulateCommand, InputError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = tokens.first() else {
        return Err(InputError::Empty);
    };

    match first.to_lowercase().as_str() {
        "done" if tokens.len() == 1 => return Ok(PopulateCommand::Done),
        "exit" if tokens.len() == 1 => return Ok(PopulateCommand::Exit),
        "rnd" if graph => return Err(InputError::NotForGraphs("rnd")),
        "rnd" => {
            return match tokens.as_slice() {
                [_] => Ok(PopulateCommand::Random(None)),
                [_, count] => count
                    .parse()
                    .map(|n| PopulateCommand::Random(Some(n)))
                    .map_err(|_| InputError::Invalid((*count).to_string())),
                _ => Err(InputError::Invalid(line.trim().to_string())),
            };
        }
        "h" if graph => {
            return match tokens.as_slice() {
                [_, vertex, value] => Ok(PopulateCommand::Heuristic {
                    vertex: parse_token(vertex)?,
                    value: parse_finite(value)?,
                }),
                _ => Err(InputError::Invalid(line.trim().to_string())),
            };
        }
        _ => {}
    }

    if graph {
        return match tokens.as_slice() {
            [from, to, weight] => Ok(PopulateCommand::Edge {
                from: parse_token(from)?,
                to: parse_token(to)?,
                weight: parse_weight(weight)?,
            }),
            [vertex] => Ok(PopulateCommand::Values(vec![parse_token(vertex)?])),
            _ => Err(InputError::Invalid(line.trim().to_string())),
        };
    }

    tokens
        .iter()
        .map(|t| parse_token(t))
        .collect::<Result<Vec<i32>, _>>()
        .map(PopulateCommand::Values)
}

fn parse_finite(token: &str) -> Result<f64, InputError> {
    let value: f64 = parse_token(token)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::Invalid(token.to_string()))
    }
}

/// Edge weights must be finite and non-negative for A* and Prim
fn parse_weight(token: &str) -> Result<f64, InputError> {
    match parse_token::<f64>(token)? {
        w if w.is_finite() && w >= 0.0 => Ok(w),
        _ => Err(InputError::InvalidWeight(token.to_string())),
    }
}

fn parse_token<T: std::str::FromStr>(token: &str) -> Result<T, InputError> {
    token
        .parse()
        .map_err(|_| InputError::Invalid(token.to_string()))
}

fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// The interactive benchmark loop and the factories it owns
pub struct Session<R: CommandRunner = ProcessRunner, L: DynamicLoader = NativeLoader> {
    config: Config,
    compiler: Compiler<R>,
    structures: StructureFactory<L>,
    algorithms: AlgorithmFactory<L>,
    benchmark: BenchmarkManager,
    /// (artifact kind directory, canonical source path) → library built this session
    built: HashMap<(&'static str, PathBuf), PathBuf>,
    clear_screen: bool,
}

impl Session {
    /// Session using the configured toolchain and the platform loader
    pub fn new(config: Config, keep_artifacts: bool) -> Self {
        let layout = ArtifactLayout::new(config.artifacts.root.clone());
        let compiler = Compiler::new(config.toolchain.clone(), layout.clone());
        let mut structures: StructureFactory = ExtensionFactory::new(layout.clone());
        let mut algorithms: AlgorithmFactory = ExtensionFactory::new(layout);
        structures.set_retain_artifacts(keep_artifacts);
        algorithms.set_retain_artifacts(keep_artifacts);

        let mut session = Self::with_parts(config, compiler, structures, algorithms);
        session.clear_screen = io::stdout().is_terminal();
        session
    }
}

impl<R: CommandRunner, L: DynamicLoader> Session<R, L> {
    /// Session over explicit parts. Algorithm settings come from `config`.
    pub fn with_parts(
        config: Config,
        compiler: Compiler<R>,
        structures: StructureFactory<L>,
        algorithms: AlgorithmFactory<L>,
    ) -> Self {
        let algorithms = algorithms.with_settings(config.algorithms.clone());
        Self {
            config,
            compiler,
            structures,
            algorithms,
            benchmark: BenchmarkManager::new(),
            built: HashMap::new(),
            clear_screen: false,
        }
    }

    #[must_use]
    pub fn structures(&self) -> &StructureFactory<L> {
        &self.structures
    }

    #[must_use]
    pub fn algorithms(&self) -> &AlgorithmFactory<L> {
        &self.algorithms
    }

    /// Run rounds until the user exits or input ends, then clean up
    pub fn run(&mut self, input: &mut dyn LineSource) -> CleanupReport {
        println!("RayStruct: Structures and Algorithms Benchmarking Tool");
        println!("Type 'exit' at any point to quit.");

        while self.round(input) == Flow::Continue {}

        self.shutdown()
    }

    /// Close every loaded library and delete generated artifacts
    pub fn shutdown(&mut self) -> CleanupReport {
        let mut report = self.structures.cleanup_all();
        report.merge(self.algorithms.cleanup_all());
        self.built.clear();
        info!(
            "Cleanup: {} closed, {} deleted, {} kept, {} leaked",
            report.closed,
            report.deleted.len(),
            report.retained.len(),
            report.leaked.len()
        );
        report
    }

    fn round(&mut self, input: &mut dyn LineSource) -> Flow {
        let Some((structure, structure_lib)) = self.select_structure(input) else {
            return Flow::Exit;
        };
        let Some((algorithm, algorithm_lib)) = self.select_algorithm(input, structure) else {
            return Flow::Exit;
        };

        let mut ds = match self
            .structures
            .create_instance(structure, structure_lib.as_deref())
        {
            Ok(ds) => ds,
            Err(e) => {
                warn!("Structure unavailable: {}", e);
                println!("\nFailed to create data structure instance: {e}");
                return Flow::Continue;
            }
        };
        let mut algo = match self
            .algorithms
            .create_instance(algorithm, algorithm_lib.as_deref())
        {
            Ok(algo) => algo,
            Err(e) => {
                warn!("Algorithm unavailable: {}", e);
                println!("\nFailed to create algorithm instance: {e}");
                return Flow::Continue;
            }
        };

        if self.populate(input, structure, ds.as_mut()) == Flow::Exit {
            return Flow::Exit;
        }

        let count = ds.elements().len();
        if count < self.config.benchmark.min_elements {
            println!("\nData structure size is too small. Cannot run benchmark.");
            return Flow::Continue;
        }

        self.clear_console();
        let result = self.benchmark.run(ds.as_mut(), algo.as_mut());

        println!("\nBenchmark successful: {} on {}", algo.name(), ds.name());
        println!("\nExecution Time (ms): {:.4}", result.execution_time_ms);
        println!("\nMemory Usage (B): {}", result.memory_used_bytes);
        if let Some(rss) = result.resident_memory_bytes {
            println!("\nProcess Memory: {}", BenchmarkManager::format_bytes(rss));
        }
        if count <= self.config.benchmark.display_limit {
            println!("\nOperations:");
            algo.execute_and_display(ds.as_mut());
        }

        println!("\n\nPress enter to continue ('exit' to quit)");
        let line = input.read_line(PROMPT);
        self.clear_console();
        match line {
            Some(line) if !is_exit(&line) => Flow::Continue,
            _ => Flow::Exit,
        }
    }

    fn select_structure(
        &mut self,
        input: &mut dyn LineSource,
    ) -> Option<(StructureKind, Option<PathBuf>)> {
        loop {
            println!("\nSelect data structure (List, Heap, Graph, Custom)");
            let line = input.read_line(PROMPT)?;
            if is_exit(&line) {
                return None;
            }
            match line.parse::<StructureKind>() {
                Ok(StructureKind::Custom) => {
                    let library = self.custom_library::<Structures>(input)?;
                    return Some((StructureKind::Custom, Some(library)));
                }
                Ok(kind) => return Some((kind, None)),
                Err(e) => {
                    debug!("{}", e);
                    println!("\nInvalid structure. Try again.");
                }
            }
        }
    }

    fn select_algorithm(
        &mut self,
        input: &mut dyn LineSource,
        structure: StructureKind,
    ) -> Option<(AlgorithmKind, Option<PathBuf>)> {
        let offered = structure.algorithms();
        let menu = offered
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        loop {
            println!("\nSelect algorithm ({menu})");
            let line = input.read_line(PROMPT)?;
            if is_exit(&line) {
                return None;
            }
            match line.parse::<AlgorithmKind>() {
                Ok(AlgorithmKind::Custom) => {
                    let library = self.custom_library::<Algorithms>(input)?;
                    return Some((AlgorithmKind::Custom, Some(library)));
                }
                Ok(kind) if offered.contains(&kind) => return Some((kind, None)),
                Ok(kind) => println!("\n{kind} is not available for {structure}. Try again."),
                Err(e) => {
                    debug!("{}", e);
                    println!("\nInvalid algorithm. Try again.");
                }
            }
        }
    }

    /// Ask for a source until one validates and compiles. `None` on exit.
    ///
    /// A source already built this session as the same kind is not rebuilt:
    /// its library is loaded and edits only take effect after a restart.
    /// Reusing it as the other kind validates it against that kind's contract.
    fn custom_library<K: ExtensionKind>(&mut self, input: &mut dyn LineSource) -> Option<PathBuf> {
        loop {
            println!("\nPath to the custom {} source (.{SOURCE_EXTENSION})", K::LABEL);
            let line = input.read_line(PROMPT)?;
            let line = line.trim();
            if is_exit(line) {
                return None;
            }
            if line.is_empty() {
                continue;
            }

            let source = canonical_path(Path::new(line));
            let key = (K::ARTIFACT_DIR, source);
            if let Some(library) = self.built.get(&key) {
                info!(
                    "Reusing {} built from {}; restart to pick up source changes",
                    library.display(),
                    key.1.display()
                );
                return Some(library.clone());
            }

            match self.compiler.build::<K>(&key.1) {
                Ok(library) => {
                    println!("\nCompiled {}", library.display());
                    self.built.insert(key, library.clone());
                    return Some(library);
                }
                Err(e) => println!("\n{e}\nTry again."),
            }
        }
    }

    fn populate(
        &self,
        input: &mut dyn LineSource,
        structure: StructureKind,
        ds: &mut dyn DataStructure,
    ) -> Flow {
        let graph = ds.as_graph().is_some();
        let instructions = if graph {
            "Add edges as 'u v w', heuristics as 'h v value', vertices as 'v' ('done' to finish, 'exit' to quit)"
        } else {
            "Insert elements ('done' to finish, 'rnd' to insert random elements, 'exit' to quit)"
        };

        loop {
            println!("\n{} into {}", instructions, structure);
            let Some(line) = input.read_line(PROMPT) else {
                return Flow::Exit;
            };

            match parse_populate(&line, graph) {
                Ok(PopulateCommand::Done) => return Flow::Continue,
                Ok(PopulateCommand::Exit) => return Flow::Exit,
                Ok(PopulateCommand::Values(values)) => {
                    for value in values {
                        ds.insert(value);
                    }
                }
                Ok(PopulateCommand::Random(count)) => {
                    let count = match count {
                        Some(count) => count,
                        None => match self.ask_count(input) {
                            Some(Ok(count)) => count,
                            Some(Err(e)) => {
                                println!("\n{e}");
                                continue;
                            }
                            None => return Flow::Exit,
                        },
                    };
                    self.insert_random(ds, count);
                    return Flow::Continue;
                }
                Ok(PopulateCommand::Edge { from, to, weight }) => {
                    if let Some(graph) = ds.as_graph_mut() {
                        graph.add_edge(from, to, weight, true);
                    }
                }
                Ok(PopulateCommand::Heuristic { vertex, value }) => {
                    if let Some(graph) = ds.as_graph_mut() {
                        graph.set_heuristic(vertex, value);
                    }
                }
                Err(InputError::Empty) => {}
                Err(e) => println!("\n{e}"),
            }
        }
    }

    fn ask_count(&self, input: &mut dyn LineSource) -> Option<Result<usize, InputError>> {
        println!("\nHow many elements do you want to insert?");
        let line = input.read_line(PROMPT)?;
        if is_exit(&line) {
            return None;
        }
        Some(parse_token(line.trim()))
    }

    fn insert_random(&self, ds: &mut dyn DataStructure, count: usize) {
        let range = self.config.benchmark.random_min..=self.config.benchmark.random_max;
        let mut rng = rand::thread_rng();
        for _ in 0..count {
            ds.insert(rng.gen_range(range.clone()));
        }
        debug!("Inserted {} random values in {:?}", count, range);
    }

    fn clear_console(&self) {
        if !self.clear_screen {
            return;
        }
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)) {
            debug!("Failed to clear console: {}", e);
        }
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolchainConfig;
    use crate::plugins::testing::FakeLoader;
    use crate::plugins::{CommandOutcome, CommandSpec, CompileError};
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Scripted(VecDeque<String>);

    impl Scripted {
        fn new(lines: &[&str]) -> Self {
            Self(lines.iter().map(|l| l.to_string()).collect())
        }
    }

    impl LineSource for Scripted {
        fn read_line(&mut self, _prompt: &str) -> Option<String> {
            self.0.pop_front()
        }
    }

    /// Writes the requested output file and succeeds
    #[derive(Default)]
    struct BuildingRunner {
        runs: Cell<usize>,
    }

    impl CommandRunner for BuildingRunner {
        fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, CompileError> {
            self.runs.set(self.runs.get() + 1);
            fs::write(command.args.last().unwrap(), b"lib").unwrap();
            Ok(CommandOutcome {
                exit_code: Some(0),
                output: String::new(),
            })
        }
    }

    const BAG_SOURCE: &str = r#"
#include "model/DataStructure.hpp"
#include <vector>
class Bag : public DataStructure {
    std::vector<int> items;
public:
    void insert(int v) override { items.push_back(v); }
    void remove(int v) override {}
    std::vector<int> getElements() const override { return items; }
};
extern "C" DataStructure* createDataStructure() { return new Bag(); }
"#;

    fn session(dir: &TempDir) -> Session<BuildingRunner, FakeLoader> {
        let layout = ArtifactLayout::new(dir.path().join("build"));
        let compiler =
            Compiler::with_runner(BuildingRunner::default(), ToolchainConfig::default(), layout.clone());
        Session::with_parts(
            Config::default(),
            compiler,
            ExtensionFactory::with_loader(FakeLoader::default(), layout.clone()),
            ExtensionFactory::with_loader(FakeLoader::default(), layout),
        )
    }

    #[test]
    fn test_parse_values_and_commands() {
        assert_eq!(parse_populate("5", false), Ok(PopulateCommand::Values(vec![5])));
        assert_eq!(
            parse_populate(" 3 -1 8 ", false),
            Ok(PopulateCommand::Values(vec![3, -1, 8]))
        );
        assert_eq!(parse_populate("DONE", false), Ok(PopulateCommand::Done));
        assert_eq!(parse_populate("exit", true), Ok(PopulateCommand::Exit));
        assert_eq!(parse_populate("rnd", false), Ok(PopulateCommand::Random(None)));
        assert_eq!(parse_populate("rnd 12", false), Ok(PopulateCommand::Random(Some(12))));
        assert_eq!(parse_populate("   ", false), Err(InputError::Empty));
        assert_eq!(
            parse_populate("4 x", false),
            Err(InputError::Invalid("x".to_string()))
        );
    }

    #[test]
    fn test_parse_graph_input() {
        assert_eq!(
            parse_populate("1 2 3.5", true),
            Ok(PopulateCommand::Edge {
                from: 1,
                to: 2,
                weight: 3.5
            })
        );
        assert_eq!(
            parse_populate("h 4 0.5", true),
            Ok(PopulateCommand::Heuristic {
                vertex: 4,
                value: 0.5
            })
        );
        assert_eq!(parse_populate("7", true), Ok(PopulateCommand::Values(vec![7])));
        assert_eq!(parse_populate("rnd", true), Err(InputError::NotForGraphs("rnd")));
        assert!(parse_populate("1 2", true).is_err());
    }

    #[test]
    fn test_graph_weights_must_be_finite_and_non_negative() {
        for weight in ["-5", "NaN", "inf", "-inf"] {
            assert_eq!(
                parse_populate(&format!("1 2 {weight}"), true),
                Err(InputError::InvalidWeight(weight.to_string()))
            );
        }
        assert_eq!(
            parse_populate("1 2 0", true),
            Ok(PopulateCommand::Edge {
                from: 1,
                to: 2,
                weight: 0.0
            })
        );
        assert_eq!(
            parse_populate("h 3 NaN", true),
            Err(InputError::Invalid("NaN".to_string()))
        );
    }

    #[test]
    fn test_negative_edge_is_refused_and_astar_completes() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir);
        let mut input = Scripted::new(&["graph", "a*", "1 2 -5", "1 2 5", "2 3 1", "done", "exit"]);

        session.run(&mut input);
        assert!(input.0.is_empty());
    }

    #[test]
    fn test_builtin_round_then_exit() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir);
        let mut input = Scripted::new(&["list", "insertion sort", "3 1 2", "done", "exit"]);

        let report = session.run(&mut input);
        assert!(report.is_clean());
        assert!(input.0.is_empty());
    }

    #[test]
    fn test_algorithm_must_match_structure() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir);
        // Prim is refused for a list, then the user quits
        let mut input = Scripted::new(&["list", "prim", "exit"]);

        session.run(&mut input);
        assert!(input.0.is_empty());
    }

    #[test]
    fn test_graph_round() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir);
        let mut input = Scripted::new(&["graph", "prim", "1 2 1", "2 3 2", "h 3 0", "done", ""]);

        session.run(&mut input);
        assert!(input.0.is_empty());
    }

    #[test]
    fn test_invalid_custom_source_reprompts_without_compiling() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Bag.cpp");
        fs::write(&source, BAG_SOURCE.replace("public DataStructure", "public Thing")).unwrap();

        let mut session = session(&dir);
        let source = source.display().to_string();
        let mut input = Scripted::new(&["custom", source.as_str(), "exit"]);

        session.run(&mut input);
        assert_eq!(session.compiler.runner().runs.get(), 0);
        assert!(session.structures().cache().is_empty());
    }

    #[test]
    fn test_custom_structure_is_built_once_and_cleaned_up() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Bag.cpp");
        fs::write(&source, BAG_SOURCE).unwrap();
        let source = source.display().to_string();

        let mut session = session(&dir);
        let mut input = Scripted::new(&[
            "custom",
            source.as_str(),
            "insertion sort",
            "4 2",
            "done",
            "",
            "custom",
            source.as_str(),
            "merge sort",
            "9 8",
            "done",
            "exit",
        ]);

        let report = session.run(&mut input);
        assert_eq!(session.compiler.runner().runs.get(), 1);
        assert_eq!(report.closed, 1);
        assert_eq!(report.deleted.len(), 1);
        assert!(!report.deleted[0].exists());
        assert!(session.structures().cache().is_empty());
    }

    #[test]
    fn test_structure_source_is_validated_again_as_algorithm() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Bag.cpp");
        fs::write(&source, BAG_SOURCE).unwrap();
        let source = source.display().to_string();

        let mut session = session(&dir);
        let mut input = Scripted::new(&[
            "custom",
            source.as_str(),
            "insertion sort",
            "4 2",
            "done",
            "",
            "list",
            "custom",
            source.as_str(),
            "exit",
        ]);

        let report = session.run(&mut input);
        assert!(input.0.is_empty());
        // Rejected by the algorithm checks, so never compiled or loaded as one
        assert_eq!(session.compiler.runner().runs.get(), 1);
        assert_eq!(report.closed, 1);
        assert_eq!(report.deleted.len(), 1);
        assert!(report.deleted[0].parent().unwrap().ends_with("structures"));
        assert!(session.algorithms().cache().is_empty());
    }

    #[test]
    fn test_too_few_elements_skips_benchmark() {
        let dir = tempdir().unwrap();
        let mut session = session(&dir);
        let mut input = Scripted::new(&["heap", "heap build", "1", "done", "exit"]);

        session.run(&mut input);
        assert!(input.0.is_empty());
    }
}
