//! Builds validated plugin sources into shared libraries
//!
//! The toolchain runs as a blocking child process. There is no timeout: a hung
//! compiler hangs the session.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::error::{BuildError, CompileError};
use super::kind::ExtensionKind;
use super::layout::ArtifactLayout;
use super::validator::SourceValidator;
use crate::config::ToolchainConfig;

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit code and combined stdout/stderr of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub output: String,
}

/// Runs toolchain commands to completion
pub trait CommandRunner {
    /// # Errors
    /// Infrastructure failures only (missing program, spawn or log I/O). A
    /// non-zero exit is a normal [`CommandOutcome`].
    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, CompileError>;
}

/// Spawns real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, CompileError> {
        let program = which::which(&command.program).map_err(|_| CompileError::ToolchainNotFound {
            program: command.program.clone(),
        })?;

        // stdout and stderr share one descriptor offset, so output interleaves
        // the way a terminal would show it
        let log = NamedTempFile::new().map_err(io_error("Failed to create compiler log"))?;
        let stdout = log
            .as_file()
            .try_clone()
            .map_err(io_error("Failed to open compiler log"))?;
        let stderr = log
            .as_file()
            .try_clone()
            .map_err(io_error("Failed to open compiler log"))?;

        let status = Command::new(&program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .map_err(io_error(&format!("Failed to run {}", program.display())))?;

        let output = fs::read(log.path()).map_err(io_error("Failed to read compiler log"))?;
        if let Err(e) = log.close() {
            warn!("Failed to delete compiler log: {}", e);
        }

        Ok(CommandOutcome {
            exit_code: status.code(),
            output: String::from_utf8_lossy(&output).into_owned(),
        })
    }
}

fn io_error(context: &str) -> impl FnOnce(io::Error) -> CompileError + '_ {
    move |source| CompileError::Io {
        context: context.to_string(),
        source,
    }
}

/// Result of one compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Where the library was (or would have been) written
    pub library_path: PathBuf,
    /// Compiler output, verbatim
    pub diagnostics: String,
    pub success: bool,
}

impl CompiledArtifact {
    /// Library path on success, [`CompileError::Failed`] with the diagnostics otherwise
    ///
    /// # Errors
    /// Returns [`CompileError::Failed`] when the compile did not succeed.
    pub fn into_library(self) -> Result<PathBuf, CompileError> {
        if self.success {
            Ok(self.library_path)
        } else {
            Err(CompileError::Failed {
                diagnostics: self.diagnostics,
            })
        }
    }
}

/// Turns plugin sources into libraries under the artifact layout
#[derive(Debug, Clone)]
pub struct Compiler<R: CommandRunner = ProcessRunner> {
    runner: R,
    toolchain: ToolchainConfig,
    layout: ArtifactLayout,
}

impl Compiler {
    pub fn new(toolchain: ToolchainConfig, layout: ArtifactLayout) -> Self {
        Self::with_runner(ProcessRunner, toolchain, layout)
    }
}

impl<R: CommandRunner> Compiler<R> {
    pub fn with_runner(runner: R, toolchain: ToolchainConfig, layout: ArtifactLayout) -> Self {
        Self {
            runner,
            toolchain,
            layout,
        }
    }

    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Toolchain invocation building `source` into `output`
    #[must_use]
    pub fn command_for(&self, source: &Path, output: &Path) -> CommandSpec {
        let include = &self.toolchain.include_dir;
        let mut args = vec![
            format!("-std={}", self.toolchain.standard),
            "-shared".to_string(),
        ];
        if !cfg!(windows) {
            args.push("-fPIC".to_string());
        }
        args.push("-Wall".to_string());
        args.push("-Wextra".to_string());
        args.push(format!("-I{}", include.display()));
        args.push(format!("-I{}", include.join("model").display()));
        args.extend(self.toolchain.extra_flags.iter().cloned());
        if cfg!(windows) {
            // The factory is not marked dllexport by the plugin author
            args.push("-Wl,--export-all-symbols".to_string());
        }
        args.push(source.display().to_string());
        args.push("-o".to_string());
        args.push(output.display().to_string());

        CommandSpec {
            program: self.toolchain.compiler.clone(),
            args,
        }
    }

    /// Compile `source` into `<root>/<kind dir>/<stem>_generated.<dll ext>`.
    ///
    /// A failed build removes any partial output and is reported through
    /// `success = false`, not as an error.
    ///
    /// # Errors
    /// Returns [`CompileError`] when the toolchain could not be run at all.
    pub fn compile<K: ExtensionKind>(&self, source: &Path) -> Result<CompiledArtifact, CompileError> {
        let dir = self.layout.dir(K::ARTIFACT_DIR);
        fs::create_dir_all(&dir).map_err(|source| CompileError::Io {
            context: format!("Failed to create {}", dir.display()),
            source,
        })?;

        let output = self.layout.artifact_path(K::ARTIFACT_DIR, source);
        remove_artifact(&output).map_err(|source| CompileError::Io {
            context: format!("Failed to remove stale {}", output.display()),
            source,
        })?;

        let command = self.command_for(source, &output);
        info!("Compiling {} {}", K::LABEL, source.display());
        debug!("{}", command);

        let outcome = self.runner.run(&command)?;
        let success = outcome.exit_code == Some(0);
        if success {
            info!("Built {}", output.display());
        } else {
            warn!(
                "Compiler exited with {:?} for {}",
                outcome.exit_code,
                source.display()
            );
            if let Err(e) = remove_artifact(&output) {
                warn!("Failed to remove partial {}: {}", output.display(), e);
            }
        }

        Ok(CompiledArtifact {
            library_path: output,
            diagnostics: outcome.output,
            success,
        })
    }

    /// Validate `path` for kind `K`, then compile it. Nothing is compiled when
    /// validation fails.
    ///
    /// # Errors
    /// Returns the validation failure, an infrastructure failure, or
    /// [`CompileError::Failed`] carrying the diagnostics.
    pub fn build<K: ExtensionKind>(&self, path: &Path) -> Result<PathBuf, BuildError> {
        let source = SourceValidator::for_kind::<K>().validate(path)?;
        let library = self.compile::<K>(&source.path)?.into_library()?;
        Ok(library)
    }
}

fn remove_artifact(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
