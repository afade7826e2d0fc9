use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use raystruct::config::Config;
use raystruct::session::{Editor, Session};

/// RayStruct - benchmark data structures and algorithms, including your own C++ ones
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// C++ compiler used for custom sources
    #[arg(long)]
    compiler: Option<String>,

    /// Keep generated plugin libraries on disk at exit
    #[arg(long)]
    keep_artifacts: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they don't interleave with the session prompts.
    // RUST_LOG applies unless --debug is given.
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    // Load configuration
    let mut config = if let Some(config_path) = args.config {
        Config::load_from_file(&config_path)?
    } else {
        Config::load_default()?
    };

    if let Some(compiler) = args.compiler {
        config.toolchain.compiler = compiler;
    }

    let mut editor = Editor::new()?;
    let mut session = Session::new(config, args.keep_artifacts);
    let report = session.run(&mut editor);

    for path in &report.leaked {
        warn!("Library still mapped at exit: {}", path.display());
    }
    if !report.retained.is_empty() {
        info!("Kept {} generated artifact(s)", report.retained.len());
    }

    Ok(())
}
