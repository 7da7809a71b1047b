use anyhow::{Context, Result};
use apk_patcher::pipeline::{Observer, PipelineContext, StageStatus};
use apk_patcher::{settings, stages, PatchInputs};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apk-patcher")]
#[command(about = "Patch an Android APK with the code of AAR libraries", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the code of one or more AARs into an APK
    Patch {
        /// The target APK
        #[arg(short, long)]
        target: PathBuf,

        /// The source AAR(s)
        #[arg(short, long, num_args = 1.., required = true)]
        source: Vec<PathBuf>,

        /// Keep intermediate and patched output in this directory
        /// (a temporary directory is used and removed otherwise)
        #[arg(short, long)]
        workdir: Option<PathBuf>,

        /// Settings file (defaults to $APK_PATCHER_CONFIG, then
        /// ~/.config/apk-patcher/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let debug = settings::debug_from_env();
    init_tracing(debug);

    match cli.command {
        Commands::Patch {
            target,
            source,
            workdir,
            config,
        } => cmd_patch(&target, &source, workdir, config.as_deref(), debug),
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn success_message(message: &str) -> String {
    format!(
        "{} {}",
        " SUCCESS ".on_green().bold().bright_white(),
        message.green()
    )
}

fn error_message(message: &str) -> String {
    format!(
        "{} {}",
        " ERROR ".on_red().bold().bright_white(),
        message.red()
    )
}

/// Prints stage transitions and live tool output.
struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn stage_started(&mut self, title: &str) {
        println!("{} {}", "→".cyan(), title.bold());
    }

    fn stage_output(&mut self, _title: &str, line: &str) {
        println!("  {}", line.dimmed());
    }

    fn stage_finished(&mut self, title: &str, status: StageStatus) {
        match status {
            StageStatus::Succeeded => println!("{} {}", "✓".green(), title),
            StageStatus::Skipped => println!("{} {} {}", "⊘".cyan(), title, "[skipped]".dimmed()),
            StageStatus::Failed => eprintln!("{} {}", "✗".red(), title),
        }
    }
}

fn cmd_patch(
    target: &Path,
    sources: &[PathBuf],
    workdir: Option<PathBuf>,
    config: Option<&Path>,
    debug: bool,
) -> Result<()> {
    // 1. Validate inputs before anything else runs
    let inputs = match PatchInputs::validate(target, sources) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("{}", error_message(&e.to_string()));
            std::process::exit(1);
        }
    };

    // 2. Run, reporting a generic failure unless debugging
    match run_pipeline(inputs, workdir, config, debug) {
        Ok(Some(kept)) => {
            println!("{}", success_message("Successfully patched APK!"));
            println!("{}", format!("Patched sources: {}", kept.display()).dimmed());
            Ok(())
        }
        Ok(None) => {
            println!("{}", success_message("Successfully patched APK!"));
            Ok(())
        }
        Err(e) => {
            if debug {
                eprintln!("{e:?}");
            }
            println!("{}", error_message("Error patching APK. Please check logs!"));
            std::process::exit(1);
        }
    }
}

/// Run the pipeline. Returns the decoded, patched target directory when the
/// working directory is kept.
fn run_pipeline(
    inputs: PatchInputs,
    workdir: Option<PathBuf>,
    config: Option<&Path>,
    debug_mode: bool,
) -> Result<Option<PathBuf>> {
    let settings = settings::discover(config).context("failed to load settings")?;

    // `temp_dir` is removed when this function returns.
    let (working_dir, temp_dir) = match workdir {
        Some(dir) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            (dir, None)
        }
        None => {
            let temp = tempfile::Builder::new()
                .prefix("apk-patcher-")
                .tempdir()
                .context("failed to create a temporary working directory")?;
            (temp.path().to_path_buf(), Some(temp))
        }
    };
    let keep = temp_dir.is_none();

    tracing::info!(
        apk = %inputs.target.display(),
        sources = inputs.sources.len(),
        workdir = %working_dir.display(),
        debug_mode,
        "starting patch run"
    );

    let mut ctx = PipelineContext::new(working_dir, inputs.target, inputs.sources);
    let pipeline =
        stages::patch_pipeline(settings.toolchain(), settings.compile.clone(), debug_mode);
    pipeline.run(&mut ctx, &mut ConsoleObserver)?;

    Ok(if keep { ctx.decoded_target_dir } else { None })
}
