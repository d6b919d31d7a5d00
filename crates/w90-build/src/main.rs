use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use w90_build::findup;
use w90_build::probe::Probe;
use w90_build::sh::System;
use w90_build::{BuildConfig, OsFamily, Pipeline};

/// w90-build command-line interface
#[derive(Parser)]
#[command(name = "w90-build", version, about = "Build the libwannier90 Python extension")]
struct Cli {
    /// Path to YAML config (defaults to the nearest `w90-build.yaml`)
    #[arg(long, global = true, env = "W90_BUILD_CONFIG")]
    config: Option<PathBuf>,

    /// Override the detected OS family
    #[arg(long, global = true, value_enum)]
    os: Option<OsFamily>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Do not probe or install BLAS/LAPACK and pybind11
    #[arg(long)]
    skip_deps: bool,
}

/// Supported subcommands
#[derive(Subcommand)]
enum Command {
    /// Install dependencies, build wannier90 and compile the extension
    Build(BuildArgs),
    /// Build, then copy the extension into the interpreter's library dir
    Install {
        #[command(flatten)]
        build: BuildArgs,

        /// Install into this directory instead
        #[arg(long)]
        target: Option<PathBuf>,
    },
    /// Report missing prerequisites without installing anything
    Probe,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_config(cli: &Cli) -> Result<(PathBuf, BuildConfig)> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let (root, found) = match &cli.config {
        Some(path) => {
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| cwd.join(p))
                .unwrap_or_else(|| cwd.clone());
            (root, Some(path.clone()))
        }
        None => findup::project_root(&cwd),
    };

    let config = match found {
        Some(path) => {
            log::debug!("using config {}", path.display());
            BuildConfig::load(&path)?
        }
        None => BuildConfig::default(),
    };
    Ok((root, config))
}

fn run(cli: Cli) -> Result<()> {
    let (root, config) = load_config(&cli)?;
    let os = cli.os.unwrap_or_else(OsFamily::detect);
    log::debug!("project root {}, OS family {os}", root.display());

    let shell = System;
    let pipeline = Pipeline::new(&shell, config, &root, os);

    match cli.command {
        Command::Build(args) => {
            let report = pipeline.skip_deps(args.skip_deps).build()?;
            println!("built {}", report.module.display());
            println!("staged {}", report.staged.dir.display());
        }
        Command::Install { build, target } => {
            let (_, installed) = pipeline
                .skip_deps(build.skip_deps)
                .install(target.as_deref())?;
            for path in installed {
                println!("installed {}", path.display());
            }
        }
        Command::Probe => {
            let reports = pipeline.probe()?;
            let mut missing = 0;
            for r in &reports {
                println!("{:<20} {}", r.package, r.probe);
                if r.probe == Probe::Missing {
                    missing += 1;
                }
            }
            if missing > 0 {
                anyhow::bail!("{missing} prerequisite(s) missing");
            }
        }
    }
    Ok(())
}

fn error_message(e: &anyhow::Error) -> String {
    format!("Error: {:#}", e)
}

fn exit_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = &result {
        eprintln!("{}", error_message(e));
    }
    std::process::exit(exit_code(&result));
}
