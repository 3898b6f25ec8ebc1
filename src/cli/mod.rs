//! Command line interface for shipline
//!
//! Parses the operator's request, resolves configuration and logging, runs
//! the pipeline and prints the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use shipline::{Config, RunOptions, Service, TargetStage, init_logging, run_pipeline};
use std::path::PathBuf;

/// CLI arguments for shipline
#[derive(Parser, Debug)]
#[command(name = "shipline")]
#[command(author, version, about = "Build and deploy a service through a fixed stage pipeline", long_about = None)]
struct Args {
    /// Service to build and deploy
    #[arg(long, default_value = "lotto-api")]
    service: Service,

    /// Target stage: frontend-build, backend-build, build, docker-rebuild,
    /// deploy, all, aws-deploy or verify
    #[arg(long, default_value = "all")]
    stage: TargetStage,

    /// Skip the toolchain prerequisite check
    #[arg(long)]
    skip_prerequisites: bool,

    /// Log performance numbers for every command and stage
    #[arg(long)]
    monitor: bool,

    /// Deploy to the local container engine
    #[arg(long)]
    local: bool,

    /// Configuration file (default: shipline.yaml in the project root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project root all service paths are relative to
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Log level, overriding the configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Parse and execute CLI arguments
///
/// Returns whether the pipeline succeeded.
pub fn run() -> Result<bool> {
    let args = Args::parse();

    let root = args.project_root.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config =
        Config::resolve(args.config.as_deref(), &root).context("Failed to load configuration")?;
    if let Some(project_root) = args.project_root {
        config.project_root = project_root;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);

    let options = RunOptions {
        service: args.service,
        target: args.stage,
        local: args.local,
        skip_prerequisites: args.skip_prerequisites,
        monitor: args.monitor,
    };

    let (_, report) = run_pipeline(&config, options);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{json}");
    } else if let Some(stage) = report.failed_stage {
        eprintln!("Stage '{stage}' failed:");
        for line in &report.diagnostics {
            eprintln!("  {line}");
        }
    }

    Ok(report.success)
}
