//! CI Plan - build platform planning for the CI workflow
//!
//! The `ci-plan` command exposes the platform registry to workflow steps.
//!
//! ## Commands
//!
//! - `list`: Show every supported platform
//! - `show`: Show one platform descriptor
//! - `core`: Show the platform used for platform-independent jobs
//! - `export`: Dump the full registry as JSON
//! - `script-path`: Resolve a build-env script file name to its path
//! - `matrix`: Plan the build matrix and publish it as a step output

use anyhow::{Context, Result};
use ci_plan::{
    build_script_path, write_github_output, BuildMatrix, MatrixFilter, Platform, Registry,
    RunnerOs,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "ci-plan")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build platform registry and CI matrix planner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all supported platforms
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a single platform as JSON
    Show {
        /// Platform identifier (e.g. ubuntu2204)
        id: String,
    },

    /// Show the platform used for platform-independent jobs
    Core {
        /// Print only the identifier
        #[arg(long)]
        id_only: bool,
    },

    /// Export the full registry as JSON
    Export {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Resolve a build environment script file name to its path
    ScriptPath {
        /// Script file name (e.g. macos.sh)
        file: String,
    },

    /// Plan the build matrix
    Matrix {
        /// Only include platforms whose build must pass
        #[arg(long, env = "CI_PLAN_ESSENTIAL_ONLY")]
        essential_only: bool,

        /// Leave out platforms known to be broken
        #[arg(long, env = "CI_PLAN_SKIP_BROKEN")]
        skip_broken: bool,

        /// Restrict to one runner OS label (e.g. macos-latest)
        #[arg(long)]
        os: Option<RunnerOs>,

        /// Restrict to these platform ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Step output file to append `matrix` and `matrix-digest` to
        #[arg(long, env = "GITHUB_OUTPUT")]
        github_output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    ci_plan::init_tracing(cli.json, level);

    let registry = Registry::global();
    registry
        .validate()
        .context("Platform registry failed validation")?;

    let output = run(registry, cli.command)?;
    println!("{}", output);
    Ok(())
}

/// Execute a command and return what goes to stdout.
fn run(registry: &Registry, command: Commands) -> Result<String> {
    match command {
        Commands::List { format } => cmd_list(registry, format),
        Commands::Show { id } => cmd_show(registry, &id),
        Commands::Core { id_only } => cmd_core(registry, id_only),
        Commands::Export { pretty } => cmd_export(registry, pretty),
        Commands::ScriptPath { file } => Ok(build_script_path(&file)),
        Commands::Matrix {
            essential_only,
            skip_broken,
            os,
            only,
            github_output,
        } => {
            let mut filter = MatrixFilter::all().with_only(only);
            filter.essential_only = essential_only;
            filter.skip_broken = skip_broken;
            if let Some(os) = os {
                filter = filter.with_os(os);
            }
            cmd_matrix(registry, &filter, github_output)
        }
    }
}

/// List all platforms
fn cmd_list(registry: &Registry, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let export = registry.export()?;
            Ok(serde_json::to_string_pretty(&export)?)
        }
        OutputFormat::Table => {
            let core_id = registry.core_id();
            let mut lines = vec![format!(
                "{:<12} {:<18} {:<16} {:<18} {:<10} {}",
                "ID", "NAME", "OS", "CACHE KEY", "ARTIFACT", "STATUS"
            )];
            for platform in registry.list_all() {
                lines.push(format!(
                    "{:<12} {:<18} {:<16} {:<18} {:<10} {}",
                    platform.id,
                    platform.name,
                    platform.os,
                    platform.cache_key,
                    platform.artifact_marker.unwrap_or("-"),
                    status_label(platform, core_id)
                ));
            }
            Ok(lines.join("\n"))
        }
    }
}

fn status_label(platform: &Platform, core_id: &str) -> String {
    let mut labels = Vec::new();
    if platform.id == core_id {
        labels.push("core");
    }
    labels.push(if platform.essential {
        "essential"
    } else {
        "optional"
    });
    if platform.is_broken {
        labels.push("broken");
    }
    labels.join(",")
}

/// Show one platform
fn cmd_show(registry: &Registry, id: &str) -> Result<String> {
    let platform = registry
        .lookup(id)
        .with_context(|| format!("Cannot show platform '{}'", id))?;
    Ok(serde_json::to_string_pretty(platform)?)
}

/// Show the core platform
fn cmd_core(registry: &Registry, id_only: bool) -> Result<String> {
    let core = registry.core()?;
    if id_only {
        return Ok(core.id.to_string());
    }
    Ok(serde_json::to_string_pretty(core)?)
}

/// Export the registry
fn cmd_export(registry: &Registry, pretty: bool) -> Result<String> {
    let export = registry.export()?;
    let json = if pretty {
        serde_json::to_string_pretty(&export)?
    } else {
        serde_json::to_string(&export)?
    };
    Ok(json)
}

/// Plan the build matrix and publish step outputs
fn cmd_matrix(
    registry: &Registry,
    filter: &MatrixFilter,
    github_output: Option<PathBuf>,
) -> Result<String> {
    let matrix = BuildMatrix::plan(registry, filter).context("Failed to plan build matrix")?;
    if matrix.is_empty() {
        info!("Build matrix is empty; no platform jobs will run");
    }

    let json = matrix.to_json()?;
    if let Some(path) = github_output {
        let digest = matrix.digest()?;
        write_github_output(&path, "matrix", &json)
            .with_context(|| format!("Failed to write step output to {:?}", path))?;
        write_github_output(&path, "matrix-digest", &digest)
            .with_context(|| format!("Failed to write step output to {:?}", path))?;
        info!(jobs = matrix.len(), digest = %digest, "Published build matrix");
    }

    Ok(json)
}
