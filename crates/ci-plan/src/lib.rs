//! CI Plan - build platform registry for the CI workflow
//!
//! Provides the authoritative, read-only description of every platform
//! the project is built on:
//! - Platform descriptors (runner OS, build-env script, cache key, artifact marker)
//! - A process-wide registry with required-presence lookup
//! - The core platform used for platform-independent jobs
//! - Build matrix planning and GitHub Actions output helpers

pub mod error;
pub mod github;
pub mod matrix;
pub mod platform;
pub mod registry;
pub mod telemetry;

// Re-export key types
pub use error::{PlatformError, Result};
pub use github::write_github_output;
pub use matrix::{BuildMatrix, MatrixEntry, MatrixFilter};
pub use platform::{BuildEnvScript, EnvOverrides, Platform, RunnerOs};
pub use registry::{
    build_script_path, core_platform, list_all, lookup, Registry, RegistryExport, BUILD_ENV_DIR,
    CORE_PLATFORM_ID, SCRIPTS_ROOT,
};
pub use telemetry::init_tracing;

/// CI Plan version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
