//! Build platform descriptors.

use crate::error::PlatformError;
use crate::registry::build_script_path;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Runner OS images a platform can be scheduled on.
#[derive(Debug, Clone, Copy, serde::Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunnerOs {
    #[serde(rename = "ubuntu-22.04")]
    Ubuntu2204,

    #[serde(rename = "windows-latest")]
    WindowsLatest,

    #[serde(rename = "macos-latest")]
    MacosLatest,
}

impl RunnerOs {
    /// Every supported runner OS, in label order.
    pub const ALL: [RunnerOs; 3] = [
        RunnerOs::Ubuntu2204,
        RunnerOs::WindowsLatest,
        RunnerOs::MacosLatest,
    ];

    /// Runner label as understood by the CI engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerOs::Ubuntu2204 => "ubuntu-22.04",
            RunnerOs::WindowsLatest => "windows-latest",
            RunnerOs::MacosLatest => "macos-latest",
        }
    }
}

impl fmt::Display for RunnerOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RunnerOs {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunnerOs::ALL
            .into_iter()
            .find(|os| os.as_str() == s)
            .ok_or_else(|| PlatformError::UnknownRunnerOs(s.to_string()))
    }
}

/// Build environment setup script, stored by file name.
///
/// The path is always derived with [`build_script_path`], so an entry can
/// never point outside the build-env script directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildEnvScript(&'static str);

impl BuildEnvScript {
    pub const fn new(file_name: &'static str) -> Self {
        Self(file_name)
    }

    pub fn file_name(&self) -> &'static str {
        self.0
    }

    /// Repository-relative path of the script.
    pub fn path(&self) -> String {
        build_script_path(self.0)
    }
}

impl fmt::Display for BuildEnvScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl Serialize for BuildEnvScript {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

/// Extra environment variables exported into a platform's build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvOverrides(&'static [(&'static str, &'static str)]);

impl EnvOverrides {
    pub const EMPTY: EnvOverrides = EnvOverrides(&[]);

    pub const fn new(vars: &'static [(&'static str, &'static str)]) -> Self {
        Self(vars)
    }

    pub fn get(&self, key: &str) -> Option<&'static str> {
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for EnvOverrides {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Descriptor of one supported build platform.
///
/// Serializes with the field names the workflow reads; the identifier is
/// not part of the object since it is the key the entry is filed under.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    /// Short symbolic name used for lookup (e.g. `ubuntu2204`).
    #[serde(skip)]
    pub id: &'static str,

    /// Human-readable display name.
    pub name: &'static str,

    /// Runner OS image.
    pub os: RunnerOs,

    /// Script preparing the build environment.
    #[serde(rename = "buildEnvScript")]
    pub build_env_script: BuildEnvScript,

    /// Whether the pipeline requires this platform's build to pass.
    pub essential: bool,

    /// Environment variables injected into the build.
    pub env: EnvOverrides,

    /// Namespace for build caches.
    pub cache_key: &'static str,

    /// Label attached to produced artifacts, `None` when the platform
    /// produces no distinguishable artifact.
    pub artifact_marker: Option<&'static str>,

    /// Whether the build is currently known to fail.
    pub is_broken: bool,
}

impl Platform {
    pub fn build_env_script_path(&self) -> String {
        self.build_env_script.path()
    }

    pub fn produces_artifact(&self) -> bool {
        self.artifact_marker.is_some()
    }
}
