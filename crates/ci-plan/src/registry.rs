//! Process-wide registry of supported build platforms.
//!
//! The table is static data: it is built at compile time, never mutated and
//! safe to read from any thread without locking.

use crate::error::{PlatformError, Result};
use crate::platform::{BuildEnvScript, EnvOverrides, Platform, RunnerOs};
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, warn};

macro_rules! scripts_root {
    () => {
        ".github/scripts"
    };
}

/// Root directory of the CI helper scripts, relative to the repository.
pub const SCRIPTS_ROOT: &str = scripts_root!();

/// Directory holding the per-platform build environment scripts.
pub const BUILD_ENV_DIR: &str = concat!(scripts_root!(), "/build_env/");

/// Identifier of the platform used for platform-independent jobs.
pub const CORE_PLATFORM_ID: &str = "ubuntu2204";

/// Join the build-env script directory with a script file name.
///
/// Pure string transformation; the script is not required to exist.
pub fn build_script_path(script_file_name: &str) -> String {
    format!("{BUILD_ENV_DIR}{script_file_name}")
}

// All the platforms we build on, in matrix order.
const PLATFORM_TABLE: [Platform; 3] = [
    Platform {
        id: "ubuntu2204",
        name: "Ubuntu 22.04",
        os: RunnerOs::Ubuntu2204,
        build_env_script: BuildEnvScript::new("ubuntu.sh"),
        essential: true,
        env: EnvOverrides::EMPTY,
        cache_key: "ubuntu2204-amd64",
        artifact_marker: Some("ubuntu2204"),
        is_broken: false,
    },
    Platform {
        id: "windows",
        name: "Windows",
        os: RunnerOs::WindowsLatest,
        build_env_script: BuildEnvScript::new("windows.sh"),
        essential: false,
        env: EnvOverrides::EMPTY,
        cache_key: "windows-amd64",
        artifact_marker: None,
        is_broken: true,
    },
    Platform {
        id: "macos",
        name: "macOS (aarch64)",
        os: RunnerOs::MacosLatest,
        build_env_script: BuildEnvScript::new("macos.sh"),
        essential: false,
        env: EnvOverrides::EMPTY,
        cache_key: "macos-aarch64",
        artifact_marker: None,
        is_broken: false,
    },
];

static PLATFORMS: [Platform; 3] = PLATFORM_TABLE;

// Resolved at compile time; a table without CORE_PLATFORM_ID fails the build.
const CORE_INDEX: usize = index_of(&PLATFORM_TABLE, CORE_PLATFORM_ID);

const fn index_of(platforms: &[Platform], id: &str) -> usize {
    let mut i = 0;
    while i < platforms.len() {
        if str_eq(platforms[i].id, id) {
            return i;
        }
        i += 1;
    }
    panic!("core platform id is not in the platform table");
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

static GLOBAL: Registry = Registry::new(&PLATFORMS, CORE_PLATFORM_ID);

/// Read-only mapping from platform identifier to descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    platforms: &'static [Platform],
    core_id: &'static str,
}

impl Registry {
    pub const fn new(platforms: &'static [Platform], core_id: &'static str) -> Self {
        Self {
            platforms,
            core_id,
        }
    }

    /// The registry of every platform this project supports.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Look up a platform by identifier.
    ///
    /// The set is hand-curated, so an unknown identifier is a caller bug
    /// and is reported as [`PlatformError::NotFound`] rather than defaulted.
    pub fn lookup(&self, id: &str) -> Result<&'static Platform> {
        match self.platforms.iter().find(|p| p.id == id) {
            Some(platform) => Ok(platform),
            None => {
                warn!(platform = id, "Unknown platform requested");
                Err(PlatformError::NotFound {
                    id: id.to_string(),
                    known: self.ids().map(str::to_string).collect(),
                })
            }
        }
    }

    /// All platforms in declaration order.
    pub fn list_all(&self) -> &'static [Platform] {
        self.platforms
    }

    /// The designated default platform.
    pub fn core(&self) -> Result<&'static Platform> {
        self.lookup(self.core_id)
    }

    pub fn core_id(&self) -> &'static str {
        self.core_id
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> {
        self.platforms.iter().map(|p| p.id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.platforms.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Check the table invariants.
    ///
    /// Checks (in order):
    /// 1. The registry has at least one platform.
    /// 2. Identifiers and cache keys are non-empty and unique.
    /// 3. Script entries are bare file names inside the build-env directory.
    /// 4. The core platform is present and essential.
    pub fn validate(&self) -> Result<()> {
        if self.platforms.is_empty() {
            return Err(PlatformError::InvalidRegistry(
                "registry has no platforms".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        let mut cache_keys = HashSet::new();
        for platform in self.platforms {
            if platform.id.is_empty() {
                return Err(PlatformError::InvalidRegistry(
                    "platform identifier is empty".to_string(),
                ));
            }
            if !ids.insert(platform.id) {
                return Err(PlatformError::InvalidRegistry(format!(
                    "duplicate platform identifier: {}",
                    platform.id
                )));
            }
            if platform.cache_key.is_empty() || !cache_keys.insert(platform.cache_key) {
                return Err(PlatformError::InvalidRegistry(format!(
                    "platform {} has an empty or shared cache key: '{}'",
                    platform.id, platform.cache_key
                )));
            }

            let script = platform.build_env_script.file_name();
            let bare = Path::new(script).file_name() == Some(OsStr::new(script));
            if !bare || script.contains('\\') {
                return Err(PlatformError::InvalidRegistry(format!(
                    "platform {} build env script must be a bare file name, got '{}'",
                    platform.id, script
                )));
            }
        }

        let core = self.core().map_err(|_| {
            PlatformError::InvalidRegistry(format!("core platform {} is not registered", self.core_id))
        })?;
        if !core.essential {
            return Err(PlatformError::InvalidRegistry(format!(
                "core platform {} must be essential",
                core.id
            )));
        }

        debug!(
            platforms = self.platforms.len(),
            core = self.core_id,
            "Platform registry validated"
        );
        Ok(())
    }

    /// Serializable form consumed by the CI workflow.
    pub fn export(&self) -> Result<RegistryExport> {
        Ok(RegistryExport {
            platforms: self.platforms,
            core: self.core()?,
        })
    }
}

/// Look up a platform in the global registry.
pub fn lookup(id: &str) -> Result<&'static Platform> {
    Registry::global().lookup(id)
}

/// All platforms of the global registry, in declaration order.
pub fn list_all() -> &'static [Platform] {
    Registry::global().list_all()
}

/// The platform for running platform-independent jobs.
///
/// Returns the registry's own entry, not a copy of it.
pub fn core_platform() -> &'static Platform {
    &PLATFORMS[CORE_INDEX]
}

/// Exported registry: `{"platforms": {id: platform, ...}, "core": platform, "coreId": id}`.
#[derive(Debug, Clone, Copy)]
pub struct RegistryExport {
    platforms: &'static [Platform],
    core: &'static Platform,
}

impl RegistryExport {
    pub fn core(&self) -> &'static Platform {
        self.core
    }

    pub fn platforms(&self) -> &'static [Platform] {
        self.platforms
    }
}

struct PlatformMap(&'static [Platform]);

impl Serialize for PlatformMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for platform in self.0 {
            map.serialize_entry(platform.id, platform)?;
        }
        map.end()
    }
}

impl Serialize for RegistryExport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RegistryExport", 3)?;
        state.serialize_field("platforms", &PlatformMap(self.platforms))?;
        state.serialize_field("core", self.core)?;
        state.serialize_field("coreId", self.core.id)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn linux(id: &'static str, script: &'static str, cache_key: &'static str) -> Platform {
        Platform {
            id,
            name: "Linux",
            os: RunnerOs::Ubuntu2204,
            build_env_script: BuildEnvScript::new(script),
            essential: true,
            env: EnvOverrides::EMPTY,
            cache_key,
            artifact_marker: None,
            is_broken: false,
        }
    }

    static DUPLICATE_IDS: [Platform; 2] = [
        linux("linux", "linux.sh", "linux-amd64"),
        linux("linux", "linux.sh", "linux-arm64"),
    ];

    static SHARED_CACHE_KEY: [Platform; 2] = [
        linux("linux", "linux.sh", "linux-amd64"),
        linux("linux-musl", "musl.sh", "linux-amd64"),
    ];

    static NESTED_SCRIPT: [Platform; 1] = [linux("linux", "../linux.sh", "linux-amd64")];

    static CURRENT_DIR_SCRIPT: [Platform; 1] = [linux("linux", ".", "linux-amd64")];

    static PARENT_DIR_SCRIPT: [Platform; 1] = [linux("linux", "..", "linux-amd64")];

    static EMPTY_SCRIPT: [Platform; 1] = [linux("linux", "", "linux-amd64")];

    #[test]
    fn test_build_script_path_joins_base() {
        assert_eq!(
            build_script_path("macos.sh"),
            ".github/scripts/build_env/macos.sh"
        );
        assert!(BUILD_ENV_DIR.starts_with(SCRIPTS_ROOT));
    }

    #[test]
    fn test_global_registry_is_valid() {
        Registry::global().validate().expect("global registry invalid");
    }

    #[test]
    fn test_core_constant_matches_core_id() {
        let core = Registry::global().core().unwrap();
        assert!(std::ptr::eq(core, core_platform()));
        assert_eq!(core_platform().id, CORE_PLATFORM_ID);
    }

    #[test]
    fn test_lookup_unknown_reports_known_ids() {
        match lookup("does-not-exist") {
            Err(PlatformError::NotFound { id, known }) => {
                assert_eq!(id, "does-not-exist");
                assert_eq!(known, vec!["ubuntu2204", "windows", "macos"]);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_contains() {
        let registry = Registry::global();
        assert!(registry.contains("macos"));
        assert!(!registry.contains("MacOS"));
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_registry() {
        let registry = Registry::new(&[], CORE_PLATFORM_ID);
        assert!(matches!(
            registry.validate(),
            Err(PlatformError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_core() {
        let registry = Registry::new(&PLATFORMS, "freebsd");
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("freebsd"));
    }

    #[test]
    fn test_validate_rejects_non_essential_core() {
        let registry = Registry::new(&PLATFORMS, "macos");
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("must be essential"));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let registry = Registry::new(&DUPLICATE_IDS, "linux");
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate platform identifier"));
    }

    #[test]
    fn test_validate_rejects_shared_cache_key() {
        let registry = Registry::new(&SHARED_CACHE_KEY, "linux");
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("cache key"));
    }

    #[test]
    fn test_validate_rejects_script_outside_build_env_dir() {
        let registry = Registry::new(&NESTED_SCRIPT, "linux");
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("bare file name"));
    }

    #[test]
    fn test_validate_rejects_directory_script_names() {
        for platforms in [&CURRENT_DIR_SCRIPT, &PARENT_DIR_SCRIPT, &EMPTY_SCRIPT] {
            let registry = Registry::new(platforms, "linux");
            let err = registry.validate().unwrap_err();
            assert!(err.to_string().contains("bare file name"));
        }
    }

    #[test]
    fn test_core_index_resolved_from_core_id() {
        assert_eq!(PLATFORMS[CORE_INDEX].id, CORE_PLATFORM_ID);
        assert_eq!(index_of(&PLATFORMS, "macos"), 2);
    }

    #[test]
    fn test_build_env_dir_derived_from_scripts_root() {
        assert_eq!(BUILD_ENV_DIR, format!("{SCRIPTS_ROOT}/build_env/"));
    }

    #[test]
    fn test_export_shape() {
        let export = Registry::global().export().unwrap();
        let value = serde_json::to_value(export).unwrap();

        assert_eq!(value["coreId"], "ubuntu2204");
        assert_eq!(value["core"], value["platforms"]["ubuntu2204"]);
        assert_eq!(value["platforms"].as_object().unwrap().len(), 3);
        assert_eq!(
            value["platforms"]["windows"]["buildEnvScript"],
            ".github/scripts/build_env/windows.sh"
        );
    }

    #[test]
    fn test_export_preserves_declaration_order() {
        let json = serde_json::to_string(&Registry::global().export().unwrap()).unwrap();
        let ubuntu = json.find("\"ubuntu2204\":").unwrap();
        let windows = json.find("\"windows\":").unwrap();
        let macos = json.find("\"macos\":").unwrap();
        assert!(ubuntu < windows && windows < macos);
    }
}
