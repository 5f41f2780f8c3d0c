//! Build matrix planning.
//!
//! Expands the platform registry into the `{"include": [...]}` matrix the
//! workflow fans out over. Whether broken or non-essential platforms gate
//! the pipeline is up to the workflow; by default every platform is planned.

use crate::error::Result;
use crate::platform::{Platform, RunnerOs};
use crate::registry::Registry;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Selection of platforms to include in a matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixFilter {
    /// Only plan platforms whose build must pass.
    pub essential_only: bool,

    /// Leave out platforms marked as broken.
    pub skip_broken: bool,

    /// Restrict to one runner OS.
    pub os: Option<RunnerOs>,

    /// Restrict to these platform ids (empty means all).
    pub only: Vec<String>,
}

impl MatrixFilter {
    /// Filter selecting every registered platform.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn essential_only(mut self) -> Self {
        self.essential_only = true;
        self
    }

    pub fn skip_broken(mut self) -> Self {
        self.skip_broken = true;
        self
    }

    pub fn with_os(mut self, os: RunnerOs) -> Self {
        self.os = Some(os);
        self
    }

    pub fn with_only(mut self, ids: Vec<String>) -> Self {
        self.only = ids;
        self
    }

    fn accepts(&self, platform: &Platform) -> bool {
        if self.essential_only && !platform.essential {
            return false;
        }
        if self.skip_broken && platform.is_broken {
            return false;
        }
        if self.os.is_some_and(|os| os != platform.os) {
            return false;
        }
        self.only.is_empty() || self.only.iter().any(|id| id == platform.id)
    }
}

/// One job of the build matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixEntry {
    /// Platform identifier.
    pub platform: &'static str,

    #[serde(flatten)]
    pub descriptor: &'static Platform,
}

/// Planned build matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildMatrix {
    pub include: Vec<MatrixEntry>,
}

impl BuildMatrix {
    /// Plan a matrix from the registry, keeping registry order.
    ///
    /// Every id named in `filter.only` must be registered.
    pub fn plan(registry: &Registry, filter: &MatrixFilter) -> Result<Self> {
        for id in &filter.only {
            registry.lookup(id)?;
        }

        let include: Vec<MatrixEntry> = registry
            .list_all()
            .iter()
            .filter(|platform| {
                let accepted = filter.accepts(platform);
                if !accepted {
                    debug!(platform = platform.id, "Platform filtered out of matrix");
                }
                accepted
            })
            .map(|descriptor| MatrixEntry {
                platform: descriptor.id,
                descriptor,
            })
            .collect();

        info!(
            jobs = include.len(),
            total = registry.len(),
            "Planned build matrix"
        );

        Ok(Self { include })
    }

    pub fn len(&self) -> usize {
        self.include.len()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.include.iter().map(|entry| entry.platform).collect()
    }

    /// Compact JSON form, as handed to the workflow.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deterministic SHA-256 digest of the compact JSON form.
    pub fn digest(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.to_json()?.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}
