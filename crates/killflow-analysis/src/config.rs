use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings threaded through the prover and the combinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Wall-clock budget of one top-level query, in seconds. Zero means unbounded.
    pub timeout_secs: u64,
    /// Logs every step of matching combinator queries at `info`.
    pub watch: Option<WatchFilter>,
}

/// Selects the combinator queries worth narrating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchFilter {
    /// A call to `first` queried against a call to `second`.
    CallsitePair { first: String, second: String },
    /// A call to `callee` queried against a store through a pointer named `store_ptr`.
    CallsiteToStore { callee: String, store_ptr: String },
    /// A store through `store_ptr` queried against a call to `callee`.
    StoreToCallsite { store_ptr: String, callee: String },
}

impl AnalysisConfig {
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_watch(mut self, watch: WatchFilter) -> Self {
        self.watch = Some(watch);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| AnalysisError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&input)
    }
}
