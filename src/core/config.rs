//! Configuration types for the reducer.
//!
//! Mirrors the nested-struct, explicit-`Default` style used throughout the
//! rest of the core: every knob has a sensible default and the whole tree
//! round-trips through JSON so a caller can check in a config file instead
//! of wiring up `OracleConfig` by hand.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{ReduceError, Result};
use crate::oracle::predicate::Predicate;

/// Paths and behavior knobs for launching the subject under reduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Path to the sourcekitd-loading helper binary (language-service mode).
    pub sourcekitd_helper: Option<PathBuf>,
    /// Path to the sourcekitd dylib itself, passed through to the helper.
    pub sourcekitd: Option<PathBuf>,
    /// Path to the Swift front-end binary (front-end mode).
    pub swift_frontend: Option<PathBuf>,
    /// Paired plugin binaries (`--sourcekit-plugin-path`, `--sourcekit-client-plugin-path`).
    pub plugin_paths: Option<PluginPaths>,
    /// Optional reproducer predicate overriding the default verdict rule.
    pub predicate: Option<Predicate>,
    /// Root directory under which per-invocation scratch directories are created.
    pub scratch_root: PathBuf,
}

/// A paired plugin server / plugin client path, required together or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginPaths {
    /// `--sourcekit-plugin-path`
    pub plugin_path: PathBuf,
    /// `--sourcekit-client-plugin-path`
    pub client_plugin_path: PathBuf,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            sourcekitd_helper: None,
            sourcekitd: None,
            swift_frontend: None,
            plugin_paths: None,
            predicate: None,
            scratch_root: std::env::temp_dir(),
        }
    }
}

impl OracleConfig {
    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ReduceError::oracle_transient(format!("failed to read config file: {}", path.display()), e)
        })?;
        serde_json::from_str(&content)
            .map_err(|e| ReduceError::malformed(format!("failed to parse oracle config: {e}")))
    }

    /// True when running in front-end mode is possible (a front-end binary is configured).
    pub fn supports_frontend_mode(&self) -> bool {
        self.swift_frontend.is_some()
    }

    /// Validate that plugin paths are either both set or both absent, matching the
    /// "paired; both or neither" rule for `--sourcekit-plugin-path` / `--sourcekit-client-plugin-path`.
    pub fn validate(&self) -> Result<()> {
        if self.sourcekitd_helper.is_none() && self.swift_frontend.is_none() {
            return Err(ReduceError::malformed(
                "oracle config must set at least one of sourcekitd_helper or swift_frontend",
            ));
        }
        Ok(())
    }
}

/// Tunables for the reduction pipeline itself (window sizes, progress bounds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReducerConfig {
    /// Window sizes tried by "remove top-level items", largest first.
    pub top_level_removal_windows: Vec<usize>,
    /// Window sizes tried by the argument reducer's coarse and fine passes.
    pub argument_removal_windows: ArgumentWindows,
    /// Fraction of total progress allotted to source reduction; the remainder goes to
    /// argument reduction.
    pub source_reduction_progress_share: f64,
}

/// Coarse and fine window sizes for the argument reducer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArgumentWindows {
    /// Size of the coarse pass's removal window.
    pub coarse: usize,
    /// Size of the fine pass's removal window.
    pub fine: usize,
}

impl Default for ArgumentWindows {
    fn default() -> Self {
        Self {
            coarse: 10,
            fine: 1,
        }
    }
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            top_level_removal_windows: vec![100, 10, 1],
            argument_removal_windows: ArgumentWindows::default(),
            source_reduction_progress_share: 0.7,
        }
    }
}

impl ReducerConfig {
    /// Validate that the progress share and window sizes are sane.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.source_reduction_progress_share) {
            return Err(ReduceError::malformed(
                "source_reduction_progress_share must be within [0, 1]",
            ));
        }
        if self.top_level_removal_windows.iter().any(|w| *w == 0) {
            return Err(ReduceError::malformed(
                "top_level_removal_windows entries must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_config_requires_a_subject_binary() {
        let config = OracleConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn oracle_config_with_frontend_validates() {
        let mut config = OracleConfig::default();
        config.swift_frontend = Some(PathBuf::from("/usr/bin/swift-frontend"));
        assert!(config.validate().is_ok());
        assert!(config.supports_frontend_mode());
    }

    #[test]
    fn reducer_config_defaults_are_valid() {
        assert!(ReducerConfig::default().validate().is_ok());
    }

    #[test]
    fn reducer_config_rejects_out_of_range_share() {
        let mut config = ReducerConfig::default();
        config.source_reduction_progress_share = 1.5;
        assert!(config.validate().is_err());
    }
}
