//! Verdict and raw-outcome types shared by the oracle and its predicate language.

use serde::{Deserialize, Serialize};

/// Tri-state verdict returned by a single oracle probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The failure of interest is still present; this is what the reducer wants to preserve.
    Reproduces,
    /// The subject ran and failed cleanly, but not with the failure of interest.
    Error,
    /// The subject ran to clean completion; the payload is its combined textual response.
    Success(String),
}

impl Verdict {
    /// True when this verdict should be treated as an accepted reduction step.
    pub fn reproduces(&self) -> bool {
        matches!(self, Verdict::Reproduces)
    }
}

/// The record a [`crate::oracle::Predicate`] is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRecord {
    /// Subject's stdout, lossily decoded to UTF-8.
    pub stdout: String,
    /// Subject's stderr, lossily decoded to UTF-8.
    pub stderr: String,
    /// Subject's exit code, or `None` if it terminated via signal.
    pub exit_code: Option<i32>,
}

/// Raw bytes and exit status collected from a spawned subject process, before any
/// verdict rule (default or predicate-driven) has been applied.
#[derive(Debug, Clone)]
pub struct RawOutcome {
    /// Raw stdout bytes, not yet decoded.
    pub stdout: Vec<u8>,
    /// Raw stderr bytes, not yet decoded.
    pub stderr: Vec<u8>,
    /// Exit code, or `None` if terminated via signal.
    pub exit_code: Option<i32>,
}

impl RawOutcome {
    /// Lossily decode stdout/stderr into an [`OracleRecord`] for predicate evaluation.
    pub fn to_record(&self) -> OracleRecord {
        OracleRecord {
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            exit_code: self.exit_code,
        }
    }
}
