//! Reproducer oracle: launches the subject for one request and judges the result.

pub mod predicate;
mod process;
mod types;

pub use predicate::{Field, Predicate};
pub use types::{OracleRecord, RawOutcome, Verdict};

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::core::config::OracleConfig;
use crate::core::errors::Result;
use crate::request::{self, RequestInfo, SerializedRequest};

/// Launches an isolated subject process per probe and applies the verdict rule.
///
/// Owns a scratch directory for the lifetime of the instance; every probe writes the
/// current source and request bodies to per-invocation unique files inside it, and
/// [`Oracle::teardown`] removes the whole directory.
#[derive(Debug)]
pub struct Oracle {
    config: OracleConfig,
    scratch_dir: PathBuf,
}

impl Oracle {
    /// Create an oracle, allocating its scratch directory under `config.scratch_root`.
    pub async fn new(config: OracleConfig) -> Result<Self> {
        config.validate()?;
        let scratch_dir = config.scratch_root.join(format!("reduce-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&scratch_dir).await?;
        Ok(Self { config, scratch_dir })
    }

    /// Run one probe of `request` against the subject, returning its verdict.
    #[instrument(skip(self, request, cancel), fields(frontend = request.is_frontend_mode()))]
    pub async fn probe(&self, request: &RequestInfo, cancel: &CancellationToken) -> Result<Verdict> {
        let invocation_id = Uuid::new_v4();
        let source_path = self.scratch_dir.join(format!("input-{invocation_id}.swift"));
        tokio::fs::write(&source_path, &request.file_contents).await?;
        let source_path_str = source_path.to_string_lossy().into_owned();

        let serialized = request::substitute(request, &source_path_str)?;

        let raw = if request.is_frontend_mode() {
            process_run_frontend(&self.config, &request.compiler_arguments, &source_path_str, cancel).await?
        } else {
            let request_files = self.write_request_files(invocation_id, &serialized).await?;
            process_run_language_service(&self.config, &request_files, cancel).await?
        };

        let verdict = self.judge(&raw);
        info!(?verdict, "oracle probe complete");
        Ok(verdict)
    }

    /// Remove the scratch directory. Safe to call more than once.
    pub async fn teardown(&self) {
        if let Err(err) = tokio::fs::remove_dir_all(&self.scratch_dir).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(?err, dir = %self.scratch_dir.display(), "failed to clean up oracle scratch directory");
            }
        }
    }

    async fn write_request_files(
        &self,
        invocation_id: Uuid,
        serialized: &SerializedRequest,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(serialized.bodies.len());
        for (i, body) in serialized.bodies.iter().enumerate() {
            let path = self.scratch_dir.join(format!("request-{invocation_id}-{i}.yml"));
            tokio::fs::write(&path, body).await?;
            paths.push(path);
        }
        Ok(paths)
    }

    fn judge(&self, raw: &RawOutcome) -> Verdict {
        if let Some(predicate) = &self.config.predicate {
            let record = raw.to_record();
            return if predicate.evaluate(&record) {
                Verdict::Reproduces
            } else {
                Verdict::Error
            };
        }

        match raw.exit_code {
            Some(0) => match String::from_utf8(raw.stdout.clone()) {
                Ok(text) => Verdict::Success(text),
                Err(_) => Verdict::Error,
            },
            Some(1) => Verdict::Error,
            _ => Verdict::Reproduces,
        }
    }
}

// Thin re-exports so `Oracle` doesn't need to name the `process` module's internals
// at every call site; kept private to this module.
use process::run_frontend as process_run_frontend;
use process::run_language_service as process_run_language_service;
