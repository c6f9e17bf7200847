//! Reducers: the argument shrinker and the AST-driven source shrinker.
//!
//! Both reducers are written against small probe traits rather than the concrete
//! [`crate::oracle::Oracle`] directly, so their windowing/visitor logic can be
//! exercised with a deterministic, in-process mock oracle without spawning a
//! subject process for every candidate.

pub mod argument;
pub mod source;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::errors::Result;
use crate::oracle::{Oracle, Verdict};
use crate::request::RequestInfo;

/// What the argument reducer needs from the oracle: does a candidate argument list
/// still reproduce the failure, keeping the rest of the request fixed?
#[async_trait]
pub trait ArgumentOracle: Send + Sync {
    /// Probe whether `candidate_args` still reproduces.
    async fn reproduces(&self, candidate_args: &[String], cancel: &CancellationToken) -> Result<bool>;
}

/// What the source reducer needs from the oracle: the full verdict for a candidate
/// source text and offset, keeping the rest of the request fixed. The full
/// [`Verdict`] (not just a bool) is needed because the import-inline step reads the
/// `Success` payload to extract a module interface.
#[async_trait]
pub trait SourceOracle: Send + Sync {
    /// Probe a candidate source text and offset.
    async fn probe_source(
        &self,
        candidate_source: &str,
        candidate_offset: usize,
        cancel: &CancellationToken,
    ) -> Result<Verdict>;

    /// Probe a candidate source text and offset against a substitute compiler
    /// argument list, used by the import-inline fallback.
    async fn probe_source_with_arguments(
        &self,
        candidate_source: &str,
        candidate_offset: usize,
        candidate_args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Verdict>;

    /// Fetch the generated interface for `module_name` by sending the synthesized
    /// "open interface" request under `candidate_args`.
    async fn module_interface(
        &self,
        module_name: &str,
        candidate_args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Verdict>;
}

/// Adapts a real [`Oracle`] plus a fixed base request into an [`ArgumentOracle`].
pub struct RequestArgumentOracle<'a> {
    oracle: &'a Oracle,
    base: &'a RequestInfo,
}

impl<'a> RequestArgumentOracle<'a> {
    /// Build an adapter that varies `base`'s compiler arguments and keeps everything
    /// else fixed.
    pub fn new(oracle: &'a Oracle, base: &'a RequestInfo) -> Self {
        Self { oracle, base }
    }
}

#[async_trait]
impl<'a> ArgumentOracle for RequestArgumentOracle<'a> {
    async fn reproduces(&self, candidate_args: &[String], cancel: &CancellationToken) -> Result<bool> {
        let candidate = self.base.with_compiler_arguments(candidate_args.to_vec());
        let verdict = self.oracle.probe(&candidate, cancel).await?;
        Ok(verdict.reproduces())
    }
}

/// Adapts a real [`Oracle`] plus a fixed base request into a [`SourceOracle`].
pub struct RequestSourceOracle<'a> {
    oracle: &'a Oracle,
    base: &'a RequestInfo,
}

impl<'a> RequestSourceOracle<'a> {
    /// Build an adapter that varies `base`'s source text/offset and keeps everything
    /// else fixed.
    pub fn new(oracle: &'a Oracle, base: &'a RequestInfo) -> Self {
        Self { oracle, base }
    }
}

#[async_trait]
impl<'a> SourceOracle for RequestSourceOracle<'a> {
    async fn probe_source(
        &self,
        candidate_source: &str,
        candidate_offset: usize,
        cancel: &CancellationToken,
    ) -> Result<Verdict> {
        let candidate = self
            .base
            .with_source(candidate_source.to_string(), candidate_offset);
        self.oracle.probe(&candidate, cancel).await
    }

    async fn probe_source_with_arguments(
        &self,
        candidate_source: &str,
        candidate_offset: usize,
        candidate_args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Verdict> {
        let candidate = self
            .base
            .with_source(candidate_source.to_string(), candidate_offset)
            .with_compiler_arguments(candidate_args.to_vec());
        self.oracle.probe(&candidate, cancel).await
    }

    async fn module_interface(
        &self,
        module_name: &str,
        candidate_args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Verdict> {
        let request = RequestInfo {
            primary_template: crate::reduce::source::import::open_interface_request(module_name),
            contextual_templates: Vec::new(),
            offset: 0,
            compiler_arguments: candidate_args.to_vec(),
            file_contents: self.base.file_contents.clone(),
        };
        self.oracle.probe(&request, cancel).await
    }
}
