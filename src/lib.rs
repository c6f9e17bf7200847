//! # sourcekit-reduce: automated crash reduction for sourcekitd and the Swift front end
//!
//! Given a single failing request — its compiler arguments, the offset it was
//! issued at, and the input source — this crate produces the smallest
//! still-failing reproducer: a reduced source file and a reduced argument
//! list. The interesting engineering lives in three tightly-coupled pieces:
//!
//! - [`oracle`] — a cancellable driver that serializes a request, launches
//!   the language service or front end in an isolated child process, and
//!   returns a tri-state verdict.
//! - [`reduce::source`] — a staged, AST-driven delta-debugger over the
//!   source text.
//! - [`reduce::argument`] — a coarse-to-fine shrinker over the compiler
//!   argument list.
//!
//! [`driver`] sequences the two reducers against the oracle and reports
//! progress; [`request`] is the templated envelope both sides operate on.
//!
//! CLI argument parsing, log scraping, and reproducer bundling are external
//! collaborators, not part of this library — see the `reduce` binary target
//! for a thin entry point that exercises the pipeline end to end.

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_arguments)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Configuration and error types shared across every other module.
pub mod core {
    //! Ambient stack: error taxonomy and configuration structs.

    pub mod config;
    pub mod errors;
}

/// The reduction pipeline orchestrator.
pub mod driver;

/// Reproducer oracle: subprocess invocation and verdict rules.
pub mod oracle;

/// The templated request envelope.
pub mod request;

/// Argument and source reducers.
pub mod reduce;

pub use core::errors::{ReduceError, Result};
pub use request::RequestInfo;

/// Library version, as set in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
