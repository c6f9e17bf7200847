//! Orchestration for a full reduction run: validate reproduction, merge
//! front-end multi-file inputs when applicable, then run the source reducer
//! followed by the argument reducer.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::core::config::ReducerConfig;
use crate::core::errors::{ReduceError, Result};
use crate::oracle::Oracle;
use crate::reduce::{argument, source, RequestArgumentOracle, RequestSourceOracle};
use crate::request::{RequestInfo, PLACEHOLDER_FILE};

const PRIMARY_FILE_FLAG: &str = "-primary-file";

/// Run the full pipeline against `request`, reporting progress in `[0, 1]` with
/// source reduction mapped to `[0, share)` and argument reduction to `[share, 1]`,
/// where `share` is `config.source_reduction_progress_share`.
#[instrument(skip(request, oracle, config, cancel, on_progress), fields(frontend = request.is_frontend_mode()))]
pub async fn run(
    request: RequestInfo,
    oracle: &Oracle,
    config: &ReducerConfig,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(f64, &str),
) -> Result<RequestInfo> {
    config.validate().map_err(|e| log_stage_error("config validation", e))?;

    let request = if request.is_frontend_mode() {
        merge_frontend_inputs(request, oracle, cancel)
            .await
            .map_err(|e| log_stage_error("front-end input merge", e))?
    } else {
        request
    };

    let verdict = oracle
        .probe(&request, cancel)
        .await
        .map_err(|e| log_stage_error("initial reproduction probe", e))?;
    if !verdict.reproduces() {
        error!(stage = "initial reproduction probe", "request does not reproduce the failure");
        return Err(ReduceError::NotReproducing);
    }

    let share = config.source_reduction_progress_share;

    let source_oracle = RequestSourceOracle::new(oracle, &request);
    let reduced_source = source::reduce(
        request.file_contents.clone(),
        request.offset,
        &request.compiler_arguments,
        &source_oracle,
        cancel,
        &config.top_level_removal_windows,
        |fraction, message| on_progress(fraction * share, message),
    )
    .await
    .map_err(|e| log_stage_error("source reduction", e))?;
    info!(
        bytes_before = request.file_contents.len(),
        bytes_after = reduced_source.file_contents.len(),
        "source reduction complete"
    );

    let after_source = request.with_source(reduced_source.file_contents, reduced_source.offset);

    let argument_oracle = RequestArgumentOracle::new(oracle, &after_source);
    let reduced_args = argument::reduce(
        after_source.compiler_arguments.clone(),
        &argument_oracle,
        cancel,
        config.argument_removal_windows,
        |fraction, message| on_progress(share + fraction * (1.0 - share), message),
    )
    .await
    .map_err(|e| log_stage_error("argument reduction", e))?;
    info!(
        args_before = after_source.compiler_arguments.len(),
        args_after = reduced_args.len(),
        "argument reduction complete"
    );

    Ok(after_source.with_compiler_arguments(reduced_args))
}

/// Log a fatal error at `error` level with the stage that raised it, then return it
/// unchanged so the caller can still propagate it with `?`.
fn log_stage_error(stage: &str, err: ReduceError) -> ReduceError {
    error!(stage, error = %err, "reduction stage failed");
    err
}

/// Concatenate every `.swift` input referenced by `request`'s compiler arguments,
/// drop `-primary-file` and the file-path arguments themselves, append a single
/// `$FILE` placeholder, and confirm the merge still reproduces.
async fn merge_frontend_inputs(
    request: RequestInfo,
    oracle: &Oracle,
    cancel: &CancellationToken,
) -> Result<RequestInfo> {
    let mut sources = HashMap::new();
    for arg in &request.compiler_arguments {
        if is_swift_file_argument(arg) && !sources.contains_key(arg) {
            let contents = tokio::fs::read_to_string(arg)
                .await
                .map_err(|e| log_stage_error("front-end input merge", ReduceError::from(e)))?;
            sources.insert(arg.clone(), contents);
        }
    }

    let (merged_source, merged_args) = merge_swift_sources(&request.compiler_arguments, &sources);
    let candidate = RequestInfo {
        primary_template: request.primary_template.clone(),
        contextual_templates: request.contextual_templates.clone(),
        offset: request.offset.min(merged_source.len()),
        compiler_arguments: merged_args,
        file_contents: merged_source,
    };

    let verdict = oracle
        .probe(&candidate, cancel)
        .await
        .map_err(|e| log_stage_error("front-end input merge", e))?;
    if verdict.reproduces() {
        Ok(candidate)
    } else {
        error!(stage = "front-end input merge", "merged source does not reproduce the failure");
        Err(ReduceError::MergeDidNotReproduce)
    }
}

fn is_swift_file_argument(arg: &str) -> bool {
    arg.ends_with(".swift")
}

/// Pure merge step, split out from [`merge_frontend_inputs`] so it can be unit
/// tested without touching the filesystem.
fn merge_swift_sources(compiler_arguments: &[String], sources: &HashMap<String, String>) -> (String, Vec<String>) {
    let mut merged = String::new();
    let mut remaining_args = Vec::with_capacity(compiler_arguments.len() + 1);
    let mut i = 0;

    while i < compiler_arguments.len() {
        let arg = &compiler_arguments[i];

        if arg == PRIMARY_FILE_FLAG {
            i += 1;
            continue;
        }

        if is_swift_file_argument(arg) {
            if let Some(contents) = sources.get(arg) {
                if !merged.is_empty() {
                    merged.push('\n');
                }
                merged.push_str(contents);
            }
            i += 1;
            continue;
        }

        remaining_args.push(arg.clone());
        i += 1;
    }

    remaining_args.push(PLACEHOLDER_FILE.to_string());
    (merged, remaining_args)
}
