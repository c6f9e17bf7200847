//! Child-process spawning for the two oracle invocation modes.
//!
//! Every probe spawns a fresh subject process; cancellation kills it promptly
//! rather than waiting it out instead of letting it run to completion.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::config::OracleConfig;
use crate::core::errors::{ReduceError, Result};
use crate::oracle::types::RawOutcome;

const SOURCEKITD_FLAG: &str = "--sourcekitd";
const PLUGIN_PATH_FLAG: &str = "--sourcekit-plugin-path";
const CLIENT_PLUGIN_PATH_FLAG: &str = "--sourcekit-client-plugin-path";
const REQUEST_FILE_FLAG: &str = "--request-file";

/// Spawn the Swift front-end directly on the merged/reduced source (front-end mode).
pub async fn run_frontend(
    config: &OracleConfig,
    compiler_arguments: &[String],
    source_path: &str,
    cancel: &CancellationToken,
) -> Result<RawOutcome> {
    let binary = config
        .swift_frontend
        .as_ref()
        .ok_or_else(|| ReduceError::malformed("front-end mode requires oracle config.swift_frontend"))?;
    let args = substitute_file_token(compiler_arguments, source_path);
    run_child(binary, &args, cancel).await
}

/// Spawn the in-tree sourcekitd-loading helper, replaying contextual requests before
/// the primary one within a single service session (language-service mode).
pub async fn run_language_service(
    config: &OracleConfig,
    request_files: &[PathBuf],
    cancel: &CancellationToken,
) -> Result<RawOutcome> {
    let helper = config
        .sourcekitd_helper
        .as_ref()
        .ok_or_else(|| ReduceError::malformed("language-service mode requires oracle config.sourcekitd_helper"))?;
    let sourcekitd = config
        .sourcekitd
        .as_ref()
        .ok_or_else(|| ReduceError::malformed("language-service mode requires oracle config.sourcekitd"))?;

    let mut args = vec![SOURCEKITD_FLAG.to_string(), path_arg(sourcekitd)];
    if let Some(plugins) = &config.plugin_paths {
        args.push(PLUGIN_PATH_FLAG.to_string());
        args.push(path_arg(&plugins.plugin_path));
        args.push(CLIENT_PLUGIN_PATH_FLAG.to_string());
        args.push(path_arg(&plugins.client_plugin_path));
    }
    for file in request_files {
        args.push(REQUEST_FILE_FLAG.to_string());
        args.push(path_arg(file));
    }

    run_child(helper, &args, cancel).await
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn substitute_file_token(args: &[String], source_path: &str) -> Vec<String> {
    args.iter()
        .map(|a| if a == "$FILE" { source_path.to_string() } else { a.clone() })
        .collect()
}

/// Spawn `binary` with `args`, collecting stdout/stderr and the exit status, killing
/// the child and returning [`ReduceError::Cancelled`] if `cancel` fires first.
async fn run_child(binary: &Path, args: &[String], cancel: &CancellationToken) -> Result<RawOutcome> {
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReduceError::oracle_transient(format!("failed to spawn {}", binary.display()), e))?;

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf).await;
        buf
    });

    tokio::select! {
        _ = cancel.cancelled() => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(ReduceError::Cancelled)
        }
        status = child.wait() => {
            let status = status.map_err(|e| {
                ReduceError::oracle_transient("failed to wait for subject process", e)
            })?;
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            Ok(RawOutcome {
                stdout,
                stderr,
                exit_code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn run_child_captures_stdout_and_exit_code() {
        let cancel = CancellationToken::new();
        let outcome = run_child(
            &sh(),
            &["-c".to_string(), "echo hello; exit 0".to_string()],
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(String::from_utf8(outcome.stdout).unwrap().trim(), "hello");
    }

    #[tokio::test]
    async fn run_child_reports_nonzero_exit() {
        let cancel = CancellationToken::new();
        let outcome = run_child(&sh(), &["-c".to_string(), "exit 17".to_string()], &cancel)
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, Some(17));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_child(&sh(), &["-c".to_string(), "sleep 5".to_string()], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ReduceError::Cancelled));
    }
}
