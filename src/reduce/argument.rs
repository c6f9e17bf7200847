//! Coarse-to-fine argument-list shrinker.

use tokio_util::sync::CancellationToken;

use crate::core::config::ArgumentWindows;
use crate::core::errors::{ReduceError, Result};
use crate::reduce::ArgumentOracle;

const CROSS_TOOL_PREFIX: &str = "-X";

/// Shrink `arguments` with a coarse pass (window = `windows.coarse`) followed by a
/// fine pass (window = `windows.fine`), reporting progress as
/// `1 - remaining / initial_count` after every attempt.
pub async fn reduce(
    arguments: Vec<String>,
    oracle: &dyn ArgumentOracle,
    cancel: &CancellationToken,
    windows: ArgumentWindows,
    mut on_progress: impl FnMut(f64, &str),
) -> Result<Vec<String>> {
    let initial_count = arguments.len();
    let mut current = arguments;

    for size in [windows.coarse, windows.fine] {
        current = run_pass(current, oracle, cancel, size, initial_count, &mut on_progress).await?;
    }

    Ok(current)
}

async fn run_pass(
    mut current: Vec<String>,
    oracle: &dyn ArgumentOracle,
    cancel: &CancellationToken,
    size: usize,
    initial_count: usize,
    on_progress: &mut impl FnMut(f64, &str),
) -> Result<Vec<String>> {
    let mut cursor = current.len();

    while cursor > 0 {
        if cancel.is_cancelled() {
            return Err(ReduceError::Cancelled);
        }

        let end = cursor.min(current.len());
        let mut start = end.saturating_sub(size);
        extend_for_cross_tool_prefix(&current, &mut start);

        let candidate = remove_slice(&current, start, end);
        let accepted = oracle.reproduces(&candidate, cancel).await?;

        if accepted {
            current = candidate;
            cursor = start;
        } else if let Some((start2, candidate2)) = retry_with_paired_flag(&current, start, end, oracle, cancel).await? {
            current = candidate2;
            cursor = start2;
        } else {
            cursor = cursor.saturating_sub(size);
        }

        report_progress(on_progress, current.len(), initial_count);
    }

    Ok(current)
}

/// Implements the "first attempt fails, preceding argument looks like a flag" retry:
/// extend the window left by one, reapply the `-X` rule, and retry once.
async fn retry_with_paired_flag(
    current: &[String],
    start: usize,
    end: usize,
    oracle: &dyn ArgumentOracle,
    cancel: &CancellationToken,
) -> Result<Option<(usize, Vec<String>)>> {
    if start == 0 || !current[start - 1].starts_with('-') {
        return Ok(None);
    }
    let mut start2 = start - 1;
    extend_for_cross_tool_prefix(current, &mut start2);

    let candidate = remove_slice(current, start2, end);
    if oracle.reproduces(&candidate, cancel).await? {
        Ok(Some((start2, candidate)))
    } else {
        Ok(None)
    }
}

fn extend_for_cross_tool_prefix(args: &[String], start: &mut usize) {
    if *start > 0 && args[*start - 1].starts_with(CROSS_TOOL_PREFIX) {
        *start -= 1;
    }
}

fn remove_slice(args: &[String], start: usize, end: usize) -> Vec<String> {
    let mut out = args[..start].to_vec();
    out.extend_from_slice(&args[end..]);
    out
}

fn report_progress(on_progress: &mut impl FnMut(f64, &str), remaining: usize, initial_count: usize) {
    let fraction = if initial_count == 0 {
        1.0
    } else {
        1.0 - (remaining as f64 / initial_count as f64)
    };
    on_progress(fraction.clamp(0.0, 1.0), "reducing compiler arguments");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockOracle<F> {
        accepts: F,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl<F: Fn(&[String]) -> bool> MockOracle<F> {
        fn new(accepts: F) -> Self {
            Self {
                accepts,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl<F: Fn(&[String]) -> bool + Send + Sync> ArgumentOracle for MockOracle<F> {
        async fn reproduces(&self, candidate_args: &[String], _cancel: &CancellationToken) -> Result<bool> {
            self.calls.lock().unwrap().push(candidate_args.to_vec());
            Ok((self.accepts)(candidate_args))
        }
    }

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn scenario_argument_shrink_keeps_only_required_flag() {
        let input = args(&["-a", "-b", "junk1", "-F", "/p", "junk2"]);
        let oracle = MockOracle::new(|candidate: &[String]| candidate.iter().any(|a| a == "-a"));
        let cancel = CancellationToken::new();

        let result = reduce(
            input,
            &oracle,
            &cancel,
            ArgumentWindows::default(),
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(result, vec!["-a".to_string()]);
    }

    #[tokio::test]
    async fn cross_tool_prefix_flag_is_always_kept_with_its_slice() {
        // "-Xcc" immediately precedes a one-argument fine-pass window; the oracle
        // only reproduces when "-Xcc" is paired with "value" (removing one without
        // the other breaks the invariant), so the windowing must extend left.
        let input = args(&["-a", "-Xcc", "value"]);
        let oracle = MockOracle::new(|candidate: &[String]| {
            let has_flag = candidate.iter().any(|a| a == "-Xcc");
            let has_value = candidate.iter().any(|a| a == "value");
            has_flag == has_value
        });
        let cancel = CancellationToken::new();

        let windows = ArgumentWindows { coarse: 1, fine: 1 };
        let result = reduce(input, &oracle, &cancel, windows, |_, _| {}).await.unwrap();

        // Either both removed or both kept -- never a dangling "-Xcc" or "value" alone.
        let has_flag = result.iter().any(|a| a == "-Xcc");
        let has_value = result.iter().any(|a| a == "value");
        assert_eq!(has_flag, has_value);
    }

    #[tokio::test]
    async fn paired_flag_retry_extends_window_left_on_failure() {
        // "-F /p" must be removed together: removing "/p" alone still reproduces
        // (oracle doesn't look at it), but removing "-F" alone does not, so the
        // fallback rule must extend the fine-pass window to cover both.
        let input = args(&["-a", "-F", "/p"]);
        let oracle = MockOracle::new(|candidate: &[String]| {
            let has_dash_f = candidate.iter().any(|a| a == "-F");
            let has_a = candidate.iter().any(|a| a == "-a");
            has_a && (has_dash_f == candidate.iter().any(|a| a == "/p"))
        });
        let cancel = CancellationToken::new();

        let windows = ArgumentWindows { coarse: 1, fine: 1 };
        let result = reduce(input, &oracle, &cancel, windows, |_, _| {}).await.unwrap();

        assert_eq!(result, vec!["-a".to_string()]);
    }

    #[tokio::test]
    async fn progress_reaches_one_when_fully_reduced() {
        let input = args(&["-a", "-b", "-c"]);
        let oracle = MockOracle::new(|_: &[String]| true);
        let cancel = CancellationToken::new();
        let mut last_fraction = 0.0;

        let result = reduce(input, &oracle, &cancel, ArgumentWindows::default(), |fraction, _| {
            last_fraction = fraction;
        })
        .await
        .unwrap();

        assert!(result.is_empty());
        assert_eq!(last_fraction, 1.0);
    }
}
