//! AST-driven source shrinker: the staged reduction pipeline over a single
//! Swift source file, plus its progress model.

pub mod import;
pub mod syntax;

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::errors::{ReduceError, Result};
use crate::oracle::Verdict;
use crate::reduce::SourceOracle;
use syntax::{adjust_offset, apply_edits, SourceEdit, SyntaxTree};

/// Output of a full source-reduction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReductionResult {
    /// The reduced source text.
    pub file_contents: String,
    /// The offset, adjusted for every edit accepted along the way.
    pub offset: usize,
}

/// Run the full staged pipeline against `oracle`, starting from
/// `file_contents`/`offset` and using `compiler_arguments` only for the
/// import-inline step's oracle probes.
///
/// `on_progress` receives a fraction in `[0, 1]`; the caller (the driver) is
/// responsible for remapping that into its own overall progress band.
pub async fn reduce(
    file_contents: String,
    offset: usize,
    compiler_arguments: &[String],
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
    top_level_removal_windows: &[usize],
    mut on_progress: impl FnMut(f64, &str),
) -> Result<SourceReductionResult> {
    check_cancel(cancel)?;
    let initial_verdict = oracle.probe_source(&file_contents, offset, cancel).await?;
    if !initial_verdict.reproduces() {
        return Err(ReduceError::NotReproducing);
    }

    let mut state = State { file_contents, offset };
    let initial_import_count = SyntaxTree::parse(&state.file_contents)?.import_declarations().len();
    let mut progress = Progress {
        initial_import_count,
        imports_removed: 0,
        file_size_after_last_inline: state.file_contents.len(),
    };

    // Kept across the whole pipeline, not just one call to their step function, so
    // an import inline that reopens the loop doesn't make either stateful reducer
    // re-propose a node shape it already tried and had rejected.
    let mut empty_body_keep_set: HashSet<String> = HashSet::new();
    let mut member_keep_set: HashSet<String> = HashSet::new();

    loop {
        check_cancel(cancel)?;
        dedupe_top_level_items(&mut state, oracle, cancel, &progress, &mut on_progress).await?;
        remove_top_level_items(
            &mut state,
            oracle,
            cancel,
            top_level_removal_windows,
            &progress,
            &mut on_progress,
        )
        .await?;
        empty_function_bodies(&mut state, oracle, cancel, &mut empty_body_keep_set, &progress, &mut on_progress).await?;
        remove_members_and_statements(&mut state, oracle, cancel, &mut member_keep_set, &progress, &mut on_progress)
            .await?;

        match inline_first_import(&mut state, compiler_arguments, oracle, cancel).await? {
            true => {
                progress.imports_removed += 1;
                progress.file_size_after_last_inline = state.file_contents.len();
                // Deliberately not reported here: the file can grow right after an
                // inline, which would make progress go backwards.
            }
            false => break,
        }
    }

    strip_comments(&mut state, oracle, cancel).await?;
    progress.report(state.file_contents.len(), &mut on_progress);

    Ok(SourceReductionResult {
        file_contents: state.file_contents,
        offset: state.offset,
    })
}

struct State {
    file_contents: String,
    offset: usize,
}

#[derive(Clone, Copy)]
struct Progress {
    initial_import_count: usize,
    imports_removed: usize,
    file_size_after_last_inline: usize,
}

impl Progress {
    fn share(&self) -> f64 {
        1.0 / (self.initial_import_count as f64 + 1.0)
    }

    fn report(&self, current_size: usize, on_progress: &mut impl FnMut(f64, &str)) {
        let share = self.share();
        let shrink_fraction = if self.file_size_after_last_inline == 0 {
            0.0
        } else {
            1.0 - (current_size as f64 / self.file_size_after_last_inline as f64)
        };
        let fraction = (self.imports_removed as f64 * share) + shrink_fraction.max(0.0) * share;
        on_progress(fraction.clamp(0.0, 1.0), "reducing source");
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ReduceError::Cancelled)
    } else {
        Ok(())
    }
}

fn extend_through_trailing_newline(source: &str, start: usize, end: usize) -> SourceEdit {
    let mut end = end;
    if source.as_bytes().get(end) == Some(&b'\n') {
        end += 1;
    }
    SourceEdit::delete(start, end)
}

async fn try_accept_edit(
    state: &mut State,
    edit: &SourceEdit,
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
) -> Result<bool> {
    check_cancel(cancel)?;
    let candidate_source = apply_edits(&state.file_contents, std::slice::from_ref(edit));
    let candidate_offset = adjust_offset(state.offset, edit);
    let verdict = oracle.probe_source(&candidate_source, candidate_offset, cancel).await?;
    if verdict.reproduces() {
        state.file_contents = candidate_source;
        state.offset = candidate_offset;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Step 2: keep only the first occurrence of each identical (trimmed) top-level item.
async fn dedupe_top_level_items(
    state: &mut State,
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
    progress: &Progress,
    on_progress: &mut impl FnMut(f64, &str),
) -> Result<()> {
    loop {
        check_cancel(cancel)?;
        let tree = SyntaxTree::parse(&state.file_contents)?;
        let ranges = tree.top_level_item_ranges();
        let mut seen = HashSet::new();
        let duplicate = ranges.iter().find_map(|&(start, end)| {
            let text = tree.canonical_text(start, end);
            if seen.insert(text) {
                None
            } else {
                Some((start, end))
            }
        });
        let Some((start, end)) = duplicate else { break };
        let edit = extend_through_trailing_newline(&state.file_contents, start, end);
        if !try_accept_edit(state, &edit, oracle, cancel).await? {
            break;
        }
        progress.report(state.file_contents.len(), on_progress);
    }
    Ok(())
}

/// Step 3: remove up to `window` adjacent top-level items at a time, largest window first.
async fn remove_top_level_items(
    state: &mut State,
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
    window_sizes: &[usize],
    progress: &Progress,
    on_progress: &mut impl FnMut(f64, &str),
) -> Result<()> {
    for &window in window_sizes {
        loop {
            check_cancel(cancel)?;
            let tree = SyntaxTree::parse(&state.file_contents)?;
            let ranges = tree.top_level_item_ranges();
            if ranges.is_empty() {
                break;
            }

            let mut accepted = false;
            let mut cursor = ranges.len();
            while cursor > 0 {
                let start_idx = cursor.saturating_sub(window);
                let start_byte = ranges[start_idx].0;
                let end_byte = ranges[cursor - 1].1;
                let edit = extend_through_trailing_newline(&state.file_contents, start_byte, end_byte);
                if try_accept_edit(state, &edit, oracle, cancel).await? {
                    progress.report(state.file_contents.len(), on_progress);
                    accepted = true;
                    break; // tree is now stale; reparse and restart this window's pass
                }
                cursor = start_idx;
            }
            if !accepted {
                break;
            }
        }
    }
    Ok(())
}

/// Step 4: replace each function-like body's contents with empty text, one per attempt.
async fn empty_function_bodies(
    state: &mut State,
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
    keep_set: &mut HashSet<String>,
    progress: &Progress,
    on_progress: &mut impl FnMut(f64, &str),
) -> Result<()> {
    loop {
        check_cancel(cancel)?;
        let tree = SyntaxTree::parse(&state.file_contents)?;
        let mut progressed = false;
        for (start, end) in tree.function_body_content_ranges() {
            let canonical = tree.canonical_text(start, end);
            if canonical.is_empty() || keep_set.contains(&canonical) {
                continue;
            }
            keep_set.insert(canonical);
            let edit = SourceEdit::delete(start, end);
            if try_accept_edit(state, &edit, oracle, cancel).await? {
                progress.report(state.file_contents.len(), on_progress);
                progressed = true;
                break;
            }
        }
        if !progressed {
            break;
        }
    }
    Ok(())
}

/// Step 5: remove one member or statement per attempt, re-running to a fixpoint.
async fn remove_members_and_statements(
    state: &mut State,
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
    keep_set: &mut HashSet<String>,
    progress: &Progress,
    on_progress: &mut impl FnMut(f64, &str),
) -> Result<()> {
    loop {
        check_cancel(cancel)?;
        let tree = SyntaxTree::parse(&state.file_contents)?;
        let mut progressed = false;
        for (start, end) in tree.member_and_statement_ranges() {
            let canonical = tree.canonical_text(start, end);
            if keep_set.contains(&canonical) {
                continue;
            }
            keep_set.insert(canonical);
            let edit = extend_through_trailing_newline(&state.file_contents, start, end);
            if try_accept_edit(state, &edit, oracle, cancel).await? {
                progress.report(state.file_contents.len(), on_progress);
                progressed = true;
                break;
            }
        }
        if !progressed {
            break;
        }
    }
    Ok(())
}

/// Step 6: inline the first import's generated interface, falling back to a
/// `-target`/`-sdk`-only argument list if the primary probe declines.
async fn inline_first_import(
    state: &mut State,
    compiler_arguments: &[String],
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
) -> Result<bool> {
    check_cancel(cancel)?;
    let tree = SyntaxTree::parse(&state.file_contents)?;
    let Some(first) = tree.import_declarations().into_iter().next() else {
        return Ok(false);
    };

    let interface = match fetch_interface(&first.module_name, compiler_arguments, oracle, cancel).await {
        Ok(text) => text,
        Err(err) if err.is_locally_absorbed() => {
            debug!(module = %first.module_name, error = %err, "module interface unavailable, skipping import inline");
            return Ok(false);
        }
        Err(err) => return Err(err),
    };

    let edit = SourceEdit {
        start: first.start,
        end: first.end,
        new_text: interface,
    };
    try_accept_edit(state, &edit, oracle, cancel).await
}

async fn fetch_interface(
    module_name: &str,
    compiler_arguments: &[String],
    oracle: &dyn SourceOracle,
    cancel: &CancellationToken,
) -> Result<String> {
    if let Verdict::Success(text) = oracle.module_interface(module_name, compiler_arguments, cancel).await? {
        if let Ok(interface) = import::extract_interface_text(&text) {
            return Ok(interface);
        }
    }

    let fallback_args = target_and_sdk_only(compiler_arguments);
    match oracle.module_interface(module_name, &fallback_args, cancel).await? {
        Verdict::Success(text) => import::extract_interface_text(&text),
        _ => Err(ReduceError::interface_unavailable(format!(
            "oracle declined to produce an interface for {module_name}"
        ))),
    }
}

fn target_and_sdk_only(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        if arg == "-target" || arg == "-sdk" {
            out.push(arg.clone());
            if let Some(value) = iter.next() {
                out.push(value.clone());
            }
        }
    }
    out
}

/// Step 7: strip every comment in one pass. Idempotent: a second pass finds none.
async fn strip_comments(state: &mut State, oracle: &dyn SourceOracle, cancel: &CancellationToken) -> Result<()> {
    check_cancel(cancel)?;
    let tree = SyntaxTree::parse(&state.file_contents)?;
    let edits: Vec<SourceEdit> = tree
        .comment_ranges()
        .into_iter()
        .map(|(start, end)| SourceEdit::delete(start, end))
        .collect();
    if edits.is_empty() {
        return Ok(());
    }

    let candidate_source = apply_edits(&state.file_contents, &edits);
    let candidate_offset = edits.iter().fold(state.offset, adjust_offset);

    let verdict = oracle.probe_source(&candidate_source, candidate_offset, cancel).await?;
    if verdict.reproduces() {
        state.file_contents = candidate_source;
        state.offset = candidate_offset;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockSourceOracle<F> {
        accepts: F,
        interfaces: Mutex<Vec<(String, String)>>,
    }

    impl<F: Fn(&str) -> bool> MockSourceOracle<F> {
        fn new(accepts: F) -> Self {
            Self {
                accepts,
                interfaces: Mutex::new(Vec::new()),
            }
        }

        fn with_interface(self, module: &str, interface: &str) -> Self {
            self.interfaces
                .lock()
                .unwrap()
                .push((module.to_string(), interface.to_string()));
            self
        }
    }

    #[async_trait]
    impl<F: Fn(&str) -> bool + Send + Sync> SourceOracle for MockSourceOracle<F> {
        async fn probe_source(
            &self,
            candidate_source: &str,
            _candidate_offset: usize,
            _cancel: &CancellationToken,
        ) -> Result<Verdict> {
            Ok(if (self.accepts)(candidate_source) {
                Verdict::Reproduces
            } else {
                Verdict::Error
            })
        }

        async fn probe_source_with_arguments(
            &self,
            candidate_source: &str,
            candidate_offset: usize,
            _candidate_args: &[String],
            cancel: &CancellationToken,
        ) -> Result<Verdict> {
            self.probe_source(candidate_source, candidate_offset, cancel).await
        }

        async fn module_interface(
            &self,
            module_name: &str,
            _candidate_args: &[String],
            _cancel: &CancellationToken,
        ) -> Result<Verdict> {
            let interfaces = self.interfaces.lock().unwrap();
            match interfaces.iter().find(|(name, _)| name == module_name) {
                Some((_, text)) => Ok(Verdict::Success(format!("key.sourcetext: \"{text}\",\n"))),
                None => Ok(Verdict::Error),
            }
        }
    }

    #[tokio::test]
    async fn scenario_statement_removal_keeps_only_the_crash_call() {
        let source = "let x = 1\nlet y = 2\ncrash()\nlet z = 3\n";
        let oracle = MockSourceOracle::new(|text: &str| text.contains("crash()"));
        let cancel = CancellationToken::new();

        let result = reduce(source.to_string(), 0, &[], &oracle, &cancel, &[100, 10, 1], |_, _| {})
            .await
            .unwrap();

        assert_eq!(result.file_contents.trim(), "crash()");
    }

    #[tokio::test]
    async fn scenario_comment_stripping_is_idempotent() {
        let source = "// header\nlet x = 1 /* tail */\n";
        let oracle = MockSourceOracle::new(|text: &str| text.contains("let x = 1"));
        let cancel = CancellationToken::new();

        let first = reduce(source.to_string(), 0, &[], &oracle, &cancel, &[100, 10, 1], |_, _| {})
            .await
            .unwrap();
        assert!(!first.file_contents.contains("//"));
        assert!(!first.file_contents.contains("/*"));

        let second = reduce(
            first.file_contents.clone(),
            first.offset,
            &[],
            &oracle,
            &cancel,
            &[100, 10, 1],
            |_, _| {},
        )
        .await
        .unwrap();
        assert_eq!(second.file_contents, first.file_contents);
    }

    #[tokio::test]
    async fn not_reproducing_initial_source_is_rejected() {
        let oracle = MockSourceOracle::new(|_: &str| false);
        let cancel = CancellationToken::new();
        let err = reduce("let x = 1".to_string(), 0, &[], &oracle, &cancel, &[100, 10, 1], |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, ReduceError::NotReproducing));
    }

    #[tokio::test]
    async fn scenario_import_inline_then_shrink() {
        let source = "import M\nuse(M.Thing)\n";
        let oracle = MockSourceOracle::new(|text: &str| text.contains("use("))
            .with_interface("M", "struct Thing{}; struct Other{}");
        let cancel = CancellationToken::new();

        let result = reduce(source.to_string(), 0, &[], &oracle, &cancel, &[100, 10, 1], |_, _| {})
            .await
            .unwrap();

        assert!(result.file_contents.contains("struct Thing{}"));
        assert!(result.file_contents.contains("use("));
        assert!(!result.file_contents.contains("struct Other{}"));
    }
}
