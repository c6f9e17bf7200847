//! Module-interface extraction for the import-inline step.

use crate::core::errors::{ReduceError, Result};

const SOURCETEXT_KEY: &str = "key.sourcetext:";

/// Build the synthesized "open interface" request body for `module_name`.
///
/// This is a contextual template fed through the oracle alongside the reduced
/// request's own templates; it doesn't go through [`crate::request`] substitution
/// because it carries no placeholders of its own.
pub fn open_interface_request(module_name: &str) -> String {
    format!(
        "key.request: source.request.editor.open.interface\nkey.modulename: \"{module_name}\"\n"
    )
}

/// Parse an oracle `Success` response line-by-line, extracting the value of the
/// single `key.sourcetext` line: strip its trailing comma, filter control bytes
/// below 0x20, and JSON-decode the quoted value.
///
/// Fails with [`ReduceError::interface_unavailable`] (always absorbed by the
/// caller) on any missing or malformed step.
pub fn extract_interface_text(response: &str) -> Result<String> {
    let line = response
        .lines()
        .find(|l| l.trim_start().starts_with(SOURCETEXT_KEY))
        .ok_or_else(|| ReduceError::interface_unavailable("response has no key.sourcetext line"))?;

    let after = line
        .trim_start()
        .strip_prefix(SOURCETEXT_KEY)
        .unwrap_or_default()
        .trim()
        .trim_end_matches(',');

    let filtered: String = after.chars().filter(|c| (*c as u32) >= 0x20).collect();

    serde_json::from_str::<String>(&filtered)
        .map_err(|e| ReduceError::interface_unavailable(format!("key.sourcetext is not a JSON string: {e}")))
}
