//! Construction of a [`RequestInfo`] from a single logged/pasted sourcekitd request.

use crate::core::errors::{ReduceError, Result};
use crate::request::{
    RequestInfo, PLACEHOLDER_COMPILER_ARGS, PLACEHOLDER_FILE, PLACEHOLDER_FILE_CONTENTS,
    PLACEHOLDER_OFFSET,
};

const OFFSET_KEY: &str = "key.offset:";
const SOURCEFILE_KEY: &str = "key.sourcefile:";
const NAME_KEY: &str = "key.name:";
const SOURCETEXT_KEY: &str = "key.sourcetext:";
const COMPILERARGS_KEY: &str = "key.compilerargs:";

/// Parse a logged sourcekitd request envelope into a [`RequestInfo`], replacing the
/// offset, source file, inline source text, and compiler-argument array with their
/// placeholders. Unknown keys are preserved verbatim.
pub fn from_logged_request(raw: &str) -> Result<RequestInfo> {
    let mut lines: Vec<String> = raw.lines().map(str::to_string).collect();

    let offset = extract_offset(&mut lines);
    let file_contents = extract_inline_source_text(&mut lines)?;
    extract_source_file(&mut lines)?;
    let compiler_arguments = extract_compiler_args(&mut lines)?;

    let mut primary_template = lines.join("\n");
    if raw.ends_with('\n') {
        primary_template.push('\n');
    }

    Ok(RequestInfo {
        primary_template,
        contextual_templates: Vec::new(),
        offset,
        compiler_arguments,
        file_contents: file_contents.unwrap_or_default(),
    })
}

/// Parse a contextual (non-primary) request envelope the same way, returning only
/// the templated text — contextual requests don't independently carry an offset,
/// file contents, or argument list of their own in the `RequestInfo`.
pub fn contextual_template_from_logged_request(raw: &str) -> Result<String> {
    let info = from_logged_request(raw)?;
    Ok(info.primary_template)
}

fn extract_offset(lines: &mut [String]) -> usize {
    for line in lines.iter_mut() {
        if let Some(idx) = line.find(OFFSET_KEY) {
            let after = &line[idx + OFFSET_KEY.len()..];
            let digits: String = after
                .trim_start()
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            let value = digits.parse().unwrap_or(0);
            let prefix = &line[..idx];
            *line = format!("{prefix}{OFFSET_KEY} {PLACEHOLDER_OFFSET}");
            return value;
        }
    }
    0
}

fn extract_inline_source_text(lines: &mut [String]) -> Result<Option<String>> {
    for line in lines.iter_mut() {
        if let Some(idx) = line.find(SOURCETEXT_KEY) {
            let after = &line[idx + SOURCETEXT_KEY.len()..];
            let value = extract_quoted(after)
                .ok_or_else(|| ReduceError::malformed("key.sourcetext value is not a quoted string"))?;
            let prefix = &line[..idx];
            *line = format!("{prefix}{SOURCETEXT_KEY} {PLACEHOLDER_FILE_CONTENTS}");
            return Ok(Some(unescape(&value)));
        }
    }
    Ok(None)
}

fn extract_source_file(lines: &mut [String]) -> Result<()> {
    let mut sourcefile_value: Option<String> = None;
    let mut name_value: Option<String> = None;

    for line in lines.iter() {
        if let Some(idx) = line.find(SOURCEFILE_KEY) {
            let after = &line[idx + SOURCEFILE_KEY.len()..];
            sourcefile_value = extract_quoted(after).map(|v| unescape(&v));
        }
        if let Some(idx) = line.find(NAME_KEY) {
            let after = &line[idx + NAME_KEY.len()..];
            name_value = extract_quoted(after).map(|v| unescape(&v));
        }
    }

    match (&sourcefile_value, &name_value) {
        (Some(a), Some(b)) if a != b => {
            return Err(ReduceError::malformed(
                "key.sourcefile and key.name disagree on the source path",
            ));
        }
        (None, None) => {
            return Err(ReduceError::malformed(
                "request has neither key.sourcefile nor key.name",
            ));
        }
        _ => {}
    }

    for line in lines.iter_mut() {
        if let Some(idx) = line.find(SOURCEFILE_KEY) {
            let prefix = &line[..idx].to_string();
            *line = format!("{prefix}{SOURCEFILE_KEY} \"{PLACEHOLDER_FILE}\"");
        } else if let Some(idx) = line.find(NAME_KEY) {
            let prefix = line[..idx].to_string();
            *line = format!("{prefix}{NAME_KEY} \"{PLACEHOLDER_FILE}\"");
        }
    }

    Ok(())
}

fn extract_compiler_args(lines: &mut Vec<String>) -> Result<Vec<String>> {
    let open = lines
        .iter()
        .position(|l| l.trim_end().ends_with('[') && l.contains(COMPILERARGS_KEY));
    let Some(open) = open else {
        return Ok(Vec::new());
    };
    let close = lines
        .iter()
        .enumerate()
        .skip(open + 1)
        .find(|(_, l)| l.trim_start().starts_with(']'))
        .map(|(i, _)| i)
        .ok_or_else(|| ReduceError::malformed("key.compilerargs array has no closing bracket line"))?;

    let mut json = String::from("[");
    for (i, line) in lines[open + 1..close].iter().enumerate() {
        if i > 0 {
            json.push(',');
        }
        json.push_str(line.trim().trim_end_matches(','));
    }
    json.push(']');

    let compiler_arguments: Vec<String> = serde_json::from_str(&json)
        .map_err(|e| ReduceError::malformed(format!("invalid key.compilerargs array: {e}")))?;

    lines.splice(open + 1..close, std::iter::once(PLACEHOLDER_COMPILER_ARGS.to_string()));

    Ok(compiler_arguments)
}

/// Given text starting right after a key's colon, find the first quoted string
/// and return its raw (still-escaped) contents.
fn extract_quoted(after: &str) -> Option<String> {
    let start = after.find('"')?;
    let rest = &after[start + 1..];
    let mut end = None;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => {
                end = Some(i);
                break;
            }
            _ => {}
        }
    }
    let end = end?;
    Some(rest[..end].to_string())
}

fn unescape(raw: &str) -> String {
    raw.replace("\\\"", "\"").replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"key.request: source.request.cursorinfo
key.sourcefile: "/tmp/input.swift"
key.sourcetext: "struct Foo {}"
key.offset: 42
key.compilerargs: [
  "-sdk",
  "/path/to/sdk",
  "input.swift"
]
"#;

    #[test]
    fn extracts_offset_file_and_args() {
        let req = from_logged_request(SAMPLE).unwrap();
        assert_eq!(req.offset, 42);
        assert_eq!(req.file_contents, "struct Foo {}");
        assert_eq!(
            req.compiler_arguments,
            vec!["-sdk", "/path/to/sdk", "input.swift"]
        );
        assert!(req.primary_template.contains("$OFFSET"));
        assert!(req.primary_template.contains("$FILE"));
        assert!(req.primary_template.contains("$FILE_CONTENTS"));
        assert!(req.primary_template.contains("$COMPILER_ARGS"));
        assert!(!req.primary_template.contains("42"));
        assert!(!req.primary_template.contains("struct Foo"));
    }

    #[test]
    fn missing_source_file_is_malformed() {
        let raw = "key.request: source.request.cursorinfo\nkey.offset: 1\n";
        let err = from_logged_request(raw).unwrap_err();
        assert!(matches!(err, ReduceError::MalformedRequest { .. }));
    }

    #[test]
    fn disagreeing_sourcefile_and_name_is_malformed() {
        let raw = "key.sourcefile: \"/a.swift\"\nkey.name: \"/b.swift\"\n";
        let err = from_logged_request(raw).unwrap_err();
        assert!(matches!(err, ReduceError::MalformedRequest { .. }));
    }

    #[test]
    fn default_offset_is_zero_when_absent() {
        let raw = "key.sourcefile: \"/a.swift\"\n";
        let req = from_logged_request(raw).unwrap();
        assert_eq!(req.offset, 0);
    }

    #[test]
    fn falls_back_to_name_key() {
        let raw = "key.name: \"/a.swift\"\nkey.offset: 3\n";
        let req = from_logged_request(raw).unwrap();
        assert_eq!(req.offset, 3);
        assert!(req.primary_template.contains("key.name: \"$FILE\""));
    }
}
