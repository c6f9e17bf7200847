//! Serialization of a [`RequestInfo`] back into concrete request bodies for the oracle.

use crate::core::errors::{ReduceError, Result};
use crate::request::{
    RequestInfo, PLACEHOLDER_COMPILER_ARGS, PLACEHOLDER_FILE, PLACEHOLDER_FILE_CONTENTS,
    PLACEHOLDER_OFFSET,
};

/// The substituted contextual and primary request bodies, in session replay order,
/// plus the source path they were substituted against.
#[derive(Debug, Clone)]
pub struct SerializedRequest {
    /// Contextual requests, in replay order, followed last by the primary request.
    pub bodies: Vec<String>,
    /// The on-disk path substituted for `$FILE`.
    pub source_path: String,
}

impl SerializedRequest {
    /// The primary request body (always the last element of `bodies`).
    pub fn primary(&self) -> &str {
        self.bodies.last().map(String::as_str).unwrap_or_default()
    }

    /// The contextual request bodies, in replay order.
    pub fn contextual(&self) -> &[String] {
        &self.bodies[..self.bodies.len().saturating_sub(1)]
    }
}

/// Substitute every placeholder in `request`'s templates against the given on-disk
/// source path, returning the ordered request bodies ready to be written to their own
/// per-request files by the caller (the oracle owns scratch-file placement).
pub fn substitute(request: &RequestInfo, source_path: &str) -> Result<SerializedRequest> {
    let compiler_args_body = compiler_args_json_body(&request.compiler_arguments)?;
    let file_contents_json = serde_json::to_string(&request.file_contents)?;
    let escaped_path = source_path.replace('\\', "\\\\");

    let mut bodies = Vec::with_capacity(request.contextual_templates.len() + 1);
    for template in &request.contextual_templates {
        bodies.push(substitute_template(
            template,
            request.offset,
            &compiler_args_body,
            &file_contents_json,
            &escaped_path,
        ));
    }
    bodies.push(substitute_template(
        &request.primary_template,
        request.offset,
        &compiler_args_body,
        &file_contents_json,
        &escaped_path,
    ));

    Ok(SerializedRequest {
        bodies,
        source_path: source_path.to_string(),
    })
}

fn substitute_template(
    template: &str,
    offset: usize,
    compiler_args_body: &str,
    file_contents_json: &str,
    escaped_path: &str,
) -> String {
    template
        .replace(PLACEHOLDER_OFFSET, &offset.to_string())
        .replace(PLACEHOLDER_COMPILER_ARGS, compiler_args_body)
        .replace(PLACEHOLDER_FILE_CONTENTS, file_contents_json)
        .replace(PLACEHOLDER_FILE, escaped_path)
}

/// Encode the compiler argument list as the body of a JSON array, without the
/// surrounding brackets, so it can be spliced into a template that already supplies them.
fn compiler_args_json_body(args: &[String]) -> Result<String> {
    let parts: Result<Vec<String>> = args
        .iter()
        .map(|a| serde_json::to_string(a).map_err(ReduceError::from))
        .collect();
    Ok(parts?.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RequestInfo {
        RequestInfo {
            primary_template: "key.offset: $OFFSET\nkey.sourcefile: \"$FILE\"\nkey.sourcetext: $FILE_CONTENTS\nkey.compilerargs: [\n$COMPILER_ARGS\n]\n".to_string(),
            contextual_templates: vec!["key.request: editor.open\nkey.sourcefile: \"$FILE\"\n".to_string()],
            offset: 5,
            compiler_arguments: vec!["-sdk".to_string(), "/p".to_string()],
            file_contents: "let x = 1".to_string(),
        }
    }

    #[test]
    fn substitutes_all_placeholders() {
        let serialized = substitute(&sample(), "/tmp/scratch/input.swift").unwrap();
        assert_eq!(serialized.bodies.len(), 2);
        assert!(serialized.primary().contains("key.offset: 5"));
        assert!(serialized.primary().contains("\"/tmp/scratch/input.swift\""));
        assert!(serialized.primary().contains("\"let x = 1\""));
        assert!(serialized.primary().contains("\"-sdk\""));
        assert!(!serialized.primary().contains("$OFFSET"));
        assert_eq!(serialized.contextual().len(), 1);
        assert!(serialized.contextual()[0].contains("/tmp/scratch/input.swift"));
    }

    #[test]
    fn doubles_backslashes_in_file_path() {
        let serialized = substitute(&sample(), "C:\\tmp\\input.swift").unwrap();
        assert!(serialized.primary().contains("C:\\\\tmp\\\\input.swift"));
    }
}
