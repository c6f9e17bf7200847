//! Request model: the templated envelope that is the unit of reduction.
//!
//! A [`RequestInfo`] is constructed once from an external input (a logged
//! sourcekitd request, or a front-end argument list) and then threaded
//! through the reduction pipeline, each stage allocating a new, usually
//! smaller, value rather than mutating in place.

mod frontend;
mod parse;
mod serialize;

pub use frontend::{from_frontend_arguments, split_filelist_contents};
pub use parse::{contextual_template_from_logged_request, from_logged_request};
pub use serialize::{substitute, SerializedRequest};

/// `$OFFSET` placeholder.
pub const PLACEHOLDER_OFFSET: &str = "$OFFSET";
/// `$FILE` placeholder.
pub const PLACEHOLDER_FILE: &str = "$FILE";
/// `$FILE_CONTENTS` placeholder.
pub const PLACEHOLDER_FILE_CONTENTS: &str = "$FILE_CONTENTS";
/// `$COMPILER_ARGS` placeholder.
pub const PLACEHOLDER_COMPILER_ARGS: &str = "$COMPILER_ARGS";

/// Request kind carried by the sentinel front-end template.
pub const FRONTEND_REQUEST_KIND: &str = "sourcekit-lsp-fake-request-for-frontend-crash";

/// The distinguished template that switches the oracle to front-end invocation mode.
pub fn frontend_sentinel_template() -> String {
    format!("key.request: \"{FRONTEND_REQUEST_KIND}\"\n")
}

/// The unit of reduction: a templated request plus the source it reduces against.
///
/// Immutable per pipeline stage — every reducer returns a new `RequestInfo`
/// rather than mutating this one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// The primary request envelope, with `$FILE`/`$FILE_CONTENTS`/`$OFFSET`/`$COMPILER_ARGS`
    /// placeholders in place of the concrete values below.
    pub primary_template: String,
    /// Auxiliary requests replayed, in order, before the primary request in the same
    /// subject session (e.g. an `editor.open` priming a `codecomplete`).
    pub contextual_templates: Vec<String>,
    /// UTF-8 byte offset into `file_contents`. Always within `[0, file_contents.len()]`.
    pub offset: usize,
    /// Ordered compiler argument list.
    pub compiler_arguments: Vec<String>,
    /// Complete source text, UTF-8.
    pub file_contents: String,
}

impl RequestInfo {
    /// True when this is a front-end-mode request: the sentinel template is used verbatim
    /// and no contextual requests are replayed.
    pub fn is_frontend_mode(&self) -> bool {
        self.primary_template.contains(FRONTEND_REQUEST_KIND)
    }

    /// Byte length of the current source text.
    pub fn byte_len(&self) -> usize {
        self.file_contents.len()
    }

    /// Validate that the offset falls within the current source text.
    pub fn check_offset_invariant(&self) -> bool {
        self.offset <= self.byte_len()
    }

    /// Build a `RequestInfo` with new file contents and offset, clamping the offset into
    /// range rather than panicking — callers that need a hard failure should check
    /// [`RequestInfo::check_offset_invariant`] first.
    pub fn with_source(&self, file_contents: String, offset: usize) -> RequestInfo {
        let clamped = offset.min(file_contents.len());
        RequestInfo {
            primary_template: self.primary_template.clone(),
            contextual_templates: self.contextual_templates.clone(),
            offset: clamped,
            compiler_arguments: self.compiler_arguments.clone(),
            file_contents,
        }
    }

    /// Build a `RequestInfo` with a new compiler argument list, everything else unchanged.
    pub fn with_compiler_arguments(&self, compiler_arguments: Vec<String>) -> RequestInfo {
        RequestInfo {
            primary_template: self.primary_template.clone(),
            contextual_templates: self.contextual_templates.clone(),
            offset: self.offset,
            compiler_arguments,
            file_contents: self.file_contents.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RequestInfo {
        RequestInfo {
            primary_template: "key.offset: $OFFSET\nkey.sourcefile: \"$FILE\"\n".to_string(),
            contextual_templates: vec![],
            offset: 3,
            compiler_arguments: vec!["-c".to_string()],
            file_contents: "abcdef".to_string(),
        }
    }

    #[test]
    fn offset_invariant_holds_for_sample() {
        assert!(sample().check_offset_invariant());
    }

    #[test]
    fn with_source_clamps_offset_to_new_length() {
        let req = sample();
        let shrunk = req.with_source("ab".to_string(), 5);
        assert_eq!(shrunk.offset, 2);
        assert!(shrunk.check_offset_invariant());
    }

    #[test]
    fn frontend_sentinel_is_detected() {
        let req = RequestInfo {
            primary_template: frontend_sentinel_template(),
            contextual_templates: vec![],
            offset: 0,
            compiler_arguments: vec![],
            file_contents: String::new(),
        };
        assert!(req.is_frontend_mode());
        assert!(!sample().is_frontend_mode());
    }
}
