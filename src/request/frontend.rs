//! Construction of a [`RequestInfo`] from a Swift front-end argument list.
//!
//! The front-end path has no language-service request to parse: the command
//! line itself is the subject. Construction only has to inline `-filelist`
//! contents and drop a handful of flags the reducer would otherwise have to
//! special-case later (they reference files the caller hasn't bundled yet).

use crate::core::errors::Result;
use crate::request::{frontend_sentinel_template, RequestInfo};

/// Flags that consume the following argument and should be dropped entirely
/// (they name output files the reducer has no use for and no way to keep valid).
const DROPPED_FLAGS_WITH_VALUE: &[&str] = &[
    "-supplementary-output-file-map",
    "-output-filelist",
    "-index-unit-output-path-filelist",
];

/// Flag-only argument dropped without consuming a following value.
const DROPPED_FLAG_ONLY: &str = "-index-system-modules";

const FILELIST_FLAG: &str = "-filelist";

/// Build a front-end-mode `RequestInfo` from a raw compiler argument list, inlining
/// any `-filelist <path>` into the argument list in place.
///
/// `read_filelist` abstracts reading and splitting the referenced file so tests can
/// supply an in-memory fixture instead of touching the filesystem.
pub fn from_frontend_arguments(
    args: &[String],
    mut read_filelist: impl FnMut(&str) -> Result<Vec<String>>,
) -> Result<RequestInfo> {
    let mut out = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];

        if arg == FILELIST_FLAG {
            if let Some(path) = args.get(i + 1) {
                let lines = read_filelist(path)?;
                out.extend(lines);
                i += 2;
                continue;
            }
        }

        if DROPPED_FLAGS_WITH_VALUE.contains(&arg.as_str()) {
            // Drop the flag and the value that follows it, if any.
            i += if args.get(i + 1).is_some() { 2 } else { 1 };
            continue;
        }

        if arg == DROPPED_FLAG_ONLY {
            i += 1;
            continue;
        }

        out.push(arg.clone());
        i += 1;
    }

    Ok(RequestInfo {
        primary_template: frontend_sentinel_template(),
        contextual_templates: Vec::new(),
        offset: 0,
        compiler_arguments: out,
        file_contents: String::new(),
    })
}

/// Split `-filelist` contents the way the front end does: one path per line,
/// blank lines dropped.
pub fn split_filelist_contents(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn inlines_filelist_in_place() {
        let files: HashMap<&str, &str> = HashMap::from([("F", "a.swift\nb.swift\n")]);
        let input = args(&["-c", "-filelist", "F", "-o", "out.o"]);
        let req = from_frontend_arguments(&input, |path| {
            Ok(split_filelist_contents(files[path]))
        })
        .unwrap();

        assert_eq!(
            req.compiler_arguments,
            vec!["-c", "a.swift", "b.swift", "-o", "out.o"]
        );
        assert!(req.is_frontend_mode());
    }

    #[test]
    fn drops_output_filelist_and_its_value() {
        let input = args(&[
            "-c",
            "-supplementary-output-file-map",
            "map.json",
            "-index-system-modules",
            "main.swift",
        ]);
        let req = from_frontend_arguments(&input, |_| Ok(Vec::new())).unwrap();
        assert_eq!(req.compiler_arguments, vec!["-c", "main.swift"]);
    }

    #[test]
    fn filelist_inlining_combined_with_dropped_flags() {
        let files: HashMap<&str, &str> = HashMap::from([("F", "a.swift\nb.swift")]);
        let input = args(&[
            "-filelist",
            "F",
            "-supplementary-output-file-map",
            "map.json",
        ]);
        let req = from_frontend_arguments(&input, |path| {
            Ok(split_filelist_contents(files[path]))
        })
        .unwrap();
        assert_eq!(req.compiler_arguments, vec!["a.swift", "b.swift"]);
    }
}
