//! Syntax-tree substrate for the source reducer.
//!
//! Parses with `tree-sitter` using the published `tree-sitter-swift` grammar,
//! giving byte-accurate node ranges without a host Swift parser. [`SyntaxTree`]
//! exposes exactly the four visitor hooks the reducers need; everything else
//! about tree-sitter's API stays inside this module.

use tree_sitter::{Node, Parser, Tree};

use crate::core::errors::{ReduceError, Result};

const IMPORT_DECLARATION_KIND: &str = "import_declaration";
const FUNCTION_BODY_KINDS: &[&str] = &["function_body", "computed_property"];
const MEMBER_BLOCK_KINDS: &[&str] = &["class_body", "function_body"];

/// A half-open byte range to be replaced with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEdit {
    /// Start byte offset, inclusive.
    pub start: usize,
    /// End byte offset, exclusive.
    pub end: usize,
    /// Replacement text.
    pub new_text: String,
}

impl SourceEdit {
    /// An edit that deletes `[start, end)` entirely.
    pub fn delete(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            new_text: String::new(),
        }
    }

    fn byte_len(&self) -> usize {
        self.end - self.start
    }
}

/// An `import` declaration found by [`SyntaxTree::import_declarations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    /// Byte range of the whole declaration, including the `import` keyword.
    pub start: usize,
    /// End of the byte range, exclusive.
    pub end: usize,
    /// The imported module name, as written.
    pub module_name: String,
}

/// A parsed Swift source file plus the tree-sitter tree over it.
///
/// Re-parsed once per accepted edit; tree-sitter's incremental reparse API is
/// not needed at this scale.
pub struct SyntaxTree {
    tree: Tree,
    source: String,
}

impl SyntaxTree {
    /// Parse `source` with the Swift grammar.
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_swift::LANGUAGE.into())
            .map_err(|e| ReduceError::encoding(format!("failed to load Swift grammar: {e}")))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ReduceError::encoding("tree-sitter failed to parse source"))?;
        Ok(Self {
            tree,
            source: source.to_string(),
        })
    }

    /// The source text this tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte ranges of every top-level item (direct child of the source-file root).
    pub fn top_level_item_ranges(&self) -> Vec<(usize, usize)> {
        named_children(self.tree.root_node())
            .map(|n| (n.start_byte(), n.end_byte()))
            .collect()
    }

    /// Byte ranges of the *contents* of every function-like body (the span between
    /// the braces, not the braces themselves), suitable for replacing with `""`.
    pub fn function_body_content_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        walk(self.tree.root_node(), &mut |node| {
            if FUNCTION_BODY_KINDS.contains(&node.kind()) {
                if let Some(range) = body_interior(node) {
                    ranges.push(range);
                }
            }
        });
        ranges
    }

    /// Byte ranges of every member/statement inside a `class_body` or `function_body`.
    pub fn member_and_statement_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        walk(self.tree.root_node(), &mut |node| {
            if MEMBER_BLOCK_KINDS.contains(&node.kind()) {
                ranges.extend(named_children(node).map(|n| (n.start_byte(), n.end_byte())));
            }
        });
        ranges
    }

    /// Every `import` declaration in the file, in source order.
    pub fn import_declarations(&self) -> Vec<ImportDeclaration> {
        let mut out = Vec::new();
        walk(self.tree.root_node(), &mut |node| {
            if node.kind() == IMPORT_DECLARATION_KIND {
                if let Some(decl) = import_from_node(node, &self.source) {
                    out.push(decl);
                }
            }
        });
        out
    }

    /// Byte ranges of every comment node (line, block, or doc) in the file.
    pub fn comment_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        walk(self.tree.root_node(), &mut |node| {
            if node.kind().contains("comment") {
                ranges.push((node.start_byte(), node.end_byte()));
            }
        });
        ranges
    }

    /// Text of a byte range in this tree's source, whitespace-trimmed, used as the
    /// canonical shape for keep-set membership.
    pub fn canonical_text(&self, start: usize, end: usize) -> String {
        self.source[start..end].trim().to_string()
    }
}

fn body_interior(node: Node) -> Option<(usize, usize)> {
    let start = node.start_byte() + 1;
    let end = node.end_byte().checked_sub(1)?;
    if start > end {
        return None;
    }
    Some((start, end))
}

fn import_from_node(node: Node, source: &str) -> Option<ImportDeclaration> {
    let text = node.utf8_text(source.as_bytes()).ok()?;
    let module_name = text
        .trim()
        .trim_start_matches("import")
        .trim()
        .split_whitespace()
        .next()?
        .to_string();
    Some(ImportDeclaration {
        start: node.start_byte(),
        end: node.end_byte(),
        module_name,
    })
}

fn named_children(node: Node) -> impl Iterator<Item = Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|n| n.is_named())
        .collect::<Vec<_>>()
        .into_iter()
}

fn walk<'a, F: FnMut(Node<'a>)>(node: Node<'a>, f: &mut F) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        f(current);
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            stack.push(child);
        }
    }
}

/// Apply `edits` to `source`, sorting by start offset and dropping any edit that
/// overlaps one already kept (earliest start wins), as in the original
/// `FixItApplier` routine.
pub fn apply_edits(source: &str, edits: &[SourceEdit]) -> String {
    let mut sorted: Vec<&SourceEdit> = edits.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let mut result = String::with_capacity(source.len());
    let mut cursor = 0usize;
    let mut last_end = 0usize;

    for edit in sorted {
        if edit.start < last_end {
            continue;
        }
        result.push_str(&source[cursor..edit.start]);
        result.push_str(&edit.new_text);
        cursor = edit.end;
        last_end = edit.end;
    }
    result.push_str(&source[cursor..]);
    result
}

/// Adjust `offset` for one accepted edit: if the edit's upper bound lies strictly
/// below `offset`, shift by the edit's net length delta.
pub fn adjust_offset(offset: usize, edit: &SourceEdit) -> usize {
    if edit.end < offset {
        (offset + edit.new_text.len()).saturating_sub(edit.byte_len())
    } else {
        offset
    }
}
