//! Reassembly of a document from literal text and edited blocks

use std::borrow::Cow;

use crate::edit::Operation;
use crate::fence::scan;
use crate::split::Scope;

/// Result of rewriting one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite<'a> {
    /// Document text after the edit; borrowed when nothing changed
    pub text: Cow<'a, str>,
    /// Number of code blocks found
    pub blocks: usize,
    /// Number of code blocks the operation changed
    pub changed: usize,
}

impl Rewrite<'_> {
    pub fn is_modified(&self) -> bool {
        self.changed > 0
    }
}

/// Apply `op` to every code block of `text`
///
/// Text outside the blocks is copied verbatim.
pub fn rewrite<'a>(text: &'a str, op: &Operation) -> Rewrite<'a> {
    let mut output = String::new();
    let mut last_end = 0;
    let mut blocks = 0;
    let mut changed = 0;

    for block in scan(text) {
        blocks += 1;
        let Some(replacement) = op.apply(&block) else {
            continue;
        };

        if changed == 0 {
            output.reserve(text.len() + replacement.len());
        }
        changed += 1;

        output.push_str(&text[last_end..block.span.start]);
        output.push_str(&replacement);
        last_end = block.span.end;
    }

    if changed == 0 {
        return Rewrite {
            text: Cow::Borrowed(text),
            blocks,
            changed,
        };
    }

    output.push_str(&text[last_end..]);
    Rewrite {
        text: Cow::Owned(output),
        blocks,
        changed,
    }
}

/// Apply `op` only to the part of `text` selected by `scope`
///
/// Blocks that straddle the scope boundary are not seen as blocks.
pub fn rewrite_scoped<'a>(text: &'a str, op: &Operation, scope: Scope) -> Rewrite<'a> {
    let (before, editable, after) = scope.partition(text);
    let result = rewrite(editable, op);

    if !result.is_modified() {
        return Rewrite {
            text: Cow::Borrowed(text),
            ..result
        };
    }

    Rewrite {
        text: Cow::Owned([before, result.text.as_ref(), after].concat()),
        blocks: result.blocks,
        changed: result.changed,
    }
}
