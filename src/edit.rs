//! Edit operations on a single code block

use std::fmt;
use std::num::NonZeroUsize;

use crate::error::{Error, Result};
use crate::fence::CodeBlock;

/// Edit applied to every code block of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Tag blocks that have no language
    AddLanguage(String),
    /// Set the language of every block, replacing any existing tag
    UpdateLanguage(String),
    /// Strip the language of every tagged block
    RemoveLanguage,
    /// Delete the first `n` lines of every block body
    DeleteLeadingLines(NonZeroUsize),
}

impl Operation {
    /// Build a delete operation, rejecting a zero count
    pub fn delete_leading_lines(count: usize) -> Result<Self> {
        NonZeroUsize::new(count)
            .map(Operation::DeleteLeadingLines)
            .ok_or_else(|| Error::InvalidArgument("line count must be greater than zero".to_string()))
    }

    /// Check the arguments before any file is touched
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::AddLanguage(language) | Operation::UpdateLanguage(language) => {
                if language.trim().is_empty() {
                    return Err(Error::InvalidArgument("language must not be empty".to_string()));
                }
                if language.chars().any(char::is_whitespace) {
                    return Err(Error::InvalidArgument(format!(
                        "language must be a single token, got {:?}",
                        language
                    )));
                }
                if language.contains(crate::fence::FENCE) {
                    return Err(Error::InvalidArgument(format!(
                        "language must not contain a fence, got {:?}",
                        language
                    )));
                }
                Ok(())
            }
            Operation::RemoveLanguage | Operation::DeleteLeadingLines(_) => Ok(()),
        }
    }

    /// Replacement text for `block`, or `None` when the block stays as it is
    pub fn apply(&self, block: &CodeBlock<'_>) -> Option<String> {
        match self {
            Operation::AddLanguage(language) => {
                if block.is_tagged() {
                    None
                } else {
                    Some(block.render_with(language, block.body))
                }
            }
            Operation::UpdateLanguage(language) => {
                if block.language == language.as_str() {
                    None
                } else {
                    Some(block.render_with(language, block.body))
                }
            }
            Operation::RemoveLanguage => {
                if block.is_tagged() {
                    Some(block.render_with("", block.body))
                } else {
                    None
                }
            }
            Operation::DeleteLeadingLines(count) => {
                let body = drop_leading_lines(block.body, count.get());
                if body == block.body {
                    None
                } else {
                    Some(block.render_with(block.language, body))
                }
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddLanguage(language) => write!(f, "add language '{}'", language),
            Operation::UpdateLanguage(language) => write!(f, "update language to '{}'", language),
            Operation::RemoveLanguage => write!(f, "remove language"),
            Operation::DeleteLeadingLines(count) => write!(f, "delete first {} line(s)", count),
        }
    }
}

/// Remove the first `count` lines of `body`
///
/// A body ending in `\n` keeps ending in `\n`; removing every line leaves it empty.
fn drop_leading_lines(body: &str, count: usize) -> &str {
    let offset: usize = body.split_inclusive('\n').take(count).map(str::len).sum();
    &body[offset..]
}
