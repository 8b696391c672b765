//! Fenced code block scanner
//!
//! A block is matched as
//!
//! ```text
//! ```<leading space><language><info tail>\n<body><trailing space>```
//! ```
//!
//! The body is matched minimally, so the first closing fence ends the block.
//! An opening fence without a closer is not a block and stays literal text.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{CaptureMatches, Captures, Regex};

/// Fence delimiter
pub const FENCE: &str = "```";

static FENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```([ \t]*)([^ \t\n]*)([^\n]*)\n([\s\S]*?)([ \t]*)```").expect("fence pattern is valid")
});

/// One fenced code block, borrowed from the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock<'a> {
    /// Spaces and tabs between the opening fence and the language
    pub leading_space: &'a str,
    /// Language tag, empty when the block is untagged
    pub language: &'a str,
    /// Rest of the opening line after the language
    pub info_tail: &'a str,
    /// Everything between the opening line and the closing fence line's indentation
    pub body: &'a str,
    /// Spaces and tabs right before the closing fence
    pub trailing_space: &'a str,
    /// Byte range of the whole block in the scanned text
    pub span: Range<usize>,
}

impl<'a> CodeBlock<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        let whole = caps.get(0)?;
        let group = |i| caps.get(i).map_or("", |m| m.as_str());

        Some(Self {
            leading_space: group(1),
            language: group(2),
            info_tail: group(3),
            body: group(4),
            trailing_space: group(5),
            span: whole.range(),
        })
    }

    pub fn is_tagged(&self) -> bool {
        !self.language.is_empty()
    }

    /// Render the block with a different language and body, keeping its whitespace
    pub fn render_with(&self, language: &str, body: &str) -> String {
        let mut out = String::with_capacity(self.span.len() + language.len() + body.len());
        out.push_str(FENCE);
        out.push_str(self.leading_space);
        out.push_str(language);
        out.push_str(self.info_tail);
        out.push('\n');
        out.push_str(body);
        out.push_str(self.trailing_space);
        out.push_str(FENCE);
        out
    }
}

impl fmt::Display for CodeBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{FENCE}{}{}{}\n{}{}{FENCE}",
            self.leading_space, self.language, self.info_tail, self.body, self.trailing_space
        )
    }
}

/// Iterator over the code blocks of a text, in order of appearance
pub struct Blocks<'a> {
    captures: CaptureMatches<'static, 'a>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = CodeBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.captures.next()?;
        CodeBlock::from_captures(&caps)
    }
}

impl FusedIterator for Blocks<'_> {}

/// Scan `text` for fenced code blocks
///
/// Blocks never overlap: scanning resumes right after each match.
pub fn scan(text: &str) -> Blocks<'_> {
    Blocks {
        captures: FENCE_PATTERN.captures_iter(text),
    }
}
