//! # mdfence
//!
//! Edit fenced code blocks in Markdown files without disturbing anything else.
//!
//! Four operations are supported, each applied to every code block of a
//! document:
//!
//! - add a language to blocks that have none
//! - set (update) the language of every block
//! - remove the language of every block
//! - delete the first `n` lines of every block body
//!
//! ````text
//! ```            ```python
//! print(1)   ->  print(1)
//! ```            ```
//! ````
//!
//! ## Encoding preservation
//!
//! Files are written back in the charset they were read in. The charset is
//! detected from a byte-order mark, UTF-8 validity, or a statistical guess
//! ([`charset`]); the text is edited as UTF-8 and converted back
//! ([`transcode`]). Line endings and byte-order marks are restored as well.
//! A file without any change is never rewritten.
//!
//! ## Example
//!
//! ```no_run
//! use mdfence::{apply, DocumentConfig, Operation};
//! use std::path::Path;
//!
//! let op = Operation::AddLanguage("text".to_string());
//! let outcome = apply(Path::new("README.md"), &op, &DocumentConfig::default())?;
//! println!("modified: {}", outcome.is_modified());
//! # Ok::<(), mdfence::Error>(())
//! ```
//!
//! Editing in memory:
//!
//! ```
//! use mdfence::{rewrite, Operation};
//!
//! let result = rewrite("```py\ncode\n```\n", &Operation::RemoveLanguage);
//! assert_eq!(result.text, "```\ncode\n```\n");
//! ```

pub mod charset;
pub mod document;
pub mod edit;
pub mod error;
pub mod fence;
pub mod newline;
pub mod rewrite;
pub mod split;
pub mod transcode;
#[cfg(feature = "walkdir")]
pub mod walk;

pub use charset::{Charset, CharsetDetector, Detection};
pub use document::{apply, Document, DocumentConfig, NewlineMode, Outcome};
pub use edit::Operation;
pub use error::{Error, Result};
pub use fence::{scan, CodeBlock};
pub use newline::LineEnding;
pub use rewrite::{rewrite, rewrite_scoped, Rewrite};
pub use split::{split_at_line, Scope};
