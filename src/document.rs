//! Reading, transforming and writing back a single Markdown document
//!
//! A document goes through:
//! read -> detect charset -> decode to UTF-8 -> normalize newlines ->
//! rewrite code blocks -> restore newlines -> encode -> atomic write
//!
//! Nothing is written when no code block changed.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::charset::{Charset, CharsetDetector, DEFAULT_SAMPLE_LIMIT};
use crate::edit::Operation;
use crate::error::{Error, Result};
use crate::newline::{self, LineEnding};
use crate::rewrite::rewrite_scoped;
use crate::split::Scope;
use crate::transcode;

/// What happens to line endings on write-back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewlineMode {
    /// Write the document's dominant original line ending
    #[default]
    Restore,
    /// Keep the normalized `\n` line endings
    Normalize,
}

/// Configuration for document processing
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Leading bytes examined by charset detection
    pub sample_limit: usize,
    /// Line ending policy on write-back
    pub newline: NewlineMode,
    /// Part of the document that is edited
    pub scope: Scope,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            newline: NewlineMode::default(),
            scope: Scope::default(),
        }
    }
}

/// A decoded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Where the document was read from
    pub path: PathBuf,
    /// Charset of the bytes on disk
    pub charset: Charset,
    /// Whether the bytes on disk started with a byte-order mark
    pub had_bom: bool,
    /// Dominant line ending before normalization
    pub line_ending: LineEnding,
    /// Decoded text with `\n` line endings
    pub text: String,
}

impl Document {
    /// Read and decode the file at `path`
    pub fn read(path: &Path, config: &DocumentConfig) -> Result<Self> {
        let bytes = read_bytes(path)?;
        Self::decode(path, &bytes, config)
    }

    /// Decode raw file content
    pub fn decode(path: &Path, bytes: &[u8], config: &DocumentConfig) -> Result<Self> {
        let mut detector = CharsetDetector::with_sample_limit(config.sample_limit);
        let charset = match detector.detect(bytes).into_result() {
            Ok(charset) => charset,
            Err(Error::EmptyInput) => Charset::utf8(),
            Err(Error::DetectionFailed { .. }) => {
                return Err(Error::DetectionFailed {
                    path: Some(path.to_path_buf()),
                })
            }
            Err(err) => return Err(err),
        };
        debug!("{}: charset {}", path.display(), charset);

        let (had_bom, _) = transcode::split_bom(bytes, charset);
        let decoded = transcode::to_utf8(bytes, charset)?;
        let line_ending = LineEnding::detect(&decoded);
        let text = newline::normalize(&decoded).into_owned();

        Ok(Self {
            path: path.to_path_buf(),
            charset,
            had_bom,
            line_ending,
            text,
        })
    }

    /// Encode `text` back into the document's original form
    pub fn encode(&self, text: &str, config: &DocumentConfig) -> Result<Vec<u8>> {
        let text = match config.newline {
            NewlineMode::Restore => self.line_ending.restore(text),
            NewlineMode::Normalize => text.into(),
        };

        let encoded = transcode::from_utf8(&text, self.charset)?;
        match transcode::bom(self.charset) {
            Some(bom) if self.had_bom => Ok([bom, encoded.as_slice()].concat()),
            _ => Ok(encoded),
        }
    }

    /// Encode `text` and replace the file on disk with it
    ///
    /// Encoding happens before the file is touched, so a conversion failure
    /// leaves the original intact.
    pub fn write(&self, text: &str, config: &DocumentConfig) -> Result<()> {
        let bytes = self.encode(text, config)?;
        write_atomic(&self.path, &bytes).map_err(|source| Error::CannotWriteFile {
            path: self.path.clone(),
            source,
        })
    }
}

/// Result of applying an operation to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The document has no code blocks
    NoBlocks,
    /// Code blocks were found but none needed a change
    Unchanged { blocks: usize },
    /// The document was rewritten
    Modified { blocks: usize, changed: usize },
}

impl Outcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, Outcome::Modified { .. })
    }
}

/// Apply `op` to the Markdown file at `path`, writing it back if anything changed
pub fn apply(path: &Path, op: &Operation, config: &DocumentConfig) -> Result<Outcome> {
    op.validate()?;

    let document = Document::read(path, config)?;
    let result = rewrite_scoped(&document.text, op, config.scope);

    if result.blocks == 0 {
        info!("{}: no code blocks", path.display());
        return Ok(Outcome::NoBlocks);
    }
    if !result.is_modified() {
        info!("{}: {} code block(s), nothing to change", path.display(), result.blocks);
        return Ok(Outcome::Unchanged { blocks: result.blocks });
    }

    document.write(&result.text, config)?;
    info!(
        "{}: {} changed {} of {} code block(s)",
        path.display(),
        op,
        result.changed,
        result.blocks
    );

    Ok(Outcome::Modified {
        blocks: result.blocks,
        changed: result.changed,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::CannotOpenFile {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_file() {
        return Err(Error::NotRegularFile {
            path: path.to_path_buf(),
        });
    }

    let mut file = fs::File::open(path).map_err(|source| Error::CannotOpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut bytes = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
    file.read_to_end(&mut bytes).map_err(|source| Error::CannotReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes)
}

/// Write to a temporary file next to `path`, then rename it over `path`
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).map(|m| m.permissions()).ok();

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    if let Some(permissions) = permissions {
        fs::set_permissions(tmp.path(), permissions)?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn add(language: &str) -> Operation {
        Operation::AddLanguage(language.to_string())
    }

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_apply_add_language_utf8() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "doc.md", b"```\nhello\nworld\n```\n");

        let outcome = apply(&path, &add("text"), &DocumentConfig::default()).unwrap();

        assert_eq!(outcome, Outcome::Modified { blocks: 1, changed: 1 });
        assert_eq!(fs::read_to_string(&path).unwrap(), "```text\nhello\nworld\n```\n");
    }

    #[test]
    fn test_apply_remove_language() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "doc.md", b"```py\ncode\n```");

        let outcome = apply(&path, &Operation::RemoveLanguage, &DocumentConfig::default()).unwrap();

        assert!(outcome.is_modified());
        assert_eq!(fs::read_to_string(&path).unwrap(), "```\ncode\n```");
    }

    #[test]
    fn test_apply_no_blocks_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let original = b"# Title\r\n\r\nNo code here.\r\n";
        let path = write_file(dir.path(), "doc.md", original);

        let outcome = apply(&path, &Operation::RemoveLanguage, &DocumentConfig::default()).unwrap();

        assert_eq!(outcome, Outcome::NoBlocks);
        assert!(!outcome.is_modified());
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_apply_unchanged_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let original = b"```go\nx\n```\n";
        let path = write_file(dir.path(), "doc.md", original);

        let outcome = apply(&path, &add("rust"), &DocumentConfig::default()).unwrap();

        assert_eq!(outcome, Outcome::Unchanged { blocks: 1 });
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_apply_preserves_gbk() {
        let dir = tempdir().unwrap();
        let text = "# 说明文档\n\n这是一个中文文档，下面的代码块没有语言标记，需要自动添加。\n\n\
                    ```\n打印(\"你好，世界\")\n```\n\n文档结束，谢谢阅读。\n";
        let (gbk, _, had_errors) = encoding_rs::GBK.encode(text);
        assert!(!had_errors);
        let path = write_file(dir.path(), "gbk.md", &gbk);

        let outcome = apply(&path, &add("python"), &DocumentConfig::default()).unwrap();
        assert!(outcome.is_modified());

        let expected = text.replace("```\n打印", "```python\n打印");
        let (expected_bytes, _, _) = encoding_rs::GBK.encode(&expected);
        assert_eq!(fs::read(&path).unwrap(), expected_bytes.into_owned());
    }

    #[test]
    fn test_apply_restores_crlf() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "crlf.md", b"Intro\r\n```\r\ncode\r\n```\r\n");

        apply(&path, &add("sh"), &DocumentConfig::default()).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"Intro\r\n```sh\r\ncode\r\n```\r\n");
    }

    #[test]
    fn test_apply_normalize_newlines() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "crlf.md", b"Intro\r\n```\r\ncode\r\n```\r\n");
        let config = DocumentConfig {
            newline: NewlineMode::Normalize,
            ..DocumentConfig::default()
        };

        apply(&path, &add("sh"), &config).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"Intro\n```sh\ncode\n```\n");
    }

    #[test]
    fn test_apply_restores_utf8_bom() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "bom.md", b"\xEF\xBB\xBF```\nx\n```\n");

        apply(&path, &add("c"), &DocumentConfig::default()).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBF```c\nx\n```\n");
    }

    #[test]
    fn test_apply_delete_lines() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "doc.md", b"```rust\n// header\nfn main() {}\n```\n");

        let op = Operation::delete_leading_lines(1).unwrap();
        apply(&path, &op, &DocumentConfig::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "```rust\nfn main() {}\n```\n");
    }

    #[test]
    fn test_apply_scoped() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "doc.md", b"```\na\n```\n```\nb\n```\n");
        let config = DocumentConfig {
            scope: Scope::FromLine(4),
            ..DocumentConfig::default()
        };

        apply(&path, &add("c"), &config).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "```\na\n```\n```c\nb\n```\n");
    }

    #[test]
    fn test_apply_empty_file() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "empty.md", b"");

        let outcome = apply(&path, &add("c"), &DocumentConfig::default()).unwrap();

        assert_eq!(outcome, Outcome::NoBlocks);
    }

    #[test]
    fn test_apply_missing_file() {
        let dir = tempdir().unwrap();
        let err = apply(&dir.path().join("missing.md"), &add("c"), &DocumentConfig::default()).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_apply_directory_is_not_regular_file() {
        let dir = tempdir().unwrap();
        let err = apply(dir.path(), &add("c"), &DocumentConfig::default()).unwrap_err();
        assert!(matches!(err, Error::NotRegularFile { .. }));
    }

    #[test]
    fn test_apply_rejects_empty_language() {
        let dir = tempdir().unwrap();
        let original = b"```\nx\n```\n";
        let path = write_file(dir.path(), "doc.md", original);

        let err = apply(&path, &add(""), &DocumentConfig::default()).unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_unmappable_language_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let original = b"caf\xE9\n```\nx\n```\n";
        let path = write_file(dir.path(), "latin.md", original);
        let document = Document::read(&path, &DocumentConfig::default()).unwrap();
        assert!(!document.charset.is_utf8());

        // U+2603 has no windows-1252 (or other single-byte) mapping
        let err = apply(&path, &add("☃"), &DocumentConfig::default()).unwrap_err();

        assert!(matches!(err, Error::ConversionFailed { .. }));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_decode_records_line_ending_and_bom() {
        let document = Document::decode(
            Path::new("x.md"),
            b"\xEF\xBB\xBFa\r\nb\r\n",
            &DocumentConfig::default(),
        )
        .unwrap();

        assert!(document.charset.is_utf8());
        assert!(document.had_bom);
        assert_eq!(document.line_ending, LineEnding::Crlf);
        assert_eq!(document.text, "a\nb\n");
    }

    #[test]
    fn test_encode_round_trip_unchanged_text() {
        let original = b"line one\r\nline two\r\n";
        let config = DocumentConfig::default();
        let document = Document::decode(Path::new("x.md"), original, &config).unwrap();
        assert_eq!(document.encode(&document.text, &config).unwrap(), original);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "doc.md", b"```\nx\n```\n");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        apply(&path, &add("c"), &DocumentConfig::default()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
