//! Charset naming and detection
//!
//! Detection runs in three steps:
//! 1. A byte-order mark decides the charset outright
//! 2. Input that is valid UTF-8 is UTF-8
//! 3. Otherwise the statistical guess from `chardetng` is used, provided the
//!    guessed charset can decode the sample without malformed sequences
//!
//! Only a bounded prefix of a document is examined, see [`DEFAULT_SAMPLE_LIMIT`].

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use log::debug;
use std::fmt;

use crate::error::{Error, Result};
use crate::transcode;

/// Number of leading bytes fed to the detector for a document
pub const DEFAULT_SAMPLE_LIMIT: usize = 64 * 1024;

/// A named text encoding
///
/// Two charsets compare equal when they resolve to the same encoding, so
/// `"UTF-8"`, `"utf8"` and `"Utf-8"` are all the same charset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// UTF-8
    pub fn utf8() -> Self {
        Charset(encoding_rs::UTF_8)
    }

    /// Resolve a charset label such as `"GBK"`, `"shift_jis"` or `"UTF8"`
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Charset)
    }

    /// Canonical name of the charset
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn is_utf8(&self) -> bool {
        self.0 == encoding_rs::UTF_8
    }

    pub(crate) fn encoding(&self) -> &'static Encoding {
        self.0
    }
}

impl From<&'static Encoding> for Charset {
    fn from(encoding: &'static Encoding) -> Self {
        Charset(encoding)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of charset detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Best-guess charset
    Charset(Charset),
    /// The bytes did not look like any supported charset
    Unknown,
    /// Nothing to examine
    Empty,
}

impl Detection {
    /// Charset to use when the input only needs best-effort decoding
    ///
    /// `Unknown` and `Empty` fall back to UTF-8.
    pub fn or_utf8(self) -> Charset {
        match self {
            Detection::Charset(charset) => charset,
            Detection::Unknown | Detection::Empty => Charset::utf8(),
        }
    }

    /// Charset as a result: `Empty` is [`Error::EmptyInput`], `Unknown` is
    /// [`Error::DetectionFailed`]
    pub fn into_result(self) -> Result<Charset> {
        match self {
            Detection::Charset(charset) => Ok(charset),
            Detection::Unknown => Err(Error::DetectionFailed { path: None }),
            Detection::Empty => Err(Error::EmptyInput),
        }
    }
}

/// Reusable charset detector
///
/// Each call to [`detect`](Self::detect) starts from a fresh statistical
/// state, so one detector can examine any number of inputs.
pub struct CharsetDetector {
    inner: EncodingDetector,
    sample_limit: usize,
}

impl CharsetDetector {
    /// Create a detector using [`DEFAULT_SAMPLE_LIMIT`]
    pub fn new() -> Self {
        Self::with_sample_limit(DEFAULT_SAMPLE_LIMIT)
    }

    /// Create a detector that examines at most `sample_limit` bytes
    pub fn with_sample_limit(sample_limit: usize) -> Self {
        Self {
            inner: EncodingDetector::new(),
            sample_limit: sample_limit.max(1),
        }
    }

    /// Discard any state accumulated from previous input
    pub fn reset(&mut self) {
        self.inner = EncodingDetector::new();
    }

    /// Detect the charset of `bytes`, looking only at the bounded prefix
    pub fn detect(&mut self, bytes: &[u8]) -> Detection {
        self.reset();

        if bytes.is_empty() {
            return Detection::Empty;
        }

        let complete = bytes.len() <= self.sample_limit;
        let sample = if complete {
            bytes
        } else {
            debug!(
                "Input is {} bytes, using first {} bytes for charset detection",
                bytes.len(),
                self.sample_limit
            );
            &bytes[..self.sample_limit]
        };

        if let Some((encoding, _)) = Encoding::for_bom(sample) {
            return Detection::Charset(Charset(encoding));
        }

        if is_utf8(sample, complete) {
            return Detection::Charset(Charset::utf8());
        }

        self.inner.feed(sample, complete);
        let guess = self.inner.guess(None, false);
        debug!("Statistical charset guess: {}", guess.name());

        if transcode::decode_strict(guess, sample, complete).is_ok() {
            Detection::Charset(Charset(guess))
        } else {
            Detection::Unknown
        }
    }
}

impl Default for CharsetDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Valid UTF-8, tolerating a sequence cut off by the end of an incomplete sample
fn is_utf8(sample: &[u8], complete: bool) -> bool {
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        Err(e) => !complete && e.error_len().is_none(),
    }
}

/// Detect the charset of a standalone byte string
pub fn detect(bytes: &[u8]) -> Detection {
    CharsetDetector::new().detect(bytes)
}

/// Best-effort decoding of a short transient string, such as a command line argument
///
/// Undetectable input is assumed to be UTF-8 already; invalid sequences are
/// replaced rather than reported.
pub fn decode_transient(bytes: &[u8]) -> String {
    let charset = detect(bytes).or_utf8();
    match transcode::to_utf8(bytes, charset) {
        Ok(text) => text,
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_empty() {
        assert_eq!(detect(b""), Detection::Empty);
    }

    #[test]
    fn test_detect_ascii_is_utf8() {
        assert_eq!(detect(b"# Title\n\n```\ncode\n```\n"), Detection::Charset(Charset::utf8()));
    }

    #[test]
    fn test_detect_utf8_multibyte() {
        let text = "# 标题\n\n中文内容，用于测试编码检测。\n";
        assert_eq!(detect(text.as_bytes()), Detection::Charset(Charset::utf8()));
    }

    #[test]
    fn test_detect_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"hello");
        assert_eq!(detect(&bytes), Detection::Charset(Charset::utf8()));
    }

    #[test]
    fn test_detect_utf16le_bom() {
        let bytes = [0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        assert_eq!(detect(&bytes), Detection::Charset(Charset::from(encoding_rs::UTF_16LE)));
    }

    #[test]
    fn test_detect_gbk() {
        let text = "这是一个用于测试的中文文档。代码块需要添加语言标记，然后保存为原来的编码格式。\n\
                    如果文件的编码不是统一码，程序会先把内容转换成统一码再进行处理。\n\
                    处理完成以后，内容会被转换回原来的编码并写入磁盘。\n";
        let (bytes, _, had_errors) = encoding_rs::GBK.encode(text);
        assert!(!had_errors);

        match detect(&bytes) {
            Detection::Charset(charset) => {
                assert!(!charset.is_utf8());
                let decoded = transcode::to_utf8(&bytes, charset).unwrap();
                assert_eq!(decoded, text);
            }
            other => panic!("Expected a charset, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_sample_keeps_utf8() {
        // "中" is three bytes; a limit of 5 cuts the second one in half
        let bytes = "a中中".as_bytes();
        let mut detector = CharsetDetector::with_sample_limit(5);
        assert_eq!(detector.detect(bytes), Detection::Charset(Charset::utf8()));
    }

    #[test]
    fn test_detector_reuse() {
        let mut detector = CharsetDetector::new();
        assert_eq!(detector.detect(b""), Detection::Empty);
        assert_eq!(detector.detect(b"plain text"), Detection::Charset(Charset::utf8()));
        assert_eq!(detector.detect(b"more plain text"), Detection::Charset(Charset::utf8()));
    }

    #[test]
    fn test_for_label_utf8_spellings() {
        let utf8 = Charset::utf8();
        assert_eq!(Charset::for_label("UTF-8"), Some(utf8));
        assert_eq!(Charset::for_label("UTF8"), Some(utf8));
        assert_eq!(Charset::for_label("utf8"), Some(utf8));
        assert_eq!(Charset::for_label(" utf-8 "), Some(utf8));
    }

    #[test]
    fn test_for_label_unknown() {
        assert_eq!(Charset::for_label("not-a-charset"), None);
    }

    #[test]
    fn test_for_label_gbk() {
        let charset = Charset::for_label("gbk").unwrap();
        assert_eq!(charset.name(), "GBK");
        assert!(!charset.is_utf8());
    }

    #[test]
    fn test_or_utf8() {
        assert!(Detection::Unknown.or_utf8().is_utf8());
        assert!(Detection::Empty.or_utf8().is_utf8());
    }

    #[test]
    fn test_into_result() {
        assert!(Detection::Charset(Charset::utf8()).into_result().is_ok());
        assert!(matches!(Detection::Empty.into_result(), Err(Error::EmptyInput)));
        assert!(matches!(
            Detection::Unknown.into_result(),
            Err(Error::DetectionFailed { path: None })
        ));
    }

    #[test]
    fn test_decode_transient_utf8() {
        assert_eq!(decode_transient("rust".as_bytes()), "rust");
        assert_eq!(decode_transient("中文".as_bytes()), "中文");
    }

    #[test]
    fn test_decode_transient_empty() {
        assert_eq!(decode_transient(b""), "");
    }
}
