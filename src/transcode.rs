//! Conversion between a document's charset and UTF-8
//!
//! Conversions are strict in both directions: a byte sequence that is invalid
//! in the source charset, or a character the target charset cannot represent,
//! fails the conversion instead of being replaced.

use encoding_rs::{DecoderResult, EncoderResult, Encoding};

use crate::charset::Charset;
use crate::error::{Error, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

// Minimum growth step when a converter reports a full output buffer
const MIN_GROWTH: usize = 16;

/// Byte-order mark written for `charset`, if it has one
pub fn bom(charset: Charset) -> Option<&'static [u8]> {
    let encoding = charset.encoding();
    if encoding == encoding_rs::UTF_8 {
        Some(UTF8_BOM)
    } else if encoding == encoding_rs::UTF_16LE {
        Some(UTF16LE_BOM)
    } else if encoding == encoding_rs::UTF_16BE {
        Some(UTF16BE_BOM)
    } else {
        None
    }
}

/// Split a leading byte-order mark off `bytes`
///
/// A UTF-8 BOM is always removed, whatever the declared charset; a UTF-16
/// BOM only when it matches `charset`.
pub fn split_bom(bytes: &[u8], charset: Charset) -> (bool, &[u8]) {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return (true, rest);
    }
    match bom(charset) {
        Some(mark) if !charset.is_utf8() => match bytes.strip_prefix(mark) {
            Some(rest) => (true, rest),
            None => (false, bytes),
        },
        _ => (false, bytes),
    }
}

/// Decode `bytes` from `from` into UTF-8 text
///
/// UTF-8 input is validated and returned without running a converter.
pub fn to_utf8(bytes: &[u8], from: Charset) -> Result<String> {
    let (_, bytes) = split_bom(bytes, from);

    if from.is_utf8() {
        return String::from_utf8(bytes.to_vec()).map_err(|e| {
            Error::conversion(
                from.name(),
                "UTF-8",
                format!("invalid byte sequence at offset {}", e.utf8_error().valid_up_to()),
            )
        });
    }

    decode_strict(from.encoding(), bytes, true).map_err(|offset| {
        Error::conversion(from.name(), "UTF-8", format!("invalid byte sequence at offset {}", offset))
    })
}

/// Encode UTF-8 `text` into `to`
///
/// Never fails when `to` is UTF-8.
pub fn from_utf8(text: &str, to: Charset) -> Result<Vec<u8>> {
    let encoding = to.encoding();

    if to.is_utf8() {
        return Ok(text.as_bytes().to_vec());
    }
    if encoding == encoding_rs::UTF_16LE {
        return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if encoding == encoding_rs::UTF_16BE {
        return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }
    if encoding.output_encoding() != encoding {
        return Err(Error::conversion("UTF-8", to.name(), "charset can only be decoded"));
    }

    encode_strict(encoding, text).map_err(|c| {
        Error::conversion("UTF-8", to.name(), format!("unmappable character {:?} (U+{:04X})", c, c as u32))
    })
}

/// Convert `bytes` from one charset to another through UTF-8
///
/// Identical charsets return the input untouched.
pub fn convert(bytes: &[u8], from: Charset, to: Charset) -> Result<Vec<u8>> {
    if from == to {
        return Ok(bytes.to_vec());
    }
    let text = to_utf8(bytes, from)?;
    from_utf8(&text, to)
}

/// Decode without replacement, growing the output until the input is consumed
///
/// On failure returns the offset of the first malformed byte sequence.
pub(crate) fn decode_strict(encoding: &'static Encoding, bytes: &[u8], last: bool) -> std::result::Result<String, usize> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut output = String::with_capacity(bytes.len());
    let mut consumed = 0;

    loop {
        let (result, read) = decoder.decode_to_string_without_replacement(&bytes[consumed..], &mut output, last);
        consumed += read;

        match result {
            DecoderResult::InputEmpty => return Ok(output),
            DecoderResult::OutputFull => {
                let needed = decoder
                    .max_utf8_buffer_length_without_replacement(bytes.len() - consumed)
                    .unwrap_or(bytes.len() - consumed);
                output.reserve(needed.max(MIN_GROWTH));
            }
            DecoderResult::Malformed(bad, after) => {
                return Err(consumed.saturating_sub(bad as usize + after as usize));
            }
        }
    }
}

/// Encode without replacement, growing the output until the input is consumed
///
/// On failure returns the first character the target cannot represent.
fn encode_strict(encoding: &'static Encoding, text: &str) -> std::result::Result<Vec<u8>, char> {
    let mut encoder = encoding.new_encoder();
    let mut output = Vec::with_capacity(text.len());
    let mut consumed = 0;

    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(&text[consumed..], &mut output, true);
        consumed += read;

        match result {
            EncoderResult::InputEmpty => return Ok(output),
            EncoderResult::OutputFull => {
                let needed = encoder
                    .max_buffer_length_from_utf8_without_replacement(text.len() - consumed)
                    .unwrap_or(text.len() - consumed);
                output.reserve(needed.max(MIN_GROWTH));
            }
            EncoderResult::Unmappable(c) => return Err(c),
        }
    }
}
