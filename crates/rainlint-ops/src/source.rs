//! Reading skin files from disk.
//!
//! Skins are usually UTF-8, optionally with a byte order mark, but the skin
//! engine also reads UTF-16 files that start with one. The decoded text never
//! contains the mark; [`SourceEncoding::encode`] puts it back when a file is
//! rewritten.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Byte-level layout a skin file was read with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl SourceEncoding {
    /// Encode `text` the same way the file was originally stored.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            SourceEncoding::Utf8 => text.as_bytes().to_vec(),
            SourceEncoding::Utf8Bom => [UTF8_BOM, text.as_bytes()].concat(),
            SourceEncoding::Utf16Le => UTF16_LE_BOM
                .iter()
                .copied()
                .chain(text.encode_utf16().flat_map(u16::to_le_bytes))
                .collect(),
            SourceEncoding::Utf16Be => UTF16_BE_BOM
                .iter()
                .copied()
                .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
                .collect(),
        }
    }
}

/// Decoded file contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceText {
    pub text: String,
    pub encoding: SourceEncoding,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("not valid UTF-8 and no UTF-16 byte order mark")]
    NotUtf8,

    #[error("UTF-16 data ends in the middle of a code unit")]
    TruncatedUtf16,

    #[error("invalid UTF-16 data")]
    InvalidUtf16,
}

/// Read and decode the skin file at `path`.
pub fn read_source(path: &Path) -> Result<SourceText, SourceError> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

/// Decode raw file bytes, honouring a leading byte order mark.
pub fn decode(bytes: &[u8]) -> Result<SourceText, SourceError> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return utf8(rest, SourceEncoding::Utf8Bom);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return utf16(rest, u16::from_le_bytes, SourceEncoding::Utf16Le);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return utf16(rest, u16::from_be_bytes, SourceEncoding::Utf16Be);
    }
    utf8(bytes, SourceEncoding::Utf8)
}

fn utf8(bytes: &[u8], encoding: SourceEncoding) -> Result<SourceText, SourceError> {
    let text = std::str::from_utf8(bytes).map_err(|_| SourceError::NotUtf8)?;
    Ok(SourceText {
        text: text.to_string(),
        encoding,
    })
}

fn utf16(
    bytes: &[u8],
    unit: fn([u8; 2]) -> u16,
    encoding: SourceEncoding,
) -> Result<SourceText, SourceError> {
    if bytes.len() % 2 != 0 {
        return Err(SourceError::TruncatedUtf16);
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16(&units).map_err(|_| SourceError::InvalidUtf16)?;
    Ok(SourceText { text, encoding })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_bom_is_stripped_and_restored() {
        let decoded = decode(b"\xEF\xBB\xBF[Rainmeter]\n").expect("decode");
        assert_eq!(decoded.text, "[Rainmeter]\n");
        assert_eq!(decoded.encoding, SourceEncoding::Utf8Bom);
        assert_eq!(
            decoded.encoding.encode("[Variables]\n"),
            b"\xEF\xBB\xBF[Variables]\n".to_vec()
        );
    }

    #[test]
    fn utf16_files_with_a_bom_are_decoded() {
        let little = SourceEncoding::Utf16Le.encode("[Rainmeter]\nText=Grüße\n");
        let decoded = decode(&little).expect("decode utf-16le");
        assert_eq!(decoded.text, "[Rainmeter]\nText=Grüße\n");
        assert_eq!(decoded.encoding, SourceEncoding::Utf16Le);

        let big = SourceEncoding::Utf16Be.encode("[Variables]\n");
        assert_eq!(&big[..4], &[0xFE, 0xFF, 0x00, b'[']);
        assert_eq!(decode(&big).expect("decode utf-16be").text, "[Variables]\n");
    }

    #[test]
    fn undecodable_bytes_are_errors() {
        assert!(matches!(decode(b"Text=\xFF\x00"), Err(SourceError::NotUtf8)));
        assert!(matches!(
            decode(&[0xFF, 0xFE, b'[']),
            Err(SourceError::TruncatedUtf16)
        ));
        assert!(matches!(
            decode(&[0xFF, 0xFE, 0x00, 0xD8]),
            Err(SourceError::InvalidUtf16)
        ));
    }

    #[test]
    fn plain_utf8_round_trips() {
        let decoded = decode("Text=Grüße".as_bytes()).expect("decode");
        assert_eq!(decoded.encoding, SourceEncoding::Utf8);
        assert_eq!(decoded.encoding.encode(&decoded.text), "Text=Grüße".as_bytes());
    }
}
