use std::path::{Path, PathBuf};

use anyhow::Result;
use encoding_rs::{Encoding, WINDOWS_1251, WINDOWS_1252};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode {0} with any supported legacy encoding")]
    UnsupportedEncoding(PathBuf),
}

// PMZ archives predate Unicode adoption. Files in the wild are windows-1251,
// with the odd map authored in latin-1 (windows-1252 per the WHATWG tables)
// or plain ASCII.
const LEGACY_ENCODINGS: [&Encoding; 2] = [WINDOWS_1251, WINDOWS_1252];

/// Reads a text file, trying each legacy encoding in order. Line endings are
/// normalized; the trailing newline doesn't produce an empty last line.
pub fn read_all_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs_err::read(path)?;
    let text = decode(&bytes).ok_or_else(|| DecodeError::UnsupportedEncoding(path.to_path_buf()))?;
    Ok(text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(|l| l.to_string())
        .collect())
}

fn decode(bytes: &[u8]) -> Option<String> {
    for encoding in LEGACY_ENCODINGS {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Some(text.into_owned());
        }
    }
    if bytes.is_ascii() {
        return Some(String::from_utf8_lossy(bytes).into_owned());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_windows_1251() {
        // "Метро" in windows-1251
        let bytes = [0xCC, 0xE5, 0xF2, 0xF0, 0xEE];
        assert_eq!(decode(&bytes).unwrap(), "Метро");
    }

    #[test]
    fn decodes_plain_ascii() {
        assert_eq!(decode(b"Metro").unwrap(), "Metro");
    }
}
