//! Write payload sources.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// How a payload file is cut into individual writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Delimiter {
    /// Whole file is one payload
    #[default]
    Eof,
    Separator(String),
}

impl Delimiter {
    /// `"EOF"` means whole file, anything else is a separator.
    pub fn parse(s: &str) -> Self {
        if s == "EOF" {
            Self::Eof
        } else {
            Self::Separator(s.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    Inline(Vec<String>),
    Files {
        paths: Vec<PathBuf>,
        delimiter: Delimiter,
    },
}

impl PayloadSource {
    /// Inline data wins over files when both are given.
    pub fn choose(data: Vec<String>, files: Vec<PathBuf>, delimiter: Delimiter) -> Self {
        if data.is_empty() {
            Self::Files {
                paths: files,
                delimiter,
            }
        } else {
            Self::Inline(data)
        }
    }

    pub fn load(&self) -> Result<Vec<Vec<u8>>> {
        match self {
            Self::Inline(data) => Ok(data.iter().map(|s| s.as_bytes().to_vec()).collect()),
            Self::Files { paths, delimiter } => {
                let mut payloads = Vec::new();
                for path in paths {
                    debug!("Reading payload file: {}", path.display());
                    let contents = fs::read(path)
                        .with_context(|| format!("Failed to read payload file {}", path.display()))?;
                    match delimiter {
                        Delimiter::Eof => payloads.push(contents),
                        Delimiter::Separator(sep) => {
                            payloads.extend(split_bytes(&contents, sep.as_bytes()))
                        }
                    }
                }
                debug!("Loaded {} payloads", payloads.len());
                Ok(payloads)
            }
        }
    }
}

/// Cut `data` at every occurrence of `sep`. An empty separator keeps the
/// data whole.
fn split_bytes(data: &[u8], sep: &[u8]) -> Vec<Vec<u8>> {
    if sep.is_empty() {
        return vec![data.to_vec()];
    }
    let mut parts = Vec::new();
    let mut rest = data;
    while let Some(pos) = rest.windows(sep.len()).position(|w| w == sep) {
        parts.push(rest[..pos].to_vec());
        rest = &rest[pos + sep.len()..];
    }
    parts.push(rest.to_vec());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ble_suite_payload_{}_{}",
            std::process::id(),
            name
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_inline_takes_precedence() {
        let source = PayloadSource::choose(
            vec!["abc".into()],
            vec![PathBuf::from("/nonexistent")],
            Delimiter::Eof,
        );
        assert_eq!(source.load().unwrap(), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_whole_file_payloads() {
        let a = temp_file("eof_a", "first,part");
        let b = temp_file("eof_b", "second");
        let source = PayloadSource::choose(vec![], vec![a.clone(), b.clone()], Delimiter::parse("EOF"));
        assert_eq!(
            source.load().unwrap(),
            vec![b"first,part".to_vec(), b"second".to_vec()]
        );
        let _ = fs::remove_file(a);
        let _ = fs::remove_file(b);
    }

    #[test]
    fn test_separated_payloads() {
        let a = temp_file("sep_a", "one,two");
        let b = temp_file("sep_b", "three");
        let source = PayloadSource::Files {
            paths: vec![a.clone(), b.clone()],
            delimiter: Delimiter::parse(","),
        };
        assert_eq!(
            source.load().unwrap(),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
        let _ = fs::remove_file(a);
        let _ = fs::remove_file(b);
    }

    #[test]
    fn test_binary_file_payloads() {
        let a = temp_file("bin_eof", [0x01, 0xff, 0xfe, 0x00]);
        let whole = PayloadSource::Files {
            paths: vec![a.clone()],
            delimiter: Delimiter::Eof,
        };
        assert_eq!(whole.load().unwrap(), vec![vec![0x01, 0xff, 0xfe, 0x00]]);

        let b = temp_file("bin_sep", [0xff, 0xfe, b'|', b'|', 0x00, b'|', b'|', 0x80]);
        let split = PayloadSource::Files {
            paths: vec![b.clone()],
            delimiter: Delimiter::parse("||"),
        };
        assert_eq!(
            split.load().unwrap(),
            vec![vec![0xff, 0xfe], vec![0x00], vec![0x80]]
        );
        let _ = fs::remove_file(a);
        let _ = fs::remove_file(b);
    }

    #[test]
    fn test_split_bytes_edges() {
        assert_eq!(split_bytes(b",a,", b","), vec![vec![], b"a".to_vec(), vec![]]);
        assert_eq!(split_bytes(b"abc", b""), vec![b"abc".to_vec()]);
        assert_eq!(split_bytes(b"", b","), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let source = PayloadSource::Files {
            paths: vec![PathBuf::from("/definitely/not/here")],
            delimiter: Delimiter::Eof,
        };
        assert!(source.load().is_err());
    }
}
