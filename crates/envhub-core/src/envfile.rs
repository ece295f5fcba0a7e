//! `.env` file codec
//!
//! Converts between the `KEY=VALUE` text format and [`EnvVarSet`].
//!
//! Parsing rules:
//! - blank lines and lines starting with `#` (after trimming) are skipped
//! - every other line must contain `=`; the key is the text before the
//!   first `=`, the value is everything after it, both trimmed
//! - a duplicate key keeps its first position and takes the last value
//!
//! Serialization writes values verbatim with no quoting. A value holding a
//! raw newline will not survive a round-trip.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::EnvVarSet;

/// Errors reading or writing `.env` files
#[derive(Error, Debug)]
pub enum EnvFileError {
    /// A non-comment line without `=`, or with an empty key
    #[error("Malformed line {line_number}: '{line}' (expected KEY=VALUE)")]
    MalformedLine { line_number: usize, line: String },

    /// Input file does not exist
    #[error("File '{path}' not found")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EnvFileError {
    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            EnvFileError::MalformedLine { .. } => {
                Some("Each line must be KEY=VALUE. Prefix comments with '#'.")
            }
            EnvFileError::FileNotFound { .. } => {
                Some("Pass the path to your .env file with --file.")
            }
            _ => None,
        }
    }
}

/// Parse `.env` text into an ordered variable set
///
/// Fails on the first malformed line; no partial result is returned.
pub fn parse(text: &str) -> Result<EnvVarSet, EnvFileError> {
    let mut vars = EnvVarSet::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(EnvFileError::MalformedLine {
                line_number: idx + 1,
                line: line.to_string(),
            });
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(EnvFileError::MalformedLine {
                line_number: idx + 1,
                line: line.to_string(),
            });
        }

        vars.insert(key.to_string(), value.trim().to_string());
    }

    Ok(vars)
}

/// Serialize a variable set as `KEY=VALUE` lines
pub fn serialize(vars: &EnvVarSet) -> String {
    let mut out = String::new();
    for (key, value) in vars {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Read and parse a `.env` file
pub fn read_file(path: &Path) -> Result<EnvVarSet, EnvFileError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EnvFileError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => EnvFileError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    parse(&text)
}

/// Serialize and write a variable set to a file
pub fn write_file(path: &Path, vars: &EnvVarSet) -> Result<(), EnvFileError> {
    fs::write(path, serialize(vars)).map_err(|e| EnvFileError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> EnvVarSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_simple() {
        let parsed = parse("A=1\nB=2\n").unwrap();
        assert_eq!(parsed, vars(&[("A", "1"), ("B", "2")]));
    }

    #[test]
    fn test_parse_last_assignment_wins() {
        let parsed = parse("A=1\nA=2\n").unwrap();
        assert_eq!(parsed, vars(&[("A", "2")]));
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_duplicate_keeps_first_position() {
        let parsed = parse("A=1\nB=2\nA=3\n").unwrap();
        let keys: Vec<_> = parsed.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(parsed["A"], "3");
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        let parsed = parse("\n# comment\nA=1\n").unwrap();
        assert_eq!(parsed, vars(&[("A", "1")]));

        let parsed = parse("   \n   # indented comment\n\tB = two \n").unwrap();
        assert_eq!(parsed, vars(&[("B", "two")]));
    }

    #[test]
    fn test_parse_value_keeps_equals() {
        let parsed = parse("URL=postgres://u:p@h/db?sslmode=require\n").unwrap();
        assert_eq!(parsed["URL"], "postgres://u:p@h/db?sslmode=require");

        let parsed = parse("TOKEN=abc==\n").unwrap();
        assert_eq!(parsed["TOKEN"], "abc==");
    }

    #[test]
    fn test_parse_empty_value() {
        let parsed = parse("EMPTY=\n").unwrap();
        assert_eq!(parsed["EMPTY"], "");
    }

    #[test]
    fn test_parse_malformed_line() {
        let err = parse("BAD_LINE\n").unwrap_err();
        match err {
            EnvFileError::MalformedLine { line_number, line } => {
                assert_eq!(line_number, 1);
                assert_eq!(line, "BAD_LINE");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_aborts_whole_parse() {
        let err = parse("A=1\n# ok\nnope\nB=2\n").unwrap_err();
        assert!(matches!(
            err,
            EnvFileError::MalformedLine { line_number: 3, .. }
        ));
    }

    #[test]
    fn test_parse_empty_key_is_malformed() {
        let err = parse("=value\n").unwrap_err();
        assert!(matches!(err, EnvFileError::MalformedLine { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_parse_crlf() {
        let parsed = parse("A=1\r\nB=2\r\n").unwrap();
        assert_eq!(parsed, vars(&[("A", "1"), ("B", "2")]));
    }

    #[test]
    fn test_serialize_order_and_format() {
        let set = vars(&[("Z", "last"), ("A", "x=y"), ("M", "")]);
        assert_eq!(serialize(&set), "Z=last\nA=x=y\nM=\n");
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize(&EnvVarSet::new()), "");
    }

    #[test]
    fn test_round_trip() {
        let set = vars(&[
            ("DATABASE_URL", "postgres://localhost/app?a=b"),
            ("API_KEY", "sk-123"),
            ("EMPTY", ""),
            ("WITH_HASH", "abc#def"),
        ]);
        assert_eq!(parse(&serialize(&set)).unwrap(), set);
    }

    #[test]
    fn test_read_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.env");

        let err = read_file(&missing).unwrap_err();
        assert!(matches!(err, EnvFileError::FileNotFound { .. }));
        assert!(err.to_string().contains("missing.env"));
    }

    #[test]
    fn test_write_then_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        let set = vars(&[("A", "1"), ("B", "two words")]);

        write_file(&path, &set).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A=1\nB=two words\n");
        assert_eq!(read_file(&path).unwrap(), set);
    }
}
