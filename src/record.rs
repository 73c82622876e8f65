//! Candidate records as written by the indexing tool's text export:
//!
//! ```text
//! -rw-rw---- alice staff 232.791 KB Nov 21 2019 15:48 /scratch/alice/run/out.dat
//! ```
//!
//! Fields are whitespace delimited and the owning user is always the second token.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::{Error, Result};

/// Index of the first token that may begin the file path.
const PATH_TOKEN_MIN: usize = 4;

fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(u8::is_ascii_whitespace).filter(|t| !t.is_empty())
}

/// Owning user of a record line. Only the owner token has to be UTF-8; the
/// rest of the line is kept as raw bytes.
pub fn owner(line: &[u8]) -> Option<&str> {
    tokens(line)
        .nth(1)
        .and_then(|token| std::str::from_utf8(token).ok())
}

/// Absolute path of a record line: the rest of the line starting at the first
/// token that begins with `/`, so paths containing spaces survive.
pub fn file_path(line: &[u8]) -> Option<&Path> {
    let line = trim_newline(line);
    let mut index = 0;
    let mut pos = 0;

    while pos < line.len() {
        if line[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if index >= PATH_TOKEN_MIN && line[pos] == b'/' {
            return Some(Path::new(OsStr::from_bytes(&line[pos..])));
        }
        while pos < line.len() && !line[pos].is_ascii_whitespace() {
            pos += 1;
        }
        index += 1;
    }
    None
}

/// True for an empty or whitespace-only line.
pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn trim_newline(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line
}

/// Like [`owner`] but reports the failing location.
pub fn require_owner<'a>(line: &'a [u8], file: &Path, line_no: usize) -> Result<&'a str> {
    owner(line).ok_or_else(|| Error::MalformedRecord {
        file: file.to_path_buf(),
        line: line_no,
        content: String::from_utf8_lossy(line).trim_end().to_string(),
    })
}
