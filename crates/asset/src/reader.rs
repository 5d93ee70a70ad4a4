//! Whitespace tokenizer and line reader shared by the OBJ and MTL parsers.
//!
//! Formatted reads follow `scanf` rules: whitespace (newlines included)
//! collapses, each numeric field consumes the longest numeric prefix of the
//! next token, and a field that does not match is left at zero without
//! consuming anything.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::error::{AssetError, AssetResult};

pub struct TokenReader<R> {
    reader: R,
    path: PathBuf,
    bytes: Vec<u8>,
    line: String,
    cursor: usize,
    line_no: usize,
    eof: bool,
}

impl TokenReader<BufReader<File>> {
    /// Open a file for tokenized reading.
    pub fn open(path: impl AsRef<Path>) -> AssetResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| AssetError::open(path, e))?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<'a> TokenReader<io::Cursor<&'a [u8]>> {
    /// Tokenize an in-memory string.
    pub fn from_text(contents: &'a str) -> Self {
        Self::new(io::Cursor::new(contents.as_bytes()), "<memory>")
    }
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
            bytes: Vec::with_capacity(256),
            line: String::with_capacity(256),
            cursor: 0,
            line_no: 0,
            eof: false,
        }
    }

    /// Path used in diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based number of the line currently being read (0 before the first read).
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Next whitespace-delimited token, or `None` at end of input.
    pub fn next_token(&mut self) -> AssetResult<Option<String>> {
        if !self.skip_whitespace()? {
            return Ok(None);
        }
        let rest = self.rest();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = rest[..end].to_owned();
        self.cursor += end;
        Ok(Some(token))
    }

    /// Remainder of the current line without its line terminator. When the
    /// current line is exhausted the next whole line is returned instead.
    pub fn next_line(&mut self) -> AssetResult<Option<String>> {
        if self.cursor >= self.line.len() && !self.fill_line()? {
            return Ok(None);
        }
        let line = self.rest().trim_end_matches(['\r', '\n']).to_owned();
        self.cursor = self.line.len();
        Ok(Some(line))
    }

    /// Discard whatever is left on the current line.
    pub fn skip_line(&mut self) {
        self.cursor = self.line.len();
    }

    /// Read up to `N` floats. Fields after the first mismatch stay `0.0`.
    pub fn read_floats<const N: usize>(&mut self) -> AssetResult<[f32; N]> {
        let mut out = [0.0; N];
        for slot in &mut out {
            match self.scan::<f32>(float_prefix_len)? {
                Some(v) => *slot = v,
                None => break,
            }
        }
        Ok(out)
    }

    /// Read one float, `None` if the next token is not numeric.
    pub fn read_float(&mut self) -> AssetResult<Option<f32>> {
        self.scan(float_prefix_len)
    }

    /// Read one integer, `None` if the next token is not numeric.
    pub fn read_int(&mut self) -> AssetResult<Option<i32>> {
        self.scan(int_prefix_len)
    }

    fn scan<T: FromStr>(&mut self, prefix_len: fn(&str) -> usize) -> AssetResult<Option<T>> {
        if !self.skip_whitespace()? {
            return Ok(None);
        }
        let rest = self.rest();
        let len = prefix_len(rest);
        if len == 0 {
            return Ok(None);
        }
        let value = rest[..len].parse().ok();
        if value.is_some() {
            self.cursor += len;
        }
        Ok(value)
    }

    fn rest(&self) -> &str {
        &self.line[self.cursor..]
    }

    /// Advance past whitespace, pulling in new lines as needed.
    /// Returns `false` once input is exhausted.
    fn skip_whitespace(&mut self) -> AssetResult<bool> {
        loop {
            let rest = self.rest();
            let skipped = rest.len() - rest.trim_start().len();
            let at_token = skipped < rest.len();
            self.cursor += skipped;
            if at_token {
                return Ok(true);
            }
            if !self.fill_line()? {
                return Ok(false);
            }
        }
    }

    fn fill_line(&mut self) -> AssetResult<bool> {
        self.line.clear();
        self.cursor = 0;
        if self.eof {
            return Ok(false);
        }

        self.bytes.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.bytes)
            .map_err(|source| AssetError::Read {
                path: self.path.clone(),
                line: self.line_no + 1,
                source,
            })?;
        if read == 0 {
            self.eof = true;
            return Ok(false);
        }

        // Non-UTF-8 bytes (legacy exporters) only ever appear in names and comments.
        self.line.push_str(&String::from_utf8_lossy(&self.bytes));
        self.line_no += 1;
        Ok(true)
    }
}

/// Length of the longest prefix of `s` that `strtof` would accept.
/// The `nan(chars)` payload form is not consumed past `nan`.
fn float_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    if matches!(b.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    for word in ["infinity", "inf", "nan"] {
        let end = i + word.len();
        if b.get(i..end).is_some_and(|w| w.eq_ignore_ascii_case(word.as_bytes())) {
            return end;
        }
    }

    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if b.get(i) == Some(&b'.') {
        let mut j = i + 1;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - (i + 1);
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return 0;
    }

    if matches!(b.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(b.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

fn int_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    let sign = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let digits = b[sign..].iter().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 { 0 } else { sign + digits }
}
