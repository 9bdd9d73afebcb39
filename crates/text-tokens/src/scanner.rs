//! Character-level cursor over an in-memory text buffer.
//!
//! The scanner is the lowest layer of the stack: it knows nothing about
//! tokens, only about positional and delimited reads. Every higher layer
//! (word tokenizers, the HTML lexers, the ABNF grammar lexer) drives one
//! of these.
//!
//! Scanner operations never fail on end of input; they return whatever
//! they could read and leave the cursor where the read stopped. Callers
//! decide whether a short read is an error.

use std::io::Read;
use std::ops::RangeInclusive;

use memchr::memchr;
use memchr::memmem;

/// The whitespace characters recognized by [`Scanner::read_thru_whitespace`].
pub const WHITESPACE: &str = " \t\n\r\x0b\x0c";

/// Horizontal whitespace, recognized by [`Scanner::read_thru_hspace`].
pub const HORIZONTAL_SPACE: &str = " \t";

enum Needle<'a> {
    Delim(&'a str),
    Chars(&'a str),
    Ranges(&'a [RangeInclusive<char>]),
}

impl Needle<'_> {
    fn matches_at(&self, rest: &str) -> bool {
        match self {
            Needle::Delim(delim) => !delim.is_empty() && rest.starts_with(delim),
            Needle::Chars(chars) => rest.chars().next().is_some_and(|ch| chars.contains(ch)),
            Needle::Ranges(ranges) => rest
                .chars()
                .next()
                .is_some_and(|ch| ranges.iter().any(|range| range.contains(&ch))),
        }
    }
}

/// A seekable character cursor over an owned text buffer.
///
/// Positions are byte offsets into the UTF-8 buffer and always rest on a
/// character boundary. Reads are measured in characters.
///
/// ```
/// use text_tokens::Scanner;
///
/// let mut s = Scanner::new("before [[che baz]] after");
/// assert_eq!(s.read_to_delim("[["), "before ");
/// assert_eq!(s.read_until_delim("]]"), "[[che baz]]");
/// assert_eq!(s.readline(), " after");
/// ```
pub struct Scanner {
    buffer: Box<str>,
    offset: usize,
}

impl Scanner {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            buffer: buffer.into().into_boxed_str(),
            offset: 0,
        }
    }

    /// Creates a scanner positioned at `offset` instead of the buffer start.
    pub fn with_offset(buffer: impl Into<String>, offset: usize) -> Self {
        let mut scanner = Self::new(buffer);
        scanner.seek(offset);
        scanner
    }

    /// Decodes `bytes` as UTF-8, replacing invalid sequences with U+FFFD.
    pub fn from_utf8_lossy(bytes: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(bytes))
    }

    /// Drains a reader into an in-memory buffer, decoding lossily.
    pub fn from_reader(reader: &mut impl Read) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_utf8_lossy(&bytes))
    }

    /// The full underlying buffer.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// The unread remainder of the buffer.
    pub fn rest(&self) -> &str {
        &self.buffer[self.offset..]
    }

    /// Returns the character at the cursor without advancing.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Reads up to `count` characters.
    pub fn read(&mut self, count: usize) -> String {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .nth(count)
            .map(|(at, _)| at)
            .unwrap_or(rest.len());
        let out = rest[..len].to_string();
        self.offset += len;
        out
    }

    /// Consumes a maximal run of characters that are members of `chars`.
    ///
    /// ```
    /// use text_tokens::Scanner;
    ///
    /// let mut s = Scanner::new("12345 foo bar");
    /// assert_eq!(s.read_thru_chars("1234567890"), "12345");
    /// ```
    pub fn read_thru_chars(&mut self, chars: &str) -> String {
        self.read_thru_matching(|ch| chars.contains(ch))
    }

    /// Consumes a maximal run of characters satisfying `matches`.
    pub fn read_thru_matching(&mut self, matches: impl Fn(char) -> bool) -> String {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, ch)| !matches(ch))
            .map(|(at, _)| at)
            .unwrap_or(rest.len());
        let out = rest[..len].to_string();
        self.offset += len;
        out
    }

    pub fn read_thru_whitespace(&mut self) -> String {
        self.read_thru_chars(WHITESPACE)
    }

    pub fn read_to_whitespace(&mut self) -> String {
        self.read_to_chars(WHITESPACE)
    }

    /// Consumes horizontal whitespace (space and tab).
    pub fn read_thru_hspace(&mut self) -> String {
        self.read_thru_chars(HORIZONTAL_SPACE)
    }

    pub fn read_to_hspace(&mut self) -> String {
        self.read_to_chars(HORIZONTAL_SPACE)
    }

    /// Consumes characters up to, but not including, the first unescaped
    /// occurrence of `delim`.
    ///
    /// A `\` at the cursor consumes itself and the following character
    /// verbatim into the result; the escaped character never participates
    /// in a delimiter match. The scan ends quietly at end of input.
    pub fn read_to_delim(&mut self, delim: &str) -> String {
        self.scan_to(&Needle::Delim(delim))
    }

    /// Like [`Scanner::read_to_delim`] but stops at any character in `chars`.
    pub fn read_to_chars(&mut self, chars: &str) -> String {
        self.scan_to(&Needle::Chars(chars))
    }

    /// Like [`Scanner::read_to_chars`] with the set given as character ranges.
    pub fn read_to_chars_in(&mut self, ranges: &[RangeInclusive<char>]) -> String {
        self.scan_to(&Needle::Ranges(ranges))
    }

    /// Consumes characters up to and including the first unescaped
    /// occurrence of `delim`.
    pub fn read_until_delim(&mut self, delim: &str) -> String {
        let mut out = self.read_to_delim(delim);
        out.push_str(&self.read(delim.chars().count()));
        out
    }

    /// Repeats [`Scanner::read_until_delim`] `count` times, concatenating.
    pub fn read_until_delim_count(&mut self, delim: &str, count: usize) -> String {
        let mut out = String::new();
        for _ in 0..count {
            out.push_str(&self.read_until_delim(delim));
        }
        out
    }

    pub fn read_until_chars(&mut self, chars: &str) -> String {
        let mut out = self.read_to_chars(chars);
        out.push_str(&self.read(1));
        out
    }

    /// Consumes up to and including `delim`, treating `"…"` and `'…'` runs
    /// as opaque so a delimiter inside a quoted string does not end the
    /// read. Used for markup where `>` may appear in attribute values.
    pub fn read_until_delim_unquoted(&mut self, delim: &str) -> String {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => break,
                Some(quote @ ('"' | '\'')) => {
                    out.push_str(&self.read(1));
                    out.push_str(&self.read_to_chars(&quote.to_string()));
                    out.push_str(&self.read(1));
                }
                Some(_) => {
                    if self.rest().starts_with(delim) && !delim.is_empty() {
                        out.push_str(&self.read(delim.chars().count()));
                        break;
                    }
                    out.push_str(&self.read(1));
                }
            }
        }
        out
    }

    pub fn read_to_newline(&mut self) -> String {
        self.read_to_chars("\n")
    }

    pub fn read_until_newline(&mut self) -> String {
        self.read_until_chars("\n")
    }

    /// Reads through the next newline, or to the end of the buffer.
    /// No escape handling, matching ordinary line semantics.
    pub fn readline(&mut self) -> String {
        let rest = self.rest();
        let len = match memchr(b'\n', rest.as_bytes()) {
            Some(at) => at + 1,
            None => rest.len(),
        };
        let out = rest[..len].to_string();
        self.offset += len;
        out
    }

    fn scan_to(&mut self, needle: &Needle<'_>) -> String {
        let mut out = String::new();
        loop {
            let rest = self.rest();
            let Some(ch) = rest.chars().next() else { break };

            if ch == '\\' {
                out.push(ch);
                self.offset += 1;
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.offset += escaped.len_utf8();
                }
                continue;
            }

            if needle.matches_at(rest) {
                break;
            }

            // for a substring delimiter, jump straight to the next possible
            // match or escape instead of stepping a character at a time
            if let Needle::Delim(delim) = needle {
                if !delim.is_empty() {
                    let bytes = rest.as_bytes();
                    let hit = memmem::find(bytes, delim.as_bytes()).unwrap_or(rest.len());
                    let esc = memchr(b'\\', bytes).unwrap_or(rest.len());
                    let stop = hit.min(esc);
                    if stop > 0 {
                        out.push_str(&rest[..stop]);
                        self.offset += stop;
                        continue;
                    }
                }
            }

            out.push(ch);
            self.offset += ch.len_utf8();
        }
        out
    }

    /// The cursor's byte offset.
    pub fn tell(&self) -> usize {
        self.offset
    }

    /// Moves the cursor to `offset`, clamped to the buffer and snapped
    /// back to the nearest character boundary. Returns the new offset.
    pub fn seek(&mut self, offset: usize) -> usize {
        let mut at = offset.min(self.buffer.len());
        while !self.buffer.is_char_boundary(at) {
            at -= 1;
        }
        self.offset = at;
        at
    }

    /// The byte length of the whole buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether any input remains at the cursor.
    pub fn has_remaining(&self) -> bool {
        self.offset < self.buffer.len()
    }

    /// Runs `f`; if it returns `Err` the cursor is restored to where it
    /// was when the transaction began, and the error propagates.
    /// Transactions nest: an inner rollback leaves an outer transaction's
    /// saved position untouched.
    pub fn transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let start = self.offset;
        let result = f(self);
        if result.is_err() {
            self.offset = start;
        }
        result
    }

    /// Runs `f` and always restores the cursor afterwards. Use this to
    /// look ahead ephemerally.
    pub fn temporary<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let start = self.offset;
        let out = f(self);
        self.offset = start;
        out
    }

    /// The character starting at byte offset `at`, which must be a
    /// character boundary.
    pub(crate) fn char_at(&self, at: usize) -> Option<char> {
        self.buffer[at..].chars().next()
    }

    /// The byte offset of the character immediately before `at`, or
    /// `None` at the buffer start.
    pub(crate) fn prev_boundary(&self, at: usize) -> Option<usize> {
        if at == 0 {
            return None;
        }
        let mut p = at - 1;
        while !self.buffer.is_char_boundary(p) {
            p -= 1;
        }
        Some(p)
    }
}
