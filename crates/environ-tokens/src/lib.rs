//! Tokenizes environment files into name/value pairs.
//!
//! An environment file holds `NAME=VALUE` lines. The tokenizer skips
//! `#` comments and blank lines, ignores `export ` prefixes, handles
//! single- and double-quoted values, joins `\`-continued lines, and
//! interpolates `$VAR` / `${VAR}` references against a provided map.
//!
//! ```
//! use environ_tokens::EnvironTokenizer;
//! use text_tokens::TokenStream;
//!
//! let mut vars = EnvironTokenizer::new("# settings\nexport NAME=value\n");
//! let token = vars.next_token().unwrap();
//! assert_eq!(token.name, "NAME");
//! assert_eq!(token.value, "value");
//! ```

use std::collections::HashMap;

use text_tokens::{Scanner, Span, Spanned, TokenError, TokenStream};

/// A parsed environment variable: its name, its value, and the offsets
/// where the name started and the value stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironToken {
    pub name: String,
    pub value: String,
    pub start: usize,
    pub stop: usize,
}

impl Spanned for EnvironToken {
    fn span(&self) -> Span {
        Span::new(self.start, self.stop)
    }
}

/// Parses an environment-file buffer into [`EnvironToken`]s.
pub struct EnvironTokenizer {
    scanner: Scanner,
    environ: Option<HashMap<String, String>>,
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

impl EnvironTokenizer {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            scanner: Scanner::new(buffer),
            environ: None,
        }
    }

    /// Like [`EnvironTokenizer::new`], with a map used to resolve
    /// `$VAR` / `${VAR}` interpolations. Without one, interpolations
    /// resolve to nothing.
    pub fn with_environ(buffer: impl Into<String>, environ: HashMap<String, String>) -> Self {
        Self {
            scanner: Scanner::new(buffer),
            environ: Some(environ),
        }
    }

    fn interpolate(&self, name: &str) -> &str {
        self.environ
            .as_ref()
            .and_then(|environ| environ.get(name))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Scans forward to the next variable name, skipping comments,
    /// whitespace, and `export` markers. Returns the name and the
    /// offset where it began.
    fn scan_name(&mut self) -> Result<(String, usize), TokenError> {
        loop {
            let start = self.scanner.tell();
            let ch = self.scanner.read(1);

            match ch.chars().next() {
                None => return Err(TokenError::EndOfTokens),

                Some('#') => {
                    self.scanner.readline();
                }

                Some(ch) if ch.is_whitespace() => {
                    self.scanner.read_thru_whitespace();
                }

                Some(ch) if ch.is_ascii_alphabetic() => {
                    let mut name = String::from(ch);
                    name.push_str(&self.scanner.read_thru_matching(is_name_char));

                    if name == "export" {
                        self.scanner.read_thru_whitespace();
                        continue;
                    }

                    return Ok((name, start));
                }

                Some(ch) => {
                    return Err(TokenError::InvalidInput {
                        offset: start,
                        message: format!("unexpected character [{ch}] in a variable name"),
                    })
                }
            }
        }
    }

    fn scan_value(&mut self) -> Result<String, TokenError> {
        let equals = self.scanner.read(1);
        if equals != "=" {
            return Err(TokenError::InvalidInput {
                offset: self.scanner.tell(),
                message: format!("expected [=] but got [{equals}]"),
            });
        }

        let mut value = String::new();
        // the quote character currently holding the value open, if any
        let mut sentinel: Option<char> = None;
        let mut multiline = false;

        loop {
            let ch = self.scanner.read(1);
            let Some(ch) = ch.chars().next() else { break };

            match ch {
                '\\' => {
                    multiline = true;
                    let escaped = self.scanner.read(1);
                    match escaped.chars().next() {
                        Some(next) if next.is_whitespace() => {
                            // a continuation: collapse the break into a
                            // single joining space
                            self.scanner.read_thru_whitespace();
                            if !value.ends_with(' ') {
                                value.push(' ');
                            }
                        }
                        Some(next) => value.push(next),
                        None => {}
                    }
                }

                '"' | '\'' => {
                    if sentinel == Some(ch) {
                        sentinel = None;
                    } else if sentinel.is_none() {
                        sentinel = Some(ch);
                    } else {
                        value.push(ch);
                    }
                }

                '$' => {
                    let marker = self.scanner.read(1);
                    let name = match marker.chars().next() {
                        Some('{') => {
                            let name = self.scanner.read_to_delim("}");
                            self.scanner.read_thru_chars("}");
                            name
                        }
                        Some(first) => {
                            let mut name = String::from(first);
                            name.push_str(&self.scanner.read_thru_matching(is_name_char));
                            name
                        }
                        None => break,
                    };
                    value.push_str(self.interpolate(&name));
                }

                '#' => {
                    if sentinel.is_some() {
                        value.push(ch);
                    } else {
                        // the rest of the line is a comment
                        self.scanner.readline();
                        if multiline {
                            self.scanner.read_thru_whitespace();
                            multiline = false;
                        } else {
                            break;
                        }
                    }
                }

                '\n' => break,

                _ => value.push(ch),
            }
        }

        Ok(value)
    }
}

impl TokenStream for EnvironTokenizer {
    type Token = EnvironToken;

    fn next_token(&mut self) -> Result<EnvironToken, TokenError> {
        let (name, start) = self.scan_name()?;
        let value = self.scan_value()?;

        Ok(EnvironToken {
            name,
            value,
            start,
            stop: self.scanner.tell(),
        })
    }

    fn prev_token(&mut self) -> Result<EnvironToken, TokenError> {
        Err(TokenError::Unsupported)
    }

    fn buffer_tell(&self) -> usize {
        self.scanner.tell()
    }

    fn buffer_seek(&mut self, offset: usize) -> usize {
        self.scanner.seek(offset)
    }
}
