//! Delimiter-driven word tokenization.
//!
//! A [`WordTokenizer`] splits a buffer into tokens separated by a
//! delimiter predicate, keeping the delimiter runs on both sides of each
//! token so the original buffer can be reconstructed from the stream.
//! [`StopWordTokenizer`] layers a stop-word filter on top.

use std::fmt;

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use crate::scanner::Scanner;
use crate::tokenizer::{Span, Spanned, TokenError, TokenStream};

/// Decides which characters separate words.
pub enum Delimiters {
    /// Any character in the set is a delimiter.
    Chars(FxHashSet<char>),
    /// The predicate decides per character.
    Predicate(Box<dyn Fn(char) -> bool>),
}

impl Delimiters {
    pub fn chars(chars: &str) -> Self {
        Self::Chars(chars.chars().collect())
    }

    pub fn predicate(predicate: impl Fn(char) -> bool + 'static) -> Self {
        Self::Predicate(Box::new(predicate))
    }

    fn is_delim(&self, ch: char) -> bool {
        match self {
            Self::Chars(chars) => chars.contains(&ch),
            Self::Predicate(predicate) => predicate(ch),
        }
    }
}

impl Default for Delimiters {
    /// ASCII whitespace plus ASCII punctuation.
    fn default() -> Self {
        Self::predicate(|ch| ch.is_ascii_whitespace() || ch.is_ascii_punctuation())
    }
}

/// A word together with the delimiter runs on either side of it.
///
/// `ldelim` is absent when the token begins the buffer, `rdelim` when it
/// ends it. Delimiter tokens are leaves: they carry text and a span but
/// no delimiters of their own. Adjacent tokens share the delimiter run
/// between them; one token's `rdelim` is the next token's `ldelim`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordToken {
    pub text: String,
    pub start: usize,
    pub stop: usize,
    pub ldelim: Option<Box<WordToken>>,
    pub rdelim: Option<Box<WordToken>>,
}

impl WordToken {
    fn leaf(text: String, start: usize, stop: usize) -> Self {
        Self {
            text,
            start,
            stop,
            ldelim: None,
            rdelim: None,
        }
    }
}

impl Spanned for WordToken {
    fn span(&self) -> Span {
        Span::new(self.start, self.stop)
    }
}

impl fmt::Display for WordToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Segments text into `(ldelim, text, rdelim)` triples.
pub struct WordTokenizer {
    scanner: Scanner,
    delims: Delimiters,
}

impl WordTokenizer {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self::with_delimiters(buffer, Delimiters::default())
    }

    pub fn with_delimiters(buffer: impl Into<String>, delims: Delimiters) -> Self {
        Self {
            scanner: Scanner::new(buffer),
            delims,
        }
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn is_delim_char(&self, ch: char) -> bool {
        self.delims.is_delim(ch)
    }

    /// Finds the starting offset of the current token's left-delimiter
    /// run without moving the cursor. `None` means the token touches the
    /// buffer start and has no left delimiter.
    ///
    /// When the cursor sits inside a delimiter run this walks back to the
    /// run's start; when it sits inside a token body it walks back past
    /// the body to the delimiter run before it.
    fn tell_ldelim(&self) -> Result<Option<usize>, TokenError> {
        let pos = self.scanner.tell();
        let ch = self.scanner.char_at(pos).ok_or(TokenError::EndOfTokens)?;

        if self.is_delim_char(ch) {
            Ok(Some(self.delim_run_start(pos)))
        } else {
            let mut p = pos;
            loop {
                match self.scanner.prev_boundary(p) {
                    Some(q) => {
                        let before = self
                            .scanner
                            .char_at(q)
                            .expect("boundary walk stays inside the buffer");
                        if self.is_delim_char(before) {
                            return Ok(Some(self.delim_run_start(q)));
                        }
                        p = q;
                    }
                    None => return Ok(None),
                }
            }
        }
    }

    /// Walks backward from a delimiter at `at` to the first delimiter of
    /// its maximal run.
    fn delim_run_start(&self, at: usize) -> usize {
        let mut p = at;
        while let Some(q) = self.scanner.prev_boundary(p) {
            let ch = self
                .scanner
                .char_at(q)
                .expect("boundary walk stays inside the buffer");
            if !self.is_delim_char(ch) {
                break;
            }
            p = q;
        }
        p
    }

    /// Consumes a maximal delimiter run at the cursor.
    fn read_delim_run(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.scanner.peek() {
            if !self.is_delim_char(ch) {
                break;
            }
            out.push_str(&self.scanner.read(1));
        }
        out
    }

    /// Consumes a maximal non-delimiter run at the cursor.
    fn read_body_run(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.scanner.peek() {
            if self.is_delim_char(ch) {
                break;
            }
            out.push_str(&self.scanner.read(1));
        }
        out
    }
}

impl TokenStream for WordTokenizer {
    type Token = WordToken;

    fn next_token(&mut self) -> Result<WordToken, TokenError> {
        let mut ldelim = None;
        let start = match self.tell_ldelim()? {
            Some(run_start) => {
                self.scanner.seek(run_start);
                let text = self.read_delim_run();
                let stop = self.scanner.tell();
                ldelim = Some(Box::new(WordToken::leaf(text, run_start, stop)));
                stop
            }
            None => {
                self.scanner.seek(0);
                0
            }
        };

        let text = self.read_body_run();
        if text.is_empty() {
            return Err(TokenError::EndOfTokens);
        }
        let stop = self.scanner.tell();

        let mut rdelim = None;
        if self.scanner.peek().map_or(false, |ch| self.is_delim_char(ch)) {
            let run_start = stop;
            let text = self.read_delim_run();
            let run_stop = self.scanner.tell();
            rdelim = Some(Box::new(WordToken::leaf(text, run_start, run_stop)));

            // When the run touches the end of the buffer, rest the cursor
            // on its final character so the stream reports end-of-tokens
            // from here; otherwise the cursor already sits at the start of
            // the next token's body, sharing this delimiter run with it.
            if self.scanner.peek().is_none() {
                if let Some(back) = self.scanner.prev_boundary(run_stop) {
                    self.scanner.seek(back);
                }
            }
        }

        Ok(WordToken {
            text,
            start,
            stop,
            ldelim,
            rdelim,
        })
    }

    fn prev_token(&mut self) -> Result<WordToken, TokenError> {
        let token = match self.tell_ldelim() {
            Err(TokenError::EndOfTokens) => {
                // cursor at end of input: step back onto the last
                // character and take the token found there
                let back = self
                    .scanner
                    .prev_boundary(self.scanner.tell())
                    .ok_or(TokenError::EndOfTokens)?;
                self.scanner.seek(back);
                self.next_token()?
            }
            Err(other) => return Err(other),
            Ok(Some(run_start)) if run_start > 0 => {
                let back = self
                    .scanner
                    .prev_boundary(run_start)
                    .ok_or(TokenError::EndOfTokens)?;
                self.scanner.seek(back);
                self.next_token()?
            }
            Ok(_) => return Err(TokenError::EndOfTokens),
        };

        // leave the cursor at the token's left edge so a following
        // next_token returns the same token
        let start = token
            .ldelim
            .as_ref()
            .map(|ldelim| ldelim.start)
            .unwrap_or(token.start);
        self.scanner.seek(start);

        Ok(token)
    }

    fn buffer_tell(&self) -> usize {
        self.scanner.tell()
    }

    fn buffer_seek(&mut self, offset: usize) -> usize {
        self.scanner.seek(offset)
    }
}

/// The English stop words skipped by [`StopWordTokenizer`].
static STOP_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "did", "do", "does", "doing", "down", "during", "each", "few",
        "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
        "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
        "itself", "me", "more", "most", "my", "myself", "no", "nor", "not", "of", "off", "on",
        "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same",
        "she", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
        "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
        "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "whom", "why", "with", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// A [`WordTokenizer`] that skips common English stop words in both
/// directions.
pub struct StopWordTokenizer {
    inner: WordTokenizer,
}

impl StopWordTokenizer {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            inner: WordTokenizer::new(buffer),
        }
    }

    pub fn with_delimiters(buffer: impl Into<String>, delims: Delimiters) -> Self {
        Self {
            inner: WordTokenizer::with_delimiters(buffer, delims),
        }
    }

    fn is_valid(token: &WordToken) -> bool {
        !STOP_WORDS.contains(token.text.to_lowercase().as_str())
    }
}

impl TokenStream for StopWordTokenizer {
    type Token = WordToken;

    fn next_token(&mut self) -> Result<WordToken, TokenError> {
        loop {
            let token = self.inner.next_token()?;
            if Self::is_valid(&token) {
                return Ok(token);
            }
        }
    }

    fn prev_token(&mut self) -> Result<WordToken, TokenError> {
        loop {
            let token = self.inner.prev_token()?;
            if Self::is_valid(&token) {
                return Ok(token);
            }
        }
    }

    fn buffer_tell(&self) -> usize {
        self.inner.buffer_tell()
    }

    fn buffer_seek(&mut self, offset: usize) -> usize {
        self.inner.buffer_seek(offset)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn texts(tokens: &[WordToken]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn next_walks_every_token() {
        let mut t = WordTokenizer::new(" 123 567  ABC");
        let tokens = t.read_all();
        assert_eq!(texts(&tokens), ["123", "567", "ABC"]);

        let first = &tokens[0];
        assert_eq!(first.ldelim.as_ref().unwrap().text, " ");
        assert_eq!(first.rdelim.as_ref().unwrap().text, " ");

        let last = &tokens[2];
        assert_eq!(last.ldelim.as_ref().unwrap().text, "  ");
        assert!(last.rdelim.is_none());
    }

    #[test]
    fn next_from_mid_token_returns_the_whole_token() {
        let mut t = WordTokenizer::new(" 123 567  ABC");
        t.buffer_seek(6);
        let token = t.next_token().unwrap();
        assert_eq!(token.text, "567");
        assert_eq!(token.ldelim.as_ref().unwrap().text, " ");
        assert_eq!(token.rdelim.as_ref().unwrap().text, "  ");

        t.buffer_seek(2);
        let token = t.next_token().unwrap();
        assert_eq!(token.text, "123");
    }

    #[test]
    fn buffer_without_delimiters_yields_one_bare_token() {
        let mut t = WordTokenizer::new("0123456789");
        let token = t.next_token().unwrap();
        assert_eq!(token.text, "0123456789");
        assert!(token.ldelim.is_none());
        assert!(token.rdelim.is_none());
        assert_eq!(t.next_token(), Err(TokenError::EndOfTokens));
    }

    #[test]
    fn trailing_delimiters_belong_to_the_last_token() {
        let mut t = WordTokenizer::new("0123456789   ");
        t.buffer_seek(9);
        let token = t.next_token().unwrap();
        assert_eq!(token.text, "0123456789");
        assert!(token.ldelim.is_none());
        assert_eq!(token.rdelim.as_ref().unwrap().text, "   ");

        // from inside the trailing delimiter run there is nothing left
        t.buffer_seek(10);
        assert_eq!(t.next_token(), Err(TokenError::EndOfTokens));
    }

    #[test]
    fn empty_buffer_has_no_tokens() {
        let mut t = WordTokenizer::new("");
        assert_eq!(t.next_token(), Err(TokenError::EndOfTokens));
        assert_eq!(t.token_count(), 0);
    }

    #[test]
    fn bidirectional_walk() {
        let mut t = WordTokenizer::new(" 123 567  ABC");
        while t.next_token().is_ok() {}

        assert_eq!(t.prev_token().unwrap().text, "ABC");
        assert_eq!(t.prev_token().unwrap().text, "567");
        assert_eq!(t.prev_token().unwrap().text, "123");
        assert_eq!(t.prev_token(), Err(TokenError::EndOfTokens));
    }

    #[test]
    fn prev_after_next_returns_the_same_token() {
        let mut t = WordTokenizer::new("foo bar che");
        assert_eq!(t.prev_token(), Err(TokenError::EndOfTokens));

        let foo = t.next_token().unwrap();
        let again = t.prev_token().unwrap();
        assert_eq!(again.text, "foo");
        assert_eq!((again.start, again.stop), (foo.start, foo.stop));

        t.next_token().unwrap(); // back past foo
        let bar = t.next_token().unwrap();
        assert_eq!(bar.text, "bar");
        assert_eq!(t.prev_token().unwrap().text, "bar");

        t.next_token().unwrap();
        let che = t.next_token().unwrap();
        assert_eq!(che.text, "che");
        assert_eq!(t.prev_token().unwrap().text, "che");
    }

    #[test]
    fn predicate_delimiters() {
        let mut t =
            WordTokenizer::with_delimiters("fooAbarAcheAbooAbaz", Delimiters::predicate(|ch| ch == 'A'));
        assert_eq!(texts(&t.read_all()), ["foo", "bar", "che", "boo", "baz"]);
        assert_eq!(t.next_token(), Err(TokenError::EndOfTokens));
    }

    #[test]
    fn punctuation_predicate_splits_dates() {
        let mut t = WordTokenizer::with_delimiters(
            "september 15-17, 2019",
            Delimiters::predicate(|ch| ch.is_whitespace()),
        );
        assert_eq!(texts(&t.read_all()), ["september", "15-17,", "2019"]);

        let mut t = WordTokenizer::with_delimiters(
            "september 15-17, 2019",
            Delimiters::predicate(|ch| ch.is_whitespace() || ch.is_ascii_punctuation()),
        );
        let tokens = t.read_all();
        assert_eq!(texts(&tokens), ["september", "15", "17", "2019"]);
        assert_eq!(tokens[1].rdelim.as_ref().unwrap().text, "-");
        assert_eq!(tokens[2].ldelim.as_ref().unwrap().text, "-");
    }

    #[test]
    fn read_counts() {
        let mut t = WordTokenizer::new("0123 567  ABC");
        assert_eq!(texts(&t.read_tokens(2)), ["0123", "567"]);

        t.buffer_seek(0);
        assert_eq!(texts(&t.read_tokens(5)), ["0123", "567", "ABC"]);

        t.buffer_seek(0);
        assert_eq!(t.read_all().len(), 3);
        assert_eq!(t.read_tokens(0).len(), 0);
    }

    #[test]
    fn peek_does_not_advance() {
        let mut t = WordTokenizer::new("foo bar. Che? Boom!");
        assert_eq!(t.next_token().unwrap().text, "foo");
        assert_eq!(t.peek_token().unwrap().text, "bar");
        assert_eq!(t.next_token().unwrap().text, "bar");
        assert_eq!(t.peek_token().unwrap().text, "Che");
        assert_eq!(t.next_token().unwrap().text, "Che");
    }

    #[test]
    fn seek_tokens_from_the_end() {
        use std::io::SeekFrom;

        let mut t = WordTokenizer::new("foo bar che");
        t.read_all();
        t.seek_tokens(SeekFrom::End(-2)).unwrap();
        assert_eq!(t.next_token().unwrap().text, "bar");

        t.seek_tokens(SeekFrom::Start(0)).unwrap();
        assert_eq!(t.next_token().unwrap().text, "foo");
    }

    #[test]
    fn stop_words_are_skipped_both_ways() {
        let mut t = StopWordTokenizer::new("the quick fox is on a fence");
        assert_eq!(texts(&t.read_all()), ["quick", "fox", "fence"]);

        assert_eq!(t.prev_token().unwrap().text, "fence");
        assert_eq!(t.prev_token().unwrap().text, "fox");
        assert_eq!(t.prev_token().unwrap().text, "quick");
        assert_eq!(t.prev_token(), Err(TokenError::EndOfTokens));
    }

    #[quickcheck]
    fn concatenation_reconstructs_the_buffer(buffer: String) -> bool {
        let mut t = WordTokenizer::new(buffer.clone());
        let tokens = t.read_all();

        if tokens.is_empty() {
            // no token body anywhere: nothing but delimiters (or empty)
            return buffer.chars().all(|ch| ch.is_ascii_whitespace() || ch.is_ascii_punctuation());
        }

        // shared delimiter runs are counted once: take each token's
        // ldelim only when it isn't the previous token's rdelim
        let mut out = String::new();
        let mut last_stop = 0;
        for token in &tokens {
            if let Some(ldelim) = &token.ldelim {
                if ldelim.start >= last_stop {
                    out.push_str(&ldelim.text);
                }
            }
            out.push_str(&token.text);
            if let Some(rdelim) = &token.rdelim {
                out.push_str(&rdelim.text);
                last_stop = rdelim.stop;
            } else {
                last_stop = token.stop;
            }
        }
        out == buffer
    }

    #[quickcheck]
    fn next_then_prev_is_stable(buffer: String, skip: usize) -> bool {
        let mut t = WordTokenizer::new(buffer);
        for _ in 0..skip % 4 {
            if t.next_token().is_err() {
                return true;
            }
        }
        match t.next_token() {
            Ok(token) => {
                let back = t.prev_token().expect("a token was just produced");
                (back.start, back.stop) == (token.start, token.stop)
            }
            Err(_) => true,
        }
    }
}
