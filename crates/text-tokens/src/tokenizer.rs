//! The bidirectional token cursor that all concrete tokenizers implement.
//!
//! A token stream behaves like an IO cursor but moves in whole tokens:
//! reads produce token records and seeks reposition the cursor between
//! them. The cursor itself lives in the underlying buffer, which is what
//! makes `transaction` and `temporary` cheap: they save and restore a
//! single buffer offset.

use std::io::SeekFrom;

/// A half-open `[start, stop)` byte range into a tokenizer's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub stop: usize,
}

impl Span {
    pub fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }
}

/// Implemented by token records so the stream combinators can reason
/// about where a token came from.
pub trait Spanned {
    fn span(&self) -> Span;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The stream is exhausted in the requested direction. Recoverable;
    /// `read_tokens` and iteration treat it as a normal stop.
    #[error("no more tokens in this direction")]
    EndOfTokens,

    /// The input violates the tokenizer's syntax at `offset`.
    #[error("invalid input at offset {offset}: {message}")]
    InvalidInput { offset: usize, message: String },

    /// The stream cannot produce tokens in the requested direction at all.
    #[error("token stream does not support reads in this direction")]
    Unsupported,
}

/// An IO-style cursor that produces tokens instead of characters.
///
/// Implementors supply the two directional reads plus raw access to the
/// buffer cursor; everything else is provided. The buffer position after
/// `next_token` rests at the start of the next token's left-delimiter
/// region, so `tell` reports the starting offset of the upcoming token.
pub trait TokenStream {
    type Token: Spanned;

    /// Produces the next token, or [`TokenError::EndOfTokens`] when the
    /// stream is exhausted.
    fn next_token(&mut self) -> Result<Self::Token, TokenError>;

    /// Produces the token immediately before the cursor, leaving the
    /// cursor at that token's start so `next_token` returns it again.
    fn prev_token(&mut self) -> Result<Self::Token, TokenError>;

    /// The cursor's offset in the underlying buffer.
    fn buffer_tell(&self) -> usize;

    /// Moves the buffer cursor; returns the clamped offset.
    fn buffer_seek(&mut self, offset: usize) -> usize;

    /// Returns the next token without advancing. Never mutates
    /// observable state.
    fn peek_token(&mut self) -> Option<Self::Token>
    where
        Self: Sized,
    {
        self.temporary(|stream| stream.next_token().ok())
    }

    /// The starting offset of the upcoming token, or the buffer position
    /// when no token remains.
    fn tell(&mut self) -> usize
    where
        Self: Sized,
    {
        match self.peek_token() {
            Some(token) => token.span().start,
            None => self.buffer_tell(),
        }
    }

    /// Reads up to `count` tokens; `count < 0` reads all remaining.
    /// Stops quietly at end of tokens and returns what it collected.
    fn read_tokens(&mut self, count: isize) -> Vec<Self::Token>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        if count < 0 {
            while let Ok(token) = self.next_token() {
                out.push(token);
            }
        } else {
            for _ in 0..count {
                match self.next_token() {
                    Ok(token) => out.push(token),
                    Err(_) => break,
                }
            }
        }
        out
    }

    /// Reads and returns all remaining tokens.
    fn read_all(&mut self) -> Vec<Self::Token>
    where
        Self: Sized,
    {
        self.read_tokens(-1)
    }

    /// Moves the cursor by tokens and returns the new buffer offset.
    ///
    /// * `Start(n)` positions the buffer cursor at offset `n` directly.
    /// * `Current(-n)` walks `n` tokens backward; `Current(n)` walks
    ///   `n` tokens forward.
    /// * `End(-n)` counts `n` tokens back from the end of the stream,
    ///   which requires a full scan inside a `temporary` block.
    fn seek_tokens(&mut self, pos: SeekFrom) -> Result<usize, TokenError>
    where
        Self: Sized,
    {
        let offset = match pos {
            SeekFrom::Start(n) => n as usize,
            SeekFrom::Current(0) => self.buffer_tell(),
            SeekFrom::Current(n) if n < 0 => {
                let mut offset = self.buffer_tell();
                for _ in 0..n.unsigned_abs() {
                    offset = self.prev_token()?.span().start;
                }
                offset
            }
            SeekFrom::Current(n) => {
                for _ in 0..n {
                    self.next_token()?;
                }
                self.buffer_tell()
            }
            SeekFrom::End(n) => {
                // land on the n-th token from the end: walk forward to it
                // and take its starting offset
                let total = self.token_count();
                let target = (total + 1).saturating_sub(n.unsigned_abs() as usize);
                self.temporary(|stream| {
                    stream.buffer_seek(0);
                    let mut offset = 0;
                    for _ in 0..target {
                        match stream.next_token() {
                            Ok(token) => offset = token.span().start,
                            Err(_) => break,
                        }
                    }
                    offset
                })
            }
        };
        Ok(self.buffer_seek(offset))
    }

    /// Counts the tokens remaining after the cursor without consuming
    /// them.
    fn remaining_tokens(&mut self) -> usize
    where
        Self: Sized,
    {
        self.temporary(|stream| {
            let mut count = 0;
            while stream.next_token().is_ok() {
                count += 1;
            }
            count
        })
    }

    /// Counts every token in the stream regardless of the cursor.
    /// This parses the whole buffer and restores the cursor, so prefer
    /// `remaining_tokens` when the distinction does not matter.
    fn token_count(&mut self) -> usize
    where
        Self: Sized,
    {
        self.temporary(|stream| {
            stream.buffer_seek(0);
            stream.remaining_tokens()
        })
    }

    /// Runs `f`; on `Err` the buffer cursor is restored before the error
    /// propagates. Nested transactions compose.
    fn transaction<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized,
    {
        let start = self.buffer_tell();
        let result = f(self);
        if result.is_err() {
            self.buffer_seek(start);
        }
        result
    }

    /// Runs `f` and always restores the buffer cursor afterwards.
    fn temporary<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T
    where
        Self: Sized,
    {
        let start = self.buffer_tell();
        let out = f(self);
        self.buffer_seek(start);
        out
    }

    /// Rewinds to the buffer start and iterates every token.
    fn tokens(&mut self) -> Tokens<'_, Self>
    where
        Self: Sized,
    {
        self.buffer_seek(0);
        Tokens { stream: self }
    }
}

/// Iterator over a stream's tokens; ends at the first `EndOfTokens`.
pub struct Tokens<'a, S: TokenStream> {
    stream: &'a mut S,
}

impl<S: TokenStream> Iterator for Tokens<'_, S> {
    type Item = S::Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.next_token().ok()
    }
}
