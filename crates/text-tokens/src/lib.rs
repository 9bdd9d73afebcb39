//! Seekable tokenization and parsing over in-memory text.
//!
//! The crate is a four-layer stack, leaves first:
//!
//!  - [`Scanner`]: a character cursor with positional reads, delimited
//!    reads, escape handling, and transactional rollback.
//!  - [`TokenStream`]: an IO-style bidirectional token cursor built on
//!    the scanner, with [`WordTokenizer`] and [`StopWordTokenizer`] as
//!    the delimiter-driven implementations.
//!  - [`html`]: tag lexing and cleanup with plain-text extraction, tag
//!    records with source spans, and fidelity-preserving block
//!    iteration.
//!  - [`abnf`]: an RFC 5234 / RFC 7405 grammar parser producing rule
//!    trees indexed by name.
//!
//! ```
//! use text_tokens::{TokenStream, WordTokenizer};
//!
//! let mut words = WordTokenizer::new("a stream of words");
//! let texts: Vec<_> = words.tokens().map(|word| word.text).collect();
//! assert_eq!(texts, ["a", "stream", "of", "words"]);
//! ```

mod macros;

pub mod abnf;
pub mod html;
pub mod scanner;
pub mod tokenizer;
pub mod word;

pub use scanner::Scanner;
pub use tokenizer::{Span, Spanned, TokenError, TokenStream, Tokens};
pub use word::{Delimiters, StopWordTokenizer, WordToken, WordTokenizer};
