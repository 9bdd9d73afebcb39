//! ABNF grammar parsing per RFC 5234, with the RFC 7405 `%s`/`%i`
//! case-sensitivity extension.
//!
//! [`AbnfGrammar`] lexes a grammar source into a tree of
//! [`AbnfDefinition`] nodes; [`AbnfParser`] indexes the rules by name,
//! merges `=/` incremental alternatives, and answers lookups. Applying
//! rules to input is not part of this module; it produces and serves
//! the rule trees.
//!
//! ```
//! use text_tokens::abnf::AbnfParser;
//!
//! let mut parser = AbnfParser::new("greeting = \"hello\" SP name\nname = 1*ALPHA\n");
//! let rule = parser.rule("greeting").unwrap();
//! assert!(rule.is_rule());
//! ```

mod definition;
mod grammar;
mod parser;

pub use definition::{AbnfDefinition, AbnfKind, AbnfValue, DefinedSign};
pub use grammar::AbnfGrammar;
pub use parser::AbnfParser;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbnfError {
    /// The grammar source violates ABNF syntax. Fatal to the current
    /// parse; the offset points at where scanning stopped.
    #[error("invalid grammar at offset {offset}: {message}")]
    Invalid { offset: usize, message: String },

    /// A rule was defined a second time with `=` instead of `=/`.
    #[error("rule {0} is already defined; a second definition must use =/")]
    DuplicateDefinition(String),

    /// A lookup for a rule name the grammar never defines.
    #[error("unknown rule {0}")]
    UnknownRule(String),
}

/// Rule names compare case-insensitively and treat `-` and `_` alike;
/// the normal form is lowercase with both separators removed.
pub(crate) fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|&ch| ch != '-' && ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_normalization() {
        assert_eq!(normalize_name("defined-as"), "definedas");
        assert_eq!(normalize_name("Defined_As"), "definedas");
        assert_eq!(normalize_name("CRLF"), "crlf");
    }
}
