//! The grammar tree node.

use std::fmt;

use crate::abnf::AbnfError;

/// The rule-kind of a grammar node, one variant per production the
/// lexer emits. The name-based introspection of the tree goes through
/// [`AbnfDefinition::find`] with one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbnfKind {
    Rulelist,
    Rule,
    Rulename,
    DefinedAs,
    Elements,
    Alternation,
    Concatenation,
    Repetition,
    Repeat,
    Element,
    Group,
    Option,
    CharVal,
    QuotedString,
    BinVal,
    DecVal,
    HexVal,
    ProseVal,
    Cwsp,
    Cnl,
    Comment,
    Crlf,
}

impl AbnfKind {
    /// The normalized rule name: lowercase with separators removed.
    pub fn as_str(self) -> &'static str {
        match self {
            AbnfKind::Rulelist => "rulelist",
            AbnfKind::Rule => "rule",
            AbnfKind::Rulename => "rulename",
            AbnfKind::DefinedAs => "definedas",
            AbnfKind::Elements => "elements",
            AbnfKind::Alternation => "alternation",
            AbnfKind::Concatenation => "concatenation",
            AbnfKind::Repetition => "repetition",
            AbnfKind::Repeat => "repeat",
            AbnfKind::Element => "element",
            AbnfKind::Group => "group",
            AbnfKind::Option => "option",
            AbnfKind::CharVal => "charval",
            AbnfKind::QuotedString => "quotedstring",
            AbnfKind::BinVal => "binval",
            AbnfKind::DecVal => "decval",
            AbnfKind::HexVal => "hexval",
            AbnfKind::ProseVal => "proseval",
            AbnfKind::Cwsp => "cwsp",
            AbnfKind::Cnl => "cnl",
            AbnfKind::Comment => "comment",
            AbnfKind::Crlf => "crlf",
        }
    }
}

/// Which sign a `defined-as` carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinedSign {
    /// `=`, a basic definition.
    Basic,
    /// `=/`, an incremental alternative.
    Incremental,
}

impl DefinedSign {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinedSign::Basic => "=",
            DefinedSign::Incremental => "=/",
        }
    }
}

/// One entry in a node's `values`: a child node, literal source text,
/// or a repeat bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbnfValue {
    Definition(AbnfDefinition),
    Str(String),
    Num(usize),
}

/// A node of a parsed grammar.
///
/// Shapes worth knowing:
///  - a `Rule` node's children are `[rulename, defined-as, elements,
///    c-nl, …]`; children past the first four are alternatives merged
///    in by `=/`.
///  - a `Repeat` node's values are exactly `[min, max]`, where a `max`
///    of zero means unbounded.
///  - `CharVal` and `QuotedString` nodes carry `case_sensitive`
///    (RFC 7405: quoted literals compare case-insensitively unless the
///    source wrote `%s`).
///  - a `DefinedAs` node carries `sign`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbnfDefinition {
    pub kind: AbnfKind,
    pub values: Vec<AbnfValue>,
    pub start: usize,
    pub stop: usize,
    pub case_sensitive: Option<bool>,
    pub sign: Option<DefinedSign>,
}

impl AbnfDefinition {
    pub(crate) fn new(kind: AbnfKind, values: Vec<AbnfValue>, start: usize, stop: usize) -> Self {
        Self {
            kind,
            values,
            start,
            stop,
            case_sensitive: None,
            sign: None,
        }
    }

    /// The child nodes, skipping literal values.
    pub fn definitions(&self) -> impl Iterator<Item = &AbnfDefinition> {
        self.values.iter().filter_map(|value| match value {
            AbnfValue::Definition(definition) => Some(definition),
            _ => None,
        })
    }

    /// Collects every descendant of the given kind. A child that
    /// matches is collected without searching inside it; children that
    /// don't match are searched recursively.
    pub fn find(&self, kind: AbnfKind) -> Vec<&AbnfDefinition> {
        let mut out = Vec::new();
        self.find_into(kind, &mut out);
        out
    }

    /// The first match of [`AbnfDefinition::find`], if any.
    pub fn first(&self, kind: AbnfKind) -> Option<&AbnfDefinition> {
        // cheap enough at grammar scale; rule trees are shallow
        self.find(kind).into_iter().next()
    }

    fn find_into<'a>(&'a self, kind: AbnfKind, out: &mut Vec<&'a AbnfDefinition>) {
        for definition in self.definitions() {
            if definition.kind == kind {
                out.push(definition);
            } else {
                definition.find_into(kind, out);
            }
        }
    }

    pub fn is_rule(&self) -> bool {
        self.kind == AbnfKind::Rule
    }

    /// Any of the three numeric terminal kinds.
    pub fn is_numval(&self) -> bool {
        matches!(
            self.kind,
            AbnfKind::BinVal | AbnfKind::DecVal | AbnfKind::HexVal
        )
    }

    /// A terminal: a literal string or a numeric value.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, AbnfKind::QuotedString | AbnfKind::CharVal) || self.is_numval()
    }

    /// For a `Rule` node (or anything containing a rulename), the name
    /// the grammar author wrote.
    pub fn rulename(&self) -> Option<&str> {
        let rulename = if self.kind == AbnfKind::Rulename {
            self
        } else {
            self.first(AbnfKind::Rulename)?
        };
        match rulename.values.first()? {
            AbnfValue::Str(name) => Some(name),
            _ => None,
        }
    }

    /// The `[min, max]` bounds of a `Repeat` node; `max == 0` means
    /// unbounded.
    pub fn repeat_bounds(&self) -> Option<(usize, usize)> {
        if self.kind != AbnfKind::Repeat {
            return None;
        }
        match (self.values.first()?, self.values.get(1)?) {
            (AbnfValue::Num(min), AbnfValue::Num(max)) => Some((*min, *max)),
            _ => None,
        }
    }

    /// Folds an incremental alternative (`=/`) into this rule: the new
    /// `Rule` node is appended as an extra child, preserving declaration
    /// order. A second definition signed `=` is an error.
    pub fn merge(&mut self, definition: AbnfDefinition) -> Result<(), AbnfError> {
        let name = self.rulename().unwrap_or_default().to_string();

        if !self.is_rule() || !definition.is_rule() {
            return Err(AbnfError::DuplicateDefinition(name));
        }

        let incremental = definition
            .values
            .get(1)
            .and_then(|value| match value {
                AbnfValue::Definition(defined_as) => defined_as.sign,
                _ => None,
            })
            .map_or(false, |sign| sign == DefinedSign::Incremental);

        if !incremental {
            return Err(AbnfError::DuplicateDefinition(name));
        }

        self.values.push(AbnfValue::Definition(definition));
        Ok(())
    }
}

impl fmt::Display for AbnfDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}:{}]:", self.kind.as_str(), self.start, self.stop)?;

        for value in &self.values {
            match value {
                AbnfValue::Definition(definition) => match definition.kind {
                    AbnfKind::Rulename => {
                        write!(f, " rulename({})", definition.rulename().unwrap_or(""))?
                    }
                    AbnfKind::DefinedAs => write!(
                        f,
                        " definedas({})",
                        definition.sign.map(DefinedSign::as_str).unwrap_or("")
                    )?,
                    kind => write!(f, " {}", kind.as_str())?,
                },
                AbnfValue::Str(text) => write!(f, " {text}")?,
                AbnfValue::Num(number) => write!(f, " {number}")?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn leaf(kind: AbnfKind, values: Vec<AbnfValue>) -> AbnfDefinition {
        AbnfDefinition::new(kind, values, 0, 0)
    }

    #[test]
    fn find_collects_without_descending_into_matches() {
        let inner = leaf(
            AbnfKind::Rulename,
            vec![AbnfValue::Str("inner".to_string())],
        );
        let element = leaf(AbnfKind::Element, vec![AbnfValue::Definition(inner)]);
        let outer = leaf(
            AbnfKind::Alternation,
            vec![
                AbnfValue::Definition(element),
                AbnfValue::Definition(leaf(
                    AbnfKind::Rulename,
                    vec![AbnfValue::Str("outer".to_string())],
                )),
            ],
        );

        let found = outer.find(AbnfKind::Rulename);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].rulename(), Some("inner"));
        assert_eq!(found[1].rulename(), Some("outer"));
    }

    #[test]
    fn terminal_predicates() {
        assert!(leaf(AbnfKind::HexVal, vec![]).is_numval());
        assert!(leaf(AbnfKind::HexVal, vec![]).is_terminal());
        assert!(leaf(AbnfKind::QuotedString, vec![]).is_terminal());
        assert!(!leaf(AbnfKind::Group, vec![]).is_terminal());
        assert!(!leaf(AbnfKind::QuotedString, vec![]).is_numval());
    }

    #[test]
    fn repeat_bounds() {
        let repeat = leaf(
            AbnfKind::Repeat,
            vec![AbnfValue::Num(2), AbnfValue::Num(5)],
        );
        assert_eq!(repeat.repeat_bounds(), Some((2, 5)));
        assert_eq!(leaf(AbnfKind::Element, vec![]).repeat_bounds(), None);
    }
}
