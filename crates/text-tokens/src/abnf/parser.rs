//! Rule-table façade over [`AbnfGrammar`].

use rustc_hash::FxHashMap;

use crate::abnf::definition::AbnfDefinition;
use crate::abnf::grammar::AbnfGrammar;
use crate::abnf::{normalize_name, AbnfError};

/// Owns a grammar and serves its rules by name.
///
/// The table is built once, on the first lookup: the grammar's own
/// rules are indexed in declaration order, `=/` definitions are merged
/// into the rule they extend, and the RFC 5234 core rules are added for
/// any name the grammar didn't define itself. After that population the
/// table is read-only.
///
/// Lookups are case-insensitive and treat `-` and `_` alike, so
/// `defined-as`, `Defined_As`, and `DEFINEDAS` name the same rule.
pub struct AbnfParser {
    grammar: AbnfGrammar,
    rules: Option<FxHashMap<String, AbnfDefinition>>,
    order: Vec<String>,
}

impl AbnfParser {
    pub fn new(grammar: impl Into<String>) -> Self {
        Self::with_grammar(AbnfGrammar::new(grammar))
    }

    pub fn with_grammar(grammar: AbnfGrammar) -> Self {
        Self {
            grammar,
            rules: None,
            order: Vec::new(),
        }
    }

    /// Looks up a rule definition by name.
    pub fn rule(&mut self, name: &str) -> Result<&AbnfDefinition, AbnfError> {
        self.populate()?;
        let key = normalize_name(name);
        self.rules
            .as_ref()
            .expect("populate just filled the table")
            .get(&key)
            .ok_or_else(|| AbnfError::UnknownRule(name.to_string()))
    }

    /// The grammar's own rules (core rules excluded) in declaration
    /// order.
    pub fn rules(&mut self) -> Result<Vec<&AbnfDefinition>, AbnfError> {
        self.populate()?;
        let table = self.rules.as_ref().expect("populate just filled the table");
        Ok(self
            .order
            .iter()
            .filter_map(|name| table.get(name))
            .collect())
    }

    fn populate(&mut self) -> Result<(), AbnfError> {
        if self.rules.is_some() {
            return Ok(());
        }

        let mut table: FxHashMap<String, AbnfDefinition> = FxHashMap::default();
        let mut order = Vec::new();

        for rule in self.grammar.rules()? {
            let name = normalize_name(rule.rulename().unwrap_or_default());
            match table.get_mut(&name) {
                Some(existing) => existing.merge(rule)?,
                None => {
                    order.push(name.clone());
                    table.insert(name, rule);
                }
            }
        }

        // the core rules back any name the grammar leaves undefined; a
        // grammar may shadow them with its own definitions
        for rule in AbnfGrammar::core_rules()? {
            let name = normalize_name(rule.rulename().unwrap_or_default());
            table.entry(name).or_insert(rule);
        }

        self.rules = Some(table);
        self.order = order;
        Ok(())
    }
}
