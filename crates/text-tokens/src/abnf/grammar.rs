//! The ABNF grammar lexer.
//!
//! One `scan_*` method per RFC 5234 production, each returning an
//! [`AbnfDefinition`] subtree. Productions that backtrack wrap their
//! sub-scans in a transaction so a failed branch restores the scanner
//! before the next branch runs.
//!
//! Deliberate leniencies beyond the strict RFC:
//!  - a bare `\n` is accepted wherever CRLF is required, as is the end
//!    of input;
//!  - `|` is accepted as a synonym for the `/` alternation separator;
//!  - numeric values accept multiple `.` concatenation tails.

use log::{debug, trace};

use crate::abnf::definition::{AbnfDefinition, AbnfKind, AbnfValue, DefinedSign};
use crate::abnf::AbnfError;
use crate::scanner::Scanner;

/// The core rules of RFC 5234 appendix B.1. Rather than hand-building
/// their trees, the grammar parses this source once and merges the
/// result into every rule table.
const CORE_RULES: &str = r#"ALPHA = %x41-5A / %x61-7A   ; A-Z / a-z
BIT = "0" / "1"
CHAR = %x01-7F
   ; any 7-bit US-ASCII character, excluding NUL
CR = %x0D
   ; carriage return
CRLF = CR LF
   ; Internet standard newline
CTL = %x00-1F / %x7F
   ; controls
DIGIT = %x30-39
   ; 0-9
DQUOTE = %x22
   ; " (Double Quote)
HEXDIG = DIGIT / "A" / "B" / "C" / "D" / "E" / "F"
HTAB = %x09
   ; horizontal tab
LF = %x0A
   ; linefeed
LWSP = *(WSP / CRLF WSP)
   ; linear white space; use with caution outside mail headers
OCTET = %x00-FF
   ; 8 bits of data
SP = %x20
VCHAR = %x21-7E
   ; visible (printing) characters
WSP = SP / HTAB
   ; white space
"#;

/// Lexes an ABNF grammar source into [`AbnfDefinition`] trees.
pub struct AbnfGrammar {
    scanner: Scanner,
}

impl AbnfGrammar {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            scanner: Scanner::new(buffer),
        }
    }

    /// Parses the whole source and returns its `rule` definitions in
    /// declaration order.
    pub fn rules(&mut self) -> Result<Vec<AbnfDefinition>, AbnfError> {
        self.scanner.seek(0);
        let rulelist = self.scan_rulelist()?;
        Ok(rulelist
            .values
            .into_iter()
            .filter_map(|value| match value {
                AbnfValue::Definition(definition) if definition.is_rule() => Some(definition),
                _ => None,
            })
            .collect())
    }

    /// The RFC 5234 appendix B.1 core rules, parsed from their own
    /// ABNF source.
    pub fn core_rules() -> Result<Vec<AbnfDefinition>, AbnfError> {
        Self::new(CORE_RULES).rules()
    }

    /// Runs `f`; on failure the scanner is restored to where the
    /// production began before the error propagates.
    fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, AbnfError>,
    ) -> Result<T, AbnfError> {
        let start = self.scanner.tell();
        let result = f(self);
        if result.is_err() {
            self.scanner.seek(start);
        }
        result
    }

    /// Runs `f`, swallowing a failure after rolling the scanner back.
    /// For the `*c-wsp` style optional productions.
    fn optional(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<AbnfDefinition, AbnfError>,
    ) -> Option<AbnfDefinition> {
        self.attempt(f).ok()
    }

    fn invalid(&self, message: impl Into<String>) -> AbnfError {
        AbnfError::Invalid {
            offset: self.scanner.tell(),
            message: message.into(),
        }
    }

    fn definition(&self, kind: AbnfKind, values: Vec<AbnfValue>, start: usize) -> AbnfDefinition {
        AbnfDefinition::new(kind, values, start, self.scanner.tell())
    }

    /// `rulelist = 1*( rule / (*c-wsp c-nl) )`
    ///
    /// The whole buffer must be consumable; source that is neither a
    /// rule nor blank/comment lines is invalid input.
    fn scan_rulelist(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let start = self.scanner.tell();
        let mut values = Vec::new();

        loop {
            if !self.scanner.has_remaining() {
                break;
            }

            match self.attempt(Self::scan_rule) {
                Ok(rule) => values.push(AbnfValue::Definition(rule)),
                Err(rule_error) => {
                    if let Some(cwsp) = self.optional(Self::scan_cwsp) {
                        values.push(AbnfValue::Definition(cwsp));
                    }
                    match self.attempt(Self::scan_cnl) {
                        Ok(cnl) => values.push(AbnfValue::Definition(cnl)),
                        Err(_) => {
                            if self.scanner.has_remaining() {
                                return Err(rule_error);
                            }
                            break;
                        }
                    }
                }
            }
        }

        Ok(self.definition(AbnfKind::Rulelist, values, start))
    }

    /// `rule = rulename defined-as elements c-nl`
    fn scan_rule(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let rulename = self.scan_rulename()?;
        debug!("parsing rule {}", rulename.rulename().unwrap_or(""));

        let defined_as = self.scan_definedas()?;
        let elements = self.scan_elements()?;
        let cnl = self.scan_cnl()?;

        let start = rulename.start;
        Ok(self.definition(
            AbnfKind::Rule,
            vec![
                AbnfValue::Definition(rulename),
                AbnfValue::Definition(defined_as),
                AbnfValue::Definition(elements),
                AbnfValue::Definition(cnl),
            ],
            start,
        ))
    }

    /// `rulename = ALPHA *(ALPHA / DIGIT / "-")`
    fn scan_rulename(&mut self) -> Result<AbnfDefinition, AbnfError> {
        trace!("scan_rulename at {}", self.scanner.tell());
        let start = self.scanner.tell();

        match self.scanner.peek() {
            Some(ch) if ch.is_ascii_alphabetic() => {}
            other => {
                return Err(self.invalid(format!(
                    "[{}] is not an ALPHA character",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }

        let rulename = self
            .scanner
            .read_thru_matching(|ch| ch.is_ascii_alphanumeric() || ch == '-');

        Ok(self.definition(AbnfKind::Rulename, vec![AbnfValue::Str(rulename)], start))
    }

    /// `defined-as = *c-wsp ("=" / "=/") *c-wsp`
    fn scan_definedas(&mut self) -> Result<AbnfDefinition, AbnfError> {
        trace!("scan_definedas at {}", self.scanner.tell());
        let start = self.scanner.tell();
        let mut values = Vec::new();

        if let Some(cwsp) = self.optional(Self::scan_cwsp) {
            values.push(AbnfValue::Definition(cwsp));
        }

        let sign = match self.scanner.read_thru_chars("=/").as_str() {
            "=" => DefinedSign::Basic,
            "=/" => DefinedSign::Incremental,
            other => return Err(self.invalid(format!("[{other}] is not = or =/"))),
        };
        values.push(AbnfValue::Str(sign.as_str().to_string()));

        if let Some(cwsp) = self.optional(Self::scan_cwsp) {
            values.push(AbnfValue::Definition(cwsp));
        }

        let mut defined_as = self.definition(AbnfKind::DefinedAs, values, start);
        defined_as.sign = Some(sign);
        Ok(defined_as)
    }

    /// `c-wsp = WSP / (c-nl WSP)`
    fn scan_cwsp(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let start = self.scanner.tell();

        let space = self.scanner.read_thru_hspace();
        if !space.is_empty() {
            return Ok(self.definition(AbnfKind::Cwsp, vec![AbnfValue::Str(space)], start));
        }

        let cnl = self.scan_cnl()?;
        let space = self.scanner.read_thru_hspace();
        if space.is_empty() {
            return Err(self.invalid("(c-nl WSP) missing WSP"));
        }

        Ok(self.definition(
            AbnfKind::Cwsp,
            vec![AbnfValue::Definition(cnl), AbnfValue::Str(space)],
            start,
        ))
    }

    /// `c-nl = comment / CRLF`
    ///
    /// A bare `\n` is accepted in place of CRLF, and so is the end of
    /// input so a grammar need not end with a newline.
    fn scan_cnl(&mut self) -> Result<AbnfDefinition, AbnfError> {
        match self.scanner.peek() {
            Some(';') => {
                let comment = self.scan_comment()?;
                let start = comment.start;
                Ok(self.definition(
                    AbnfKind::Cnl,
                    vec![AbnfValue::Definition(comment)],
                    start,
                ))
            }
            Some('\r') | Some('\n') => {
                let start = self.scanner.tell();
                let newline = self.scanner.read_until_newline();
                let crlf = self.definition(AbnfKind::Crlf, vec![AbnfValue::Str(newline)], start);
                Ok(self.definition(AbnfKind::Cnl, vec![AbnfValue::Definition(crlf)], start))
            }
            None => {
                let at = self.scanner.tell();
                let crlf = AbnfDefinition::new(
                    AbnfKind::Crlf,
                    vec![AbnfValue::Str(String::new())],
                    at,
                    at,
                );
                Ok(AbnfDefinition::new(
                    AbnfKind::Cnl,
                    vec![AbnfValue::Definition(crlf)],
                    at,
                    at,
                ))
            }
            Some(_) => Err(self.invalid("c-nl requires a comment or a newline")),
        }
    }

    /// `comment = ";" *(WSP / VCHAR) CRLF`
    fn scan_comment(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let start = self.scanner.tell();

        if self.scanner.read(1) != ";" {
            return Err(self.invalid("comment must start with ;"));
        }

        let comment = self.scanner.read_until_newline();
        if !comment.ends_with('\n') && self.scanner.has_remaining() {
            return Err(self.invalid("comment must end with a newline"));
        }

        Ok(self.definition(
            AbnfKind::Comment,
            vec![AbnfValue::Str(comment.trim().to_string())],
            start,
        ))
    }

    /// `elements = alternation *c-wsp`
    fn scan_elements(&mut self) -> Result<AbnfDefinition, AbnfError> {
        trace!("scan_elements at {}", self.scanner.tell());
        let start = self.scanner.tell();
        let mut values = Vec::new();

        values.push(AbnfValue::Definition(self.scan_alternation()?));

        if let Some(cwsp) = self.optional(Self::scan_cwsp) {
            values.push(AbnfValue::Definition(cwsp));
        }

        Ok(self.definition(AbnfKind::Elements, values, start))
    }

    /// `alternation = concatenation *(*c-wsp ("/" | "|") *c-wsp concatenation)`
    fn scan_alternation(&mut self) -> Result<AbnfDefinition, AbnfError> {
        trace!("scan_alternation at {}", self.scanner.tell());
        let start = self.scanner.tell();
        let mut values = Vec::new();

        values.push(AbnfValue::Definition(self.scan_concatenation()?));

        loop {
            if let Some(cwsp) = self.optional(Self::scan_cwsp) {
                values.push(AbnfValue::Definition(cwsp));
            }

            match self.scanner.peek() {
                Some('/') | Some('|') => {
                    values.push(AbnfValue::Str(self.scanner.read(1)));

                    if let Some(cwsp) = self.optional(Self::scan_cwsp) {
                        values.push(AbnfValue::Definition(cwsp));
                    }

                    values.push(AbnfValue::Definition(self.scan_concatenation()?));
                }
                _ => break,
            }
        }

        Ok(self.definition(AbnfKind::Alternation, values, start))
    }

    /// `concatenation = repetition *(1*c-wsp repetition)`
    fn scan_concatenation(&mut self) -> Result<AbnfDefinition, AbnfError> {
        trace!("scan_concatenation at {}", self.scanner.tell());
        let start = self.scanner.tell();
        let mut values = Vec::new();

        values.push(AbnfValue::Definition(self.scan_repetition()?));

        loop {
            let more = self.attempt(|grammar| {
                let cwsp = grammar.scan_cwsp()?;
                let repetition = grammar.scan_repetition()?;
                Ok((cwsp, repetition))
            });
            match more {
                Ok((cwsp, repetition)) => {
                    values.push(AbnfValue::Definition(cwsp));
                    values.push(AbnfValue::Definition(repetition));
                }
                Err(_) => break,
            }
        }

        Ok(self.definition(AbnfKind::Concatenation, values, start))
    }

    /// `repetition = [repeat] element`
    fn scan_repetition(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let repeat = self.scan_repeat()?;
        let element = self.scan_element()?;
        let start = repeat.start;
        Ok(self.definition(
            AbnfKind::Repetition,
            vec![AbnfValue::Definition(repeat), AbnfValue::Definition(element)],
            start,
        ))
    }

    /// `repeat = 1*DIGIT / (*DIGIT "*" *DIGIT)`
    ///
    /// The node's values are always the pair `[min, max]`, with a `max`
    /// of zero meaning unbounded: `*` is `[0, 0]`, `3` is `[3, 3]`,
    /// `3*` is `[3, 0]`, `*5` is `[0, 5]`, and `3*5` is `[3, 5]`.
    fn scan_repeat(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let start = self.scanner.tell();

        let min_repeat = self.read_number()?;

        let max_repeat = if self.scanner.peek() == Some('*') {
            self.scanner.read(1);
            self.read_number()?
        } else {
            min_repeat
        };

        Ok(self.definition(
            AbnfKind::Repeat,
            vec![AbnfValue::Num(min_repeat), AbnfValue::Num(max_repeat)],
            start,
        ))
    }

    /// Reads a possibly-empty digit run; an absent number is zero.
    fn read_number(&mut self) -> Result<usize, AbnfError> {
        let digits = self.scanner.read_thru_matching(|ch| ch.is_ascii_digit());
        if digits.is_empty() {
            return Ok(0);
        }
        digits
            .parse()
            .map_err(|_| self.invalid(format!("repeat count {digits} is out of range")))
    }

    /// `element = rulename / group / option / char-val / num-val / prose-val`
    fn scan_element(&mut self) -> Result<AbnfDefinition, AbnfError> {
        trace!("scan_element at {}", self.scanner.tell());
        let start = self.scanner.tell();

        let ch = self
            .scanner
            .peek()
            .ok_or_else(|| self.invalid("unexpected end of input in element"))?;

        let value = if ch.is_ascii_alphabetic() {
            self.scan_rulename()?
        } else if ch == '"' {
            // a bare quoted string is case-insensitive; wrap it in a
            // char-val to stay consistent with the rfc7405 forms
            let quoted = self.scan_quotedstring(false)?;
            let mut charval = AbnfDefinition::new(
                AbnfKind::CharVal,
                vec![AbnfValue::Definition(quoted)],
                start,
                self.scanner.tell(),
            );
            charval.case_sensitive = Some(false);
            charval
        } else if ch == '(' {
            self.scan_group()?
        } else if ch == '[' {
            self.scan_option()?
        } else if ch == '%' {
            self.scan_val()?
        } else if ch == '<' {
            self.scan_proseval()?
        } else {
            return Err(self.invalid(format!("unknown element starting with [{ch}]")));
        };

        Ok(self.definition(
            AbnfKind::Element,
            vec![AbnfValue::Definition(value)],
            start,
        ))
    }

    /// `quoted-string = DQUOTE *(%x20-21 / %x23-7E) DQUOTE`
    fn scan_quotedstring(&mut self, case_sensitive: bool) -> Result<AbnfDefinition, AbnfError> {
        if self.scanner.peek() != Some('"') {
            return Err(self.invalid("char value begins with a double-quote"));
        }

        let start = self.scanner.tell();
        let raw = self.scanner.read_until_delim_count("\"", 2);
        let text = raw.trim_matches('"').to_string();

        let mut quoted =
            self.definition(AbnfKind::QuotedString, vec![AbnfValue::Str(text)], start);
        quoted.case_sensitive = Some(case_sensitive);
        Ok(quoted)
    }

    /// `num-val = "%" ("b" bin-val / "d" dec-val / "x" hex-val)`, plus
    /// the rfc7405 `%s` / `%i` quoted-string forms.
    fn scan_val(&mut self) -> Result<AbnfDefinition, AbnfError> {
        trace!("scan_val at {}", self.scanner.tell());
        let start = self.scanner.tell();
        let mut values = Vec::new();

        let percent = self.scanner.read(1);
        if percent != "%" {
            return Err(self.invalid("num-val starts with %"));
        }
        values.push(AbnfValue::Str(percent));

        let marker = self.scanner.read(1);
        values.push(AbnfValue::Str(marker.clone()));

        match marker.as_str() {
            "b" | "d" | "x" => {
                let (kind, digit): (AbnfKind, fn(char) -> bool) = match marker.as_str() {
                    "b" => (AbnfKind::BinVal, |ch| ch == '0' || ch == '1'),
                    "d" => (AbnfKind::DecVal, |ch| ch.is_ascii_digit()),
                    _ => (AbnfKind::HexVal, |ch| ch.is_ascii_hexdigit()),
                };

                let digits = self.scanner.read_thru_matching(digit);
                if digits.is_empty() {
                    return Err(self.invalid("num-val with no number values"));
                }
                values.push(AbnfValue::Str(digits));

                // a single "-" range tail, or any number of "." concat tails
                if self.scanner.peek() == Some('-') {
                    values.push(AbnfValue::Str(self.scanner.read(1)));
                    let digits = self.scanner.read_thru_matching(digit);
                    if digits.is_empty() {
                        return Err(self.invalid("num-val - with no number values after"));
                    }
                    values.push(AbnfValue::Str(digits));
                } else {
                    while self.scanner.peek() == Some('.') {
                        values.push(AbnfValue::Str(self.scanner.read(1)));
                        let digits = self.scanner.read_thru_matching(digit);
                        if digits.is_empty() {
                            return Err(self.invalid("num-val . with no number values after"));
                        }
                        values.push(AbnfValue::Str(digits));
                    }
                }

                Ok(self.definition(kind, values, start))
            }

            "s" | "i" => {
                let case_sensitive = marker == "s";
                let quoted = self.scan_quotedstring(case_sensitive)?;
                values.push(AbnfValue::Definition(quoted));

                let mut charval = self.definition(AbnfKind::CharVal, values, start);
                charval.case_sensitive = Some(case_sensitive);
                Ok(charval)
            }

            _ => Err(self.invalid(format!("terminal value {marker} failed"))),
        }
    }

    /// `prose-val = "<" *(%x20-3D / %x3F-7E) ">"`
    fn scan_proseval(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let start = self.scanner.tell();

        if self.scanner.read(1) != "<" {
            return Err(self.invalid("prose-val begins with <"));
        }

        let val = self.scanner.read_until_delim(">");
        let val = val.trim_matches('>').to_string();
        Ok(self.definition(AbnfKind::ProseVal, vec![AbnfValue::Str(val)], start))
    }

    /// `group = "(" *c-wsp alternation *c-wsp ")"`
    fn scan_group(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let (values, start) = self.scan_delimited('(', ')')?;
        Ok(self.definition(AbnfKind::Group, values, start))
    }

    /// `option = "[" *c-wsp alternation *c-wsp "]"`
    fn scan_option(&mut self) -> Result<AbnfDefinition, AbnfError> {
        let (values, start) = self.scan_delimited('[', ']')?;
        Ok(self.definition(AbnfKind::Option, values, start))
    }

    fn scan_delimited(
        &mut self,
        open: char,
        close: char,
    ) -> Result<(Vec<AbnfValue>, usize), AbnfError> {
        trace!("scan_delimited {open}{close} at {}", self.scanner.tell());
        let start = self.scanner.tell();
        let mut values = Vec::new();

        if self.scanner.peek() != Some(open) {
            return Err(self.invalid(format!("group must start with {open}")));
        }
        values.push(AbnfValue::Str(self.scanner.read(1)));

        if let Some(cwsp) = self.optional(Self::scan_cwsp) {
            values.push(AbnfValue::Definition(cwsp));
        }

        values.push(AbnfValue::Definition(self.scan_alternation()?));

        if let Some(cwsp) = self.optional(Self::scan_cwsp) {
            values.push(AbnfValue::Definition(cwsp));
        }

        if self.scanner.peek() != Some(close) {
            return Err(self.invalid(format!("group must end with {close}")));
        }
        values.push(AbnfValue::Str(self.scanner.read(1)));

        Ok((values, start))
    }
}
