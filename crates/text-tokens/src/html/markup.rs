//! Low-level markup event scanning shared by the HTML layers.
//!
//! The scanner walks a buffer byte-by-byte and classifies each `<` the
//! way a streaming tag processor does: tag opener, tag closer, comment,
//! DOCTYPE, or plain text. It carries no nesting state; that belongs to
//! the layers above.

use memchr::memmem;

use crate::macros::{charcspn, charspn};
use crate::tokenizer::Span;

/// A matched start or end tag.
pub(crate) struct TagEvent {
    /// ASCII-lowercased tag name.
    pub name: String,
    /// Attributes in source order; a bare boolean attribute has an empty
    /// value. Always empty on end tags.
    pub attrs: Vec<(String, String)>,
    /// Offset of the opening `<`.
    pub start: usize,
    /// Offset one past the closing `>`, or the end of the buffer when
    /// the markup is unterminated.
    pub stop: usize,
    /// Whether the tag carries the `/>` self-closing flag.
    pub self_closing: bool,
}

pub(crate) enum MarkupEvent {
    StartTag(TagEvent),
    EndTag(TagEvent),
    Text(Span),
    /// An HTML comment or anything else that parses like one: bogus
    /// comments (`<!…>`, `<?…>`) and closers with non-alpha names.
    Comment(Span),
    Doctype(Span),
}

pub(crate) struct MarkupScanner {
    html: Box<str>,
    at: usize,
}

impl MarkupScanner {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into().into_boxed_str(),
            at: 0,
        }
    }

    pub fn source(&self) -> &str {
        &self.html
    }

    pub fn slice(&self, span: Span) -> &str {
        &self.html[span.start..span.stop]
    }

    pub fn tell(&self) -> usize {
        self.at
    }

    pub fn seek(&mut self, offset: usize) -> usize {
        self.at = offset.min(self.html.len());
        self.at
    }

    pub fn len(&self) -> usize {
        self.html.len()
    }

    pub fn next_event(&mut self) -> Option<MarkupEvent> {
        let doc: &str = &self.html;
        let len = doc.len();
        let was_at = self.at;
        if was_at >= len {
            return None;
        }

        let mut at = was_at;
        loop {
            let Some(lt) = strpos(doc, "<", at) else {
                // nothing remains but a text node
                self.at = len;
                return Some(MarkupEvent::Text(Span::new(was_at, len)));
            };
            at = lt;

            /*
             * A "<" starts a syntax token only when followed by "!", "/",
             * "?", or a tag-name letter. Anything else is plain text; this
             * keeps things like "<3" rendered instead of hidden.
             */
            let launches = matches!(
                doc.as_bytes().get(at + 1),
                Some(b'!' | b'/' | b'?' | b'a'..=b'z' | b'A'..=b'Z')
            );
            if !launches {
                at += 1;
                continue;
            }

            if at > was_at {
                self.at = at;
                return Some(MarkupEvent::Text(Span::new(was_at, at)));
            }
            break;
        }

        let bytes = doc.as_bytes();

        if bytes[at + 1] == b'!' {
            return Some(self.markup_declaration(at));
        }

        /*
         * "<?" transitions to a bogus comment. Skip to the nearest ">".
         * If no closer exists the markup was truncated.
         */
        if bytes[at + 1] == b'?' {
            let stop = strpos(doc, ">", at + 2).map(|gt| gt + 1).unwrap_or(len);
            self.at = stop;
            return Some(MarkupEvent::Comment(Span::new(at, stop)));
        }

        let is_closer = bytes[at + 1] == b'/';

        // a closer whose name doesn't start with a letter is a comment
        if is_closer && !matches!(bytes.get(at + 2), Some(b'a'..=b'z' | b'A'..=b'Z')) {
            let stop = strpos(doc, ">", at + 2).map(|gt| gt + 1).unwrap_or(len);
            self.at = stop;
            return Some(MarkupEvent::Comment(Span::new(at, stop)));
        }

        let name_at = at + if is_closer { 2 } else { 1 };
        let name_length = charcspn!(doc, ' ' | '\t' | '\x0c' | '\r' | '\n' | '/' | '>', name_at);
        let name = doc[name_at..name_at + name_length].to_ascii_lowercase();

        let mut pos = name_at + name_length;
        let mut attrs = Vec::new();
        loop {
            let (attr, next_pos) = parse_next_attribute(doc, pos);
            pos = next_pos;
            match attr {
                // closers may not carry attributes, but any present in the
                // source still need to be consumed to find the real ">"
                Some(pair) if !is_closer => attrs.push(pair),
                Some(_) => {}
                None => break,
            }
        }

        let (stop, self_closing) = match strpos(doc, ">", pos) {
            Some(gt) => (gt + 1, gt >= 1 && bytes[gt - 1] == b'/'),
            None => (len, false),
        };
        self.at = stop;

        let event = TagEvent {
            name,
            attrs,
            start: at,
            stop,
            self_closing,
        };
        Some(if is_closer {
            MarkupEvent::EndTag(event)
        } else {
            MarkupEvent::StartTag(event)
        })
    }

    /// Handles `<!`: comments, DOCTYPE, and bogus comments.
    fn markup_declaration(&mut self, at: usize) -> MarkupEvent {
        let doc: &str = &self.html;
        let bytes = doc.as_bytes();
        let len = doc.len();

        if doc.get(at + 2..).is_some_and(|rest| rest.starts_with("--")) {
            let closer_at = at + 4;
            if closer_at >= len {
                self.at = len;
                return MarkupEvent::Comment(Span::new(at, len));
            }

            // abruptly-closed empty comments are dashes followed by ">"
            let dashes = charspn!(doc, '-', closer_at);
            if bytes.get(closer_at + dashes) == Some(&b'>') {
                let stop = closer_at + dashes + 1;
                self.at = stop;
                return MarkupEvent::Comment(Span::new(at, stop));
            }

            /*
             * Comments close at the first "-->" or at the invalid "--!>".
             */
            let mut search = closer_at;
            loop {
                let Some(dashes_at) = strpos(doc, "--", search) else {
                    self.at = len;
                    return MarkupEvent::Comment(Span::new(at, len));
                };
                if bytes.get(dashes_at + 2) == Some(&b'>') {
                    let stop = dashes_at + 3;
                    self.at = stop;
                    return MarkupEvent::Comment(Span::new(at, stop));
                }
                if bytes.get(dashes_at + 2) == Some(&b'!') && bytes.get(dashes_at + 3) == Some(&b'>')
                {
                    let stop = dashes_at + 4;
                    self.at = stop;
                    return MarkupEvent::Comment(Span::new(at, stop));
                }
                search = dashes_at + 1;
            }
        }

        // "<!DOCTYPE", ASCII case-insensitive
        if doc
            .get(at + 2..at + 9)
            .is_some_and(|word| word.eq_ignore_ascii_case("doctype"))
        {
            let stop = strpos(doc, ">", at + 9).map(|gt| gt + 1).unwrap_or(len);
            self.at = stop;
            return MarkupEvent::Doctype(Span::new(at, stop));
        }

        // anything else is an incorrectly-opened comment
        let stop = strpos(doc, ">", at + 2).map(|gt| gt + 1).unwrap_or(len);
        self.at = stop;
        MarkupEvent::Comment(Span::new(at, stop))
    }
}

/// Parses one attribute starting at or after `at`, skipping leading
/// whitespace and stray slashes. Returns the parsed attribute (or `None`
/// when the cursor reached the end of the tag's attribute list) and the
/// new offset.
fn parse_next_attribute(doc: &str, at: usize) -> (Option<(String, String)>, usize) {
    let len = doc.len();
    let mut at = at + charspn!(doc, ' ' | '\t' | '\x0c' | '\r' | '\n' | '/', at.min(len));
    if at >= len {
        return (None, at);
    }

    /*
     * A leading "=" is treated as part of the attribute name, matching
     * the before-attribute-name state in the HTML specification.
     */
    let starts_with_equal = doc.as_bytes()[at] == b'=';
    let start_shift = usize::from(starts_with_equal);
    let name_length = start_shift
        + charcspn!(
            doc,
            '=' | '/' | '>' | ' ' | '\t' | '\x0c' | '\r' | '\n',
            at + start_shift
        );

    if name_length == 0 {
        // no attribute here, just the tag closer
        return (None, at);
    }

    let name_end = at + name_length;
    let name = doc[at..name_end].to_ascii_lowercase();

    at = name_end + charspn!(doc, ' ' | '\t' | '\x0c' | '\r' | '\n', name_end.min(len));
    if at >= len || doc.as_bytes()[at] != b'=' {
        // boolean attribute
        return (Some((name, String::new())), name_end);
    }

    at += 1;
    at += charspn!(doc, ' ' | '\t' | '\x0c' | '\r' | '\n', at.min(len));
    if at >= len {
        return (Some((name, String::new())), at);
    }

    match doc.as_bytes()[at] {
        quote @ (b'\'' | b'"') => {
            let value_start = at + 1;
            let value_end = memchr::memchr(quote, &doc.as_bytes()[value_start..])
                .map(|hit| value_start + hit)
                .unwrap_or(len);
            let value = doc[value_start..value_end].to_string();
            ((Some((name, value))), (value_end + 1).min(len))
        }
        _ => {
            let value_end = at + charcspn!(doc, '>' | ' ' | '\t' | '\x0c' | '\r' | '\n', at);
            let value = doc[at..value_end].to_string();
            (Some((name, value)), value_end)
        }
    }
}

fn strpos(s: &str, pattern: &str, offset: usize) -> Option<usize> {
    let rest = s.as_bytes().get(offset..)?;
    memmem::find(rest, pattern.as_bytes()).map(|at| at + offset)
}

#[cfg(test)]
mod test {
    use super::*;

    fn start_tag(scanner: &mut MarkupScanner) -> TagEvent {
        match scanner.next_event() {
            Some(MarkupEvent::StartTag(tag)) => tag,
            _ => panic!("expected a start tag"),
        }
    }

    #[test]
    fn classifies_a_simple_document() {
        let mut scanner = MarkupScanner::new("<p>Hello world!</p>");

        let tag = start_tag(&mut scanner);
        assert_eq!(tag.name, "p");
        assert_eq!((tag.start, tag.stop), (0, 3));

        match scanner.next_event() {
            Some(MarkupEvent::Text(span)) => {
                assert_eq!(scanner.slice(span), "Hello world!")
            }
            _ => panic!("expected text"),
        }

        match scanner.next_event() {
            Some(MarkupEvent::EndTag(tag)) => assert_eq!(tag.name, "p"),
            _ => panic!("expected an end tag"),
        }

        assert!(scanner.next_event().is_none());
    }

    #[test]
    fn attributes_keep_source_order() {
        let mut scanner =
            MarkupScanner::new(r#"<div data-B="2" class='c' checked id=main>x</div>"#);
        let tag = start_tag(&mut scanner);
        assert_eq!(
            tag.attrs,
            vec![
                ("data-b".to_string(), "2".to_string()),
                ("class".to_string(), "c".to_string()),
                ("checked".to_string(), String::new()),
                ("id".to_string(), "main".to_string()),
            ]
        );
    }

    #[test]
    fn quoted_gt_does_not_close_the_tag() {
        let mut scanner = MarkupScanner::new(r#"<a href="x>y" title='a>b'>text"#);
        let tag = start_tag(&mut scanner);
        assert_eq!(tag.name, "a");
        assert_eq!(tag.attrs[0].1, "x>y");
        assert_eq!(tag.attrs[1].1, "a>b");
        assert_eq!(&scanner.source()[tag.stop..], "text");
    }

    #[test]
    fn heart_is_not_a_tag() {
        let mut scanner = MarkupScanner::new("I <3 parsing<br>");
        match scanner.next_event() {
            Some(MarkupEvent::Text(span)) => assert_eq!(scanner.slice(span), "I <3 parsing"),
            _ => panic!("expected text"),
        }
        assert_eq!(start_tag(&mut scanner).name, "br");
    }

    #[test]
    fn self_closing_flag() {
        let mut scanner = MarkupScanner::new("<br /><hr>");
        assert!(start_tag(&mut scanner).self_closing);
        assert!(!start_tag(&mut scanner).self_closing);
    }

    #[test]
    fn comments_and_doctype() {
        let mut scanner = MarkupScanner::new("<!doctype html><!-- a -- b --><!--->rest");
        assert!(matches!(
            scanner.next_event(),
            Some(MarkupEvent::Doctype(span)) if span == Span::new(0, 15)
        ));
        match scanner.next_event() {
            Some(MarkupEvent::Comment(span)) => {
                assert_eq!(scanner.slice(span), "<!-- a -- b -->")
            }
            _ => panic!("expected a comment"),
        }
        // abruptly-closed comment
        match scanner.next_event() {
            Some(MarkupEvent::Comment(span)) => assert_eq!(scanner.slice(span), "<!--->"),
            _ => panic!("expected a comment"),
        }
        match scanner.next_event() {
            Some(MarkupEvent::Text(span)) => assert_eq!(scanner.slice(span), "rest"),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn unterminated_markup_runs_to_eof() {
        let mut scanner = MarkupScanner::new(r#"<a href="still open"#);
        let tag = start_tag(&mut scanner);
        assert_eq!(tag.name, "a");
        assert_eq!(tag.stop, scanner.len());
        assert!(scanner.next_event().is_none());
    }
}
