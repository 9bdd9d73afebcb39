//! Tag-record tokenization: a stream of matched tags with attributes,
//! nested bodies, and source spans.

use std::collections::VecDeque;
use std::fmt;

use log::debug;
use rustc_hash::FxHashSet;

use crate::html::markup::{MarkupEvent, MarkupScanner};
use crate::html::{in_tagnames, normalize_tagnames, VOID_TAGNAMES};
use crate::tokenizer::{Span, Spanned, TokenError, TokenStream};

/// A run of character data inside a tag's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub start: usize,
    pub stop: usize,
}

/// One entry in a tag's body: either a nested tag or character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Tag(HtmlTagToken),
    Text(TextNode),
}

/// A matched HTML tag.
///
/// `start` is the offset of the opening markup; `stop` is the offset of
/// the closing markup (a void element closes immediately, so its `stop`
/// equals its `start`). `attrs` preserves source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTagToken {
    pub tagname: String,
    pub attrs: Vec<(String, String)>,
    pub body: Vec<HtmlNode>,
    pub start: usize,
    pub stop: usize,
}

impl HtmlTagToken {
    /// The body rendered back to a string: nested tags re-rendered
    /// canonically, text verbatim.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.body {
            match node {
                HtmlNode::Tag(tag) => out.push_str(&tag.to_string()),
                HtmlNode::Text(text) => out.push_str(&text.text),
            }
        }
        out
    }

    /// Looks up an attribute, accepting `foo-bar` and `foo_bar`
    /// spellings interchangeably.
    pub fn attr(&self, name: &str) -> Option<&str> {
        let dashed = name.replace('_', "-");
        let underscored = name.replace('-', "_");
        self.attrs
            .iter()
            .find(|(attr, _)| *attr == name || *attr == dashed || *attr == underscored)
            .map(|(_, value)| value.as_str())
    }

    /// The nested tags of this tag, depth-first; an empty `tagnames`
    /// selection matches every tag.
    pub fn tags<'a>(&'a self, tagnames: &[&str]) -> Vec<&'a HtmlTagToken> {
        let wanted: FxHashSet<String> = tagnames.iter().map(|name| name.to_lowercase()).collect();
        let mut out = Vec::new();
        self.collect_tags(&wanted, &mut out);
        out
    }

    fn collect_tags<'a>(&'a self, wanted: &FxHashSet<String>, out: &mut Vec<&'a HtmlTagToken>) {
        for node in &self.body {
            if let HtmlNode::Tag(tag) = node {
                if wanted.is_empty() || wanted.contains(&tag.tagname) {
                    out.push(tag);
                }
                tag.collect_tags(wanted, out);
            }
        }
    }
}

impl Spanned for HtmlTagToken {
    fn span(&self) -> Span {
        Span::new(self.start, self.stop)
    }
}

impl fmt::Display for HtmlTagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tagname)?;
        for (name, value) in &self.attrs {
            write!(f, " {}=\"{}\"", name, value)?;
        }
        write!(f, ">{}</{}>", self.text(), self.tagname)
    }
}

/// Tokenizes HTML, yielding only the tags in the configured selection
/// (or every top-level tag when the selection is empty). Tags nested
/// inside a matched tag are retained in its `body` along with its text.
pub struct HtmlTagTokenizer {
    scanner: MarkupScanner,
    tagnames: FxHashSet<String>,
    pending: VecDeque<HtmlTagToken>,
}

impl HtmlTagTokenizer {
    pub fn new<I, S>(html: impl Into<String>, tagnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            scanner: MarkupScanner::new(html),
            tagnames: normalize_tagnames(tagnames),
            pending: VecDeque::new(),
        }
    }

    fn include_tag(&self, tagname: &str, attrs: &[(String, String)]) -> bool {
        self.tagnames.is_empty() || in_tagnames(&self.tagnames, tagname, attrs)
    }

    /// Adds a completed tag to its parent's body, or surfaces it when it
    /// closed at the top level.
    fn add_tag(stack: &mut Vec<HtmlTagToken>, pending: &mut VecDeque<HtmlTagToken>, tag: HtmlTagToken) {
        match stack.last_mut() {
            Some(parent) => parent.body.push(HtmlNode::Tag(tag)),
            None => pending.push_back(tag),
        }
    }
}

impl TokenStream for HtmlTagTokenizer {
    type Token = HtmlTagToken;

    fn next_token(&mut self) -> Result<HtmlTagToken, TokenError> {
        if let Some(tag) = self.pending.pop_front() {
            return Ok(tag);
        }

        // tags that have opened but not yet closed, innermost last
        let mut stack: Vec<HtmlTagToken> = Vec::new();

        loop {
            match self.scanner.next_event() {
                Some(MarkupEvent::StartTag(event)) => {
                    if stack.is_empty() && !self.include_tag(&event.name, &event.attrs) {
                        continue;
                    }

                    let tag = HtmlTagToken {
                        tagname: event.name.clone(),
                        attrs: event.attrs,
                        body: Vec::new(),
                        start: event.start,
                        // a void element has no closing markup; it begins
                        // and ends at the same offset
                        stop: event.start,
                    };

                    if event.self_closing || VOID_TAGNAMES.contains(event.name.as_str()) {
                        Self::add_tag(&mut stack, &mut self.pending, tag);
                        if stack.is_empty() {
                            if let Some(done) = self.pending.pop_front() {
                                return Ok(done);
                            }
                        }
                    } else {
                        stack.push(tag);
                    }
                }

                Some(MarkupEvent::Text(span)) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.body.push(HtmlNode::Text(TextNode {
                            text: self.scanner.slice(span).to_string(),
                            start: span.start,
                            stop: span.stop,
                        }));
                    }
                }

                Some(MarkupEvent::EndTag(event)) => {
                    // a closer only matches the innermost open tag; stray
                    // closers are dropped
                    if stack.last().map_or(false, |open| open.tagname == event.name) {
                        let mut tag = stack.pop().expect("stack top was just checked");
                        tag.stop = event.start;
                        let closed_at_top = stack.is_empty();
                        Self::add_tag(&mut stack, &mut self.pending, tag);
                        if closed_at_top {
                            if let Some(done) = self.pending.pop_front() {
                                return Ok(done);
                            }
                        }
                    }
                }

                Some(MarkupEvent::Comment(_)) | Some(MarkupEvent::Doctype(_)) => {}

                None => {
                    if stack.is_empty() {
                        return Err(TokenError::EndOfTokens);
                    }

                    // force-close whatever is still open at end of input
                    debug!("force-closing {} unterminated tag(s)", stack.len());
                    let eof = self.scanner.len();
                    while let Some(mut tag) = stack.pop() {
                        tag.stop = eof;
                        Self::add_tag(&mut stack, &mut self.pending, tag);
                    }
                    return self.pending.pop_front().ok_or(TokenError::EndOfTokens);
                }
            }
        }
    }

    fn prev_token(&mut self) -> Result<HtmlTagToken, TokenError> {
        // walk the document again from the start and keep the last tag
        // that completed at or before the cursor; costly, like any
        // whole-stream operation on this tokenizer
        let current = self.scanner.tell();
        self.pending.clear();

        self.scanner.seek(0);
        let mut found: Option<HtmlTagToken> = None;
        loop {
            match self.next_token() {
                Ok(tag) => {
                    if self.scanner.tell() <= current && self.pending.is_empty() {
                        found = Some(tag);
                    } else {
                        break;
                    }
                }
                Err(_) => break,
            }
        }

        match found {
            Some(tag) => {
                self.pending.clear();
                self.scanner.seek(tag.start);
                Ok(tag)
            }
            None => {
                self.pending.clear();
                self.scanner.seek(current);
                Err(TokenError::EndOfTokens)
            }
        }
    }

    fn buffer_tell(&self) -> usize {
        self.scanner.tell()
    }

    fn buffer_seek(&mut self, offset: usize) -> usize {
        self.scanner.seek(offset)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selected_tags_with_classes() {
        let html = "<p class=\"one\">one body</p>\n<p class=\"two\">two body</p>";
        let mut t = HtmlTagTokenizer::new(html, ["p"]);

        let tag = t.next_token().unwrap();
        assert_eq!(tag.attr("class"), Some("one"));
        assert_eq!(tag.text(), "one body");

        let tag = t.next_token().unwrap();
        assert_eq!(tag.attr("class"), Some("two"));
        assert_eq!(tag.text(), "two body");

        assert_eq!(t.next_token(), Err(TokenError::EndOfTokens));
    }

    #[test]
    fn nested_tags_are_retained_in_the_body() {
        let html = concat!(
            "<div>",
            "<p>one</p>",
            "<p>two with <a href=\"#\">link</a></p>",
            "<p>three with <img src=\"foobar.jpg\" /></p>",
            "<p>four with <img src=\"foobar.jpg\" /> and <a href=\"#2\">link</a></p>",
            "<p>five</p>",
            "</div>",
        );
        let mut t = HtmlTagTokenizer::new(html, ["p"]);
        let tags = t.read_all();

        assert_eq!(tags.len(), 5);
        assert_eq!(tags[1].body.len(), 2);
        assert_eq!(tags[2].body.len(), 2);
        assert_eq!(tags[3].body.len(), 4);
        assert_eq!(tags[4].body.len(), 1);
    }

    #[test]
    fn all_tags_when_no_selection() {
        let html = "<div><h1 class=\"foo\">h1 full</h1><p>this is something <b>bold</b> and stuff</p></div>";
        let mut t = HtmlTagTokenizer::new(html, [] as [&str; 0]);

        let tag = t.next_token().unwrap();
        assert_eq!(tag.tagname, "div");
        assert_eq!(tag.body.len(), 2);
        assert_eq!(t.next_token(), Err(TokenError::EndOfTokens));
    }

    #[test]
    fn missing_end_tags_are_force_closed_at_eof() {
        let html = "<div><h1 class=\"foo\">h1 full</h1><p>this is something <b>bold</b> and stuff</p>";
        let mut t = HtmlTagTokenizer::new(html, [] as [&str; 0]);

        let tag = t.next_token().unwrap();
        assert_eq!(tag.tagname, "div");
        assert_eq!(tag.stop, html.len());
    }

    #[test]
    fn void_elements_close_immediately() {
        let html = "<div><span><img src=\"\"><p>p data</p><br></span></div>";
        let mut t = HtmlTagTokenizer::new(html, [] as [&str; 0]);

        let div = t.next_token().unwrap();
        assert_eq!(div.body.len(), 1);
        let HtmlNode::Tag(span) = &div.body[0] else {
            panic!("expected the span child");
        };
        assert_eq!(span.body.len(), 3);

        let HtmlNode::Tag(img) = &span.body[0] else {
            panic!("expected the img child");
        };
        assert_eq!(img.start, img.stop);
        assert!(img.body.is_empty());
    }

    #[test]
    fn renders_canonically() {
        let mut t = HtmlTagTokenizer::new("<p class=\"one\">body <b>bold</b></p>", ["p"]);
        let tag = t.next_token().unwrap();
        assert_eq!(tag.to_string(), "<p class=\"one\">body <b>bold</b></p>");
    }

    #[test]
    fn attr_spelling_is_interchangeable() {
        let mut t = HtmlTagTokenizer::new("<p data-foo-bar=\"x\">y</p>", ["p"]);
        let tag = t.next_token().unwrap();
        assert_eq!(tag.attr("data-foo-bar"), Some("x"));
        assert_eq!(tag.attr("data_foo_bar"), Some("x"));
        assert_eq!(tag.attr("data-foo-baz"), None);
    }

    #[test]
    fn source_spans_extract_the_original(){
        let html = "pre <section id=\"s\">inner <em>x</em></section> post";
        let mut t = HtmlTagTokenizer::new(html, ["section"]);
        let tag = t.next_token().unwrap();
        assert_eq!(&html[tag.start..tag.stop], "<section id=\"s\">inner <em>x</em>");
        assert!(html[tag.stop..].starts_with("</section>"));
    }

    #[test]
    fn next_and_prev_walk_the_same_stream() {
        let html = "<one>1</one>\n<two>2</two>\n<three>3</three>\n<four>4</four>";
        let mut t = HtmlTagTokenizer::new(html, [] as [&str; 0]);

        assert_eq!(t.prev_token(), Err(TokenError::EndOfTokens));

        assert_eq!(t.next_token().unwrap().tagname, "one");
        assert_eq!(t.prev_token().unwrap().tagname, "one");
        assert_eq!(t.next_token().unwrap().tagname, "one");
        assert_eq!(t.next_token().unwrap().tagname, "two");
        assert_eq!(t.next_token().unwrap().tagname, "three");

        let four = t.next_token().unwrap();
        assert_eq!(four.tagname, "four");
        assert_eq!(four.text(), "4");

        assert_eq!(t.next_token(), Err(TokenError::EndOfTokens));

        assert_eq!(t.prev_token().unwrap().tagname, "four");
        assert_eq!(t.prev_token().unwrap().tagname, "three");
    }

    #[test]
    fn subtag_search() {
        let html = "<div><p>one <a href=\"#\">x</a></p><p>two</p></div>";
        let mut t = HtmlTagTokenizer::new(html, ["div"]);
        let div = t.next_token().unwrap();

        assert_eq!(div.tags(&[]).len(), 3);
        assert_eq!(div.tags(&["p"]).len(), 2);
        assert_eq!(div.tags(&["a"]).len(), 1);
    }
}
