//! Event-driven HTML stripping.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::html::markup::{MarkupEvent, MarkupScanner, TagEvent};
use crate::html::{in_tagnames, normalize_tagnames, BLOCK_TAGNAMES, VOID_TAGNAMES};

/// Configuration for [`HtmlCleaner`].
///
/// Tag sets may hold bare names (`"div"`) or the simple selectors
/// `tag.class` / `tag#id`.
pub struct CleanerOptions {
    /// Tags whose markup is preserved verbatim in the output.
    pub ignore_tagnames: FxHashSet<String>,
    /// Preserve every tag that isn't stripped, regardless of
    /// `ignore_tagnames`.
    pub ignore_all: bool,
    /// Tags whose entire subtree (opening tag, body, closing tag) is
    /// removed from the output.
    pub strip_tagnames: FxHashSet<String>,
    /// Appended in place of a removed block-level tag's closer.
    pub block_sep: String,
    /// Appended in place of a removed inline tag's closer.
    pub inline_sep: String,
    /// When a plain-text pass removes an `<img>`, emit its `src`
    /// attribute (surrounded by `block_sep`) in its place.
    pub keep_img_src: bool,
}

impl Default for CleanerOptions {
    fn default() -> Self {
        Self {
            ignore_tagnames: FxHashSet::default(),
            ignore_all: false,
            strip_tagnames: FxHashSet::default(),
            block_sep: "\n".to_string(),
            inline_sep: String::new(),
            keep_img_src: false,
        }
    }
}

impl CleanerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore<I, S>(mut self, tagnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_tagnames = normalize_tagnames(tagnames);
        self
    }

    pub fn ignore_all(mut self) -> Self {
        self.ignore_all = true;
        self
    }

    pub fn strip<I, S>(mut self, tagnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.strip_tagnames = normalize_tagnames(tagnames);
        self
    }

    pub fn block_sep(mut self, sep: impl Into<String>) -> Self {
        self.block_sep = sep.into();
        self
    }

    pub fn inline_sep(mut self, sep: impl Into<String>) -> Self {
        self.inline_sep = sep.into();
        self
    }

    pub fn keep_img_src(mut self) -> Self {
        self.keep_img_src = true;
        self
    }
}

/// Turns HTML into plain text, completely removes configured subtrees,
/// or both.
///
/// ```
/// use text_tokens::html::{CleanerOptions, HtmlCleaner};
///
/// // convert html to plain text
/// let text = HtmlCleaner::default().feed("this is <b>some html</b>");
/// assert_eq!(text, "this is some html");
///
/// // strip certain tags from the html, leaving the rest intact
/// let cleaner = HtmlCleaner::new(CleanerOptions::new().ignore_all().strip(["span"]));
/// let text = cleaner.feed("<p>this is some <span>fancy text</span> stuff</p>");
/// assert_eq!(text, "<p>this is some  stuff</p>");
/// ```
#[derive(Default)]
pub struct HtmlCleaner {
    options: CleanerOptions,
}

impl HtmlCleaner {
    pub fn new(options: CleanerOptions) -> Self {
        Self { options }
    }

    /// Processes `html` and returns the cleaned output.
    pub fn feed(&self, html: &str) -> String {
        let mut scanner = MarkupScanner::new(html);
        let mut out = String::new();

        // nesting depth per stripped tag name; while any counter is
        // active every event is discarded
        let mut stripping: FxHashMap<String, usize> = FxHashMap::default();

        while let Some(event) = scanner.next_event() {
            match event {
                MarkupEvent::Text(span) => {
                    if stripping.is_empty() {
                        out.push_str(&html[span.start..span.stop]);
                    }
                }
                MarkupEvent::Comment(_) | MarkupEvent::Doctype(_) => {}
                MarkupEvent::StartTag(tag) => {
                    self.open_tag(&tag, html, &mut out, &mut stripping)
                }
                MarkupEvent::EndTag(tag) => self.close_tag(&tag.name, &mut out, &mut stripping),
            }
        }

        if !stripping.is_empty() {
            debug!("input ended inside a stripped region: {:?}", stripping.keys());
        }

        out
    }

    fn is_stripped(&self, tagname: &str, attrs: &[(String, String)]) -> bool {
        in_tagnames(&self.options.strip_tagnames, tagname, attrs)
    }

    fn is_ignored(&self, tagname: &str, attrs: &[(String, String)]) -> bool {
        self.options.ignore_all || in_tagnames(&self.options.ignore_tagnames, tagname, attrs)
    }

    fn open_tag(
        &self,
        tag: &TagEvent,
        html: &str,
        out: &mut String,
        stripping: &mut FxHashMap<String, usize>,
    ) {
        let void = tag.self_closing || VOID_TAGNAMES.contains(tag.name.as_str());

        if self.is_stripped(&tag.name, &tag.attrs) {
            // a void tag is a complete subtree; it vanishes with its markup
            if !void {
                *stripping.entry(tag.name.clone()).or_insert(0) += 1;
            }
            return;
        }

        if !stripping.is_empty() {
            // a nested same-name opener deepens the active region so its
            // closer doesn't end the strip early
            if !void {
                if let Some(depth) = stripping.get_mut(&tag.name) {
                    *depth += 1;
                }
            }
            return;
        }

        if self.is_ignored(&tag.name, &tag.attrs) {
            out.push_str(&html[tag.start..tag.stop]);
            return;
        }

        if tag.name == "img" && self.options.keep_img_src {
            if let Some((_, src)) = tag.attrs.iter().find(|(name, _)| name == "src") {
                out.push_str(&self.options.block_sep);
                out.push_str(src);
            }
        }

        if void {
            self.close_separator(&tag.name, out);
        }
    }

    fn close_tag(&self, tagname: &str, out: &mut String, stripping: &mut FxHashMap<String, usize>) {
        if !stripping.is_empty() {
            if let Some(depth) = stripping.get_mut(tagname) {
                *depth -= 1;
                if *depth == 0 {
                    stripping.remove(tagname);
                }
            }
            return;
        }

        // selectors cannot match here: a closing tag carries no attributes
        if self.is_ignored(tagname, &[]) {
            out.push('<');
            out.push('/');
            out.push_str(tagname);
            out.push('>');
            return;
        }

        self.close_separator(tagname, out);
    }

    fn close_separator(&self, tagname: &str, out: &mut String) {
        if BLOCK_TAGNAMES.contains(tagname) {
            out.push_str(&self.options.block_sep);
        } else if tagname == "img" && self.options.keep_img_src {
            out.push_str(&self.options.block_sep);
        } else {
            out.push_str(&self.options.inline_sep);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn plain_text_extraction() {
        assert_eq!(HtmlCleaner::default().feed("foo<br />bar"), "foo\nbar");
        assert_eq!(HtmlCleaner::default().feed("foo<br>bar"), "foo\nbar");
    }

    #[test]
    fn entity_references_pass_through_verbatim() {
        let cleaned = HtmlCleaner::default().feed("&lt;:x|<br />&gt;:)");
        assert_eq!(cleaned, "&lt;:x|\n&gt;:)");
    }

    #[test]
    fn inline_tags_leave_no_seam() {
        let html = r#"Sideways <a href="/wiki/Latin_1" class="mw-redirect" title="Latin 1">Latin</a>-only emoticons"#;
        assert_eq!(
            HtmlCleaner::default().feed(html),
            "Sideways Latin-only emoticons"
        );
    }

    #[test]
    fn strip_selector_removes_the_whole_subtree() {
        let cleaner = HtmlCleaner::new(CleanerOptions::new().strip(["div.foo"]));
        let cleaned =
            cleaner.feed(r#"<div class="foo">1<div>2</div>3</div><div>4</div><p>5</p>"#);
        assert_eq!(cleaned, "4\n5\n");
    }

    #[test]
    fn strip_by_bare_name() {
        let cleaner = HtmlCleaner::new(CleanerOptions::new().ignore_all().strip(["span"]));
        let cleaned = cleaner.feed("<p>this is some <span>fancy text</span> stuff</p>");
        assert_eq!(cleaned, "<p>this is some  stuff</p>");
    }

    #[test]
    fn ignored_tags_keep_their_original_markup() {
        let cleaner = HtmlCleaner::new(CleanerOptions::new().ignore(["a"]));
        let cleaned = cleaner.feed(r##"<p>see <a HREF="#x">here</a></p>"##);
        assert_eq!(cleaned, r##"see <a HREF="#x">here</a>"##.to_string() + "\n");
    }

    #[test]
    fn keep_img_src_surfaces_the_source() {
        let html = r#"foo <img src="bar.jpeg" /> che"#;

        let kept = HtmlCleaner::new(CleanerOptions::new().keep_img_src()).feed(html);
        assert_eq!(kept, "foo \nbar.jpeg\n che");

        let dropped = HtmlCleaner::default().feed(html);
        assert_eq!(dropped, "foo  che");
    }

    #[test]
    fn stripped_void_tags_vanish() {
        let cleaner = HtmlCleaner::new(CleanerOptions::new().ignore_all().strip(["img"]));
        let cleaned = cleaner.feed(r#"a<img src="x.png">b"#);
        assert_eq!(cleaned, "ab");
    }

    #[test]
    fn custom_separators() {
        let cleaner =
            HtmlCleaner::new(CleanerOptions::new().block_sep(" | ").inline_sep("·"));
        let cleaned = cleaner.feed("<p>one</p><p>two</p><b>bold</b>");
        assert_eq!(cleaned, "one | two | bold·");
    }

    #[quickcheck]
    fn idempotent_on_plain_text(text: String) -> bool {
        let plain: String = text.chars().filter(|&ch| ch != '<').collect();
        HtmlCleaner::default().feed(&plain) == plain
    }
}
