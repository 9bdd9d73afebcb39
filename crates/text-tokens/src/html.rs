//! HTML lexing and cleanup.
//!
//! Three views over the same markup, all built on byte-offset scanning
//! rather than a DOM:
//!
//!  - [`HtmlCleaner`] strips markup to plain text, optionally preserving
//!    some tags verbatim or removing whole subtrees.
//!  - [`HtmlTagTokenizer`] yields matched tag records with attributes,
//!    nested bodies, and source spans.
//!  - [`HtmlBlockTokenizer`] yields `(markup, text)` pairs whose
//!    concatenation reproduces the input exactly.
//!
//! None of this is a conforming HTML5 parser; it is a tag lexer in the
//! spirit of a streaming tag processor, good enough to strip, select,
//! and re-render real-world markup.

mod blocks;
mod cleaner;
mod markup;
mod tags;

pub use blocks::HtmlBlockTokenizer;
pub use cleaner::{CleanerOptions, HtmlCleaner};
pub use tags::{HtmlNode, HtmlTagToken, HtmlTagTokenizer, TextNode};

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// Void (empty) elements: no closing tag, no body content.
///
/// https://developer.mozilla.org/en-US/docs/Glossary/Void_element
pub static VOID_TAGNAMES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
        "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect()
});

/// Block-level elements: stripping one of these emits the cleaner's
/// `block_sep`.
///
/// https://developer.mozilla.org/en-US/docs/Web/HTML/Block-level_elements
pub static BLOCK_TAGNAMES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "article",
        "aside",
        "blockquote",
        "body",
        "br",
        "button",
        "canvas",
        "caption",
        "col",
        "colgroup",
        "dd",
        "div",
        "dl",
        "dt",
        "embed",
        "fieldset",
        "figcaption",
        "figure",
        "footer",
        "form",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "header",
        "hgroup",
        "hr",
        "li",
        "map",
        "object",
        "ol",
        "output",
        "p",
        "pre",
        "progress",
        "section",
        "table",
        "tbody",
        "textarea",
        "tfoot",
        "th",
        "thead",
        "tr",
        "ul",
        "video",
    ]
    .into_iter()
    .collect()
});

/// Inline elements. An inline element cannot contain a block element.
pub static INLINE_TAGNAMES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "abbr", "acronym", "b", "bdo", "big", "cite", "code", "dfn", "em", "i", "img",
        "input", "kbd", "label", "map", "object", "output", "q", "samp", "script", "select",
        "small", "span", "strong", "sub", "sup", "time", "tt", "var",
    ]
    .into_iter()
    .collect()
});

/// Lowercases a collection of configured tag names or selectors.
pub(crate) fn normalize_tagnames<I, S>(tagnames: I) -> FxHashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tagnames
        .into_iter()
        .map(|name| name.as_ref().to_lowercase())
        .collect()
}

/// Tests a tag against a set of configured names and selectors.
///
/// Besides bare tag names the sets may hold `tag.class` and `tag#id`
/// selectors; those match only when the tag carries the corresponding
/// `class` or `id` attribute. This is not a CSS engine; the attribute
/// value is matched whole.
pub(crate) fn in_tagnames(
    tagnames: &FxHashSet<String>,
    tagname: &str,
    attrs: &[(String, String)],
) -> bool {
    if tagnames.is_empty() {
        return false;
    }

    if tagnames.contains(tagname) {
        return true;
    }

    for (name, value) in attrs {
        let selector = match name.as_str() {
            "class" => format!("{tagname}.{value}"),
            "id" => format!("{tagname}#{value}"),
            _ => continue,
        };
        if tagnames.contains(&selector) {
            return true;
        }
    }

    false
}

/// Strips all markup from `html`, separating block elements with
/// newlines.
///
/// ```
/// assert_eq!(text_tokens::html::plain("this is <b>some html</b>"), "this is some html");
/// ```
pub fn plain(html: &str) -> String {
    HtmlCleaner::default().feed(html)
}

/// Removes the subtrees of every tag in `strip_tagnames` while leaving
/// all other markup intact.
///
/// ```
/// let cleaned = text_tokens::html::strip_tags(
///     "<p>this is some <span>fancy text</span> stuff</p>",
///     ["span"],
/// );
/// assert_eq!(cleaned, "<p>this is some  stuff</p>");
/// ```
pub fn strip_tags<I, S>(html: &str, strip_tagnames: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    HtmlCleaner::new(
        CleanerOptions::new()
            .ignore_all()
            .strip(strip_tagnames),
    )
    .feed(html)
}

/// Returns a tokenizer over the tags in `tagnames` (all tags when the
/// selection is empty).
pub fn tags<I, S>(html: impl Into<String>, tagnames: I) -> HtmlTagTokenizer
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    HtmlTagTokenizer::new(html, tagnames)
}

/// Returns a block tokenizer whose `(markup, text)` pairs concatenate
/// back to `html`, treating tags in `ignore_tagnames` as opaque spans.
pub fn blocks<I, S>(html: impl Into<String>, ignore_tagnames: I) -> HtmlBlockTokenizer
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    HtmlBlockTokenizer::new(html, ignore_tagnames)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selector_matching() {
        let set = normalize_tagnames(["div.foo", "span#bar", "p"]);
        let class_attr = vec![("class".to_string(), "foo".to_string())];
        let id_attr = vec![("id".to_string(), "bar".to_string())];

        assert!(in_tagnames(&set, "p", &[]));
        assert!(in_tagnames(&set, "div", &class_attr));
        assert!(!in_tagnames(&set, "div", &id_attr));
        assert!(!in_tagnames(&set, "div", &[]));
        assert!(in_tagnames(&set, "span", &id_attr));
        assert!(!in_tagnames(&set, "span", &[]));
    }

    #[test]
    fn taxonomy_is_disjoint_where_it_matters() {
        assert!(VOID_TAGNAMES.contains("br"));
        assert!(BLOCK_TAGNAMES.contains("br"));
        assert!(!INLINE_TAGNAMES.contains("div"));
        assert!(INLINE_TAGNAMES.contains("a"));
    }
}
