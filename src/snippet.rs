//! Replacement content model and rich text degradation.
//!
//! Replacement content is either plain text or HTML markup. Clipboard-based
//! substitution delivers HTML in its native form, but sensitive applications
//! are typed into character by character, which requires degrading the markup
//! to plain text first.

use regex::Regex;
use std::sync::LazyLock;

/// The Unicode object replacement character. Rich text editors substitute it
/// for embedded images when rendering to plain text; it has no typed
/// equivalent and is removed before character-by-character typing.
pub const OBJECT_REPLACEMENT_CHAR: char = '\u{fffc}';

static BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b.*?</style\s*>|<script\b.*?</script\s*>")
        .expect("valid style/script block regex")
});

static LINE_BREAK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>|</li\s*>").expect("valid line break regex")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

static NUMERIC_ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:x([0-9a-fA-F]+)|([0-9]+));").expect("valid numeric entity regex")
});

/// The content of one substitution, in its native form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Plain text, delivered verbatim.
    Plain(String),
    /// HTML markup, pasted natively or degraded to plain text when typed.
    Html(String),
}

impl Replacement {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Self::Html(markup.into())
    }

    pub fn is_html(&self) -> bool {
        matches!(self, Self::Html(_))
    }

    /// The raw content as provided by the caller.
    pub fn raw(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Html(text) => text,
        }
    }

    /// The content as it will render in the target application: HTML is
    /// stripped to plain text, plain text is returned unchanged.
    ///
    /// The cursor repositioning step counts printable characters of this
    /// form, since that is the text the caret actually moves over.
    pub fn rendered_text(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Html(markup) => strip_html(markup),
        }
    }

    /// The content in typeable form: like [`rendered_text`], but with the
    /// object replacement character removed, since images cannot be typed.
    ///
    /// [`rendered_text`]: Self::rendered_text
    pub fn typed_text(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Html(markup) => strip_html(markup)
                .chars()
                .filter(|&c| c != OBJECT_REPLACEMENT_CHAR)
                .collect(),
        }
    }
}

/// Degrade HTML markup to plain text.
///
/// Style and script blocks are dropped, line-breaking tags become newlines,
/// remaining tags are removed and entities are decoded. Literal newlines in
/// the markup are preserved.
fn strip_html(markup: &str) -> String {
    let without_blocks = BLOCK_REGEX.replace_all(markup, "");
    let with_breaks = LINE_BREAK_REGEX.replace_all(&without_blocks, "\n");
    let without_tags = TAG_REGEX.replace_all(&with_breaks, "");
    decode_entities(&without_tags)
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY_REGEX.replace_all(text, |caps: &regex::Captures| {
        let code = caps
            .get(1)
            .map(|hex| u32::from_str_radix(hex.as_str(), 16))
            .or_else(|| caps.get(2).map(|dec| dec.as_str().parse::<u32>()))
            .and_then(|parsed| parsed.ok());
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    // `&amp;` must decode last so that e.g. "&amp;lt;" yields "&lt;"
    decoded
        .replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_passthrough() {
        let replacement = Replacement::plain("hello\nworld");
        assert_eq!(replacement.rendered_text(), "hello\nworld");
        assert_eq!(replacement.typed_text(), "hello\nworld");
        assert!(!replacement.is_html());
    }

    #[test]
    fn test_inline_tags_stripped() {
        let replacement = Replacement::html("<b>Hi</b>\nThere");
        assert_eq!(replacement.typed_text(), "Hi\nThere");
    }

    #[test]
    fn test_line_break_tags() {
        assert_eq!(
            Replacement::html("first<br>second<br/>third").rendered_text(),
            "first\nsecond\nthird"
        );
        assert_eq!(
            Replacement::html("<p>one</p><p>two</p>").rendered_text(),
            "one\ntwo"
        );
    }

    #[test]
    fn test_style_block_dropped() {
        let markup = "<html><head><style type=\"text/css\">p { color: red; }</style></head>\
                      <body><p>visible</p></body></html>";
        assert_eq!(Replacement::html(markup).rendered_text(), "visible\n");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            Replacement::html("a &lt;b&gt; &amp; c &quot;d&quot;").rendered_text(),
            "a <b> & c \"d\""
        );
        assert_eq!(Replacement::html("&#65;&#x42;").rendered_text(), "AB");
        // double-encoded entity decodes one level only
        assert_eq!(Replacement::html("&amp;lt;").rendered_text(), "&lt;");
    }

    #[test]
    fn test_object_replacement_char_removed_when_typed() {
        let markup = format!("before{}after", OBJECT_REPLACEMENT_CHAR);
        let replacement = Replacement::html(markup.clone());
        assert_eq!(
            replacement.rendered_text(),
            format!("before{}after", OBJECT_REPLACEMENT_CHAR)
        );
        assert_eq!(replacement.typed_text(), "beforeafter");

        // plain content is delivered verbatim, even if it contains the marker
        let plain = Replacement::plain(markup.clone());
        assert_eq!(plain.typed_text(), markup);
    }
}
