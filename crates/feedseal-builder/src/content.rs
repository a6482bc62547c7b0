//! Content processing: markdown rendering, HTML sanitizing, plain text and
//! summaries.
//!
//! Markdown is rendered once, the result sanitized once, and plain text is
//! always derived from sanitized HTML.

use lazy_static::lazy_static;
use pulldown_cmark::{html, Options, Parser};
use regex::{Captures, Regex};

lazy_static! {
    static ref BLOCK_TAG_RE: Regex =
        Regex::new(r"(?i)</?(p|div|br|h[1-6]|li|ul|ol|blockquote|pre|tr|table|hr)\b[^>]*>")
            .expect("block tag pattern");
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").expect("tag pattern");
    static ref ENTITY_RE: Regex =
        Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity pattern");
    static ref SPACE_RE: Regex = Regex::new(r"[ \t\r\f\v]+").expect("space pattern");
}

/// Render CommonMark (with tables and strikethrough) to HTML. Not sanitized.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Clean HTML against the allow-list sanitizer.
///
/// Scripts, event handlers and unsafe URL schemes are removed; links get
/// `rel="noopener noreferrer"`.
pub fn sanitize_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Plain text of an HTML fragment: block elements become line breaks, tags
/// are dropped, entities decoded and whitespace collapsed.
pub fn html_to_text(input: &str) -> String {
    let with_breaks = BLOCK_TAG_RE.replace_all(input, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(|line| SPACE_RE.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(input: &str) -> String {
    ENTITY_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Derive a summary of at most `limit` characters.
///
/// Prefers the last sentence end past half the limit; otherwise cuts at the
/// last word boundary and appends `...`; otherwise hard-truncates and
/// appends `...`.
pub fn summarize(text: &str, limit: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= limit {
        return text;
    }

    let window: Vec<char> = text.chars().take(limit).collect();
    let sentence_end = (0..window.len()).rev().find(|&i| {
        matches!(window[i], '.' | '!' | '?')
            && window.get(i + 1).map_or(true, |c| c.is_whitespace())
    });
    if let Some(end) = sentence_end {
        if end + 1 > limit / 2 {
            return window[..=end].iter().collect();
        }
    }

    let budget = limit.saturating_sub(3);
    let head = &window[..budget.min(window.len())];
    let cut = match head.iter().rposition(|c| *c == ' ') {
        Some(space) if space > 0 => &head[..space],
        _ => head,
    };
    let mut out: String = cut.iter().collect();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}

/// Final content fields of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedContent {
    pub text: Option<String>,
    pub html: Option<String>,
    pub markdown: Option<String>,
}

/// Resolve the content fields of an item.
///
/// Supplied HTML wins over markdown-derived HTML; either way it is sanitized
/// exactly once. Text is taken as given, or derived from the sanitized HTML.
pub fn process(
    text: Option<&str>,
    html: Option<&str>,
    markdown: Option<&str>,
) -> ProcessedContent {
    let html = match (html, markdown) {
        (Some(h), _) => Some(sanitize_html(h)),
        (None, Some(md)) => Some(sanitize_html(&markdown_to_html(md))),
        (None, None) => None,
    };
    let text = match text {
        Some(t) => Some(t.to_string()),
        None => html.as_deref().map(html_to_text),
    };
    ProcessedContent {
        text: text.filter(|t| !t.trim().is_empty()),
        html: html.filter(|h| !h.trim().is_empty()),
        markdown: markdown.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_markdown() {
        let content = process(None, None, Some("# H"));
        let html = content.html.unwrap();
        assert!(html.contains("<h1>"), "{html}");
        assert_eq!(content.text.as_deref(), Some("H"));
        assert_eq!(content.markdown.as_deref(), Some("# H"));
    }

    #[test]
    fn test_markdown_punctuation_removed() {
        let content = process(None, None, Some("Some **bold** and _em_ text\n\n- one\n- two"));
        assert_eq!(content.text.as_deref(), Some("Some bold and em text\none\ntwo"));
    }

    #[test]
    fn test_sanitize_strips_scripts_and_handlers() {
        let html = sanitize_html(r#"<p onclick="x()">hi<script>alert(1)</script></p><a href="javascript:evil()">l</a>"#);
        assert!(!html.contains("script"));
        assert!(!html.contains("onclick"));
        assert!(!html.contains("javascript:"));
        assert!(html.contains("<p>hi</p>"));
    }

    #[test]
    fn test_markdown_html_is_sanitized() {
        let content = process(None, None, Some("hi <script>alert(1)</script>"));
        assert!(!content.html.unwrap().contains("<script>"));
    }

    #[test]
    fn test_supplied_html_wins_and_text_kept() {
        let content = process(Some("plain"), Some("<b>bold</b>"), Some("*md*"));
        assert_eq!(content.html.as_deref(), Some("<b>bold</b>"));
        assert_eq!(content.text.as_deref(), Some("plain"));
    }

    #[test]
    fn test_entities_decoded_once() {
        assert_eq!(html_to_text("<p>a &amp;lt; b &#65;&#x42; &copy;</p>"), "a &lt; b AB &copy;");
    }

    #[test]
    fn test_summary_short_text_unchanged() {
        assert_eq!(summarize("  short   text ", 200), "short text");
    }

    #[test]
    fn test_summary_sentence_boundary() {
        let text = format!("{}. {}", "a".repeat(120), "b ".repeat(100));
        let summary = summarize(&text, 200);
        assert_eq!(summary, format!("{}.", "a".repeat(120)));
    }

    #[test]
    fn test_summary_word_boundary() {
        let text = "word ".repeat(100);
        let summary = summarize(&text, 200);
        assert!(summary.ends_with("word..."), "{summary}");
        assert!(summary.chars().count() <= 200);
    }

    #[test]
    fn test_summary_hard_truncate() {
        let text = "x".repeat(500);
        let summary = summarize(&text, 200);
        assert_eq!(summary, format!("{}...", "x".repeat(197)));
    }

    #[test]
    fn test_summary_early_sentence_ignored() {
        // Sentence end before half the limit falls back to a word cut
        let text = format!("Hi. {}", "word ".repeat(100));
        let summary = summarize(&text, 200);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_summary_multibyte_safe() {
        let text = "é".repeat(300);
        assert_eq!(summarize(&text, 10).chars().count(), 10);
    }
}
