//! HTML5-aware minifier for finalized documents.
//!
//! A single forward pass over the markup. Tags are re-emitted with normalized
//! attributes; text is copied (optionally whitespace-collapsed); raw-text
//! elements are copied verbatim.

use serde::{Deserialize, Serialize};

/// Minifier switches. `Default` is the configuration applied to every
/// committed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinifyOptions {
    pub html5: bool,
    pub collapse_boolean_attributes: bool,
    pub collapse_inline_tag_whitespace: bool,
    pub remove_attribute_quotes: bool,
    pub remove_comments: bool,
    pub keep_closing_slash: bool,
    pub collapse_whitespace: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        MinifyOptions {
            html5: true,
            collapse_boolean_attributes: true,
            collapse_inline_tag_whitespace: true,
            remove_attribute_quotes: true,
            remove_comments: true,
            keep_closing_slash: true,
            collapse_whitespace: false,
        }
    }
}

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "compact",
    "controls",
    "declare",
    "default",
    "defaultchecked",
    "defaultmuted",
    "defaultselected",
    "defer",
    "disabled",
    "enabled",
    "formnovalidate",
    "hidden",
    "indeterminate",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nohref",
    "noresize",
    "noshade",
    "novalidate",
    "nowrap",
    "open",
    "pauseonexit",
    "readonly",
    "required",
    "reversed",
    "scoped",
    "seamless",
    "selected",
    "sortable",
    "truespeed",
    "typemustmatch",
    "visible",
];

#[derive(Debug)]
struct Attribute<'a> {
    name: &'a str,
    value: Option<&'a str>,
    quote: Option<char>,
}

#[derive(Debug)]
struct StartTag<'a> {
    name: &'a str,
    attributes: Vec<Attribute<'a>>,
    self_closing: bool,
    /// Bytes consumed, including `<` and `>`.
    len: usize,
}

/// Minify `html` under `options`.
pub fn minify(html: &str, options: &MinifyOptions) -> String {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &html[pos..];
        let next = bytes.get(pos + 1).copied();

        if rest.starts_with("<!--") {
            push_text(&mut out, &html[text_start..pos], options);
            let end = rest[4..]
                .find("-->")
                .map_or(html.len(), |i| pos + 4 + i + 3);
            let comment = &html[pos..end];
            if !options.remove_comments || is_conditional_comment(comment) {
                out.push_str(comment);
            }
            pos = end;
            text_start = pos;
        } else if matches!(next, Some(b'!') | Some(b'?')) {
            push_text(&mut out, &html[text_start..pos], options);
            let end = rest.find('>').map_or(html.len(), |i| pos + i + 1);
            out.push_str(&html[pos..end]);
            pos = end;
            text_start = pos;
        } else if next == Some(b'/') && bytes.get(pos + 2).is_some_and(u8::is_ascii_alphabetic) {
            push_text(&mut out, &html[text_start..pos], options);
            let end = rest.find('>').map_or(html.len(), |i| pos + i + 1);
            let name = tag_name(&html[pos + 2..end]);
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            pos = end;
            text_start = pos;
        } else if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            let Some(tag) = parse_start_tag(rest) else {
                pos += 1;
                continue;
            };
            push_text(&mut out, &html[text_start..pos], options);
            write_start_tag(&mut out, &tag, options);
            pos += tag.len;

            if !tag.self_closing && is_raw_text(tag.name, options) {
                let close = find_closing_tag(&html[pos..], tag.name).map_or(html.len(), |i| pos + i);
                out.push_str(&html[pos..close]);
                pos = close;
            }
            text_start = pos;
        } else {
            pos += 1;
        }
    }
    push_text(&mut out, &html[text_start..], options);
    out
}

fn is_conditional_comment(comment: &str) -> bool {
    comment.starts_with("<!--[if") || comment.starts_with("<!--<![endif]") || comment.starts_with("<![endif]")
}

fn is_raw_text(name: &str, options: &MinifyOptions) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(name))
        || (options.collapse_whitespace && name.eq_ignore_ascii_case("pre"))
}

fn tag_name(s: &str) -> &str {
    let end = s
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(s.len());
    &s[..end]
}

/// Offset of `</name` in `haystack`, ignoring ASCII case.
fn find_closing_tag(haystack: &str, name: &str) -> Option<usize> {
    let needle = format!("</{name}");
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

fn parse_start_tag(s: &str) -> Option<StartTag<'_>> {
    let bytes = s.as_bytes();
    let name = tag_name(&s[1..]);
    let mut i = 1 + name.len();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match *bytes.get(i)? {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_closing = bytes.get(i + 1) == Some(&b'>');
                i += 1;
                continue;
            }
            _ => {}
        }

        let name_start = i;
        while i < bytes.len() && !matches!(bytes[i], b'=' | b'>' | b'/') && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let attr_name = &s[name_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        if bytes.get(i) != Some(&b'=') {
            attributes.push(Attribute {
                name: attr_name,
                value: None,
                quote: None,
            });
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let (value, quote) = match *bytes.get(i)? {
            q @ (b'"' | b'\'') => {
                let quote = q as char;
                let start = i + 1;
                let len = s[start..].find(quote)?;
                i = start + len + 1;
                (&s[start..start + len], Some(quote))
            }
            _ => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'>' && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                (&s[start..i], None)
            }
        };
        attributes.push(Attribute {
            name: attr_name,
            value: Some(value),
            quote,
        });
    }

    Some(StartTag {
        name,
        attributes,
        self_closing,
        len: i,
    })
}

fn can_unquote(value: &str) -> bool {
    !value.is_empty()
        && !value.ends_with('/')
        && !value
            .chars()
            .any(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c' | '"' | '\'' | '=' | '<' | '>' | '`'))
}

fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.iter().any(|b| b.eq_ignore_ascii_case(name))
}

fn write_start_tag(out: &mut String, tag: &StartTag<'_>, options: &MinifyOptions) {
    out.push('<');
    out.push_str(tag.name);
    let mut ends_unquoted = false;

    for attr in &tag.attributes {
        out.push(' ');
        out.push_str(attr.name);
        ends_unquoted = false;

        let Some(value) = attr.value else { continue };
        if options.collapse_boolean_attributes && is_boolean_attribute(attr.name) {
            continue;
        }
        out.push('=');
        if options.remove_attribute_quotes && can_unquote(value) {
            out.push_str(value);
            ends_unquoted = true;
        } else {
            let quote = match attr.quote {
                Some(q) => q,
                None if value.contains('"') => '\'',
                None => '"',
            };
            out.push(quote);
            out.push_str(value);
            out.push(quote);
        }
    }

    if tag.self_closing && options.keep_closing_slash {
        if ends_unquoted {
            out.push(' ');
        }
        out.push('/');
    }
    out.push('>');
}

fn push_text(out: &mut String, text: &str, options: &MinifyOptions) {
    if text.is_empty() {
        return;
    }
    if !options.collapse_whitespace {
        out.push_str(text);
        return;
    }
    if options.collapse_inline_tag_whitespace && text.trim_matches(|c: char| c.is_ascii_whitespace()).is_empty() {
        return;
    }
    let mut previous_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !previous_space {
                out.push(' ');
            }
            previous_space = true;
        } else {
            out.push(ch);
            previous_space = false;
        }
    }
}
