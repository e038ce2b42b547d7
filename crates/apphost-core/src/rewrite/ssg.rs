//! Request-time templating.
//!
//! Runs once per request over a cached document: a fresh nonce is generated,
//! a `Content-Security-Policy` meta tag is ensured, every `script` and `link`
//! element is stamped with the nonce, and `{| name |}` placeholders are
//! filled from the request.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use rand::RngCore;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::domain::ParseError;

const NONCE_BYTES: usize = 16;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\|\s*([A-Za-z0-9_.\-]+)\s*\|\}").expect("placeholder pattern is valid")
    })
}

/// Request data available to placeholders. Header names are lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub headers: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }
}

/// Output of one templating pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub nonce: String,
}

impl RenderedPage {
    /// Policy matching the injected meta tag, for a response header.
    pub fn csp_header(&self) -> String {
        csp_policy(&self.nonce)
    }
}

/// 16 random bytes, base64.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

pub fn csp_policy(nonce: &str) -> String {
    format!("script-src 'nonce-{nonce}'")
}

fn csp_meta(nonce: &str) -> String {
    format!(
        r#"<meta http-equiv="Content-Security-Policy" content="{}">"#,
        csp_policy(nonce)
    )
}

/// Run the templating pass with a fresh nonce.
pub fn render_page(html: &str, request: &RequestContext) -> Result<RenderedPage, ParseError> {
    render_page_with_nonce(html, request, generate_nonce())
}

/// Run the templating pass with the given nonce.
pub fn render_page_with_nonce(
    html: &str,
    request: &RequestContext,
    nonce: String,
) -> Result<RenderedPage, ParseError> {
    let has_csp = has_csp_meta(html)?;
    let head_seen = Cell::new(false);
    let meta = csp_meta(&nonce);

    let stamped = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("head", |el| {
                    head_seen.set(true);
                    if !has_csp {
                        el.prepend(&meta, ContentType::Html);
                    }
                    Ok(())
                }),
                element!("script", |el| {
                    el.set_attribute("nonce", &nonce)?;
                    Ok(())
                }),
                element!("link", |el| {
                    el.set_attribute("nonce", &nonce)?;
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ParseError::Html(e.to_string()))?;

    let stamped = if !has_csp && !head_seen.get() {
        prepend_after_doctype(&stamped, &meta)
    } else {
        stamped
    };

    let variables = Variables {
        request,
        nonce: &nonce,
        user: uuid::Uuid::new_v4().to_string(),
    };
    let html = substitute(&stamped, &variables);

    Ok(RenderedPage { html, nonce })
}

fn has_csp_meta(html: &str) -> Result<bool, ParseError> {
    let found = Cell::new(false);
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("meta[http-equiv]", |el| {
                let is_csp = el
                    .get_attribute("http-equiv")
                    .is_some_and(|v| v.eq_ignore_ascii_case("content-security-policy"));
                if is_csp {
                    found.set(true);
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ParseError::Html(e.to_string()))?;
    Ok(found.get())
}

fn prepend_after_doctype(html: &str, meta: &str) -> String {
    let trimmed = html.trim_start();
    let offset = html.len() - trimmed.len();
    let has_doctype = trimmed
        .get(..9)
        .is_some_and(|p| p.eq_ignore_ascii_case("<!doctype"));

    match trimmed.find('>').filter(|_| has_doctype) {
        Some(end) => {
            let split = offset + end + 1;
            format!("{}{}{}", &html[..split], meta, &html[split..])
        }
        None => format!("{meta}{html}"),
    }
}

struct Variables<'a> {
    request: &'a RequestContext,
    nonce: &'a str,
    user: String,
}

impl Variables<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "headers" => Some(json_for_html(&self.request.headers)),
            "params" => Some(json_for_html(&self.request.params)),
            "nonce" => Some(self.nonce.to_string()),
            "user" => Some(self.user.clone()),
            _ => {
                if let Some(header) = name.strip_prefix("headers.") {
                    self.request
                        .headers
                        .get(&header.to_ascii_lowercase())
                        .map(|v| escape_html(v))
                } else if let Some(param) = name.strip_prefix("params.") {
                    self.request.params.get(param).map(|v| escape_html(v))
                } else {
                    None
                }
            }
        }
    }
}

fn substitute(html: &str, variables: &Variables<'_>) -> String {
    placeholder_regex()
        .replace_all(html, |caps: &Captures<'_>| {
            variables
                .lookup(&caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// JSON safe to embed in markup or an inline script.
fn json_for_html(map: &BTreeMap<String, String>) -> String {
    serde_json::to_string(map)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
