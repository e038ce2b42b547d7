//! Document rewriting: asset references, integrity, prefetch hint.
//!
//! A document is processed in three steps. `scan_document` collects every
//! asset-bearing attribute, the references are resolved concurrently against
//! the application's rewrite context, and `apply_rewrites` writes the
//! canonical keys and digests back into the markup. Only then is the result
//! minified and handed back for commit.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};

use futures::future::join_all;
use lol_html::errors::AttributeNameError;
use lol_html::html_content::{ContentType, Element};
use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::domain::{ParseError, RenderError};
use crate::obs;
use crate::rewrite::context::RewriteContext;
use crate::rewrite::minify::{minify, MinifyOptions};

/// Injected into `<head>` once per document.
pub const PREFETCH_META: &str = r#"<meta http-equiv="x-dns-prefetch-control" content="on"/>"#;

/// Element kinds whose reference attribute is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefTag {
    Script,
    Img,
    Link,
}

impl RefTag {
    pub fn attribute(&self) -> &'static str {
        match self {
            RefTag::Script | RefTag::Img => "src",
            RefTag::Link => "href",
        }
    }

    /// Scripts and links load asynchronously after rewriting.
    pub fn loads_async(&self) -> bool {
        matches!(self, RefTag::Script | RefTag::Link)
    }
}

/// One asset-bearing attribute, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub tag: RefTag,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct DocumentScan {
    pub references: Vec<AssetReference>,
    pub has_head: bool,
    pub has_prefetch_hint: bool,
}

/// Rewrite target for one reference value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub key: String,
    pub integrity: String,
}

/// A finalized document plus the references that could not be resolved.
#[derive(Debug)]
pub struct RenderedDocument {
    pub html: String,
    pub rewritten: usize,
    pub failures: Vec<RenderError>,
}

fn html_error(err: impl std::fmt::Display) -> ParseError {
    ParseError::Html(err.to_string())
}

/// Collect asset references and head/prefetch facts from `html`.
pub fn scan_document(html: &str) -> Result<DocumentScan, ParseError> {
    let references = RefCell::new(Vec::new());
    let has_head = Cell::new(false);
    let has_prefetch_hint = Cell::new(false);

    let collect = |tag: RefTag, value: Option<String>| {
        if let Some(value) = value {
            references.borrow_mut().push(AssetReference { tag, value });
        }
    };

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script[src]", |el| {
                    collect(RefTag::Script, el.get_attribute("src"));
                    Ok(())
                }),
                element!("img[src]", |el| {
                    collect(RefTag::Img, el.get_attribute("src"));
                    Ok(())
                }),
                element!("link[href]", |el| {
                    collect(RefTag::Link, el.get_attribute("href"));
                    Ok(())
                }),
                element!("head", |_el| {
                    has_head.set(true);
                    Ok(())
                }),
                element!("meta[http-equiv]", |el| {
                    let is_hint = el
                        .get_attribute("http-equiv")
                        .is_some_and(|v| v.eq_ignore_ascii_case("x-dns-prefetch-control"));
                    if is_hint {
                        has_prefetch_hint.set(true);
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(html_error)?;

    Ok(DocumentScan {
        references: references.into_inner(),
        has_head: has_head.get(),
        has_prefetch_hint: has_prefetch_hint.get(),
    })
}

fn rewrite_reference(
    el: &mut Element<'_, '_>,
    tag: RefTag,
    resolved: &HashMap<String, ResolvedAsset>,
) -> Result<(), AttributeNameError> {
    let Some(asset) = el
        .get_attribute(tag.attribute())
        .and_then(|value| resolved.get(&value))
    else {
        return Ok(());
    };
    el.set_attribute(tag.attribute(), &asset.key)?;
    el.set_attribute("integrity", &asset.integrity)?;
    if tag.loads_async() {
        el.set_attribute("async", "true")?;
        el.set_attribute("defer", "true")?;
    }
    Ok(())
}

/// Write resolved keys and digests into `html`. References missing from
/// `resolved` are left as they are.
pub fn apply_rewrites(
    html: &str,
    resolved: &HashMap<String, ResolvedAsset>,
    inject_prefetch: bool,
) -> Result<String, ParseError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script[src]", |el| {
                    rewrite_reference(el, RefTag::Script, resolved)?;
                    Ok(())
                }),
                element!("img[src]", |el| {
                    rewrite_reference(el, RefTag::Img, resolved)?;
                    Ok(())
                }),
                element!("link[href]", |el| {
                    rewrite_reference(el, RefTag::Link, resolved)?;
                    Ok(())
                }),
                element!("head", |el| {
                    if inject_prefetch {
                        el.append(PREFETCH_META, ContentType::Html);
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(html_error)
}

/// Rewrite one page of the application held by `ctx`.
///
/// Every distinct reference is resolved concurrently; a failed reference is
/// reported in `failures` and its element is left unchanged.
pub async fn render_document(
    ctx: &RewriteContext,
    path: &str,
    html: &str,
    options: &MinifyOptions,
) -> Result<RenderedDocument, ParseError> {
    let scan = scan_document(html)?;

    let unique: BTreeSet<&str> = scan.references.iter().map(|r| r.value.as_str()).collect();
    let pending = unique.into_iter().filter_map(move |value| {
        ctx.relative_reference(value)
            .map(move |relative| async move { (value, ctx.resolve_reference(&relative).await) })
    });
    let settled = join_all(pending).await;

    let mut resolved = HashMap::with_capacity(settled.len());
    let mut failures = Vec::new();
    for (value, result) in settled {
        match result {
            Ok(committed) => {
                resolved.insert(
                    value.to_string(),
                    ResolvedAsset {
                        integrity: committed.artifact.sha256().integrity(),
                        key: committed.key,
                    },
                );
            }
            Err(err) => {
                obs::emit_file_failed(&ctx.app().name, value, &err);
                failures.push(RenderError::rewrite(format!("{path}: {value}"), err));
            }
        }
    }

    let inject_prefetch = scan.has_head && !scan.has_prefetch_hint;
    let rewritten = apply_rewrites(html, &resolved, inject_prefetch)?;

    Ok(RenderedDocument {
        html: minify(&rewritten, options),
        rewritten: resolved.len(),
        failures,
    })
}
