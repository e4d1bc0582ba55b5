//! HTML cleaning: markup passthrough or noise-free plain text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node, Selector};
use tracing::{debug, warn};

use crate::{Result, SearchError};

/// Elements that never carry page content.
const NOISE_SELECTOR: &str = "script, style, noscript, iframe, header, footer, nav, aside, form, \
     [aria-hidden=\"true\"], .advertisement, #comments";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cleans fetched HTML for callers.
///
/// With `keep_markup` the input is returned unchanged. Otherwise the text of
/// the document body is extracted with scripts, navigation and other noise
/// removed, and whitespace collapsed.
///
/// Entities are decoded in the output, so text that spelled out markup
/// (`&lt;script&gt;`) comes back as real tags. Cleaning such output a second
/// time treats those tags as markup and is not idempotent.
pub fn clean(html: &str, keep_markup: bool) -> String {
    clean_with_selector(html, keep_markup, None)
}

/// Like [`clean`], but when `keep_markup` is set and a selector is supplied,
/// returns the inner markup of the first matching element instead.
///
/// Falls back to the full input when the selector is invalid or matches
/// nothing. Never fails.
pub fn clean_with_selector(html: &str, keep_markup: bool, selector: Option<&str>) -> String {
    if keep_markup {
        return match selector {
            Some(css) => select_markup(html, css).unwrap_or_else(|| html.to_string()),
            None => html.to_string(),
        };
    }

    match extract_text(html) {
        Ok(text) => text,
        Err(e) => {
            warn!("Structured text extraction failed ({}), stripping tags", e);
            strip_tags(html)
        }
    }
}

fn select_markup(html: &str, css: &str) -> Option<String> {
    let selector = match Selector::parse(css) {
        Ok(selector) => selector,
        Err(e) => {
            warn!("Invalid selector '{}': {:?}, returning full HTML", css, e);
            return None;
        }
    };

    let document = Html::parse_document(html);
    let inner = document.select(&selector).next().map(|el| el.inner_html());
    match inner {
        Some(markup) if !markup.trim().is_empty() => {
            debug!("Extracted markup with selector '{}'", css);
            Some(markup)
        }
        _ => {
            debug!("Selector '{}' matched no content, returning full HTML", css);
            None
        }
    }
}

fn extract_text(html: &str) -> Result<String> {
    let noise = Selector::parse(NOISE_SELECTOR)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector: {:?}", e)))?;
    let body = Selector::parse("body")
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector: {:?}", e)))?;

    let document = Html::parse_document(html);
    let skipped: HashSet<_> = document.select(&noise).map(|el| el.id()).collect();

    let root = match document.select(&body).next() {
        Some(body) => *body,
        None => document.tree.root(),
    };

    let mut parts = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        if node.ancestors().any(|a| skipped.contains(&a.id())) {
            continue;
        }
        parts.push(&**text);
    }

    Ok(collapse_whitespace(&parts.join(" ")))
}

/// Best-effort regex tag strip used when structured extraction fails.
pub fn strip_tags(html: &str) -> String {
    collapse_whitespace(&TAG_RE.replace_all(html, " "))
}

fn collapse_whitespace(text: &str) -> String {
    SPACE_RE.replace_all(text, " ").trim().to_string()
}
