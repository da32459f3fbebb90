//! Text shaping shared by the strategies: page splitting and HTML flattening.
//!
//! Page splitting runs `semchunk-rs` with a whitespace token counter, so a "page" is a
//! semantic segment of at most `page_tokens` whitespace-delimited tokens. A budget of zero
//! disables splitting.

use super::ExtractedUnit;
use scraper::{Html, Selector};
use semchunk_rs::Chunker;
use serde_json::{Map, Value};
use std::sync::Arc;

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Elements whose text never reaches the extracted output.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

fn whitespace_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

/// Split text into page-sized segments. Returns an empty vector for blank input.
pub(crate) fn split_pages(text: &str, page_tokens: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if page_tokens == 0 {
        return vec![text.trim().to_string()];
    }

    let counter = whitespace_token_counter();
    let chunker = Chunker::new(
        page_tokens,
        Box::new(move |segment: &str| counter.as_ref()(segment)),
    );
    chunker
        .chunk(text)
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect()
}

/// Split text into units numbered from 1.
pub(crate) fn paged_units(text: &str, page_tokens: usize) -> Vec<ExtractedUnit> {
    split_pages(text, page_tokens)
        .into_iter()
        .zip(1u32..)
        .map(|(page, ordinal)| ExtractedUnit::new(page).with_ordinal(ordinal))
        .collect()
}

/// Visible text of an HTML document.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct HtmlText {
    pub title: Option<String>,
    pub text: String,
}

/// Flatten an HTML document to its body text, skipping scripts and styles.
pub(crate) fn html_to_text(html: &str) -> HtmlText {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| element.text().collect::<String>())
        })
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty());

    let body = Selector::parse("body").ok();
    let root = body
        .as_ref()
        .and_then(|selector| document.select(selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut blocks = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            blocks.push(trimmed.to_string());
        }
    }

    HtmlText {
        title,
        text: blocks.join(" "),
    }
}

/// First non-blank string (or number) stored under any of `keys`.
pub(crate) fn pick_text(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

/// First positive integer stored under any of `keys`, accepting numeric strings.
pub(crate) fn pick_ordinal(item: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|key| {
        let value = item.get(*key)?;
        let number = match value {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }?;
        u32::try_from(number).ok().filter(|ordinal| *ordinal > 0)
    })
}
