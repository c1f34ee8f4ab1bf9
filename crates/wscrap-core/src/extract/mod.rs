//! Readable-text extraction from fetched HTML.
//!
//! Best effort: picks the main content container, keeps block-level text,
//! and drops scripts, navigation and page chrome. Never fails; a page with
//! nothing readable yields an empty string.

use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Derives cleaned text from raw page content. Pure.
pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &str) -> String;
}

/// Containers tried in order; the first match is the content root.
const ROOT_SELECTORS: &[&str] = &["article", "main", "[role=main]", "body"];

/// Elements whose text becomes one output line each.
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "td", "th",
    "figcaption",
];

/// Subtrees never included.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadableTextExtractor;

impl Extractor for ReadableTextExtractor {
    fn extract(&self, raw: &str) -> String {
        let document = Html::parse_document(raw);
        let Some(root) = root_selectors()
            .iter()
            .find_map(|sel| document.select(sel).next())
        else {
            return String::new();
        };

        let mut lines: Vec<String> = Vec::new();
        for element in root.select(block_selector()) {
            if !is_outermost_readable(element, root) {
                continue;
            }
            let line = collapse_whitespace(visible_text(element, root));
            if !line.is_empty() {
                lines.push(line);
            }
        }

        // Pages without block markup: fall back to the container's own text.
        if lines.is_empty() {
            return collapse_whitespace(visible_text(root, root));
        }
        lines.join("\n")
    }
}

fn root_selectors() -> &'static [Selector] {
    static ROOTS: OnceLock<Vec<Selector>> = OnceLock::new();
    ROOTS.get_or_init(|| {
        ROOT_SELECTORS
            .iter()
            .map(|s| Selector::parse(s).expect("static root selector is valid"))
            .collect()
    })
}

fn block_selector() -> &'static Selector {
    static BLOCKS: OnceLock<Selector> = OnceLock::new();
    BLOCKS.get_or_init(|| {
        Selector::parse(&BLOCK_TAGS.join(", ")).expect("static block selector is valid")
    })
}

fn is_skipped(element: ElementRef<'_>) -> bool {
    SKIP_TAGS.contains(&element.value().name())
}

/// False when the element sits inside a skipped subtree or inside another
/// block element (whose line already contains this text).
fn is_outermost_readable(element: ElementRef<'_>, root: ElementRef<'_>) -> bool {
    for node in element.ancestors() {
        if node.id() == root.id() {
            break;
        }
        let Some(ancestor) = ElementRef::wrap(node) else {
            continue;
        };
        let name = ancestor.value().name();
        if SKIP_TAGS.contains(&name) || BLOCK_TAGS.contains(&name) {
            return false;
        }
    }
    true
}

/// Text nodes under `element` that are not inside a skipped subtree.
fn visible_text<'a>(
    element: ElementRef<'a>,
    root: ElementRef<'a>,
) -> impl Iterator<Item = &'a str> + 'a {
    element.descendants().filter_map(move |node| {
        let text = node.value().as_text()?;
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != root.id())
            .filter_map(ElementRef::wrap)
            .any(is_skipped);
        (!hidden).then_some(&**text)
    })
}

fn collapse_whitespace<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    let joined: String = pieces.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
