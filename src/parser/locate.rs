use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::warn;

use crate::error::StructureError;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Attribute that names pages, blocks and items on the portal.
pub const DATA_CI: &str = "data-ci";

/// A tag/class selector together with its source text for error messages.
pub struct BlockType {
    pub css: &'static str,
    selector: Selector,
}

impl BlockType {
    fn new(css: &'static str) -> Self {
        BlockType {
            css,
            selector: Selector::parse(css).unwrap(),
        }
    }

    /// First descendant of `scope` matching this block type.
    pub fn first_in<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.selector).next()
    }

    /// First descendant matching, or a `MissingRegion` naming `within`.
    pub fn require_in<'a>(
        &self,
        scope: ElementRef<'a>,
        within: &str,
    ) -> Result<ElementRef<'a>, StructureError> {
        self.first_in(scope).ok_or_else(|| StructureError::MissingRegion {
            region: self.css,
            within: within.to_string(),
        })
    }

    /// Whether `el` itself is this kind of block.
    pub fn matches(&self, el: ElementRef<'_>) -> bool {
        self.selector.matches(&el)
    }
}

pub static CONTENT_ROOT: LazyLock<BlockType> = LazyLock::new(|| BlockType::new("div.lplancontent"));
pub static PAGE_BLOCK: LazyLock<BlockType> = LazyLock::new(|| BlockType::new("div.lplanpage"));
pub static CHILD_ITEMS: LazyLock<BlockType> = LazyLock::new(|| BlockType::new("div.childItems"));
pub static TOC_REGION: LazyLock<BlockType> =
    LazyLock::new(|| BlockType::new("div.inhaltsverzeichnis"));
pub static TOC_BLOCK: LazyLock<BlockType> = LazyLock::new(|| BlockType::new("div.ivblock"));
pub static TOC_ITEM: LazyLock<BlockType> = LazyLock::new(|| BlockType::new("div.ivitem"));

/// Find the `block_type` element under `scope` whose `attribute` equals `value`.
///
/// The first match in document order wins. Further matches are logged, not rejected.
pub fn find_block<'a>(
    scope: ElementRef<'a>,
    block_type: &BlockType,
    attribute: &'static str,
    value: &str,
) -> Result<ElementRef<'a>, StructureError> {
    let mut matches = scope
        .select(&block_type.selector)
        .filter(|el| el.value().attr(attribute) == Some(value));

    let found = matches.next().ok_or_else(|| StructureError::NotFound {
        selector: block_type.css,
        attribute,
        value: value.to_string(),
    })?;

    let extra = matches.count();
    if extra > 0 {
        warn!(
            selector = block_type.css,
            attribute,
            value,
            extra,
            "ambiguous block, using first match"
        );
    }
    Ok(found)
}

/// Immediate element children of `el`, in document order.
pub fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// All text below `el`, whitespace collapsed.
pub fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Trim and fold every whitespace run (newlines included) into one space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

// ── Tests ──
