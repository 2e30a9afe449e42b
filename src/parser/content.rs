use scraper::ElementRef;
use tracing::debug;

use super::locate::{child_elements, find_block, CHILD_ITEMS, DATA_CI, PAGE_BLOCK};
use super::sanitize::{strip_links, to_markdown};
use crate::error::StructureError;
use crate::model::{ContentUnit, Contents};

/// Walk every declared block's child items and number them globally.
///
/// Indices run from 0 in block order, then item order within each block.
pub fn extract_content(
    scope: ElementRef<'_>,
    content_ids: &[String],
) -> Result<Contents, StructureError> {
    let mut content = Contents::new();
    let mut idx = 0usize;

    for content_id in content_ids {
        let block = find_block(scope, &PAGE_BLOCK, DATA_CI, content_id)?;
        let items = CHILD_ITEMS.require_in(block, &format!("block `{}`", content_id))?;

        let before = idx;
        for item in child_elements(items) {
            let title = item
                .value()
                .attr(DATA_CI)
                .ok_or_else(|| StructureError::MissingAttribute {
                    attribute: DATA_CI,
                    within: format!("item {} of block `{}`", idx - before, content_id),
                })?
                .to_string();

            let html = item.html();
            let markdown = to_markdown(&strip_links(&html)).map_err(|source| {
                StructureError::Markdown {
                    title: title.clone(),
                    source,
                }
            })?;

            content.insert(
                idx,
                ContentUnit {
                    title,
                    section: content_id.clone(),
                    content: markdown,
                },
            );
            idx += 1;
        }
        debug!(section = %content_id, units = idx - before, "extracted block");
    }

    Ok(content)
}

// ── Tests ──
