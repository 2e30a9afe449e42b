use scraper::ElementRef;

use super::locate::{child_elements, text_of, DATA_CI, TOC_BLOCK, TOC_ITEM, TOC_REGION};
use crate::error::StructureError;

/// Ids of the top-level entries in the plan's table of contents, in document order.
///
/// Only the first `ivblock` directly under the TOC region counts, and only its
/// direct `ivitem` children; deeper levels belong to the content blocks themselves.
/// An entry's id is its visible text, which is what the page blocks are keyed by.
/// `data-ci` is only used for entries without text.
pub fn list_content_ids(scope: ElementRef<'_>) -> Result<Vec<String>, StructureError> {
    let region = TOC_REGION.require_in(scope, "content root")?;
    let block = child_elements(region)
        .find(|el| TOC_BLOCK.matches(*el))
        .ok_or_else(|| StructureError::MissingRegion {
            region: TOC_BLOCK.css,
            within: TOC_REGION.css.to_string(),
        })?;

    let ids = child_elements(block)
        .filter(|el| TOC_ITEM.matches(*el))
        .map(|item| {
            let text = text_of(item);
            if !text.is_empty() {
                return Ok(text);
            }
            match item.value().attr(DATA_CI).map(str::trim) {
                Some(id) if !id.is_empty() => Ok(id.to_string()),
                _ => Err(StructureError::MissingAttribute {
                    attribute: DATA_CI,
                    within: TOC_ITEM.css.to_string(),
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ids)
}
