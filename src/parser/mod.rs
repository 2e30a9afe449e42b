pub mod content;
pub mod locate;
pub mod outline;
pub mod sanitize;
pub mod toc;

use scraper::Html;

use crate::error::StructureError;
use crate::model::Plan;
use locate::{find_block, text_of, CONTENT_ROOT, DATA_CI, PAGE_BLOCK};

const COVER_PAGE: &str = "Deckblatt";
const IMPRESSUM: &str = "Impressum";

/// Two-pass pipeline: raw html → flat indexed units → plan with derived toc.
pub fn parse_plan(raw_html: &str) -> Result<Plan, StructureError> {
    let document = Html::parse_document(raw_html);
    let root = CONTENT_ROOT.require_in(document.root_element(), "document")?;

    let content_ids = outline::list_content_ids(root)?;
    let content = content::extract_content(root, &content_ids)?;

    let cover_page = text_of(find_block(root, &PAGE_BLOCK, DATA_CI, COVER_PAGE)?);
    let impressum = text_of(find_block(root, &PAGE_BLOCK, DATA_CI, IMPRESSUM)?);

    Ok(Plan::assemble(cover_page, impressum, content))
}

// ── Tests ──
