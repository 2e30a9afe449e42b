use crate::model::{Contents, TableOfContents};

/// Group units by owning section. Sections appear in first-occurrence order,
/// indices ascend within each section.
pub fn build_toc(content: &Contents) -> TableOfContents {
    let mut toc = TableOfContents::new();
    for (idx, unit) in content {
        toc.entry(unit.section.clone())
            .or_default()
            .insert(*idx, unit.title.clone());
    }
    toc
}
