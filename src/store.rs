use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::Result;
use crate::model::Corpus;

/// Replace the corpus file at `path` in one rename. Readers never see a partial file.
pub fn save(path: &Path, corpus: &Corpus) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, corpus)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), plans = corpus.len(), "Wrote corpus");
    Ok(())
}

pub fn load(path: &Path) -> Result<Corpus> {
    let file = fs::File::open(path)?;
    let corpus = serde_json::from_reader(BufReader::new(file))?;
    Ok(corpus)
}

// ── Tests ──
