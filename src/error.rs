use crate::model::Subject;

/// The page no longer has the shape the extractor expects.
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("no `{selector}` block with {attribute}=\"{value}\"")]
    NotFound {
        selector: &'static str,
        attribute: &'static str,
        value: String,
    },
    #[error("missing `{region}` region in {within}")]
    MissingRegion {
        region: &'static str,
        within: String,
    },
    #[error("missing `{attribute}` attribute on {within}")]
    MissingAttribute {
        attribute: &'static str,
        within: String,
    },
    #[error("markdown conversion failed for item `{title}`: {source}")]
    Markdown {
        title: String,
        #[source]
        source: std::io::Error,
    },
}

impl StructureError {
    /// Name of the block or id the extractor was looking for.
    pub fn expected(&self) -> &str {
        match self {
            StructureError::NotFound { value, .. } => value,
            StructureError::MissingRegion { region, .. } => region,
            StructureError::MissingAttribute { attribute, .. } => attribute,
            StructureError::Markdown { title, .. } => title,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fetching plan for `{subject}` failed: {source}")]
    Transport {
        subject: Subject,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected page structure for `{subject}`: {source}")]
    Structure {
        subject: Subject,
        #[source]
        source: StructureError,
    },
    #[error("building http client failed: {0}")]
    Client(#[source] reqwest::Error),
    #[error("unknown subject `{0}`")]
    UnknownSubject(String),
    #[error("section {index} out of range for `{subject}` ({len} sections)")]
    IndexOutOfRange {
        subject: Subject,
        index: usize,
        len: usize,
    },
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Progress(#[from] indicatif::style::TemplateError),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
