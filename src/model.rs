use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The curriculum subjects the portal publishes plans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Deutsch,
    Mathe,
    Englisch,
    Sachunterricht,
}

impl Subject {
    pub const ALL: [Subject; 4] = [
        Subject::Deutsch,
        Subject::Mathe,
        Subject::Englisch,
        Subject::Sachunterricht,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Deutsch => "deutsch",
            Subject::Mathe => "mathe",
            Subject::Englisch => "englisch",
            Subject::Sachunterricht => "sachunterricht",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s)
            .ok_or_else(|| Error::UnknownSubject(s.to_string()))
    }
}

/// One leaf curriculum item. Its global index is the key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub title: String,
    pub section: String,
    pub content: String,
}

/// Units keyed by their global index, ascending.
pub type Contents = BTreeMap<usize, ContentUnit>;

/// Section id → (index → title), sections in first-occurrence order.
pub type TableOfContents = IndexMap<String, BTreeMap<usize, String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub cover_page: String,
    pub impressum: String,
    pub table_of_contents: TableOfContents,
    pub content: Contents,
}

impl Plan {
    /// Build a plan whose table of contents is derived from `content`.
    pub fn assemble(cover_page: String, impressum: String, content: Contents) -> Self {
        let table_of_contents = crate::parser::toc::build_toc(&content);
        Plan {
            cover_page,
            impressum,
            table_of_contents,
            content,
        }
    }
}

/// Every subject's plan. This is what gets persisted and read back.
pub type Corpus = BTreeMap<Subject, Plan>;

pub struct PlanStats {
    pub subject: Subject,
    pub sections: usize,
    pub units: usize,
}

/// Read-only lookups over a loaded corpus.
pub trait CorpusExt {
    fn plan(&self, subject: &str) -> Result<(Subject, &Plan)>;
    fn section(&self, subject: &str, index: usize) -> Result<&str>;
    fn table_of_contents(&self) -> BTreeMap<Subject, &TableOfContents>;
    fn stats(&self) -> Vec<PlanStats>;
}

impl CorpusExt for Corpus {
    fn plan(&self, subject: &str) -> Result<(Subject, &Plan)> {
        let key: Subject = subject.parse()?;
        self.get(&key)
            .map(|plan| (key, plan))
            .ok_or_else(|| Error::UnknownSubject(subject.to_string()))
    }

    fn section(&self, subject: &str, index: usize) -> Result<&str> {
        let (key, plan) = self.plan(subject)?;
        plan.content
            .get(&index)
            .map(|unit| unit.content.as_str())
            .ok_or(Error::IndexOutOfRange {
                subject: key,
                index,
                len: plan.content.len(),
            })
    }

    fn table_of_contents(&self) -> BTreeMap<Subject, &TableOfContents> {
        self.iter()
            .map(|(subject, plan)| (*subject, &plan.table_of_contents))
            .collect()
    }

    fn stats(&self) -> Vec<PlanStats> {
        self.iter()
            .map(|(subject, plan)| PlanStats {
                subject: *subject,
                sections: plan.table_of_contents.len(),
                units: plan.content.len(),
            })
            .collect()
    }
}

// ── Tests ──
