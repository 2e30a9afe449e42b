use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::model::Subject;

const SETTINGS_FILE: &str = "lehrplan";
const ENV_PREFIX: &str = "LPLAN";

/// Where a subject's plan lives on the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocator {
    pub plan_id: &'static str,
    pub access_token: &'static str,
}

/// Fixed subject → locator table.
#[derive(Debug, Clone)]
pub struct PlanSources {
    deutsch: SourceLocator,
    mathe: SourceLocator,
    englisch: SourceLocator,
    sachunterricht: SourceLocator,
}

impl PlanSources {
    pub fn get(&self, subject: Subject) -> SourceLocator {
        match subject {
            Subject::Deutsch => self.deutsch,
            Subject::Mathe => self.mathe,
            Subject::Englisch => self.englisch,
            Subject::Sachunterricht => self.sachunterricht,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subject, SourceLocator)> + '_ {
        Subject::ALL.into_iter().map(|subject| (subject, self.get(subject)))
    }
}

impl Default for PlanSources {
    fn default() -> Self {
        let locator = |plan_id, access_token| SourceLocator {
            plan_id,
            access_token,
        };
        PlanSources {
            deutsch: locator("908", "1tblk6cNNahu0dAWKRuO"),
            mathe: locator("912", "Mpk0iAibe4ONjV3PndYR"),
            englisch: locator("91", "O6Em8mw3wB7reJu01rO2"),
            sachunterricht: locator("80", "2DYw4je6s74vCaxRHqx6"),
        }
    }
}

/// Transport and storage settings. Defaults, then `lehrplan.toml`, then `LPLAN_*`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub output: PathBuf,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://www.schulportal.sachsen.de/lplandb/index.php".to_string(),
            output: PathBuf::from("resources/data.json"),
            timeout_secs: 30,
            user_agent: "teaching-tools/1.0".to_string(),
            max_retries: 2,
            backoff_ms: 1000,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(SETTINGS_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
