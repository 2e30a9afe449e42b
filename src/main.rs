mod config;
mod crawl;
mod error;
mod fetch;
mod model;
mod parser;
mod store;

use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use config::{PlanSources, Settings};
use model::CorpusExt;

#[derive(Parser)]
#[command(name = "lehrplan", about = "Curriculum plan extractor for the Saxon Lehrplandatenbank")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all subject plans and replace the stored corpus
    Crawl,
    /// Print one content unit's markdown from the stored corpus
    Section {
        /// Subject key (deutsch, mathe, englisch, sachunterricht)
        subject: String,
        /// Global content index, starting at 0
        index: usize,
    },
    /// Print the table of contents of every plan as JSON
    Toc,
    /// Show section and unit counts per subject
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Crawl => {
            let sources = PlanSources::default();
            let fetcher = fetch::Fetcher::new(&settings)?;
            println!("Crawling {} plans...", model::Subject::ALL.len());
            let corpus = crawl::run(&fetcher, &sources, &settings.output)
                .await
                .with_context(|| {
                    format!("Crawl failed, {} left unchanged", settings.output.display())
                })?;
            for s in corpus.stats() {
                println!("{:<16} {:>4} sections {:>5} units", s.subject, s.sections, s.units);
            }
            println!("Saved corpus to {}", settings.output.display());
            Ok(())
        }
        Commands::Section { subject, index } => {
            let corpus = load_corpus(&settings)?;
            let content = corpus.section(&subject, index)?;
            println!("{}", content);
            Ok(())
        }
        Commands::Toc => {
            let corpus = load_corpus(&settings)?;
            println!("{}", serde_json::to_string_pretty(&corpus.table_of_contents())?);
            Ok(())
        }
        Commands::Stats => {
            let corpus = load_corpus(&settings)?;
            if corpus.is_empty() {
                println!("Corpus is empty. Run 'crawl' first.");
                return Ok(());
            }
            println!("{:<16} | {:>8} | {:>5}", "Subject", "Sections", "Units");
            println!("{}", "-".repeat(35));
            for s in corpus.stats() {
                println!("{:<16} | {:>8} | {:>5}", s.subject, s.sections, s.units);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_corpus(settings: &Settings) -> anyhow::Result<model::Corpus> {
    store::load(&settings.output).with_context(|| {
        format!(
            "Failed to read corpus from {} (run 'crawl' first?)",
            settings.output.display()
        )
    })
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
