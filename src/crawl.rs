use std::path::Path;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::{PlanSources, SourceLocator};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::model::{Corpus, Plan, Subject};
use crate::parser;
use crate::store;

/// Fetch and extract one subject's plan.
pub async fn build_plan(fetcher: &Fetcher, subject: Subject, locator: SourceLocator) -> Result<Plan> {
    let start = Instant::now();
    let raw_html = fetcher.fetch(subject, locator).await?;

    let plan = parser::parse_plan(&raw_html).map_err(|source| {
        warn!(%subject, expected = source.expected(), "Page structure mismatch");
        Error::Structure { subject, source }
    })?;

    info!(
        %subject,
        sections = plan.table_of_contents.len(),
        units = plan.content.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Extracted plan"
    );
    Ok(plan)
}

/// Build every subject's plan concurrently. The first failure aborts the rest.
pub async fn build_corpus(fetcher: &Fetcher, sources: &PlanSources) -> Result<Corpus> {
    let pb = ProgressBar::new(Subject::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    build_corpus_with(fetcher, sources, &pb).await
}

async fn build_corpus_with(fetcher: &Fetcher, sources: &PlanSources, pb: &ProgressBar) -> Result<Corpus> {
    let mut tasks = JoinSet::new();
    for (subject, locator) in sources.iter() {
        let fetcher = fetcher.clone();
        tasks.spawn(async move {
            let plan = build_plan(&fetcher, subject, locator).await?;
            Ok::<_, Error>((subject, plan))
        });
    }

    // Returning early drops the set, which aborts the remaining tasks.
    let mut corpus = Corpus::new();
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(Error::from).and_then(|plan| plan) {
            Ok((subject, plan)) => {
                pb.set_message(subject.as_str());
                pb.inc(1);
                corpus.insert(subject, plan);
            }
            Err(err) => {
                pb.abandon();
                return Err(err);
            }
        }
    }
    pb.finish_and_clear();
    Ok(corpus)
}

/// Crawl every subject, then replace the corpus at `path`. Nothing is written on failure.
pub async fn run(fetcher: &Fetcher, sources: &PlanSources, path: &Path) -> Result<Corpus> {
    let corpus = build_corpus(fetcher, sources).await?;
    store::save(path, &corpus)?;
    Ok(corpus)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::Settings;
    use crate::error::StructureError;

    /// Serve `respond(request_line)` as (status, body) over plain HTTP/1.1.
    async fn serve<F>(respond: F) -> Fetcher
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let addr = listen(respond).await;
        fetcher_for(addr, 0)
    }

    async fn listen<F>(respond: F) -> SocketAddr
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let respond = Arc::new(respond);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let respond = Arc::clone(&respond);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&buf);
                    let request_line = request.lines().next().unwrap_or_default().to_string();
                    let (status, body) = respond(&request_line);
                    let response = format!(
                        "HTTP/1.1 {} X\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        addr
    }

    fn fetcher_for(addr: SocketAddr, max_retries: u32) -> Fetcher {
        let settings = Settings {
            base_url: format!("http://{}/lplandb/index.php", addr),
            max_retries,
            backoff_ms: 10,
            ..Settings::default()
        };
        Fetcher::new(&settings).unwrap()
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[tokio::test]
    async fn corpus_has_every_subject() {
        let fetcher = serve(|_| (200, fixture("minimal"))).await;
        let corpus = build_corpus(&fetcher, &PlanSources::default()).await.unwrap();

        let subjects: Vec<Subject> = corpus.keys().copied().collect();
        assert_eq!(subjects, Subject::ALL);
        for plan in corpus.values() {
            assert_eq!(plan.content.len(), 3);
            assert_eq!(plan.table_of_contents.len(), 2);
        }
    }

    #[tokio::test]
    async fn one_failed_fetch_fails_the_corpus() {
        let fetcher = serve(|line| {
            if line.contains("lplanid=912") {
                (404, "not found".to_string())
            } else {
                (200, fixture("minimal"))
            }
        })
        .await;

        let err = build_corpus(&fetcher, &PlanSources::default()).await.unwrap_err();
        assert!(matches!(err, Error::Transport { subject: Subject::Mathe, .. }));
    }

    #[tokio::test]
    async fn structure_error_names_subject_and_block() {
        let fetcher = serve(|line| {
            if line.contains("lplanid=91&") {
                (200, fixture("missing_block"))
            } else {
                (200, fixture("minimal"))
            }
        })
        .await;

        let err = build_corpus(&fetcher, &PlanSources::default()).await.unwrap_err();
        match err {
            Error::Structure { subject, source } => {
                assert_eq!(subject, Subject::Englisch);
                assert!(matches!(source, StructureError::NotFound { ref value, .. } if value == "C"));
            }
            other => panic!("expected structure error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_plan() {
        let fetcher = serve(|_| (200, fixture("minimal"))).await;
        let locator = PlanSources::default().get(Subject::Deutsch);
        let plan = build_plan(&fetcher, Subject::Deutsch, locator).await.unwrap();
        assert_eq!(plan.cover_page, "Lehrplan Grundschule Testfach 2019");
    }

    #[tokio::test]
    async fn server_error_is_retried_until_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let addr = listen(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                (503, "busy".to_string())
            } else {
                (200, fixture("minimal"))
            }
        })
        .await;

        let fetcher = fetcher_for(addr, 2);
        let locator = PlanSources::default().get(Subject::Mathe);
        let plan = build_plan(&fetcher, Subject::Mathe, locator).await.unwrap();
        assert_eq!(plan.content.len(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let addr = listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            (404, "not found".to_string())
        })
        .await;

        let fetcher = fetcher_for(addr, 3);
        let locator = PlanSources::default().get(Subject::Deutsch);
        let err = build_plan(&fetcher, Subject::Deutsch, locator).await.unwrap_err();
        assert!(matches!(err, Error::Transport { subject: Subject::Deutsch, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_give_up_after_max_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let addr = listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            (429, "slow down".to_string())
        })
        .await;

        let fetcher = fetcher_for(addr, 2);
        let locator = PlanSources::default().get(Subject::Englisch);
        let err = build_plan(&fetcher, Subject::Englisch, locator).await.unwrap_err();
        assert!(matches!(err, Error::Transport { subject: Subject::Englisch, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_run_leaves_stored_corpus_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let ok = serve(|_| (200, fixture("minimal"))).await;
        run(&ok, &PlanSources::default(), &path).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let failing = serve(|line| {
            if line.contains("lplanid=80&") {
                (404, "not found".to_string())
            } else {
                (200, fixture("minimal").replace("Testfach", "Neufach"))
            }
        })
        .await;
        let err = run(&failing, &PlanSources::default(), &path).await.unwrap_err();
        assert!(matches!(err, Error::Transport { subject: Subject::Sachunterricht, .. }));

        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn successful_run_writes_corpus() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("resources").join("data.json");

        let fetcher = serve(|_| (200, fixture("minimal"))).await;
        let corpus = run(&fetcher, &PlanSources::default(), &path).await.unwrap();
        assert_eq!(store::load(&path).unwrap(), corpus);
    }

    #[tokio::test]
    async fn progress_bar_is_finished_after_failure() {
        let fetcher = serve(|line| {
            if line.contains("lplanid=912") {
                (404, "not found".to_string())
            } else {
                (200, fixture("minimal"))
            }
        })
        .await;

        let pb = ProgressBar::hidden();
        let err = build_corpus_with(&fetcher, &PlanSources::default(), &pb).await.unwrap_err();
        assert!(matches!(err, Error::Transport { subject: Subject::Mathe, .. }));
        assert!(pb.is_finished());
    }

    #[tokio::test]
    async fn progress_bar_counts_every_plan() {
        let fetcher = serve(|_| (200, fixture("minimal"))).await;
        let pb = ProgressBar::hidden();
        build_corpus_with(&fetcher, &PlanSources::default(), &pb).await.unwrap();
        assert_eq!(pb.position(), Subject::ALL.len() as u64);
        assert!(pb.is_finished());
    }
}
