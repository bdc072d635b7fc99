//! Bounded fan-out of per-dependency work.
//!
//! Every top-level dependency runs in its own task, at most `concurrency` at
//! a time. Tasks share nothing but the toolchain, the progress counter and
//! the scratch area; results are reassembled in input order. An exhausted
//! vulnerability quota cancels the whole run.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

use crate::engine::Differ;
use crate::error::{DsuError, Result};
use crate::plugin::Toolchain;
use crate::report::{InventoryEntry, InventoryReport, UpdateEntry, UpdateReport};
use crate::scratch::ScratchArea;
use crate::survey::Surveyor;
use crate::types::{Dependency, Ledger};

pub const DEFAULT_CONCURRENCY: usize = 8;

pub trait ProgressSink: Send + Sync {
    fn start(&self, _total: usize) {}

    fn advance(&self, completed: usize, total: usize);

    fn finish(&self) {}
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&self, _completed: usize, _total: usize) {}
}

struct FanOut<T> {
    outcomes: Vec<(Dependency, Result<T>)>,
    failures: Vec<String>,
}

pub struct Scheduler {
    toolchain: Toolchain,
    scratch: Arc<ScratchArea>,
    concurrency: usize,
    progress: Arc<dyn ProgressSink>,
}

impl Scheduler {
    pub fn new(toolchain: Toolchain, scratch: Arc<ScratchArea>) -> Self {
        Self {
            toolchain,
            scratch,
            concurrency: DEFAULT_CONCURRENCY,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Differences every dependency that has an update. Dependencies without
    /// one are skipped.
    pub async fn analyze_all(&self, dependencies: Vec<Dependency>) -> Result<UpdateReport> {
        let started = Instant::now();
        let targets: Vec<Dependency> = dependencies.into_iter().filter(Dependency::has_update).collect();
        let mut report = UpdateReport::new();
        if targets.is_empty() {
            return Ok(report);
        }

        info!(dependencies = targets.len(), concurrency = self.concurrency, "analyzing updates");
        let differ = Arc::new(Differ::new(self.toolchain.clone()));
        let fan = self
            .fan_out(targets, move |dependency| {
                let differ = differ.clone();
                async move { differ.analyze_update(&dependency).await }
            })
            .await?;

        for (dependency, outcome) in fan.outcomes {
            let entry = match outcome {
                Ok(ledger) => UpdateEntry::new(&dependency, ledger, None),
                Err(err) => UpdateEntry::new(&dependency, Ledger::new(), Some(err.to_string())),
            };
            report.add_entry(entry);
        }
        report.errors = fan.failures;
        report.elapsed = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Surveys every dependency's current tree.
    pub async fn survey_all(&self, dependencies: Vec<Dependency>) -> Result<InventoryReport> {
        let started = Instant::now();
        let mut report = InventoryReport::new();
        if dependencies.is_empty() {
            return Ok(report);
        }

        info!(dependencies = dependencies.len(), concurrency = self.concurrency, "surveying dependencies");
        let surveyor = Arc::new(Surveyor::new(self.toolchain.clone()));
        let fan = self
            .fan_out(dependencies, move |dependency| {
                let surveyor = surveyor.clone();
                async move { surveyor.survey(&dependency).await }
            })
            .await?;

        for (dependency, outcome) in fan.outcomes {
            let entry = match outcome {
                Ok(surveyed) => InventoryEntry::new(surveyed, None),
                Err(err) => InventoryEntry::new(dependency, Some(err.to_string())),
            };
            report.add_entry(entry);
        }
        report.errors = fan.failures;
        report.elapsed = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn fan_out<T, F, Fut>(&self, items: Vec<Dependency>, task: F) -> Result<FanOut<T>>
    where
        T: Send + 'static,
        F: Fn(Dependency) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.scratch.ensure().await?;

        let total = items.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();
        self.progress.start(total);

        for (index, item) in items.into_iter().enumerate() {
            let permits = permits.clone();
            let completed = completed.clone();
            let progress = self.progress.clone();
            let span = tracing::info_span!("dependency", coordinate = %item.coordinate());
            let work = task(item.clone());

            set.spawn(
                async move {
                    let outcome = match permits.acquire_owned().await {
                        Ok(_permit) => work.await,
                        Err(_) => Err(DsuError::Cancelled),
                    };
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.advance(done, total);
                    (index, item, outcome)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<(Dependency, Result<T>)>> = (0..total).map(|_| None).collect();
        let mut failures = Vec::new();
        let mut fatal = None;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, item, Err(err))) if err.is_rate_limited() => {
                    error!(dependency = %item, error = %err, "quota exhausted, cancelling run");
                    fatal = Some(err);
                    set.abort_all();
                    break;
                }
                Ok((index, item, outcome)) => {
                    if let Err(err) = &outcome {
                        warn!(dependency = %item, error = %err, "analysis failed");
                    }
                    slots[index] = Some((item, outcome));
                }
                Err(join_error) if join_error.is_cancelled() => {}
                Err(join_error) => {
                    error!(error = %join_error, "task panicked");
                    failures.push(join_error.to_string());
                }
            }
        }
        while set.join_next().await.is_some() {}

        self.progress.finish();
        self.scratch.teardown().await;

        if let Some(err) = fatal {
            return Err(err);
        }
        debug!(completed = completed.load(Ordering::SeqCst), total, "fan-out finished");
        Ok(FanOut {
            outcomes: slots.into_iter().flatten().collect(),
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{dep, World};
    use crate::types::{DiffKind, LicenseType};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Recorder(Mutex<Vec<usize>>);

    impl ProgressSink for Recorder {
        fn advance(&self, completed: usize, _total: usize) {
            self.0.lock().unwrap().push(completed);
        }
    }

    fn world() -> World {
        let mut world = World::default();
        for name in ["a", "b", "c", "d", "e"] {
            let old = format!("{}@v1.0.0", name);
            let new = format!("{}@v1.1.0", name);
            world = world
                .license(&old, &format!("{}-old", name), Some(("MIT", LicenseType::Notice)))
                .license(&new, &format!("{}-new", name), Some(("GPL-3.0", LicenseType::Restricted)))
                .children(&new, vec![dep(&format!("{}-extra", name), "v0.1.0")]);
        }
        world
    }

    fn inputs() -> Vec<Dependency> {
        let mut deps: Vec<Dependency> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| dep(n, "v1.0.0").with_update(dep(n, "v1.1.0")))
            .collect();
        deps.insert(2, dep("pinned", "v3.0.0"));
        deps
    }

    fn scratch(dir: &TempDir) -> Arc<ScratchArea> {
        Arc::new(ScratchArea::new(dir.path().join("scratch")))
    }

    fn assert_scratch_clean(dir: &TempDir) {
        let root = dir.path().join("scratch");
        let leftovers = std::fs::read_dir(&root).map(|entries| entries.count()).unwrap_or(0);
        assert_eq!(leftovers, 0, "run directories left in {}", root.display());
    }

    #[tokio::test]
    async fn test_results_in_input_order_and_independent_of_concurrency() {
        let dir = TempDir::new().unwrap();
        let mut reports = Vec::new();
        for concurrency in [1, 3, 16] {
            let (_, toolchain) = world().toolchain();
            let report = Scheduler::new(toolchain, scratch(&dir))
                .with_concurrency(concurrency)
                .analyze_all(inputs())
                .await
                .unwrap();
            reports.push(report);
        }

        let order: Vec<&str> = reports[0].entries.iter().map(|e| e.dependency.path.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d", "e"]);
        for report in &reports {
            assert_eq!(report.summary.dependencies_analyzed, 5);
            for entry in &report.entries {
                let kinds: Vec<DiffKind> = entry.ledger.iter().map(|d| d.kind).collect();
                assert_eq!(kinds, vec![DiffKind::MoreStrict, DiffKind::NewDependency]);
            }
            assert_eq!(report.entries.len(), reports[0].entries.len());
            for (left, right) in report.entries.iter().zip(&reports[0].entries) {
                assert_eq!(left.ledger, right.ledger);
            }
        }
        assert_scratch_clean(&dir);
    }

    #[tokio::test]
    async fn test_progress_counts_every_task() {
        let dir = TempDir::new().unwrap();
        let (_, toolchain) = world().toolchain();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        Scheduler::new(toolchain, scratch(&dir))
            .with_concurrency(2)
            .with_progress(recorder.clone())
            .analyze_all(inputs())
            .await
            .unwrap();

        let mut seen = recorder.0.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_task_error_is_recorded_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let (_, toolchain) = world().corrupt_listing("c@v1.1.0").toolchain();
        let report = Scheduler::new(toolchain, scratch(&dir))
            .analyze_all(inputs())
            .await
            .unwrap();

        assert_eq!(report.summary.failed, 1);
        let failed = &report.entries[2];
        assert_eq!(failed.dependency.path, "c");
        assert!(failed.error.is_some());
        assert!(failed.ledger.is_empty());
        assert!(report.entries[3].error.is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_cancels_run_and_tears_down() {
        let dir = TempDir::new().unwrap();
        let (_, toolchain) = world().rate_limited("b@v1.1.0").toolchain();
        let err = Scheduler::new(toolchain, scratch(&dir))
            .with_concurrency(1)
            .analyze_all(inputs())
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_scratch_clean(&dir);
    }

    #[tokio::test]
    async fn test_nothing_to_analyze() {
        let dir = TempDir::new().unwrap();
        let (world, toolchain) = World::default().toolchain();
        let report = Scheduler::new(toolchain, scratch(&dir))
            .analyze_all(vec![dep("pinned", "v1.0.0")])
            .await
            .unwrap();
        assert!(report.entries.is_empty());
        assert!(world.resolved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_survey_all() {
        let dir = TempDir::new().unwrap();
        let (_, toolchain) = World::default()
            .children("root@v1", vec![dep("child", "v1")])
            .vulnerable("child@v1", "GO-1", 5.0)
            .toolchain();
        let report = Scheduler::new(toolchain, scratch(&dir))
            .survey_all(vec![dep("root", "v1"), dep("other", "v2")])
            .await
            .unwrap();

        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].submodules, 1);
        assert_eq!(report.highest_severity(), Some(crate::types::Severity::Medium));
    }
}
