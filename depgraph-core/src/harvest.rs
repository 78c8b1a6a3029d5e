//! Bounded-concurrency harvesting of inventories and dependency edges.
//!
//! Every batch call spawns one task per scope onto a [`JoinSet`]. Each task
//! first takes a permit from a [`Semaphore`] sized to the concurrency limit,
//! so at most that many remote calls are in flight and a finished call's
//! permit goes straight to the next waiting task. The join loop is the single
//! writer for the result accumulator and the progress counter, and it only
//! returns once every task has finished.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{Id as TaskId, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::config::HarvestSection;
use crate::error::FetchError;
use crate::progress::{NoopReporter, ProgressReporter};
use crate::source::RemoteSource;
use crate::types::{ComponentRecord, DependencyEdgeRecord, EdgeScope, TypeDescriptor};

/// Result of a batch harvest: everything that arrived plus the scopes that didn't.
#[derive(Debug)]
pub struct HarvestOutcome<T> {
    pub records: Vec<T>,
    /// `(scope label, error)` for every task that contributed nothing.
    pub failed: Vec<(String, FetchError)>,
    /// Tasks scheduled (and therefore completed) in this batch.
    pub tasks: usize,
}

impl<T> HarvestOutcome<T> {
    pub fn failed_scopes(&self) -> Vec<String> {
        self.failed.iter().map(|(scope, _)| scope.clone()).collect()
    }
}

/// Fetches per-type inventories and dependency edges from a [`RemoteSource`].
#[derive(Debug, Clone)]
pub struct Harvester {
    source: Arc<dyn RemoteSource>,
    concurrency: usize,
    call_timeout: Duration,
    id_chunk_size: usize,
    reporter: Arc<dyn ProgressReporter>,
}

impl Harvester {
    pub fn new(source: Arc<dyn RemoteSource>, config: &HarvestSection) -> Self {
        Self {
            source,
            concurrency: config.concurrency.max(1),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            id_chunk_size: config.id_chunk_size.max(1),
            reporter: Arc::new(NoopReporter),
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Override the concurrency limit. Zero is treated as one.
    #[must_use]
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn source(&self) -> &Arc<dyn RemoteSource> {
        &self.source
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// One inventory fetch per type. Failed types contribute nothing.
    #[instrument(skip_all, name = "fetch_inventory", fields(types = types.len()))]
    pub async fn fetch_inventory(&self, types: &[TypeDescriptor]) -> HarvestOutcome<ComponentRecord> {
        let jobs = types
            .iter()
            .map(|t| (format!("type:{}", t.name), t.name.clone()))
            .collect();
        self.run_bounded("inventory", jobs, |source, type_name: String| async move {
            source.list_components(&type_name).await
        })
        .await
    }

    /// One edge query per type. Failed types contribute nothing.
    #[instrument(skip_all, name = "fetch_edges", fields(types = types.len()))]
    pub async fn fetch_edges_by_type(
        &self,
        types: &[TypeDescriptor],
    ) -> HarvestOutcome<DependencyEdgeRecord> {
        let scopes = types
            .iter()
            .map(|t| EdgeScope::OfType(t.name.clone()))
            .collect();
        self.fetch_edge_scopes("edges", scopes).await
    }

    /// Edge queries for explicit ids, chunked so each query stays a sane size.
    #[instrument(skip_all, name = "fetch_edges", fields(ids = ids.len()))]
    pub async fn fetch_edges_by_id(&self, ids: &[String]) -> HarvestOutcome<DependencyEdgeRecord> {
        let scopes = ids
            .chunks(self.id_chunk_size)
            .map(|chunk| EdgeScope::ById(chunk.to_vec()))
            .collect();
        self.fetch_edge_scopes("edges by id", scopes).await
    }

    async fn fetch_edge_scopes(
        &self,
        task: &str,
        scopes: Vec<EdgeScope>,
    ) -> HarvestOutcome<DependencyEdgeRecord> {
        let jobs = scopes
            .into_iter()
            .map(|scope| (scope.to_string(), scope))
            .collect();
        self.run_bounded(task, jobs, |source, scope: EdgeScope| async move {
            source.query_dependency_edges(&scope).await
        })
        .await
    }

    /// A single edge query with the per-call deadline, errors surfaced.
    ///
    /// Used where a silent empty result would be wrong: repair batches and
    /// live dependency lookups.
    pub async fn query_edges(
        &self,
        scope: &EdgeScope,
    ) -> Result<Vec<DependencyEdgeRecord>, FetchError> {
        with_deadline(self.call_timeout, self.source.query_dependency_edges(scope)).await
    }

    async fn run_bounded<J, T, F, Fut>(
        &self,
        task: &str,
        jobs: Vec<(String, J)>,
        call: F,
    ) -> HarvestOutcome<T>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(Arc<dyn RemoteSource>, J) -> Fut,
        Fut: Future<Output = Result<Vec<T>, FetchError>> + Send + 'static,
    {
        let total = jobs.len();
        self.reporter.start(task, total as u64);
        info!(task, total, concurrency = self.concurrency, "Harvest starting");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();
        // Labels by task id, so a panicked task still names its scope.
        let mut labels: HashMap<TaskId, String> = HashMap::with_capacity(total);
        for (scope, job) in jobs {
            let label = format!("{task} {scope}");
            let semaphore = Arc::clone(&semaphore);
            let fetch = call(Arc::clone(&self.source), job);
            let deadline = self.call_timeout;
            let handle = set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Err(FetchError::Transient("harvest pool closed".into()));
                };
                with_deadline(deadline, fetch).await
            });
            labels.insert(handle.id(), label);
        }

        let mut records = Vec::new();
        let mut failed = Vec::new();
        let mut completed = 0usize;
        while let Some(joined) = set.join_next_with_id().await {
            completed += 1;
            self.reporter.advance(1);
            match joined {
                Ok((id, Ok(mut batch))) => {
                    let label = labels.remove(&id).unwrap_or_default();
                    debug!(scope = %label, records = batch.len(), completed, total, "Fetch complete");
                    records.append(&mut batch);
                }
                Ok((id, Err(e))) => {
                    let label = labels.remove(&id).unwrap_or_default();
                    warn!(scope = %label, error = %e, completed, total, "Fetch failed, continuing without it");
                    failed.push((label, e));
                }
                Err(e) => {
                    let label = labels.remove(&e.id()).unwrap_or_default();
                    warn!(scope = %label, error = %e, completed, total, "Fetch task aborted");
                    failed.push((label, FetchError::Transient(format!("task aborted: {e}"))));
                }
            }
        }
        self.reporter.finish();

        info!(
            task,
            records = records.len(),
            failed = failed.len(),
            "Harvest complete"
        );
        HarvestOutcome {
            records,
            failed,
            tasks: total,
        }
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(FetchError::Timeout(deadline)))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::source::MemorySource;

    /// Records every reporter call so tests can check the counter.
    #[derive(Debug, Default)]
    pub(crate) struct CountingReporter {
        pub started: Mutex<Vec<(String, u64)>>,
        pub advanced: AtomicU64,
        pub finished: AtomicU64,
    }

    impl ProgressReporter for CountingReporter {
        fn start(&self, task: &str, total: u64) {
            self.started
                .lock()
                .unwrap()
                .push((task.to_string(), total));
        }
        fn advance(&self, amount: u64) {
            self.advanced.fetch_add(amount, Ordering::SeqCst);
        }
        fn finish(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
        fn message(&self, _msg: &str) {}
    }

    pub(crate) fn twelve_types() -> (MemorySource, Vec<TypeDescriptor>) {
        let mut source = MemorySource::new();
        let mut types = Vec::new();
        for i in 0..12 {
            let name = format!("Type{i}");
            let a = format!("t{i}-a");
            let b = format!("t{i}-b");
            source = source.with_type(&name, &[(a.as_str(), "first"), (b.as_str(), "second")]);
            types.push(TypeDescriptor::new(name));
        }
        (source, types)
    }

    fn harvester(source: Arc<MemorySource>, limit: usize) -> Harvester {
        Harvester::new(source, &HarvestSection::default()).with_concurrency(limit)
    }

    fn sorted_ids(records: &[ComponentRecord]) -> Vec<String> {
        let mut ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids
    }

    #[tokio::test(start_paused = true)]
    async fn all_types_complete_under_limit() {
        let (source, types) = twelve_types();
        let source = Arc::new(source);
        // Scrambled completion order.
        for (i, t) in types.iter().enumerate() {
            source.delay_type(&t.name, Duration::from_millis(((i * 7) % 12) as u64 * 10));
        }

        let reporter = Arc::new(CountingReporter::default());
        let outcome = harvester(Arc::clone(&source), 5)
            .with_reporter(reporter.clone())
            .fetch_inventory(&types)
            .await;

        assert_eq!(outcome.tasks, 12);
        assert_eq!(outcome.records.len(), 24);
        assert!(outcome.failed.is_empty());
        assert_eq!(source.calls().list, 12);
        assert!(source.max_in_flight() <= 5);
        assert!(source.max_in_flight() > 1);

        assert_eq!(reporter.advanced.load(Ordering::SeqCst), 12);
        assert_eq!(reporter.finished.load(Ordering::SeqCst), 1);
        assert_eq!(
            *reporter.started.lock().unwrap(),
            vec![("inventory".to_string(), 12)]
        );
    }

    #[tokio::test]
    async fn one_failed_type_is_excluded() {
        let (source, types) = twelve_types();
        source.fail_type("Type3");
        let source = Arc::new(source);
        let reporter = Arc::new(CountingReporter::default());

        let outcome = harvester(Arc::clone(&source), 5)
            .with_reporter(reporter.clone())
            .fetch_inventory(&types)
            .await;

        assert_eq!(outcome.records.len(), 22);
        assert!(!sorted_ids(&outcome.records).contains(&"t3-a".to_string()));
        assert_eq!(outcome.failed_scopes(), vec!["inventory type:Type3"]);
        // failed tasks still count toward progress
        assert_eq!(reporter.advanced.load(Ordering::SeqCst), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_call_times_out_without_stalling_batch() {
        let (source, types) = twelve_types();
        source.delay_type("Type0", Duration::from_secs(3600));
        let source = Arc::new(source);

        let outcome = harvester(Arc::clone(&source), 5)
            .with_call_timeout(Duration::from_secs(5))
            .fetch_inventory(&types)
            .await;

        assert_eq!(outcome.records.len(), 22);
        assert_eq!(outcome.failed.len(), 1);
        assert!(matches!(outcome.failed[0].1, FetchError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limit_runs_serially() {
        let (source, types) = twelve_types();
        let source = Arc::new(source);
        for t in &types {
            source.delay_type(&t.name, Duration::from_millis(5));
        }
        let h = harvester(Arc::clone(&source), 0);
        assert_eq!(h.concurrency(), 1);
        let outcome = h.fetch_inventory(&types).await;
        assert_eq!(outcome.records.len(), 24);
        assert_eq!(source.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn edges_by_id_are_chunked() {
        let source = Arc::new(
            MemorySource::new()
                .with_type("ApexClass", &[("a", "A"), ("b", "B")])
                .with_edge("a", "b"),
        );
        let ids: Vec<String> = (0..250).map(|i| format!("id{i}")).chain(["a".to_string()]).collect();
        let outcome = Harvester::new(
            source.clone(),
            &HarvestSection {
                id_chunk_size: 100,
                ..HarvestSection::default()
            },
        )
        .fetch_edges_by_id(&ids)
        .await;

        assert_eq!(outcome.tasks, 3);
        assert_eq!(source.calls().edges_by_id, 3);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn edges_by_type_tolerate_failure() {
        let source = MemorySource::new()
            .with_type("ApexClass", &[("a", "A")])
            .with_type("ApexPage", &[("p", "P")])
            .with_edge("a", "p")
            .with_edge("p", "a");
        source.fail_type("ApexPage");
        let types = vec![TypeDescriptor::new("ApexClass"), TypeDescriptor::new("ApexPage")];

        let outcome = harvester(Arc::new(source), 2)
            .fetch_edges_by_type(&types)
            .await;
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].source_id, "a");
        assert_eq!(outcome.failed_scopes(), vec!["edges type:ApexPage"]);
    }

    /// Serves two types and panics on the inventory of `Boom`.
    #[derive(Debug)]
    struct PanickingSource;

    #[async_trait::async_trait]
    impl RemoteSource for PanickingSource {
        async fn describe_types(&self) -> Result<Vec<TypeDescriptor>, FetchError> {
            Ok(vec![TypeDescriptor::new("Calm"), TypeDescriptor::new("Boom")])
        }

        async fn list_components(
            &self,
            type_name: &str,
        ) -> Result<Vec<ComponentRecord>, FetchError> {
            assert_ne!(type_name, "Boom", "inventory of Boom blew up");
            Ok(vec![ComponentRecord::new("c1", Some("Calm One"), Some(type_name))])
        }

        async fn query_dependency_edges(
            &self,
            _scope: &EdgeScope,
        ) -> Result<Vec<DependencyEdgeRecord>, FetchError> {
            Ok(Vec::new())
        }

        async fn aggregate(
            &self,
            _query: crate::types::MetricQuery,
        ) -> Result<Vec<crate::types::MetricRow>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn panicked_task_keeps_its_scope_label() {
        let types = vec![TypeDescriptor::new("Calm"), TypeDescriptor::new("Boom")];
        let outcome = Harvester::new(Arc::new(PanickingSource), &HarvestSection::default())
            .fetch_inventory(&types)
            .await;

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.failed_scopes(), vec!["inventory type:Boom"]);
        assert!(matches!(outcome.failed[0].1, FetchError::Transient(_)));
    }

    #[tokio::test]
    async fn query_edges_surfaces_errors() {
        let source = MemorySource::new().with_type("ApexClass", &[("a", "A")]);
        source.fail_by_id(true);
        let err = harvester(Arc::new(source), 1)
            .query_edges(&EdgeScope::ById(vec!["a".into()]))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
