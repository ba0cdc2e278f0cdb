//! In-memory run collaborators for tests and offline use.

use crate::run::{
    domain::{ExpandedKeywords, KeywordExpansion, SourceKind, SourceResults},
    ports::{
        ExpanderError, KeywordExpander, PipelineContext, PipelineError, PipelineReport,
        ReportPipeline, ResourceError, ResultSource, ResultSourceError, SharedResource,
    },
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;

fn lock<'a, T>(mutex: &'a Mutex<T>, resource: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex.lock().map_err(|_| {
        ResourceError::io(
            resource,
            "lock",
            std::io::Error::other("resource lock poisoned"),
        )
    })
}

/// Shared resource held in memory.
///
/// Clones share the same content.
#[derive(Debug, Clone)]
pub struct InMemoryResource {
    name: String,
    content: Arc<Mutex<Option<Vec<u8>>>>,
    failing_stores: Arc<AtomicUsize>,
}

impl InMemoryResource {
    /// Creates an absent resource.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Arc::new(Mutex::new(None)),
            failing_stores: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a resource holding `content`.
    #[must_use]
    pub fn with_content(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let resource = Self::new(name);
        if let Ok(mut slot) = resource.content.lock() {
            *slot = Some(content.into());
        }
        resource
    }

    /// Makes the next `count` stores fail.
    pub fn fail_next_stores(&self, count: usize) {
        self.failing_stores.store(count, Ordering::SeqCst);
    }

    /// Returns the current content.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.content.lock().ok().and_then(|slot| slot.clone())
    }

    fn take_store_failure(&self) -> bool {
        self.failing_stores
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

impl SharedResource for InMemoryResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Option<Vec<u8>>, ResourceError> {
        Ok(lock(&self.content, &self.name)?.clone())
    }

    fn store(&self, content: &[u8]) -> Result<(), ResourceError> {
        if self.take_store_failure() {
            return Err(ResourceError::io(
                self.name.clone(),
                "write",
                std::io::Error::other("injected store failure"),
            ));
        }
        *lock(&self.content, &self.name)? = Some(content.to_vec());
        Ok(())
    }

    fn remove(&self) -> Result<(), ResourceError> {
        *lock(&self.content, &self.name)? = None;
        Ok(())
    }
}

/// Expander answering from a fixed table.
///
/// Seeds missing from the table expand to themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticKeywordExpander {
    table: HashMap<String, Vec<String>>,
    failure: Option<ExpanderError>,
}

impl StaticKeywordExpander {
    /// Creates an expander that returns every seed verbatim.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates an expander that always fails with `error`.
    #[must_use]
    pub fn failing(error: ExpanderError) -> Self {
        Self {
            table: HashMap::new(),
            failure: Some(error),
        }
    }

    /// Registers the expansion of `seed`.
    #[must_use]
    pub fn with_terms(
        mut self,
        seed: impl Into<String>,
        terms: impl IntoIterator<Item = String>,
    ) -> Self {
        self.table.insert(seed.into(), terms.into_iter().collect());
        self
    }
}

#[async_trait]
impl KeywordExpander for StaticKeywordExpander {
    async fn expand(&self, seeds: &[String]) -> Result<ExpandedKeywords, ExpanderError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let expansions = seeds
            .iter()
            .filter_map(|seed| {
                self.table
                    .get(seed)
                    .map(|terms| KeywordExpansion::new(seed.clone(), terms.iter().cloned()))
            })
            .collect();
        Ok(ExpandedKeywords::from_expansions(seeds, expansions))
    }
}

/// Result sets held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultSource {
    sources: Vec<SourceResults>,
}

impl InMemoryResultSource {
    /// Creates a source serving `sources`.
    #[must_use]
    pub const fn new(sources: Vec<SourceResults>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ResultSource for InMemoryResultSource {
    async fn latest(&self, kind: SourceKind) -> Result<Vec<SourceResults>, ResultSourceError> {
        Ok(self
            .sources
            .iter()
            .filter(|source| source.kind == kind)
            .cloned()
            .collect())
    }
}

/// One pipeline invocation observed by [`StubReportPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRun {
    /// Context the pipeline was called with.
    pub context: PipelineContext,
    /// Content of each observed resource while the pipeline ran.
    pub resources: Vec<Option<Vec<u8>>>,
}

#[derive(Debug, Clone)]
enum StubBehaviour {
    Succeed(PipelineReport),
    Fail(String),
}

/// Scripted report pipeline that records what it saw.
#[derive(Clone)]
pub struct StubReportPipeline {
    behaviour: StubBehaviour,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    observed: Vec<Arc<dyn SharedResource>>,
    runs: Arc<Mutex<Vec<ObservedRun>>>,
}

impl StubReportPipeline {
    /// Creates a pipeline that reports `report`.
    #[must_use]
    pub fn succeeding(report: PipelineReport) -> Self {
        Self::with_behaviour(StubBehaviour::Succeed(report))
    }

    /// Creates a pipeline that fails with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behaviour(StubBehaviour::Fail(reason.into()))
    }

    fn with_behaviour(behaviour: StubBehaviour) -> Self {
        Self {
            behaviour,
            delay: None,
            gate: None,
            observed: Vec::new(),
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleeps for `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Waits for `gate` to be notified before answering.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Captures the content of `resource` on every run.
    #[must_use]
    pub fn observing(mut self, resource: Arc<dyn SharedResource>) -> Self {
        self.observed.push(resource);
        self
    }

    /// Returns every observed run, oldest first.
    #[must_use]
    pub fn runs(&self) -> Vec<ObservedRun> {
        self.runs.lock().map(|runs| runs.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReportPipeline for StubReportPipeline {
    async fn run(&self, context: &PipelineContext) -> Result<PipelineReport, PipelineError> {
        let resources = self
            .observed
            .iter()
            .map(|resource| resource.load().ok().flatten())
            .collect();
        if let Ok(mut runs) = self.runs.lock() {
            runs.push(ObservedRun {
                context: context.clone(),
                resources,
            });
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behaviour {
            StubBehaviour::Succeed(report) => Ok(report.clone()),
            StubBehaviour::Fail(reason) => Err(PipelineError::Failed(reason.clone())),
        }
    }
}
