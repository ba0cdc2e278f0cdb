//! Exclusive run orchestration: expand, override, delegate, restore, record.

use super::transaction::{
    ConfigTransaction, ConfigTransactionError, ResourceSnapshot, RunOverride,
};
use crate::run::{
    domain::{
        AdHocRunRequest, ExpandedKeywords, KeywordMatcher, RunOutcome, RunOutput, RunPermit,
        RunRequest, RunRequestError, RunResult, RunSlot, RunStats, SourceKind, match_and_rank,
    },
    ports::{KeywordExpander, PipelineContext, ReportPipeline, ResultSource},
};
use crate::task::{
    domain::{NewTaskExecution, TaskId},
    ports::{TaskRepository, TaskRepositoryError},
};
use futures::FutureExt;
use mockable::Clock;
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reason recorded when an artifact run produced no artifact.
pub const MISSING_ARTIFACT_REASON: &str = "report artifact was not generated";

/// Errors returned instead of a [`RunResult`].
#[derive(Debug, Error)]
pub enum RunCoordinatorError {
    /// Another run holds the run slot.
    #[error("another run is already in progress")]
    Conflict,
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// The request was invalid.
    #[error(transparent)]
    Validation(#[from] RunRequestError),
    /// Task lookup failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// Shared documents could not be rewritten or restored.
    #[error(transparent)]
    Config(#[from] ConfigTransactionError),
    /// The run task ended without producing a result.
    #[error("run task failed: {0}")]
    Interrupted(#[source] tokio::task::JoinError),
}

/// External collaborators of a run.
#[derive(Clone)]
pub struct RunCollaborators {
    /// Keyword expansion provider.
    pub expander: Arc<dyn KeywordExpander>,
    /// Delegated fetch, filter, and render step.
    pub pipeline: Arc<dyn ReportPipeline>,
    /// Persisted result sets for link-list runs.
    pub results: Arc<dyn ResultSource>,
    /// Shared document transaction.
    pub transaction: ConfigTransaction,
}

struct Staged {
    outcome: RunOutcome,
    stats: RunStats,
}

enum StageFailure {
    Fatal(ConfigTransactionError),
    Upstream {
        reason: String,
        platform_count: usize,
    },
}

impl StageFailure {
    fn upstream(reason: impl Into<String>, platform_count: usize) -> Self {
        Self::Upstream {
            reason: reason.into(),
            platform_count,
        }
    }
}

/// Runs watch searches one at a time.
///
/// Every accepted run restores the shared documents before the run slot is
/// released, whatever the outcome. Accepted runs execute on their own task,
/// so a caller that stops waiting does not interrupt the restore.
pub struct RunCoordinator<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    collaborators: RunCollaborators,
    slot: RunSlot,
}

impl<R, C> Clone for RunCoordinator<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            collaborators: self.collaborators.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<R, C> RunCoordinator<R, C>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a coordinator with its own run slot.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, collaborators: RunCollaborators) -> Self {
        Self {
            repository,
            clock,
            collaborators,
            slot: RunSlot::new(),
        }
    }

    /// Replaces the run slot, letting several coordinators share one.
    #[must_use]
    pub fn with_slot(mut self, slot: RunSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Returns the run slot.
    #[must_use]
    pub const fn slot(&self) -> &RunSlot {
        &self.slot
    }

    /// Replays a stored task and records the execution.
    ///
    /// # Errors
    ///
    /// Returns [`RunCoordinatorError::Conflict`] when another run is active,
    /// [`RunCoordinatorError::NotFound`] for unknown tasks, and
    /// [`RunCoordinatorError::Config`] when the shared documents cannot be
    /// rewritten or restored. Pipeline failures are reported through an
    /// unsuccessful [`RunResult`]. [`RunCoordinatorError::Interrupted`] means
    /// the run task itself failed outside the guarded pipeline call.
    pub async fn execute_task(&self, task_id: &str) -> Result<RunResult, RunCoordinatorError> {
        let id = TaskId::parse(task_id).map_err(RunRequestError::from)?;
        let permit = self.acquire()?;
        let task = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| RunCoordinatorError::NotFound(id.clone()))?;
        info!(task_id = %id, "task run accepted");
        self.spawn_run(permit, RunRequest::from_task(&task), Some(id))
            .await
    }

    /// Runs an ad hoc search without recording history.
    ///
    /// # Errors
    ///
    /// Returns [`RunCoordinatorError::Validation`] for invalid requests and
    /// otherwise fails like [`Self::execute_task`].
    pub async fn execute_ad_hoc(
        &self,
        request: AdHocRunRequest,
    ) -> Result<RunResult, RunCoordinatorError> {
        let validated = request.validate()?;
        let permit = self.acquire()?;
        info!(keywords = validated.keywords.as_slice().len(), "ad hoc run accepted");
        self.spawn_run(permit, validated, None).await
    }

    fn acquire(&self) -> Result<RunPermit, RunCoordinatorError> {
        self.slot.try_acquire().ok_or_else(|| {
            warn!("run rejected: another run is in progress");
            RunCoordinatorError::Conflict
        })
    }

    /// Runs the bracket on its own task, holding `permit` until it ends.
    async fn spawn_run(
        &self,
        permit: RunPermit,
        request: RunRequest,
        task_id: Option<TaskId>,
    ) -> Result<RunResult, RunCoordinatorError> {
        let worker = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = worker.run(&request, task_id.as_ref()).await;
            drop(permit);
            outcome
        });
        handle.await.map_err(RunCoordinatorError::Interrupted)?
    }

    async fn run(
        &self,
        request: &RunRequest,
        task_id: Option<&TaskId>,
    ) -> Result<RunResult, RunCoordinatorError> {
        let started = Instant::now();
        let expanded = self.expand(request).await;
        let snapshot = match self
            .collaborators
            .transaction
            .run_blocking(ConfigTransaction::snapshot)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => return self.fail_fatally(task_id, started, err).await,
        };

        let staged = AssertUnwindSafe(self.run_overridden(request, &expanded, &snapshot, task_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(StageFailure::upstream(
                    format!("report pipeline panicked: {}", panic_message(payload.as_ref())),
                    0,
                ))
            });
        if let Err(err) = self.restore(snapshot).await {
            return self.fail_fatally(task_id, started, err).await;
        }

        let (success, outcome, stats, detail) = match staged {
            Ok(Staged { outcome, stats }) => (true, outcome, stats, None),
            Err(StageFailure::Upstream {
                reason,
                platform_count,
            }) => {
                warn!(error = %reason, "run failed");
                let partial = RunStats {
                    platform_count,
                    matched_count: 0,
                };
                (false, RunOutcome::Failed, partial, Some(reason))
            }
            Err(StageFailure::Fatal(err)) => return self.fail_fatally(task_id, started, err).await,
        };

        let result = RunResult {
            success,
            duration_ms: elapsed_ms(started),
            task_id: task_id.cloned(),
            keywords: expanded,
            outcome,
            stats,
            detail,
        };
        info!(
            success,
            duration_ms = result.duration_ms,
            matched_count = result.stats.matched_count,
            "run finished"
        );
        if let Some(id) = task_id {
            self.write_history(&self.history_record(id, &result)).await;
        }
        Ok(result)
    }

    async fn expand(&self, request: &RunRequest) -> ExpandedKeywords {
        let seeds = request.keywords.as_slice();
        if !request.expand_keywords {
            return ExpandedKeywords::identity(seeds);
        }
        match self.collaborators.expander.expand(seeds).await {
            Ok(expanded) => {
                debug!(seeds = seeds.len(), "keywords expanded");
                expanded
            }
            Err(err) => {
                warn!(error = %err, "keyword expansion failed; searching seed keywords verbatim");
                ExpandedKeywords::identity(seeds)
            }
        }
    }

    async fn run_overridden(
        &self,
        request: &RunRequest,
        expanded: &ExpandedKeywords,
        snapshot: &ResourceSnapshot,
        task_id: Option<&TaskId>,
    ) -> Result<Staged, StageFailure> {
        let captured = snapshot.clone();
        let keywords = expanded.clone();
        let filters = request.filters.as_slice().to_vec();
        let platforms = request.platforms.as_slice().to_vec();
        let report_mode = request.report_mode;
        let summary = self
            .collaborators
            .transaction
            .run_blocking(move |transaction| {
                transaction.apply_override(
                    &captured,
                    RunOverride {
                        expanded: &keywords,
                        filters: &filters,
                        platforms: &platforms,
                        report_mode,
                    },
                )
            })
            .await
            .map_err(StageFailure::Fatal)?;

        let context = PipelineContext {
            report_mode: request.report_mode,
            render_report: request.output == RunOutput::Artifact,
            task_id: task_id.cloned(),
        };
        let report = self
            .collaborators
            .pipeline
            .run(&context)
            .await
            .map_err(|err| StageFailure::upstream(err.to_string(), summary.platform_count))?;

        match request.output {
            RunOutput::Artifact => {
                let Some(artifact_path) = report.artifact_path else {
                    return Err(StageFailure::upstream(
                        MISSING_ARTIFACT_REASON,
                        summary.platform_count,
                    ));
                };
                let artifact_url = report
                    .artifact_url
                    .unwrap_or_else(|| artifact_path.as_str().replace('\\', "/"));
                Ok(Staged {
                    outcome: RunOutcome::Artifact {
                        artifact_path: artifact_path.into_string(),
                        artifact_url,
                    },
                    stats: RunStats {
                        platform_count: summary.platform_count,
                        matched_count: report.matched_count.unwrap_or(0),
                    },
                })
            }
            RunOutput::LinkList => self.collect_links(request, expanded).await,
        }
    }

    async fn restore(&self, snapshot: ResourceSnapshot) -> Result<(), ConfigTransactionError> {
        self.collaborators
            .transaction
            .run_blocking(move |transaction| transaction.restore(&snapshot))
            .await
    }

    async fn collect_links(
        &self,
        request: &RunRequest,
        expanded: &ExpandedKeywords,
    ) -> Result<Staged, StageFailure> {
        let results = &self.collaborators.results;
        let mut sources = results
            .latest(SourceKind::Ranked)
            .await
            .map_err(|err| StageFailure::upstream(err.to_string(), 0))?;
        let scope = request.platforms.as_slice();
        if !scope.is_empty() {
            sources.retain(|source| scope.contains(&source.id));
        }
        sources.extend(
            results
                .latest(SourceKind::Feed)
                .await
                .map_err(|err| StageFailure::upstream(err.to_string(), 0))?,
        );

        let matcher = KeywordMatcher::new(expanded, request.filters.as_slice());
        let matched_items = match_and_rank(&sources, &matcher);
        Ok(Staged {
            stats: RunStats {
                platform_count: sources.len(),
                matched_count: u64::try_from(matched_items.len()).unwrap_or(u64::MAX),
            },
            outcome: RunOutcome::Links { matched_items },
        })
    }

    fn history_record(&self, task_id: &TaskId, result: &RunResult) -> NewTaskExecution {
        let executed_at = self.clock.utc();
        let base = if result.success {
            NewTaskExecution::succeeded(task_id.clone(), result.duration_ms, executed_at)
        } else {
            NewTaskExecution::failed(
                task_id.clone(),
                result.duration_ms,
                result.detail.as_deref().unwrap_or("run failed"),
                executed_at,
            )
        };
        let counted = base.with_matched_count(result.stats.matched_count);
        match result.artifact_path() {
            Some(path) => counted.with_html_path(path),
            None => counted,
        }
    }

    async fn fail_fatally(
        &self,
        task_id: Option<&TaskId>,
        started: Instant,
        err: ConfigTransactionError,
    ) -> Result<RunResult, RunCoordinatorError> {
        warn!(error = %err, "run aborted by configuration failure");
        if let Some(id) = task_id {
            let record = NewTaskExecution::failed(
                id.clone(),
                elapsed_ms(started),
                err.to_string(),
                self.clock.utc(),
            );
            self.write_history(&record).await;
        }
        Err(err.into())
    }

    async fn write_history(&self, record: &NewTaskExecution) {
        match self.repository.record_execution(record).await {
            Ok(id) => debug!(
                task_id = %record.task_id,
                execution_id = id.value(),
                "execution recorded"
            ),
            Err(err) => warn!(
                task_id = %record.task_id,
                error = %err,
                "failed to record execution history"
            ),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
