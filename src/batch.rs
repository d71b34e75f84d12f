//! Runs the per-feature evaluations of a dataset concurrently.

use {
    crate::{
        dataset::Task,
        report::{FeatureReport, Status},
    },
    geomatch_config::Runtime,
    geomatch_evidence::{Matcher, Shape},
    std::{sync::Arc, time::Duration},
    tokio::{sync::Semaphore, task::JoinSet},
    tracing::{error, info, warn},
};

/// Evaluates reference features with a shared [`Matcher`].
///
/// Each reference feature is evaluated on the blocking thread pool. The number of evaluations in flight is
/// bounded by [`Runtime::max_concurrent_features`] and each one is subject to the optional
/// [`Runtime::feature_timeout_ms`]. A failed or timed-out feature is reported and logged without stopping the
/// rest of the batch.
pub struct BatchRunner {
    matcher: Arc<Matcher<Shape>>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl BatchRunner {
    pub fn new(matcher: Matcher<Shape>, runtime: &Runtime) -> Self {
        Self {
            matcher: Arc::new(matcher),
            permits: Arc::new(Semaphore::new(runtime.max_concurrent_features.max(1))),
            timeout: runtime.feature_timeout_ms.map(Duration::from_millis),
        }
    }

    /// Evaluates every task and returns one report per task, in task order.
    ///
    /// A timed-out evaluation cannot be interrupted. It keeps its concurrency permit until it finishes and its
    /// result is then discarded.
    pub async fn run(&self, tasks: Vec<Task>) -> Vec<FeatureReport> {
        let references: Vec<String> = tasks.iter().map(|t| t.reference.id.clone()).collect();
        let mut join_set: JoinSet<(usize, FeatureReport)> = JoinSet::new();

        for (index, task) in tasks.into_iter().enumerate() {
            let matcher = self.matcher.clone();
            let permits = self.permits.clone();
            let timeout = self.timeout;
            join_set.spawn(async move {
                let reference = task.reference.id.clone();
                let permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return (index, FeatureReport::failed(reference, Status::Failed, e));
                    }
                };
                // The permit is held until the evaluation returns, even after a timeout.
                let evaluation = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    matcher.evaluate(&task.reference, &task.candidates)
                });
                let joined = match timeout {
                    Some(duration) => match tokio::time::timeout(duration, evaluation).await {
                        Ok(joined) => joined,
                        Err(e) => {
                            warn!(
                                message = "feature timed out",
                                reference = %reference,
                                timeout_ms = duration.as_millis() as u64,
                            );
                            return (index, FeatureReport::failed(reference, Status::TimedOut, e));
                        }
                    },
                    None => evaluation.await,
                };
                let report = match joined {
                    Ok(Ok(report)) => FeatureReport::from(report),
                    Ok(Err(e)) => {
                        warn!(
                            message = "feature failed",
                            reference = %reference,
                            error_message = %e,
                        );
                        FeatureReport::failed(reference, Status::Failed, e)
                    }
                    Err(e) => {
                        error!(
                            message = "join error on feature evaluation",
                            reference = %reference,
                            error_message = ?e,
                        );
                        FeatureReport::failed(reference, Status::Failed, e)
                    }
                };
                (index, report)
            });
        }

        let mut reports: Vec<Option<FeatureReport>> = vec![None; references.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => error!(
                    message = "join error on feature task",
                    error_message = ?e,
                ),
            }
        }

        let reports: Vec<FeatureReport> = reports
            .into_iter()
            .zip(references)
            .map(|(report, reference)| {
                report.unwrap_or_else(|| {
                    FeatureReport::failed(reference, Status::Failed, "feature task did not complete")
                })
            })
            .collect();
        let count = |status: Status| reports.iter().filter(|r| r.status == status).count();
        info!(
            message = "batch complete",
            features = reports.len(),
            evaluated = count(Status::Evaluated),
            failed = count(Status::Failed),
            timed_out = count(Status::TimedOut),
        );
        reports
    }
}
