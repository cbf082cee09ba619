use std::future::Future;
use std::pin::Pin;

use sqlx::PgPool;

use crate::services::audit;

type Compensation = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A compensation that failed during unwind. The corresponding store row or
/// identity is left behind and needs manual follow-up.
#[derive(Debug)]
pub struct CompensationFailure {
    pub step: &'static str,
    pub detail: String,
}

/// Ordered-steps executor for workflows that span the identity provider and
/// the relational store, which fail independently of each other.
///
/// Each successful forward action registers the action that undoes it. When
/// a later forward action fails, registered compensations run in strict
/// reverse order of creation. A compensation failure is logged, recorded in
/// `workflow_failures`, and never blocks the remaining compensations —
/// unwind is best-effort, not transactional.
pub struct Saga {
    workflow: &'static str,
    pool: Option<PgPool>,
    compensations: Vec<(&'static str, Compensation)>,
}

impl Saga {
    /// Runner without a failure log — used by unit tests.
    pub fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            pool: None,
            compensations: Vec::new(),
        }
    }

    /// Runner that records failed compensations in `workflow_failures`.
    pub fn with_failure_log(workflow: &'static str, pool: PgPool) -> Self {
        Self {
            workflow,
            pool: Some(pool),
            compensations: Vec::new(),
        }
    }

    /// Execute a forward action and, on success, register its compensation.
    /// On failure, unwind everything registered so far and propagate the
    /// error untouched.
    pub async fn step<T, E, F, B, C>(
        &mut self,
        label: &'static str,
        forward: F,
        compensation: B,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        B: FnOnce(&T) -> C,
        C: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        match forward.await {
            Ok(value) => {
                self.compensations.push((label, Box::pin(compensation(&value))));
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("workflow {}: step '{label}' failed, unwinding", self.workflow);
                self.unwind().await;
                Err(e)
            }
        }
    }

    /// Execute a forward action with nothing to undo (typically the last
    /// step). Still unwinds earlier steps on failure.
    pub async fn run<T, E, F>(&mut self, label: &'static str, forward: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match forward.await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!("workflow {}: step '{label}' failed, unwinding", self.workflow);
                self.unwind().await;
                Err(e)
            }
        }
    }

    /// All steps succeeded — discard the compensations.
    pub fn commit(mut self) {
        self.compensations.clear();
    }

    /// Run registered compensations in reverse order, collecting the ones
    /// that failed.
    pub async fn unwind(&mut self) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        while let Some((step, compensation)) = self.compensations.pop() {
            if let Err(e) = compensation.await {
                tracing::warn!(
                    "workflow {}: compensation '{}' failed: {e}",
                    self.workflow,
                    step
                );
                if let Some(pool) = &self.pool {
                    audit::record_compensation_failure(
                        pool.clone(),
                        self.workflow,
                        step,
                        &e.to_string(),
                    );
                }
                failures.push(CompensationFailure {
                    step,
                    detail: e.to_string(),
                });
            } else {
                tracing::info!("workflow {}: compensated '{}'", self.workflow, step);
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn tracker() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn mark(log: &Arc<Mutex<Vec<&'static str>>>, entry: &'static str) {
        log.lock().unwrap().push(entry);
    }

    #[tokio::test]
    async fn commit_discards_compensations() {
        let log = tracker();
        let mut saga = Saga::new("test");

        let l = log.clone();
        saga.step(
            "create a",
            async { Ok::<_, anyhow::Error>(1u32) },
            move |_| async move {
                mark(&l, "undo a");
                Ok::<(), anyhow::Error>(())
            },
        )
        .await
        .unwrap();

        saga.commit();
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_unwinds_in_reverse_order() {
        let log = tracker();
        let mut saga = Saga::new("test");

        let l = log.clone();
        saga.step(
            "create a",
            async { Ok::<_, anyhow::Error>(()) },
            move |_| async move {
                mark(&l, "undo a");
                Ok::<(), anyhow::Error>(())
            },
        )
        .await
        .unwrap();

        let l = log.clone();
        saga.step(
            "create b",
            async { Ok::<_, anyhow::Error>(()) },
            move |_| async move {
                mark(&l, "undo b");
                Ok::<(), anyhow::Error>(())
            },
        )
        .await
        .unwrap();

        let result: Result<(), anyhow::Error> = saga
            .run("create c", async { Err(anyhow::anyhow!("c exploded")) })
            .await;

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["undo b", "undo a"]);
    }

    #[tokio::test]
    async fn failing_compensation_does_not_block_the_rest() {
        let log = tracker();
        let mut saga = Saga::new("test");

        let l = log.clone();
        saga.step(
            "create a",
            async { Ok::<_, anyhow::Error>(()) },
            move |_| async move {
                mark(&l, "undo a");
                Ok::<(), anyhow::Error>(())
            },
        )
        .await
        .unwrap();

        saga.step(
            "create b",
            async { Ok::<_, anyhow::Error>(()) },
            |_| async { Err(anyhow::anyhow!("undo b failed")) },
        )
        .await
        .unwrap();

        let failures = saga.unwind().await;

        // The broken compensation is reported, the earlier one still ran.
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].step, "create b");
        assert_eq!(*log.lock().unwrap(), vec!["undo a"]);
    }

    #[tokio::test]
    async fn step_failure_skips_own_compensation() {
        let log = tracker();
        let mut saga = Saga::new("test");

        let l = log.clone();
        let result: Result<(), anyhow::Error> = saga
            .step(
                "create a",
                async { Err(anyhow::anyhow!("a never happened")) },
                move |_| async move {
                    mark(&l, "undo a");
                    Ok(())
                },
            )
            .await;

        assert!(result.is_err());
        assert!(log.lock().unwrap().is_empty());
    }
}
