//! Bounded fan-out of inference calls.
//!
//! A fixed set of tokio workers drains one bounded queue. Work is submitted
//! in *rounds*: every item of a round carries a sender for that round's
//! result channel and the round's cancellation token. Workers never touch
//! nodes; they send results back and the caller applies them in slot order.
//!
//! ```text
//! run_round(requests) ──send──> [bounded queue] ──> worker 0..N ──> InferenceService
//!        ▲                                                │
//!        └────────────── round result channel <───────────┘
//! ```
//!
//! The result channel is sized to the round, so a worker's send never blocks.
//! The first failed item cancels its round: queued items of that round are
//! dropped unprocessed and in-flight calls are aborted.

use crate::error::{Result, TreeError};
use doctree_inference::InferenceService;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkKind {
    Embedding,
    Summary,
    Keywords { max_keywords: usize },
}

impl WorkKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Embedding => "embeddings",
            Self::Summary => "summary",
            Self::Keywords { .. } => "keywords",
        }
    }
}

/// One inference call for the node at `slot` of the caller's tier.
#[derive(Debug, Clone)]
pub struct WorkRequest {
    pub slot: usize,
    pub kind: WorkKind,
    pub text: Arc<str>,
}

impl WorkRequest {
    pub fn new(slot: usize, kind: WorkKind, text: impl Into<Arc<str>>) -> Self {
        Self {
            slot,
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkResult {
    Embedding(Vec<f32>),
    Summary(String),
    Keywords(Vec<String>),
    /// Empty input text; the service was not called.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkOutput {
    pub slot: usize,
    pub result: WorkResult,
}

struct WorkItem {
    request: WorkRequest,
    round: CancellationToken,
    results: mpsc::Sender<Result<WorkOutput>>,
}

pub struct WorkerPool {
    queue: Option<mpsc::Sender<WorkItem>>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawn `workers` tasks on the current tokio runtime.
    pub fn start(
        service: Arc<dyn InferenceService>,
        workers: usize,
        queue_capacity: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (queue, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    service.clone(),
                    receiver.clone(),
                    cancel.clone(),
                ))
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Started {} inference workers (queue capacity {})",
            handles.len(),
            queue_capacity.max(1)
        );

        Self {
            queue: Some(queue),
            workers: handles,
            cancel,
        }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Abort every round in flight and stop the workers.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Submit `requests` and wait until every one has a result, or return the
    /// first error. Outputs arrive in completion order; callers match them
    /// by `slot`.
    pub async fn run_round(&self, requests: Vec<WorkRequest>) -> Result<Vec<WorkOutput>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let queue = self.queue.as_ref().ok_or(TreeError::PoolClosed)?;
        if self.cancel.is_cancelled() {
            return Err(TreeError::Cancelled);
        }

        let expected = requests.len();
        let round = self.cancel.child_token();
        // Whatever way this function exits, leftovers of the round are dropped.
        let _round_guard = round.clone().drop_guard();
        let (results_tx, mut results_rx) = mpsc::channel(expected);

        for request in requests {
            let item = WorkItem {
                request,
                round: round.clone(),
                results: results_tx.clone(),
            };
            tokio::select! {
                biased;
                _ = round.cancelled() => break,
                sent = queue.send(item) => {
                    if sent.is_err() {
                        return Err(TreeError::PoolClosed);
                    }
                }
            }
        }
        drop(results_tx);

        let mut outputs = Vec::with_capacity(expected);
        while let Some(result) = results_rx.recv().await {
            outputs.push(result?);
            if outputs.len() == expected {
                return Ok(outputs);
            }
        }

        if self.cancel.is_cancelled() {
            Err(TreeError::Cancelled)
        } else {
            Err(TreeError::PoolClosed)
        }
    }

    /// Close the queue and wait for every worker to exit.
    pub async fn shutdown(mut self) {
        self.queue.take();
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.await {
                log::error!("Inference worker terminated abnormally: {err}");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.cancel.cancel();
        }
    }
}

async fn run_worker(
    id: usize,
    service: Arc<dyn InferenceService>,
    queue: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    cancel: CancellationToken,
) {
    log::debug!("Inference worker {id} started");
    loop {
        let next = {
            let mut receiver = queue.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = receiver.recv() => item,
            }
        };
        let Some(item) = next else {
            break;
        };
        if item.round.is_cancelled() {
            continue;
        }

        let slot = item.request.slot;
        if item.request.text.is_empty() {
            log::warn!(
                "Skipping {} request for slot {slot}: text is empty",
                item.request.kind.name()
            );
            let _ = item.results.try_send(Ok(WorkOutput {
                slot,
                result: WorkResult::Skipped,
            }));
            continue;
        }

        let outcome = tokio::select! {
            biased;
            _ = item.round.cancelled() => None,
            result = perform(service.as_ref(), &item.request) => Some(result),
        };
        match outcome {
            Some(Ok(result)) => {
                let _ = item.results.try_send(Ok(WorkOutput { slot, result }));
            }
            Some(Err(err)) => {
                log::warn!(
                    "Worker {id}: {} request for slot {slot} failed: {err}",
                    item.request.kind.name()
                );
                let _ = item.results.try_send(Err(err));
                item.round.cancel();
            }
            None => {
                log::debug!("Worker {id}: abandoned slot {slot}, round cancelled");
            }
        }
    }
    log::debug!("Inference worker {id} stopped");
}

async fn perform(service: &dyn InferenceService, request: &WorkRequest) -> Result<WorkResult> {
    match &request.kind {
        WorkKind::Embedding => {
            let output = service.embed(&[request.text.to_string()], false).await?;
            output
                .dense
                .into_iter()
                .next()
                .map(WorkResult::Embedding)
                .ok_or_else(|| TreeError::malformed("embedding response contained no vectors"))
        }
        WorkKind::Summary => Ok(WorkResult::Summary(
            service.summarize(&request.text).await?,
        )),
        WorkKind::Keywords { max_keywords } => Ok(WorkResult::Keywords(
            service
                .extract_keywords(&request.text, *max_keywords)
                .await?,
        )),
    }
}
