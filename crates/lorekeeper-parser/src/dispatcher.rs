//! Bounded concurrent extraction over all chunks of a document

use crate::extractor::SegmentExtractor;
use lorekeeper_domain::{Chunk, ExtractionCategory, LlmProvider, SimilarityIndex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Cloneable handle used to request a best-effort stop
///
/// Segments that have not started yet are skipped once a stop is
/// requested. Segments already talking to the model run to completion.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Create a handle that has not been stopped
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once a stop is requested
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }
}

/// Fans segment extraction out to a bounded number of workers
///
/// The worker limit is shared by every `dispatch` call on the same
/// dispatcher, so categories extracted side by side still respect it.
pub struct Dispatcher {
    max_concurrency: usize,
    permits: Arc<Semaphore>,
    stop_wait: Duration,
    stop: StopHandle,
}

type SegmentOutcome = Option<(usize, Value)>;

impl Dispatcher {
    /// Create a dispatcher; `max_concurrency` is raised to at least 1
    pub fn new(max_concurrency: usize, stop_wait: Duration, stop: StopHandle) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            max_concurrency,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            stop_wait,
            stop,
        }
    }

    /// Maximum number of segments extracted at once
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Extract `category` from every chunk
    ///
    /// The output follows chunk order regardless of completion order.
    /// Segments that produced nothing, panicked, or were skipped after a
    /// stop are absent rather than replaced by placeholders.
    pub async fn dispatch<L, I>(
        &self,
        extractor: Arc<SegmentExtractor<L, I>>,
        chunks: &[Chunk],
        category: ExtractionCategory,
    ) -> Vec<Value>
    where
        L: LlmProvider + Send + Sync + 'static,
        I: SimilarityIndex + Send + Sync + 'static,
    {
        if chunks.is_empty() {
            return Vec::new();
        }

        let mut tasks: JoinSet<SegmentOutcome> = JoinSet::new();

        for chunk in chunks.iter().cloned() {
            let extractor = Arc::clone(&extractor);
            let permits = Arc::clone(&self.permits);
            let stop = self.stop.clone();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                if stop.is_stopped() {
                    debug!(category = %category, order = chunk.order, "Stop requested, skipping segment");
                    return None;
                }

                let order = chunk.order;
                match tokio::task::spawn_blocking(move || extractor.extract(&chunk, category)).await {
                    Ok(value) => value.map(|value| (order, value)),
                    Err(e) => {
                        error!(category = %category, order, error = %e, "Segment extraction panicked");
                        None
                    }
                }
            });
        }

        let mut results: HashMap<usize, Value> = HashMap::with_capacity(chunks.len());
        self.collect(&mut tasks, &mut results, category).await;

        let ordered: Vec<Value> = chunks
            .iter()
            .filter_map(|chunk| results.remove(&chunk.order))
            .collect();

        info!(
            category = %category,
            segments = chunks.len(),
            extracted = ordered.len(),
            "Segment extraction finished"
        );
        ordered
    }

    async fn collect(
        &self,
        tasks: &mut JoinSet<SegmentOutcome>,
        results: &mut HashMap<usize, Value>,
        category: ExtractionCategory,
    ) {
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(joined) => record(joined, results, category),
                    None => return,
                },
                _ = self.stop.stopped() => break,
            }
        }

        info!(
            category = %category,
            in_flight = tasks.len(),
            wait_secs = self.stop_wait.as_secs(),
            "Stop requested, waiting for in-flight segments"
        );

        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                record(joined, results, category);
            }
        };
        if tokio::time::timeout(self.stop_wait, drain).await.is_err() {
            warn!(
                category = %category,
                abandoned = tasks.len(),
                "In-flight segments did not finish in time, abandoning them"
            );
            tasks.abort_all();
        }
    }
}

fn record(
    joined: Result<SegmentOutcome, tokio::task::JoinError>,
    results: &mut HashMap<usize, Value>,
    category: ExtractionCategory,
) {
    match joined {
        Ok(Some((order, value))) => {
            results.insert(order, value);
        }
        Ok(None) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!(category = %category, error = %e, "Segment task failed"),
    }
}
