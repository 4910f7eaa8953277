//! Debounced analysis.
//!
//! Each document has at most one pending request. A new request for the same URI
//! supersedes the pending one, restarts the delay and, once the delay elapses, runs a pass
//! with the newest arguments. Callers of superseded requests receive
//! [`EngineError::Superseded`]; callers of requests dropped by [`DebounceScheduler::cancel_pending`],
//! [`DebounceScheduler::cancel_all`] or by dropping the scheduler receive
//! [`EngineError::Cancelled`].

use dashmap::DashMap;
use document_model::IncrementalAnalysisResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::analyzer::IncrementalAnalyzer;
use crate::errors::{EngineError, Result};

type Reply = oneshot::Sender<Result<IncrementalAnalysisResult>>;

struct PendingAnalysis {
    generation: u64,
    cancellation_token: CancellationToken,
    reply: Reply,
}

/// Outcome of a scheduled request, delivered once the request runs or is dropped.
pub struct DebouncedAnalysis {
    uri: String,
    receiver: oneshot::Receiver<Result<IncrementalAnalysisResult>>,
}

impl DebouncedAnalysis {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub async fn wait(self) -> Result<IncrementalAnalysisResult> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            // The timer task went away without replying, e.g. on runtime shutdown.
            Err(_) => Err(EngineError::Cancelled { uri: self.uri }),
        }
    }
}

pub struct DebounceScheduler {
    analyzer: Arc<IncrementalAnalyzer>,
    delay: Duration,
    pending: Arc<DashMap<String, PendingAnalysis>>,
    generation: AtomicU64,
}

impl DebounceScheduler {
    pub fn new(analyzer: Arc<IncrementalAnalyzer>, delay: Duration) -> Self {
        Self {
            analyzer,
            delay,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules a pass for `uri` after the debounce delay. Must be called from within a
    /// Tokio runtime.
    pub fn schedule(
        &self,
        uri: &str,
        content: String,
        language: String,
        version: i64,
    ) -> DebouncedAnalysis {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let cancellation_token = CancellationToken::new();
        let (reply, receiver) = oneshot::channel();

        let superseded = self.pending.insert(
            uri.to_string(),
            PendingAnalysis {
                generation,
                cancellation_token: cancellation_token.clone(),
                reply,
            },
        );
        if let Some(previous) = superseded {
            debug!("Superseded pending analysis of {} with v{}", uri, version);
            previous.cancellation_token.cancel();
            let _ = previous.reply.send(Err(EngineError::Superseded {
                uri: uri.to_string(),
            }));
        }

        let analyzer = Arc::clone(&self.analyzer);
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        let owned_uri = uri.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                // Whoever cancelled has already replied.
                _ = cancellation_token.cancelled() => return,
            }

            let Some((_, entry)) =
                pending.remove_if(&owned_uri, |_, entry| entry.generation == generation)
            else {
                return;
            };

            let result = analyzer
                .analyze(&owned_uri, &content, &language, version)
                .await;
            // The caller may have stopped waiting.
            let _ = entry.reply.send(Ok(result));
        });

        DebouncedAnalysis {
            uri: uri.to_string(),
            receiver,
        }
    }

    pub async fn analyze_debounced(
        &self,
        uri: &str,
        content: String,
        language: String,
        version: i64,
    ) -> Result<IncrementalAnalysisResult> {
        self.schedule(uri, content, language, version).wait().await
    }

    /// Discards the pending request for `uri`. Returns false when nothing was pending.
    pub fn cancel_pending(&self, uri: &str) -> bool {
        let Some((_, entry)) = self.pending.remove(uri) else {
            return false;
        };
        entry.cancellation_token.cancel();
        let _ = entry.reply.send(Err(EngineError::Cancelled {
            uri: uri.to_string(),
        }));
        info!("Cancelled pending analysis of {}", uri);
        true
    }

    pub fn cancel_all(&self) {
        let uris: Vec<String> = self
            .pending
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for uri in uris {
            self.cancel_pending(&uri);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
