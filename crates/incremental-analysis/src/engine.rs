use document_model::{DocumentState, IncrementalAnalysisResult};
use event_bus::{AnalysisEvent, EventBus};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::analyzer::{IncrementalAnalyzer, ScopeAnalyzer};
use crate::config::EngineConfig;
use crate::debounce::{DebounceScheduler, DebouncedAnalysis};
use crate::errors::Result;
use crate::scope::ScopeDetector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatistics {
    pub cached_documents: usize,
    pub pending_analyses: usize,
}

/// Owns one incremental analyzer and its debounce scheduler.
///
/// Nothing is global: every engine has its own cache, analyzers and event bus.
pub struct AnalysisEngine {
    analyzer: Arc<IncrementalAnalyzer>,
    scheduler: DebounceScheduler,
    event_bus: Arc<EventBus>,
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self::with_detector(
            config,
            ScopeDetector::new()?,
            Arc::new(EventBus::new()),
        ))
    }

    /// Builds an engine around a detector that may carry extra registered languages.
    pub fn with_detector(
        config: EngineConfig,
        detector: ScopeDetector,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let delay = config.debounce_delay();
        let analyzer = Arc::new(IncrementalAnalyzer::with_detector(
            config,
            detector,
            Arc::clone(&event_bus),
        ));
        let scheduler = DebounceScheduler::new(Arc::clone(&analyzer), delay);

        Self {
            analyzer,
            scheduler,
            event_bus,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.analyzer.config()
    }

    pub fn register_analyzer(&self, language: &str, analyzer: Arc<dyn ScopeAnalyzer>) {
        self.analyzer.register_analyzer(language, analyzer);
    }

    pub async fn analyze(
        &self,
        uri: &str,
        content: &str,
        language: &str,
        version: i64,
    ) -> IncrementalAnalysisResult {
        self.analyzer.analyze(uri, content, language, version).await
    }

    pub async fn analyze_full_document(
        &self,
        uri: &str,
        content: &str,
        language: &str,
        version: i64,
    ) -> IncrementalAnalysisResult {
        self.analyzer
            .analyze_full_document(uri, content, language, version)
            .await
    }

    pub async fn analyze_debounced(
        &self,
        uri: &str,
        content: String,
        language: String,
        version: i64,
    ) -> Result<IncrementalAnalysisResult> {
        self.scheduler
            .analyze_debounced(uri, content, language, version)
            .await
    }

    pub fn schedule_analysis(
        &self,
        uri: &str,
        content: String,
        language: String,
        version: i64,
    ) -> DebouncedAnalysis {
        self.scheduler.schedule(uri, content, language, version)
    }

    pub fn cancel_pending(&self, uri: &str) -> bool {
        self.scheduler.cancel_pending(uri)
    }

    pub fn get_cached_analysis(&self, uri: &str) -> Option<DocumentState> {
        self.analyzer.get_cached_analysis(uri)
    }

    pub fn invalidate_cache(&self, uri: &str) -> bool {
        self.analyzer.invalidate_cache(uri)
    }

    pub fn clear_all_caches(&self) {
        self.analyzer.clear_all_caches();
    }

    pub fn get_statistics(&self) -> EngineStatistics {
        EngineStatistics {
            cached_documents: self.analyzer.cached_documents(),
            pending_analyses: self.scheduler.pending_count(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}
