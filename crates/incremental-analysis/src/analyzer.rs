//! The incremental analysis pass.
//!
//! A pass detects the scopes of the new content, decides which of them have to be sent to
//! the external analyzer and which can keep the issues computed for them last time, runs
//! the analyzer over the affected ones in order and replaces the cached document state.
//!
//! A scope is affected when
//! 1. the document was not cached (or was dropped with [`IncrementalAnalyzer::analyze_full_document`]),
//! 2. a change region, grown by `scopeExpansionLines` on each side, touches its lines,
//! 3. no previous scope with the same name starts within `scopeMatchTolerance` lines of it,
//!    or the matched one hashed differently,
//! 4. dependency tracking is on and one of its dependencies names an affected scope.
//!
//! Step 4 is a single hop unless `transitiveDependencyTracking` is set.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use document_model::{
    AnalysisScope, Coverage, DocumentState, IncrementalAnalysisResult, Issue, content_hash,
};
use event_bus::{
    AllCachesCleared, AnalysisCompleted, AnalysisEvent, AnalysisFailed, CacheInvalidated,
    EventBus,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::DocumentStateCache;
use crate::config::EngineConfig;
use crate::diff::diff;
use crate::errors::{EngineError, Result};
use crate::scope::ScopeDetector;

/// The capability the engine consumes: turn the text of one scope into issues.
#[async_trait]
pub trait ScopeAnalyzer: Send + Sync {
    /// `scopes` holds the scope `scope_text` was extracted from.
    async fn analyze(&self, scope_text: &str, scopes: &[AnalysisScope])
    -> anyhow::Result<Vec<Issue>>;

    /// Identity used to decide whether an issue from the previous pass is still reported.
    fn fingerprint(&self, issue: &Issue) -> String {
        canonical_fingerprint(issue)
    }
}

/// Serialises `issue` with object keys sorted. Array order is kept.
pub fn canonical_fingerprint(issue: &Issue) -> String {
    fn canonical(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                Value::Object(
                    entries
                        .into_iter()
                        .map(|(key, value)| (key.clone(), canonical(value)))
                        .collect(),
                )
            }
            Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
            other => other.clone(),
        }
    }

    canonical(issue).to_string()
}

#[derive(Debug, Clone, Copy)]
struct ScopePlan {
    affected: bool,
    previous: Option<usize>,
}

pub struct IncrementalAnalyzer {
    config: EngineConfig,
    detector: ScopeDetector,
    cache: Mutex<DocumentStateCache>,
    analyzers: DashMap<String, Arc<dyn ScopeAnalyzer>>,
    document_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    event_bus: Arc<EventBus>,
}

impl IncrementalAnalyzer {
    pub fn new(config: EngineConfig, event_bus: Arc<EventBus>) -> Result<Self> {
        Ok(Self::with_detector(config, ScopeDetector::new()?, event_bus))
    }

    pub fn with_detector(
        config: EngineConfig,
        detector: ScopeDetector,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let cache = DocumentStateCache::new(config.max_cached_documents);
        Self {
            config,
            detector,
            cache: Mutex::new(cache),
            analyzers: DashMap::new(),
            document_locks: DashMap::new(),
            event_bus,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers the analyzer for a language tag, replacing any previous one.
    pub fn register_analyzer(&self, language: &str, analyzer: Arc<dyn ScopeAnalyzer>) {
        let language = language.to_lowercase();
        if self.analyzers.insert(language.clone(), analyzer).is_some() {
            info!("Replaced analyzer for language {}", language);
        } else {
            info!("Registered analyzer for language {}", language);
        }
    }

    fn cache(&self) -> MutexGuard<'_, DocumentStateCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn document_lock(&self, uri: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.document_locks
            .entry(uri.to_string())
            .or_default()
            .value()
            .clone()
    }

    pub async fn analyze(
        &self,
        uri: &str,
        content: &str,
        language: &str,
        version: i64,
    ) -> IncrementalAnalysisResult {
        self.run_pass(uri, content, language, version, false).await
    }

    /// Drops whatever is cached for `uri` and analyses every scope.
    pub async fn analyze_full_document(
        &self,
        uri: &str,
        content: &str,
        language: &str,
        version: i64,
    ) -> IncrementalAnalysisResult {
        self.run_pass(uri, content, language, version, true).await
    }

    async fn run_pass(
        &self,
        uri: &str,
        content: &str,
        language: &str,
        version: i64,
        drop_cached: bool,
    ) -> IncrementalAnalysisResult {
        let lock = self.document_lock(uri);
        let _guard = lock.lock().await;
        let started = Instant::now();

        let previous = {
            let mut cache = self.cache();
            if drop_cached {
                cache.delete(uri);
            }
            cache.get(uri).cloned()
        };

        let hash = content_hash(content);
        let lines: Vec<&str> = content.split('\n').collect();
        let mut scopes = self.detector.detect(content, language);
        let plans = self.plan(previous.as_ref(), &hash, content, &scopes);

        let analyzer = self
            .analyzers
            .get(&language.to_lowercase())
            .map(|entry| Arc::clone(entry.value()));
        if analyzer.is_none() && plans.iter().any(|plan| plan.affected) {
            warn!(
                "No analyzer registered for language {}, affected scopes of {} get no issues",
                language, uri
            );
        }

        let mut analyzed_indices = Vec::new();
        let mut skipped_indices = Vec::new();

        for (index, plan) in plans.iter().enumerate() {
            if !plan.affected {
                if let Some(previous_scope) = plan
                    .previous
                    .and_then(|i| previous.as_ref().and_then(|p| p.scopes.get(i)))
                {
                    scopes[index].issues = previous_scope.issues.clone();
                    scopes[index].last_analyzed_at = previous_scope.last_analyzed_at;
                }
                skipped_indices.push(index);
                continue;
            }

            let issues = match &analyzer {
                Some(analyzer) => {
                    let text = scopes[index].extract_text(&lines);
                    match self
                        .dispatch(analyzer.as_ref(), &text, &scopes[index])
                        .await
                    {
                        Ok(issues) => Some(issues),
                        Err(e) => {
                            error!("Analysis of scope {} in {} failed: {}", scopes[index].name, uri, e);
                            self.event_bus
                                .send(&AnalysisEvent::AnalysisError(AnalysisFailed {
                                    uri: uri.to_string(),
                                    scope: scopes[index].name.clone(),
                                    error: e.to_string(),
                                    failed_at: Utc::now(),
                                }));
                            None
                        }
                    }
                }
                None => Some(Vec::new()),
            };

            match issues {
                Some(issues) => {
                    scopes[index].issues = Some(issues);
                    scopes[index].last_analyzed_at = Some(Utc::now());
                }
                None => scopes[index].issues = Some(Vec::new()),
            }
            analyzed_indices.push(index);
        }

        let analyzed_scopes: Vec<AnalysisScope> =
            analyzed_indices.iter().map(|&i| scopes[i].clone()).collect();
        let skipped_scopes: Vec<AnalysisScope> =
            skipped_indices.iter().map(|&i| scopes[i].clone()).collect();

        let new_issues: Vec<Issue> = analyzed_scopes
            .iter()
            .flat_map(|scope| scope.issues().iter().cloned())
            .collect();
        let unchanged_issues: Vec<Issue> = skipped_scopes
            .iter()
            .flat_map(|scope| scope.issues().iter().cloned())
            .collect();
        let resolved_issues = match &previous {
            Some(previous) => {
                let fingerprint = |issue: &Issue| match &analyzer {
                    Some(analyzer) => analyzer.fingerprint(issue),
                    None => canonical_fingerprint(issue),
                };
                resolved(&previous.all_issues(), &new_issues, &unchanged_issues, fingerprint)
            }
            None => Vec::new(),
        };

        let coverage = Coverage::compute(&analyzed_scopes, &skipped_scopes, lines.len());
        let now = Utc::now();
        let state = DocumentState {
            uri: uri.to_string(),
            version,
            content_hash: hash,
            language: language.to_string(),
            line_count: lines.len(),
            last_modified_at: now,
            last_analyzed_at: Some(now),
            scopes,
            content: content.to_string(),
        };

        let evicted = self.cache().set(uri, state);
        if let Some(evicted) = evicted {
            self.document_locks
                .remove_if(&evicted, |_, lock| Arc::strong_count(lock) == 1);
        }

        let result = IncrementalAnalysisResult {
            uri: uri.to_string(),
            version,
            analyzed_scopes,
            skipped_scopes,
            new_issues,
            resolved_issues,
            unchanged_issues,
            analysis_time_ms: started.elapsed().as_millis() as u64,
            coverage,
        };

        debug!(
            "Analysed {} v{}: {} scopes analysed, {} skipped, {} new, {} resolved, {} unchanged issues in {}ms",
            uri,
            version,
            result.analyzed_scopes.len(),
            result.skipped_scopes.len(),
            result.new_issues.len(),
            result.resolved_issues.len(),
            result.unchanged_issues.len(),
            result.analysis_time_ms
        );

        self.event_bus
            .send(&AnalysisEvent::AnalysisComplete(AnalysisCompleted {
                result: result.clone(),
                completed_at: Utc::now(),
            }));

        result
    }

    fn plan(
        &self,
        previous: Option<&DocumentState>,
        hash: &str,
        content: &str,
        scopes: &[AnalysisScope],
    ) -> Vec<ScopePlan> {
        let Some(previous) = previous else {
            return scopes
                .iter()
                .map(|_| ScopePlan {
                    affected: true,
                    previous: None,
                })
                .collect();
        };

        let tolerance = self.config.scope_match_tolerance;
        let matches = scopes
            .iter()
            .map(|scope| match_previous(&previous.scopes, scope, tolerance));

        if previous.content_hash == hash {
            return matches
                .map(|previous| ScopePlan {
                    affected: previous.is_none(),
                    previous,
                })
                .collect();
        }

        let changes = diff(&previous.content, content);
        let margin = self.config.scope_expansion_lines;
        let windows: Vec<(usize, usize)> = changes.iter().map(|c| c.expanded(margin)).collect();

        let mut plans: Vec<ScopePlan> = matches
            .zip(scopes)
            .map(|(matched, scope)| {
                let touched = windows
                    .iter()
                    .any(|&(start, end)| scope.intersects(start, end));
                let rehashed = matched
                    .is_none_or(|i| previous.scopes[i].content_hash != scope.content_hash);
                ScopePlan {
                    affected: touched || rehashed,
                    previous: matched,
                }
            })
            .collect();

        if self.config.enable_dependency_tracking {
            propagate_dependencies(
                scopes,
                &mut plans,
                self.config.transitive_dependency_tracking,
            );
        }

        debug!(
            "{} change regions against v{}, {} of {} scopes affected",
            changes.len(),
            previous.version,
            plans.iter().filter(|plan| plan.affected).count(),
            scopes.len()
        );

        plans
    }

    async fn dispatch(
        &self,
        analyzer: &dyn ScopeAnalyzer,
        text: &str,
        scope: &AnalysisScope,
    ) -> Result<Vec<Issue>> {
        let call = analyzer.analyze(text, std::slice::from_ref(scope));
        let outcome = match self.config.analysis_timeout() {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                EngineError::Timeout {
                    scope: scope.name.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }
            })?,
            None => call.await,
        };

        outcome.map_err(|e| EngineError::Analyzer {
            scope: scope.name.clone(),
            message: format!("{e:#}"),
        })
    }

    /// Returns a copy of the cached state, marking it as recently used.
    pub fn get_cached_analysis(&self, uri: &str) -> Option<DocumentState> {
        self.cache().get(uri).cloned()
    }

    pub fn invalidate_cache(&self, uri: &str) -> bool {
        let removed = self.cache().delete(uri);
        self.document_locks
            .remove_if(uri, |_, lock| Arc::strong_count(lock) == 1);
        info!("Invalidated cached analysis for {}", uri);
        self.event_bus
            .send(&AnalysisEvent::CacheInvalidated(CacheInvalidated {
                uri: uri.to_string(),
                invalidated_at: Utc::now(),
            }));
        removed
    }

    pub fn clear_all_caches(&self) {
        self.cache().clear();
        // Locks still held by a running pass stay until that pass is evicted or invalidated.
        self.document_locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        info!("Cleared all cached analyses");
        self.event_bus
            .send(&AnalysisEvent::AllCachesCleared(AllCachesCleared {
                cleared_at: Utc::now(),
            }));
    }

    pub fn cached_documents(&self) -> usize {
        self.cache().len()
    }
}

/// Index of the previous scope with the same name whose start is closest to `scope`'s,
/// if it is within `tolerance` lines.
fn match_previous(
    previous: &[AnalysisScope],
    scope: &AnalysisScope,
    tolerance: usize,
) -> Option<usize> {
    previous
        .iter()
        .enumerate()
        .filter(|(_, candidate)| candidate.name == scope.name)
        .map(|(i, candidate)| (i, candidate.start_line.abs_diff(scope.start_line)))
        .filter(|&(_, distance)| distance <= tolerance)
        .min_by_key(|&(_, distance)| distance)
        .map(|(i, _)| i)
}

fn propagate_dependencies(scopes: &[AnalysisScope], plans: &mut [ScopePlan], transitive: bool) {
    loop {
        let affected_names: HashSet<&str> = scopes
            .iter()
            .zip(plans.iter())
            .filter(|(_, plan)| plan.affected)
            .map(|(scope, _)| scope.name.as_str())
            .collect();

        let promoted: Vec<usize> = scopes
            .iter()
            .enumerate()
            .filter(|&(i, _)| !plans[i].affected)
            .filter(|(_, scope)| {
                scope.dependencies.iter().any(|dependency| {
                    affected_names
                        .iter()
                        .any(|name| dependency_names(dependency, name))
                })
            })
            .map(|(i, _)| i)
            .collect();

        for &i in &promoted {
            plans[i].affected = true;
        }

        if !transitive || promoted.is_empty() {
            break;
        }
    }
}

/// Whether an import path such as `./util`, `util.js` or `crate::util` refers to `name`.
fn dependency_names(dependency: &str, name: &str) -> bool {
    if dependency == name {
        return true;
    }
    let tail = dependency
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(dependency);
    let stem = tail.split('.').next().unwrap_or(tail);
    let last = tail.rsplit(|c: char| c == '.' || c == ':').next().unwrap_or(tail);
    tail == name || stem == name || last == name
}

fn resolved<F>(
    previous: &[Issue],
    new_issues: &[Issue],
    unchanged_issues: &[Issue],
    fingerprint: F,
) -> Vec<Issue>
where
    F: Fn(&Issue) -> String,
{
    let current: HashSet<String> = new_issues
        .iter()
        .chain(unchanged_issues)
        .map(&fingerprint)
        .collect();
    let mut reported = HashSet::new();

    previous
        .iter()
        .filter(|issue| {
            let key = fingerprint(*issue);
            !current.contains(&key) && reported.insert(key)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing_test::traced_test;

    const URI: &str = "file:///src/app.js";

    /// Reports one issue per line containing `BAD` and fails on `explode`.
    #[derive(Default)]
    struct MarkerAnalyzer {
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MarkerAnalyzer {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScopeAnalyzer for MarkerAnalyzer {
        async fn analyze(
            &self,
            scope_text: &str,
            scopes: &[AnalysisScope],
        ) -> anyhow::Result<Vec<Issue>> {
            let name = scopes[0].name.clone();
            self.calls.lock().unwrap().push(name.clone());

            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if scope_text.contains("explode") {
                anyhow::bail!("analyzer crashed");
            }
            Ok(scope_text
                .lines()
                .filter(|line| line.contains("BAD"))
                .map(|line| json!({ "scope": name, "text": line.trim() }))
                .collect())
        }
    }

    fn engine_with(config: EngineConfig) -> (IncrementalAnalyzer, Arc<MarkerAnalyzer>) {
        let engine = IncrementalAnalyzer::new(config, Arc::new(EventBus::new())).unwrap();
        let analyzer = Arc::new(MarkerAnalyzer::default());
        engine.register_analyzer("javascript", analyzer.clone());
        (engine, analyzer)
    }

    fn engine() -> (IncrementalAnalyzer, Arc<MarkerAnalyzer>) {
        engine_with(EngineConfig::default())
    }

    fn function(name: &str, body: &str) -> Vec<String> {
        vec![
            format!("function {name}() {{"),
            format!("  {body}"),
            "}".to_string(),
        ]
    }

    fn filler(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("// note {i}")).collect()
    }

    fn document(parts: Vec<Vec<String>>) -> String {
        parts.concat().join("\n")
    }

    #[tokio::test]
    async fn test_new_document_analyses_every_scope() {
        let (engine, analyzer) = engine();
        let content = document(vec![
            function("foo", "return BAD;"),
            function("bar", "return 2;"),
        ]);

        let result = engine.analyze(URI, &content, "javascript", 1).await;

        assert_eq!(result.analyzed_scope_names(), vec!["foo", "bar"]);
        assert!(result.skipped_scopes.is_empty());
        assert_eq!(
            result.new_issues,
            vec![json!({ "scope": "foo", "text": "return BAD;" })]
        );
        assert!(result.resolved_issues.is_empty());
        assert_eq!(analyzer.calls(), vec!["foo", "bar"]);

        let cached = engine.get_cached_analysis(URI).unwrap();
        assert_eq!(cached.version, 1);
        assert_eq!(cached.line_count, 6);
        assert_eq!(cached.scopes[0].issues().len(), 1);
        assert!(cached.scopes[0].last_analyzed_at.is_some());
    }

    #[tokio::test]
    async fn test_identical_content_is_a_no_op() {
        let (engine, analyzer) = engine();
        let content = document(vec![
            function("foo", "return BAD;"),
            function("bar", "BAD = BAD;"),
        ]);

        let first = engine.analyze(URI, &content, "javascript", 1).await;
        let second = engine.analyze(URI, &content, "javascript", 2).await;

        assert!(second.analyzed_scopes.is_empty());
        assert_eq!(second.skipped_scope_names(), vec!["foo", "bar"]);
        let mut expected = first.new_issues.clone();
        expected.extend(first.unchanged_issues.clone());
        assert_eq!(second.unchanged_issues, expected);
        assert!(second.new_issues.is_empty());
        assert!(second.resolved_issues.is_empty());
        assert_eq!(analyzer.calls().len(), 2);
        assert_eq!(engine.get_cached_analysis(URI).unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_coverage_of_top_level_scopes_adds_up() {
        let (engine, _) = engine_with(EngineConfig {
            scope_expansion_lines: 0,
            ..EngineConfig::default()
        });
        let before = document(vec![function("foo", "return 1;"), function("bar", "return 2;")]);
        let after = document(vec![function("foo", "return 1;"), function("bar", "return 3;")]);

        let first = engine.analyze(URI, &before, "javascript", 1).await;
        let second = engine.analyze(URI, &after, "javascript", 2).await;

        assert_eq!(first.coverage.lines_analyzed + first.coverage.lines_skipped, 6);
        assert_eq!(first.coverage.percent_analyzed, 100.0);
        assert_eq!(second.analyzed_scope_names(), vec!["bar"]);
        assert_eq!(second.coverage.lines_analyzed, 3);
        assert_eq!(second.coverage.lines_skipped, 3);
        assert_eq!(second.coverage.percent_analyzed, 50.0);
    }

    #[tokio::test]
    async fn test_nested_scopes_overshoot_coverage() {
        let (engine, _) = engine();
        let content = [
            "class Greeter {",
            "  greet() {",
            "    return 1;",
            "  }",
            "}",
        ]
        .join("\n");

        let result = engine.analyze_full_document(URI, &content, "javascript", 1).await;

        assert_eq!(result.analyzed_scope_names(), vec!["Greeter", "greet"]);
        assert_eq!(result.coverage.lines_analyzed, 8);
        assert!(result.coverage.percent_analyzed > 100.0);
    }

    #[tokio::test]
    async fn test_edits_only_reanalyse_nearby_scopes() {
        let (engine, analyzer) = engine();
        let before = document(vec![
            function("foo", "return 1;"),
            filler(7),
            function("bar", "return 2;"),
        ]);
        let after = document(vec![
            function("foo", "return 1;"),
            filler(7),
            function("bar", "return 20;"),
        ]);

        engine.analyze(URI, &before, "javascript", 1).await;
        let result = engine.analyze(URI, &after, "javascript", 2).await;

        assert_eq!(result.analyzed_scope_names(), vec!["bar"]);
        assert_eq!(result.skipped_scope_names(), vec!["foo"]);
        assert_eq!(result.analyzed_scopes[0].start_line, 10);
        assert_eq!(analyzer.calls(), vec!["foo", "bar", "bar"]);
    }

    #[tokio::test]
    async fn test_shifted_scope_is_carried_over() {
        let (engine, _) = engine_with(EngineConfig {
            scope_expansion_lines: 0,
            ..EngineConfig::default()
        });
        let before = document(vec![
            function("foo", "return 1;"),
            filler(10),
            function("bar", "return BAD;"),
        ]);
        let after = document(vec![
            function("foo", "return 1;"),
            filler(12),
            function("bar", "return BAD;"),
        ]);

        let first = engine.analyze(URI, &before, "javascript", 1).await;
        let second = engine.analyze(URI, &after, "javascript", 2).await;

        assert_eq!(second.skipped_scope_names(), vec!["foo", "bar"]);
        assert_eq!(second.unchanged_issues, first.new_issues);
        assert_eq!(second.skipped_scopes[1].start_line, 15);
    }

    fn dependency_chain() -> (String, String) {
        let before = document(vec![
            function("util", "return 1;"),
            filler(7),
            function("parse", "return require('./util');"),
            filler(7),
            function("main", "return require('./parse');"),
        ]);
        let after = before.replacen("return 1;", "return 2;", 1);
        (before, after)
    }

    #[tokio::test]
    async fn test_dependents_of_changed_scopes_are_reanalysed() {
        let (engine, _) = engine();
        let (before, after) = dependency_chain();

        engine.analyze(URI, &before, "javascript", 1).await;
        let result = engine.analyze(URI, &after, "javascript", 2).await;

        assert_eq!(result.analyzed_scope_names(), vec!["util", "parse"]);
        assert_eq!(result.skipped_scope_names(), vec!["main"]);
    }

    #[tokio::test]
    async fn test_transitive_dependency_tracking() {
        let (engine, _) = engine_with(EngineConfig {
            transitive_dependency_tracking: true,
            ..EngineConfig::default()
        });
        let (before, after) = dependency_chain();

        engine.analyze(URI, &before, "javascript", 1).await;
        let result = engine.analyze(URI, &after, "javascript", 2).await;

        assert_eq!(result.analyzed_scope_names(), vec!["util", "parse", "main"]);
    }

    #[tokio::test]
    async fn test_dependency_tracking_can_be_disabled() {
        let (engine, _) = engine_with(EngineConfig {
            enable_dependency_tracking: false,
            ..EngineConfig::default()
        });
        let (before, after) = dependency_chain();

        engine.analyze(URI, &before, "javascript", 1).await;
        let result = engine.analyze(URI, &after, "javascript", 2).await;

        assert_eq!(result.analyzed_scope_names(), vec!["util"]);
    }

    #[tokio::test]
    async fn test_fixed_issues_are_resolved() {
        let (engine, _) = engine();
        let before = document(vec![function("foo", "return BAD;")]);
        let after = document(vec![function("foo", "return 1;")]);

        let first = engine.analyze(URI, &before, "javascript", 1).await;
        let second = engine.analyze(URI, &after, "javascript", 2).await;

        assert_eq!(second.resolved_issues, first.new_issues);
        assert!(second.new_issues.is_empty());
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let (engine, _) = engine_with(EngineConfig {
            max_cached_documents: 2,
            ..EngineConfig::default()
        });
        let content = document(vec![function("foo", "return 1;")]);

        for uri in ["file:///a.js", "file:///b.js", "file:///c.js"] {
            engine.analyze(uri, &content, "javascript", 1).await;
        }

        assert_eq!(engine.cached_documents(), 2);
        assert!(engine.get_cached_analysis("file:///a.js").is_none());
        assert!(engine.get_cached_analysis("file:///c.js").is_some());
    }

    #[tokio::test]
    async fn test_full_document_ignores_cached_state() {
        let (engine, analyzer) = engine();
        let content = document(vec![function("foo", "return 1;"), function("bar", "return 2;")]);

        engine.analyze(URI, &content, "javascript", 1).await;
        let result = engine
            .analyze_full_document(URI, &content, "javascript", 2)
            .await;

        assert_eq!(result.analyzed_scope_names(), vec!["foo", "bar"]);
        assert!(result.skipped_scopes.is_empty());
        assert_eq!(analyzer.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_analyzer_failure_is_isolated_to_its_scope() {
        let (engine, _) = engine();
        let mut events = engine.event_bus.subscribe();
        let content = document(vec![
            function("foo", "explode();"),
            function("bar", "return BAD;"),
        ]);

        let result = engine.analyze(URI, &content, "javascript", 1).await;

        assert_eq!(result.analyzed_scope_names(), vec!["foo", "bar"]);
        assert!(result.analyzed_scopes[0].issues().is_empty());
        assert!(result.analyzed_scopes[0].last_analyzed_at.is_none());
        assert_eq!(result.new_issues.len(), 1);

        let AnalysisEvent::AnalysisError(failure) = events.try_recv().unwrap() else {
            panic!("expected an analysis-error event first");
        };
        assert_eq!(failure.scope, "foo");
        assert!(failure.error.contains("analyzer crashed"));
        assert_eq!(events.try_recv().unwrap().name(), "analysis-complete");
    }

    #[tokio::test]
    async fn test_slow_analyzer_times_out_when_enforced() {
        let engine = IncrementalAnalyzer::new(
            EngineConfig {
                analysis_timeout_ms: Some(20),
                ..EngineConfig::default()
            },
            Arc::new(EventBus::new()),
        )
        .unwrap();
        engine.register_analyzer(
            "javascript",
            Arc::new(MarkerAnalyzer::slow(Duration::from_millis(500))),
        );
        let mut events = engine.event_bus.subscribe();
        let content = document(vec![function("foo", "return BAD;")]);

        let result = engine.analyze(URI, &content, "javascript", 1).await;

        assert!(result.new_issues.is_empty());
        let AnalysisEvent::AnalysisError(failure) = events.try_recv().unwrap() else {
            panic!("expected an analysis-error event");
        };
        assert!(failure.error.contains("timed out after 20ms"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_missing_analyzer_yields_empty_issues() {
        let (engine, _) = engine();
        let content = "def main():\n    pass";

        let result = engine.analyze("file:///main.py", content, "python", 1).await;

        assert_eq!(result.analyzed_scope_names(), vec!["main"]);
        assert!(result.new_issues.is_empty());
        assert!(logs_contain("No analyzer registered for language python"));
    }

    #[tokio::test]
    async fn test_passes_for_one_document_never_overlap() {
        let engine = IncrementalAnalyzer::new(EngineConfig::default(), Arc::new(EventBus::new()))
            .unwrap();
        let analyzer = Arc::new(MarkerAnalyzer::slow(Duration::from_millis(20)));
        engine.register_analyzer("javascript", analyzer.clone());
        let first = document(vec![function("foo", "return 1;")]);
        let second = document(vec![function("foo", "return 2;")]);

        let (a, b) = tokio::join!(
            engine.analyze(URI, &first, "javascript", 1),
            engine.analyze(URI, &second, "javascript", 2),
        );

        assert_eq!(a.version, 1);
        assert_eq!(b.analyzed_scope_names(), vec!["foo"]);
        assert_eq!(analyzer.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(engine.get_cached_analysis(URI).unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_invalidation_emits_events() {
        let (engine, _) = engine();
        let mut events = engine.event_bus.subscribe();
        let content = document(vec![function("foo", "return 1;")]);
        engine.analyze(URI, &content, "javascript", 1).await;

        assert!(engine.invalidate_cache(URI));
        assert!(!engine.invalidate_cache(URI));
        engine.clear_all_caches();

        let names: Vec<&str> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|event| event.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "analysis-complete",
                "cache-invalidated",
                "cache-invalidated",
                "all-caches-cleared"
            ]
        );
        assert_eq!(engine.cached_documents(), 0);
    }

    #[tokio::test]
    async fn test_dropping_cached_documents_releases_their_locks() {
        let (engine, _) = engine();
        let content = document(vec![function("foo", "return 1;")]);
        for index in 0..10 {
            engine
                .analyze(&format!("file:///{index}.js"), &content, "javascript", 1)
                .await;
        }
        assert_eq!(engine.document_locks.len(), 10);

        for index in 0..5 {
            engine.invalidate_cache(&format!("file:///{index}.js"));
        }
        assert_eq!(engine.document_locks.len(), 5);

        engine.clear_all_caches();
        assert_eq!(engine.cached_documents(), 0);
        assert_eq!(engine.document_locks.len(), 0);
    }

    #[test]
    fn test_canonical_fingerprint_ignores_key_order() {
        let a = json!({ "rule": "x", "line": 3, "tags": ["a", "b"] });
        let b = json!({ "tags": ["a", "b"], "line": 3, "rule": "x" });
        let c = json!({ "tags": ["b", "a"], "line": 3, "rule": "x" });

        assert_eq!(canonical_fingerprint(&a), canonical_fingerprint(&b));
        assert_ne!(canonical_fingerprint(&a), canonical_fingerprint(&c));
    }

    #[test]
    fn test_dependency_names() {
        assert!(dependency_names("./util", "util"));
        assert!(dependency_names("../lib/util.js", "util"));
        assert!(dependency_names("crate::util", "util"));
        assert!(dependency_names("util", "util"));
        assert!(!dependency_names("./utils", "util"));
    }

    #[test]
    fn test_match_previous_prefers_closest_start() {
        let scope = |name: &str, start_line: usize| AnalysisScope {
            kind: document_model::ScopeKind::Function,
            name: name.to_string(),
            start_line,
            end_line: start_line + 2,
            language: "javascript".to_string(),
            content_hash: String::new(),
            dependencies: Vec::new(),
            exports: Vec::new(),
            last_analyzed_at: None,
            issues: None,
        };
        let previous = vec![scope("run", 0), scope("run", 8), scope("stop", 12)];

        assert_eq!(match_previous(&previous, &scope("run", 7), 5), Some(1));
        assert_eq!(match_previous(&previous, &scope("run", 20), 5), None);
        assert_eq!(match_previous(&previous, &scope("halt", 12), 5), None);
    }
}
