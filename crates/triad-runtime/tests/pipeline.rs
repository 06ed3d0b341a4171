//! End-to-end pipeline behaviour with scripted analyzers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use triad_alignment::{AlignmentStore, InMemoryProfileStore};
use triad_compliance::ComplianceEngine;
use triad_consolidation::FixedCounter;
use triad_fusion::{FusionWeights, WeightFeedback};
use triad_policy::PolicyRuleSet;
use triad_runtime::{
    AnalyzerError, AnalyzerFailure, AnalyzerKind, Analyzers, EmotionAnalyzer, InputUnit,
    InteractionRecorder, LinguisticAnalyzer, Pipeline, RuntimeError,
};
use triad_types::{
    Concept, EmotionalRecord, InteractionRecord, LinguisticRecord, LinguisticStats,
    Relationship, ViolationKind, NEUTRAL_ALIGNMENT,
};

/// Returns the same records for every input.
struct Scripted {
    emotional: EmotionalRecord,
    linguistic: LinguisticRecord,
    logged: bool,
    emotion_delay: Duration,
    fail_linguistic: bool,
    /// Files every interaction under this user instead of the caller's.
    recorded_user: Option<String>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(emotional: EmotionalRecord, linguistic: LinguisticRecord) -> Self {
        Self {
            emotional,
            linguistic,
            logged: true,
            emotion_delay: Duration::ZERO,
            fail_linguistic: false,
            recorded_user: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmotionAnalyzer for Scripted {
    async fn analyze(&self, _text: &str) -> Result<EmotionalRecord, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.emotion_delay.is_zero() {
            tokio::time::sleep(self.emotion_delay).await;
        }
        Ok(self.emotional.clone())
    }
}

#[async_trait]
impl LinguisticAnalyzer for Scripted {
    async fn analyze(&self, text: &str) -> Result<LinguisticRecord, AnalyzerError> {
        if self.fail_linguistic {
            return Err("parser model not loaded".into());
        }
        let mut record = self.linguistic.clone();
        record.text = text.to_string();
        Ok(record)
    }
}

#[async_trait]
impl InteractionRecorder for Scripted {
    async fn record(
        &self,
        user_id: &str,
        session_id: &str,
        _text: &str,
    ) -> Result<InteractionRecord, AnalyzerError> {
        Ok(InteractionRecord {
            session_id: session_id.to_string(),
            user_id: self
                .recorded_user
                .clone()
                .unwrap_or_else(|| user_id.to_string()),
            timestamp: Utc::now(),
            logged_successfully: self.logged,
        })
    }
}

fn emotions(pairs: &[(&str, f64)]) -> EmotionalRecord {
    let scores: BTreeMap<String, f64> = pairs.iter().map(|(l, s)| (l.to_string(), *s)).collect();
    EmotionalRecord::from_scores(scores).unwrap()
}

/// Richness 0.5 (10 tokens, 5 tags) and extraction 0.4 (4 concepts).
fn benign_linguistic() -> LinguisticRecord {
    let pos_histogram: BTreeMap<String, u32> = ["NOUN", "VERB", "ADJ", "ADV", "DET"]
        .into_iter()
        .map(|t| (t.to_string(), 2))
        .collect();
    LinguisticRecord {
        text: String::new(),
        concepts: ["weather", "walk", "park", "dog"]
            .into_iter()
            .map(|l| Concept::new(l, "NOUN"))
            .collect(),
        relationships: Vec::new(),
        pattern_matches: BTreeMap::new(),
        stats: LinguisticStats {
            token_count: 10,
            sentence_count: 1,
            pos_histogram,
        },
    }
}

fn harmful_linguistic() -> LinguisticRecord {
    LinguisticRecord {
        concepts: vec![Concept::new("harm", "VERB")],
        relationships: vec![Relationship::new("I", "harm", "John")],
        ..Default::default()
    }
}

fn pipeline_with(scripted: Arc<Scripted>) -> (Pipeline, Arc<InMemoryProfileStore>) {
    let store = Arc::new(InMemoryProfileStore::in_memory());
    let analyzers = Analyzers {
        emotion: scripted.clone(),
        linguistic: scripted.clone(),
        interaction: scripted,
    };
    let pipeline = Pipeline::new(
        analyzers,
        ComplianceEngine::from_rule_set(&PolicyRuleSet::default_rules()),
        FusionWeights::default(),
        store.clone(),
    )
    .unwrap();
    (pipeline, store)
}

#[tokio::test]
async fn accepted_input_scores_and_updates_profile() {
    let scripted = Arc::new(Scripted::new(emotions(&[("joy", 0.9)]), benign_linguistic()));
    let (pipeline, store) = pipeline_with(scripted);

    let response = pipeline
        .process(InputUnit::new("alice", "Can you help me plan a walk in the park?"))
        .await
        .unwrap();

    assert!(response.accepted);
    assert!((response.coherence - (0.9 + 0.45 + 1.0) / 3.0).abs() < 1e-9);
    assert!(response.violations.is_empty());
    assert_eq!(response.interaction_count, 1);
    let expected_alignment = 0.9 * NEUTRAL_ALIGNMENT + 0.1 * response.coherence;
    assert!((response.alignment_score - expected_alignment).abs() < 1e-9);
    assert!(response.mood_vector_snapshot.is_unit());
    assert!(response
        .rendered_response
        .starts_with("I'm here to help you. Processing:"));
    assert!(!response.session_id.is_empty());

    let stored = store.peek("alice").await.unwrap().unwrap();
    assert_eq!(stored.interaction_count, 1);
    assert_eq!(stored.mood_vector, response.mood_vector_snapshot);
}

#[tokio::test]
async fn harmful_relationship_is_rejected_without_touching_state() {
    let scripted = Arc::new(Scripted::new(emotions(&[("anger", 0.6)]), harmful_linguistic()));
    let (pipeline, store) = pipeline_with(scripted);

    let response = pipeline
        .process(InputUnit::new("bob", "I harm John"))
        .await
        .unwrap();

    assert!(!response.accepted);
    assert_eq!(response.coherence, 0.0);
    assert!(response.rendered_response.is_empty());
    let relationship: Vec<_> = response
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::ProhibitedRelationship)
        .collect();
    assert_eq!(relationship.len(), 1);
    assert_eq!(relationship[0].evidence, vec!["I", "harm", "John"]);

    // neutral defaults, and no profile was created
    assert_eq!(response.interaction_count, 0);
    assert_eq!(response.alignment_score, NEUTRAL_ALIGNMENT);
    assert!(store.peek("bob").await.unwrap().is_none());
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn rejection_leaves_existing_profile_unchanged() {
    let scripted = Arc::new(Scripted::new(emotions(&[("anger", 0.6)]), harmful_linguistic()));
    let (pipeline, store) = pipeline_with(scripted);
    let before = store
        .apply_accepted("carol", &emotions(&[("joy", 0.5)]).mood, 0.8)
        .await
        .unwrap();

    let response = pipeline
        .process(InputUnit::new("carol", "I harm John"))
        .await
        .unwrap();

    assert!(!response.accepted);
    assert_eq!(response.interaction_count, before.interaction_count);
    assert_eq!(response.alignment_score, before.alignment_score);
    assert_eq!(store.peek("carol").await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn supplied_session_id_is_kept() {
    let scripted = Arc::new(Scripted::new(emotions(&[("joy", 0.4)]), benign_linguistic()));
    let (pipeline, _) = pipeline_with(scripted);

    let response = pipeline
        .process(InputUnit::new("dana", "hello").with_session("session-7"))
        .await
        .unwrap();
    assert_eq!(response.session_id, "session-7");

    let response = pipeline.process(InputUnit::new("dana", "hello")).await.unwrap();
    assert!(uuid::Uuid::parse_str(&response.session_id).is_ok());
}

#[tokio::test]
async fn failing_analyzer_fails_the_unit() {
    let mut scripted = Scripted::new(emotions(&[("joy", 0.4)]), benign_linguistic());
    scripted.fail_linguistic = true;
    let (pipeline, store) = pipeline_with(Arc::new(scripted));

    let err = pipeline
        .process(InputUnit::new("erin", "hello"))
        .await
        .unwrap_err();
    match err {
        RuntimeError::Analyzer(failure) => {
            assert_eq!(failure.analyzer(), AnalyzerKind::Linguistic);
            assert!(failure.to_string().contains("parser model not loaded"));
        }
        other => panic!("expected analyzer failure, got {other:?}"),
    }
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn inconsistent_emotional_record_fails_the_unit() {
    let mut emotional = emotions(&[("joy", 0.4)]);
    emotional.dominant = "anger".into();
    let (pipeline, store) = pipeline_with(Arc::new(Scripted::new(emotional, benign_linguistic())));

    let err = pipeline
        .process(InputUnit::new("erin", "hello"))
        .await
        .unwrap_err();
    match err {
        RuntimeError::Analyzer(failure) => {
            assert_eq!(failure.analyzer(), AnalyzerKind::Emotion);
            assert!(failure.to_string().contains("anger"));
        }
        other => panic!("expected analyzer failure, got {other:?}"),
    }
    assert_eq!(store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn interaction_for_another_user_fails_the_unit() {
    let mut scripted = Scripted::new(emotions(&[("joy", 0.4)]), benign_linguistic());
    scripted.recorded_user = Some("mallory".into());
    let (pipeline, store) = pipeline_with(Arc::new(scripted));

    let err = pipeline
        .process(InputUnit::new("erin", "hello"))
        .await
        .unwrap_err();
    match err {
        RuntimeError::Analyzer(failure) => {
            assert_eq!(failure.analyzer(), AnalyzerKind::Interaction);
            assert!(failure.to_string().contains("mallory"));
        }
        other => panic!("expected analyzer failure, got {other:?}"),
    }
    assert!(store.peek("erin").await.unwrap().is_none());
    assert!(store.peek("mallory").await.unwrap().is_none());
}

#[tokio::test]
async fn unnormalised_weights_are_refused() {
    let scripted = Arc::new(Scripted::new(emotions(&[("joy", 0.4)]), benign_linguistic()));
    let result = Pipeline::new(
        Analyzers {
            emotion: scripted.clone(),
            linguistic: scripted.clone(),
            interaction: scripted,
        },
        ComplianceEngine::from_rule_set(&PolicyRuleSet::default_rules()),
        FusionWeights {
            emotional: 0.5,
            linguistic: 0.5,
            interaction: 0.5,
        },
        Arc::new(InMemoryProfileStore::in_memory()),
    );
    assert!(matches!(result, Err(RuntimeError::Fusion(_))));
}

#[tokio::test]
async fn slow_analyzer_times_out() {
    let mut scripted = Scripted::new(emotions(&[("joy", 0.4)]), benign_linguistic());
    scripted.emotion_delay = Duration::from_millis(500);
    let store = Arc::new(InMemoryProfileStore::in_memory());
    let scripted = Arc::new(scripted);
    let pipeline = Pipeline::new(
        Analyzers {
            emotion: scripted.clone(),
            linguistic: scripted.clone(),
            interaction: scripted,
        },
        ComplianceEngine::from_rule_set(&PolicyRuleSet::default_rules()),
        FusionWeights::default(),
        store.clone(),
    )
    .unwrap()
    .with_analyzer_timeout(Duration::from_millis(20));

    let err = pipeline
        .process(InputUnit::new("finn", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Analyzer(AnalyzerFailure::TimedOut {
            analyzer: AnalyzerKind::Emotion,
            ..
        })
    ));
    assert!(store.peek("finn").await.unwrap().is_none());
}

#[tokio::test]
async fn empty_user_id_is_invalid() {
    let scripted = Arc::new(Scripted::new(emotions(&[("joy", 0.4)]), benign_linguistic()));
    let (pipeline, _) = pipeline_with(scripted.clone());

    let err = pipeline.process(InputUnit::new("  ", "hello")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidInput(_)));
    assert_eq!(scripted.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inputs_for_one_user_all_count() {
    let scripted = Arc::new(Scripted::new(emotions(&[("joy", 0.7)]), benign_linguistic()));
    let (pipeline, store) = pipeline_with(scripted);
    let pipeline = Arc::new(pipeline);

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .process(InputUnit::new("gwen", format!("message {i}")))
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().accepted);
    }

    let profile = store.peek("gwen").await.unwrap().unwrap();
    assert_eq!(profile.interaction_count, 25);
    assert!(profile.mood_vector.is_unit());
    assert!((0.0..=1.0).contains(&profile.alignment_score));
}

#[tokio::test]
async fn weight_feedback_changes_later_scores() {
    let scripted = Arc::new(Scripted::new(emotions(&[("joy", 0.9)]), benign_linguistic()));
    let (pipeline, _) = pipeline_with(scripted);

    let before = pipeline.process(InputUnit::new("hana", "hi")).await.unwrap();
    let weights = pipeline
        .adjust_weights(&WeightFeedback {
            interaction: Some(1.0),
            ..Default::default()
        })
        .await;
    assert!(weights.validate().is_ok());
    assert_eq!(pipeline.weights().await, weights);

    // the interaction component is the strongest, so leaning on it raises coherence
    let after = pipeline.process(InputUnit::new("hana", "hi")).await.unwrap();
    assert!(after.coherence > before.coherence);
}

#[tokio::test]
async fn health_reports_counts_and_tolerates_unavailable_stores() {
    let scripted = Arc::new(Scripted::new(emotions(&[("joy", 0.4)]), benign_linguistic()));
    let (pipeline, _) = pipeline_with(scripted);

    let health = pipeline.health().await;
    assert_eq!(health.embedding_count, None);
    assert_eq!(health.concept_count, None);
    assert_eq!(health.profile_count, Some(0));
    assert_eq!(health.policy_version, "1.0");

    let pipeline = pipeline.with_collaborators(
        Arc::new(FixedCounter::new("embeddings", 12)),
        Arc::new(FixedCounter::new("concepts", 30)),
    );
    pipeline.process(InputUnit::new("ivan", "hi")).await.unwrap();
    let health = pipeline.health().await;
    assert_eq!(health.embedding_count, Some(12));
    assert_eq!(health.concept_count, Some(30));
    assert_eq!(health.profile_count, Some(1));
}
