//! Test support: a scripted classifier and planner, and a harness wiring
//! them to a session over the sample adventure.
//!
//! Tests teach the classifier the utterances they are about to say instead
//! of talking to a live parse endpoint, so every integration test runs
//! hermetically and deterministically under a fixed seed.

use crate::adventure::AdventureDef;
use crate::nlu::classifier::{ClassifiedUtterance, Classifier};
use crate::nlu::NluEntity;
use crate::planning::{InstinctPlanner, PlannedAction, Planner, PlanningProblem};
use crate::session::{Reply, Session, SessionConfig, SessionError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A classifier that answers from a table of taught utterances. Unknown
/// utterances degrade to `no_intent`, as the real classifier would on a
/// failed parse.
#[derive(Clone, Default)]
pub struct MockClassifier {
    responses: Arc<Mutex<HashMap<String, ClassifiedUtterance>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Teach one utterance. Entities are taught at full confidence.
    pub fn teach(&self, utterance: &str, intent: &str, confidence: f64, entities: &[(&str, &str)]) {
        let entities = entities
            .iter()
            .map(|(entity, value)| NluEntity::new(*entity, *value, 1.0))
            .collect();
        self.responses.lock().unwrap().insert(
            utterance.to_lowercase(),
            ClassifiedUtterance::new(intent, confidence, entities),
        );
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&mut self, utterance: &str) -> ClassifiedUtterance {
        self.responses
            .lock()
            .unwrap()
            .get(utterance)
            .cloned()
            .unwrap_or_else(ClassifiedUtterance::no_intent)
    }
}

/// A planner that plays back queued actions, falling back to
/// [`InstinctPlanner`] when the queue is empty.
#[derive(Clone, Default)]
pub struct ScriptedPlanner {
    script: Arc<Mutex<VecDeque<PlannedAction>>>,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, action: PlannedAction) {
        self.script.lock().unwrap().push_back(action);
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&mut self, problem: &PlanningProblem) -> PlannedAction {
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(action) => action,
            None => InstinctPlanner.plan(problem).await,
        }
    }
}

/// A full session over the sample adventure with scripted NLU and planning.
pub struct TestHarness {
    pub session: Session<MockClassifier, ScriptedPlanner>,
    pub classifier: MockClassifier,
    pub planner: ScriptedPlanner,
}

impl TestHarness {
    pub fn new(seed: u64) -> Self {
        Self::with_adventure(seed, &AdventureDef::sample()).unwrap()
    }

    pub fn with_adventure(seed: u64, adventure: &AdventureDef) -> Result<Self, SessionError> {
        let classifier = MockClassifier::new();
        let planner = ScriptedPlanner::new();
        let session = Session::new(
            SessionConfig::new().with_seed(seed),
            adventure,
            classifier.clone(),
            planner.clone(),
        )?;
        Ok(Self {
            session,
            classifier,
            planner,
        })
    }

    /// Teach an utterance, then say it, returning the narration.
    pub async fn say_as(
        &mut self,
        utterance: &str,
        intent: &str,
        entities: &[(&str, &str)],
    ) -> String {
        self.classifier.teach(utterance, intent, 0.95, entities);
        self.say(utterance).await.text
    }

    pub async fn say(&mut self, utterance: &str) -> Reply {
        self.session.input(utterance).await
    }
}

/// Assert that narration contains a fragment, with a readable failure.
#[track_caller]
pub fn assert_narrates(narration: &str, fragment: &str) {
    assert!(
        narration.contains(fragment),
        "expected narration to contain {fragment:?}, got:\n{narration}"
    );
}

/// Assert that narration does not contain a fragment.
#[track_caller]
pub fn assert_silent_on(narration: &str, fragment: &str) {
    assert!(
        !narration.contains(fragment),
        "expected narration not to contain {fragment:?}, got:\n{narration}"
    );
}
