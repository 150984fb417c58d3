//! Classifier interface.
//!
//! The external service receives a lower-cased utterance and returns an
//! intent label, a confidence, and a list of typed entities. A timeout or
//! malformed response degrades to `no_intent` for that turn; it is never
//! fatal to the session.

use async_trait::async_trait;
use rasa::{ParseRequest, Rasa};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Below this intent confidence the classified intent is discarded.
pub const INTENT_CONFIDENCE: f64 = 0.5;

/// Below this entity confidence an entity must be ignored by callers
/// extracting a specific slot.
pub const ENTITY_CONFIDENCE: f64 = 0.75;

/// A typed value extracted from an utterance, distinct from a game entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluEntity {
    /// Entity type name (`location`, `monster`, `equipment`, ...).
    pub entity: String,
    pub value: String,
    pub confidence: f64,
}

impl NluEntity {
    pub fn new(entity: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            entity: entity.into(),
            value: value.into(),
            confidence,
        }
    }
}

/// Extract the first confident entity of a given type from a list.
pub fn extract_entity<'a>(entities: &'a [NluEntity], entity_type: &str) -> Option<&'a str> {
    entities
        .iter()
        .find(|e| e.entity == entity_type && e.confidence >= ENTITY_CONFIDENCE)
        .map(|e| e.value.as_str())
}

/// Raw classifier output for one utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedUtterance {
    pub intent: String,
    pub confidence: f64,
    pub entities: Vec<NluEntity>,
}

impl ClassifiedUtterance {
    pub fn new(intent: impl Into<String>, confidence: f64, entities: Vec<NluEntity>) -> Self {
        Self {
            intent: intent.into(),
            confidence,
            entities,
        }
    }

    /// The degraded output used when classification fails outright.
    pub fn no_intent() -> Self {
        Self::new("no_intent", 0.0, Vec::new())
    }
}

/// The external intent classifier.
#[async_trait]
pub trait Classifier: Send {
    /// Classify a lower-cased utterance. Implementations must degrade to
    /// [`ClassifiedUtterance::no_intent`] rather than fail the turn.
    async fn classify(&mut self, utterance: &str) -> ClassifiedUtterance;
}

/// Classifier backed by a Rasa-style parse endpoint.
pub struct RasaClassifier {
    client: Rasa,
}

impl RasaClassifier {
    pub fn new(client: Rasa) -> Self {
        Self { client }
    }

    /// Build from the `RASA_URL` environment variable.
    pub fn from_env() -> Result<Self, rasa::Error> {
        Ok(Self::new(Rasa::from_env()?))
    }
}

#[async_trait]
impl Classifier for RasaClassifier {
    async fn classify(&mut self, utterance: &str) -> ClassifiedUtterance {
        match self.client.parse(ParseRequest::new(utterance)).await {
            Ok(parsed) => {
                debug!(
                    intent = %parsed.intent.name,
                    confidence = parsed.intent.confidence,
                    "classified utterance"
                );
                ClassifiedUtterance::new(
                    parsed.intent.name,
                    parsed.intent.confidence,
                    parsed
                        .entities
                        .into_iter()
                        .map(|e| NluEntity::new(e.entity, e.value, e.confidence))
                        .collect(),
                )
            }
            Err(e) => {
                warn!(error = %e, "classifier round-trip failed, degrading to no_intent");
                ClassifiedUtterance::no_intent()
            }
        }
    }
}
