//! The intent resolution pipeline.
//!
//! Reconciles a freshly classified utterance against the session's
//! expectation fields in strict priority order:
//!
//! 1. expected entities fast-track (cleared whether or not they match);
//! 2. expected intent gate, which consumes the turn with a clarifying
//!    prompt on mismatch;
//! 3. pending suggestion decline;
//! 4. combat override, which ignores the classifier outright;
//! 5. the static dispatch map, with a one-turn stored-intent carry-over
//!    for split utterances.

use crate::nlg::{self, OutputBuilder};
use crate::nlu::classifier::{ClassifiedUtterance, NluEntity, INTENT_CONFIDENCE};
use crate::nlu::Intent;
use crate::state::{CombatStatus, SessionState};
use tracing::debug;

/// A resolved `(intent, parameters)` pair ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub intent: Intent,
    pub entities: Vec<NluEntity>,
}

impl Resolved {
    fn new(intent: Intent, entities: Vec<NluEntity>) -> Self {
        Self { intent, entities }
    }
}

/// Resolve a classified utterance into an executable intent.
///
/// Returns `None` when the turn is consumed without an intent (expectation
/// mismatch, or nothing recognisable and nothing stored). Expectation
/// fields are mutated as the pipeline consumes them.
pub fn resolve(
    state: &mut SessionState,
    classified: ClassifiedUtterance,
    out: &mut OutputBuilder,
) -> Option<Resolved> {
    let ClassifiedUtterance {
        intent: label,
        confidence,
        entities,
    } = classified;

    let mut intent = if confidence < INTENT_CONFIDENCE {
        Some(Intent::NoIntent)
    } else {
        Intent::from_label(&label)
    };

    debug!(
        label,
        confidence,
        ?intent,
        expected_intents = ?state.expected_intents(),
        expected_entities = ?state.expected_entities(),
        stored = ?state.stored_intent().map(|s| s.intent),
        suggested = state.suggested_next_move().is_some(),
        "resolving utterance"
    );

    if !state.expected_entities().is_empty() {
        // Entity expectation takes priority over everything below and is
        // cleared whether or not it matched.
        let hit = entities
            .iter()
            .any(|e| state.expected_entities().contains(&e.entity));
        if hit {
            if let Some(primary) = state.expected_intent() {
                intent = Some(primary);
            } else if let Some(stored) = state.stored_intent() {
                intent = Some(stored.intent);
            }
        }
        state.clear_expected_entities();
        state.clear_expected_intents();
    } else if !state.expected_intents().is_empty() {
        let is_roll_continuation = intent == Some(Intent::Roll);
        let satisfies = intent == Some(Intent::Affirm)
            || is_roll_continuation
            || intent.is_some_and(|i| state.expected_intents().contains(&i));
        if !satisfies {
            out.append(nlg::clarify_expected(state.expected_intents()));
            return None;
        }
        state.clear_expected_intents();
    } else if state.suggested_next_move().is_some() && intent != Some(Intent::Affirm) {
        // Anything but an affirmation declines the nudge.
        state.clear_suggested_next_move();
    }

    // Combat owns the turn: the classifier's output is ignored entirely.
    if state.in_combat() {
        let forced = if state.combat_status() == CombatStatus::Declare {
            Intent::Attack
        } else {
            Intent::Roll
        };
        return Some(Resolved::new(forced, entities));
    }

    match intent {
        Some(Intent::NoIntent) => Some(Resolved::new(Intent::NoIntent, Vec::new())),
        Some(intent) => Some(Resolved::new(intent, entities)),
        None => {
            // Unrecognised label: reuse the stored intent, merging its
            // entities with the fresh ones (split multi-turn utterances).
            let stored = state.stored_intent()?;
            let mut merged = entities;
            merged.extend(stored.entities.iter().cloned());
            Some(Resolved::new(stored.intent, merged))
        }
    }
}
