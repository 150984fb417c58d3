//! Natural-language understanding: classifier interface, the intent
//! resolution pipeline, and the slash-command layer.

pub mod classifier;
pub mod commands;
pub mod resolver;

pub use classifier::{ClassifiedUtterance, Classifier, NluEntity, RasaClassifier};
pub use resolver::{resolve, Resolved};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The player intents the engine dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Move,
    Attack,
    Use,
    StopUsing,
    PickUp,
    AbilityCheck,
    Roll,
    Affirm,
    Deny,
    Explore,
    Health,
    /// Sentinel for an utterance the classifier could not place.
    NoIntent,
}

impl Intent {
    /// The classifier's label for this intent.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Move => "move",
            Intent::Attack => "attack",
            Intent::Use => "use",
            Intent::StopUsing => "stop_using",
            Intent::PickUp => "pick_up",
            Intent::AbilityCheck => "ability_check",
            Intent::Roll => "roll",
            Intent::Affirm => "affirm",
            Intent::Deny => "deny",
            Intent::Explore => "explore",
            Intent::Health => "health",
            Intent::NoIntent => "no_intent",
        }
    }

    /// Map a classifier label to an intent. Labels that are synonyms at
    /// the classifier level collapse here (`ranged_attack` is an attack).
    pub fn from_label(label: &str) -> Option<Intent> {
        match label {
            "move" => Some(Intent::Move),
            "attack" | "ranged_attack" => Some(Intent::Attack),
            "use" => Some(Intent::Use),
            "stop_using" => Some(Intent::StopUsing),
            "pick_up" => Some(Intent::PickUp),
            "ability_check" => Some(Intent::AbilityCheck),
            "roll" => Some(Intent::Roll),
            "affirm" => Some(Intent::Affirm),
            "deny" => Some(Intent::Deny),
            "explore" => Some(Intent::Explore),
            "health" => Some(Intent::Health),
            "no_intent" => Some(Intent::NoIntent),
            _ => None,
        }
    }

    /// Human phrasing used in clarifying prompts.
    pub fn description(&self) -> &'static str {
        match self {
            Intent::Move => "move somewhere",
            Intent::Attack => "attack a target",
            Intent::Use => "use a piece of equipment",
            Intent::StopUsing => "stop using a piece of equipment",
            Intent::PickUp => "pick something up",
            Intent::AbilityCheck => "attempt an ability check",
            Intent::Roll => "roll the dice",
            Intent::Affirm => "say yes",
            Intent::Deny => "say no",
            Intent::Explore => "look around",
            Intent::Health => "check your health",
            Intent::NoIntent => "do something",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
