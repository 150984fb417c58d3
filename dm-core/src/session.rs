//! The session: one player, one adventure, one input at a time.
//!
//! `input` runs the whole per-turn pipeline: slash commands, classification,
//! intent resolution, action execution, then the trigger pass. All dice go
//! through the session's seeded RNG, so a session constructed with the same
//! seed and fed the same inputs replays identically.

use crate::actions::{self, DeclareOutcome};
use crate::adventure::{AdventureDef, AdventureError};
use crate::catalog::{Ability, Skill};
use crate::combat;
use crate::dice::{DiceSpec, DieType};
use crate::entity::EntityId;
use crate::nlg::{self, OutputBuilder};
use crate::nlu::classifier::{extract_entity, ClassifiedUtterance, Classifier};
use crate::nlu::commands::{self, CommandOutcome};
use crate::nlu::{resolver, Intent, NluEntity};
use crate::planning::Planner;
use crate::state::{SessionState, SuggestedMove};
use crate::triggers;
use crate::world::TEXT_QUEST_ACCEPT;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Adventure error: {0}")]
    Adventure(#[from] AdventureError),
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Session construction options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub seed: u64,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            seed: rand::random(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form of a resumable session.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub seed: u64,
    pub state: SessionState,
}

/// The engine's reply to one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub exit: bool,
}

impl Reply {
    fn text(text: String) -> Self {
        Self { text, exit: false }
    }

    fn exit(text: String) -> Self {
        Self { text, exit: true }
    }
}

pub struct Session<C, P> {
    state: SessionState,
    classifier: C,
    planner: P,
    rng: StdRng,
    seed: u64,
}

impl<C: Classifier, P: Planner> Session<C, P> {
    /// Build a session from an adventure definition.
    pub fn new(
        config: SessionConfig,
        adventure: &AdventureDef,
        classifier: C,
        planner: P,
    ) -> Result<Self, SessionError> {
        let state = adventure.build()?;
        info!(seed = config.seed, adventure = adventure.name, "session created");
        Ok(Self {
            state,
            classifier,
            planner,
            rng: StdRng::seed_from_u64(config.seed),
            seed: config.seed,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Opening narration: the starting room and anything it triggers.
    pub fn start(&mut self) -> String {
        let mut out = OutputBuilder::new();
        triggers::run(&mut self.state, &mut self.rng, true, &mut out);
        out.format()
    }

    /// Process one line of player input and produce the turn's narration.
    pub async fn input(&mut self, line: &str) -> Reply {
        let mut out = OutputBuilder::new();
        if self.state.game_over() {
            out.append(nlg::game_over());
            return Reply::exit(out.format());
        }

        let line = line.trim();
        match commands::dispatch(line, &self.state, &mut out) {
            Some(CommandOutcome::Exit) => return Reply::exit(out.format()),
            Some(CommandOutcome::Handled) => return Reply::text(out.format()),
            None => {}
        }

        self.state.next_turn();
        debug!(turn = self.state.turn(), line, "processing input");

        let classified = if line.is_empty() {
            if self.state.in_combat() {
                // An empty line during combat means "just roll".
                ClassifiedUtterance::new(Intent::Roll.label(), 1.0, Vec::new())
            } else {
                out.append(nlg::no_intent());
                return Reply::text(out.format());
            }
        } else {
            self.classifier.classify(&line.to_lowercase()).await
        };

        let resolved = resolver::resolve(&mut self.state, classified, &mut out);
        match resolved {
            Some(resolved) => {
                // An affirmation cashes in a pending suggestion.
                let (intent, entities) = if resolved.intent == Intent::Affirm {
                    match self.state.take_suggested_next_move() {
                        Some(suggestion) => (suggestion.intent, suggestion.entities),
                        None => (resolved.intent, resolved.entities),
                    }
                } else {
                    (resolved.intent, resolved.entities)
                };
                self.perform(intent, entities, &mut out).await;
            }
            None => {
                self.state.clear_stored_intent();
                if !out.has_response() {
                    out.append(nlg::no_intent());
                }
            }
        }

        if self.state.game_over() {
            return Reply::exit(out.format());
        }
        Reply::text(out.format())
    }

    async fn perform(&mut self, intent: Intent, entities: Vec<NluEntity>, out: &mut OutputBuilder) {
        // Every dispatched intent becomes the stored intent for the next
        // turn's carry-over; a null-intent turn drops it.
        if intent == Intent::NoIntent {
            self.state.clear_stored_intent();
        } else {
            self.state.store_intent(intent, entities.clone());
        }
        let mut moved = false;

        match intent {
            Intent::Move => {
                let location = extract_entity(&entities, "location").map(str::to_string);
                match location {
                    Some(value) => {
                        let destination = self.resolve_room(&value);
                        moved = actions::execute_move(
                            &mut self.state,
                            &EntityId::player(),
                            &destination,
                            out,
                        );
                    }
                    None => {
                        out.append(nlg::where_to_go());
                        self.defer(Intent::Move, "location");
                    }
                }
            }
            Intent::Attack => {
                let target = extract_entity(&entities, "monster")
                    .or_else(|| extract_entity(&entities, "npc"))
                    .map(str::to_string);
                match target {
                    Some(value) => {
                        // Out of combat a named obstacle soaks the swing
                        // before the declaration path runs.
                        let obstacle = !self.state.in_combat()
                            && actions::can_attack(&self.state, &value).is_err()
                            && actions::attack_object(&mut self.state, &value, &mut self.rng, out);
                        if !obstacle {
                            let outcome = actions::declare_attack(&mut self.state, &value, out);
                            if outcome == DeclareOutcome::GameOver {
                                return;
                            }
                        }
                    }
                    None => {
                        out.append(nlg::who_to_attack());
                        self.defer(Intent::Attack, "monster");
                    }
                }
            }
            Intent::Use => {
                let equipment = extract_entity(&entities, "equipment").map(normalize);
                match equipment {
                    Some(id) => {
                        actions::execute_use(&mut self.state, &id, out);
                    }
                    None => {
                        out.append(nlg::what_to_use());
                        self.defer(Intent::Use, "equipment");
                    }
                }
            }
            Intent::StopUsing => {
                let equipment = extract_entity(&entities, "equipment").map(normalize);
                match equipment {
                    Some(id) => {
                        actions::execute_stop_using(&mut self.state, &id, out);
                    }
                    None => {
                        out.append(nlg::what_to_use());
                        self.defer(Intent::StopUsing, "equipment");
                    }
                }
            }
            Intent::PickUp => {
                let item = extract_entity(&entities, "item").map(normalize);
                match item {
                    Some(id) => {
                        actions::execute_pick_up(&mut self.state, &id, out);
                    }
                    None => {
                        out.append(nlg::what_to_pick_up());
                        self.defer(Intent::PickUp, "item");
                    }
                }
            }
            Intent::AbilityCheck => {
                let ability = extract_entity(&entities, "ability")
                    .and_then(Ability::from_value)
                    .or_else(|| {
                        extract_entity(&entities, "skill")
                            .and_then(Skill::from_value)
                            .map(|skill| skill.ability())
                    });
                match ability {
                    Some(ability) => {
                        actions::execute_ability_check(&mut self.state, ability, out);
                    }
                    None => {
                        out.append(nlg::which_ability());
                        self.defer(Intent::AbilityCheck, "ability");
                    }
                }
            }
            Intent::Roll => {
                let die = extract_entity(&entities, "die").map(str::to_string);
                self.handle_roll(die.as_deref(), out).await;
            }
            Intent::Affirm => {
                if self.state.quest_offered() && !self.state.quest_accepted() {
                    self.state.accept_quest();
                    let text = self
                        .state
                        .world
                        .room(self.state.player_room())
                        .and_then(|r| r.text(TEXT_QUEST_ACCEPT))
                        .map(str::to_string)
                        .unwrap_or_else(nlg::quest_accepted);
                    out.append(text);
                } else {
                    out.append(nlg::no_intent());
                }
            }
            Intent::Deny => {
                if self.state.quest_offered() && !self.state.quest_accepted() {
                    out.append(nlg::quest_declined());
                } else {
                    out.append(nlg::no_intent());
                }
            }
            Intent::Explore => triggers::describe_room(&self.state, out),
            Intent::Health => {
                let player = self.state.registry.player();
                out.append(nlg::health_report(player.hp, player.hp_max));
            }
            Intent::NoIntent => {
                out.append(nlg::no_intent());
                self.maybe_suggest(out);
            }
        }

        if !self.state.game_over() && !self.state.in_combat() {
            triggers::run(&mut self.state, &mut self.rng, moved, out);
        }
    }

    async fn handle_roll(&mut self, die: Option<&str>, out: &mut OutputBuilder) {
        if self.state.in_combat() {
            combat::handle_roll(&mut self.state, &mut self.planner, &mut self.rng, die, out)
                .await;
            return;
        }
        if let Some(check) = self.state.take_pending_ability_check() {
            actions::resolve_ability_check(&mut self.state, check, &mut self.rng, out);
            return;
        }
        // A loose roll: whatever dice were named, d20 by default.
        let spec = match die {
            Some(notation) => match DiceSpec::parse(notation) {
                Ok(spec) => spec,
                Err(_) => {
                    out.append(nlg::bad_dice(notation));
                    return;
                }
            },
            None => DiceSpec::single(DieType::D20),
        };
        out.append(spec.roll(&mut self.rng).to_string());
    }

    /// Nudge a stalled player toward an unvisited room they could reach.
    /// The suggestion is accepted with the next `affirm`.
    fn maybe_suggest(&mut self, out: &mut OutputBuilder) {
        if self.state.in_combat() || self.state.suggested_next_move().is_some() {
            return;
        }
        let room_id = self.state.player_room();
        let candidate = self
            .state
            .world
            .room(room_id)
            .and_then(|room| {
                room.connected_rooms().find(|to| {
                    !self.state.visited(to)
                        && actions::can_move(&self.state, &EntityId::player(), to).is_ok()
                })
            })
            .map(str::to_string);

        if let Some(to) = candidate {
            let name = self
                .state
                .world
                .room(&to)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| to.clone());
            let utterance = format!("You could head to the {name}.");
            debug!(destination = %to, "suggesting a move");
            out.append(nlg::suggest_move(&utterance));
            self.state.set_suggested_next_move(SuggestedMove {
                utterance,
                intent: Intent::Move,
                entities: vec![NluEntity::new("location", &to, 1.0)],
            });
        }
    }

    /// Park an intent that is missing its entity: expect the entity type
    /// in the next utterance. The intent itself is already stored.
    fn defer(&mut self, intent: Intent, entity_type: &str) {
        self.state
            .set_expected_entities([entity_type.to_string()]);
        self.state.set_expected_intents(vec![intent]);
    }

    /// Match a spoken location against room ids and names.
    fn resolve_room(&self, value: &str) -> String {
        let id = normalize(value);
        if self.state.world.rooms.contains_key(&id) {
            return id;
        }
        let wanted = value.to_lowercase();
        self.state
            .world
            .rooms
            .values()
            .find(|r| r.name.to_lowercase() == wanted)
            .map(|r| r.id.clone())
            .unwrap_or(id)
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Write a resumable snapshot of this session.
    pub async fn save(&self, path: &Path) -> Result<(), SessionError> {
        let snapshot = Snapshot {
            seed: self.seed,
            state: self.state.clone(),
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;
        info!(path = %path.display(), turn = self.state.turn(), "snapshot saved");
        Ok(())
    }

    /// Resume a session from a snapshot. The RNG is reseeded from the
    /// stored seed and the turn counter, so two resumptions of the same
    /// snapshot replay identically.
    pub async fn load(
        path: &Path,
        classifier: C,
        planner: P,
    ) -> Result<Self, SessionError> {
        let bytes = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        let rng_seed = snapshot.seed.wrapping_add(snapshot.state.turn());
        info!(path = %path.display(), turn = snapshot.state.turn(), "snapshot loaded");
        Ok(Self {
            state: snapshot.state,
            classifier,
            planner,
            rng: StdRng::seed_from_u64(rng_seed),
            seed: snapshot.seed,
        })
    }
}

/// Normalize a spoken value to a content id: lower case, underscores.
fn normalize(value: &str) -> String {
    value.trim().to_lowercase().replace(' ', "_")
}
