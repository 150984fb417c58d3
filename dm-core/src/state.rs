//! The session state store: single owner of all mutable per-session data.
//!
//! Every other component reads and mutates through this type. There is
//! exactly one logical writer because a session processes one input at a
//! time; a snapshot of this struct at the next-input boundary is enough to
//! resume a session exactly.

use crate::entity::{Entity, EntityId, EntityRegistry};
use crate::nlu::{Intent, NluEntity};
use crate::world::WorldGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Unknown-reference errors, distinct from ordinary precondition failures
/// so callers can produce a specific `unknown *` reason.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Unrecognised room: {0}")]
    UnknownRoom(String),
    #[error("Unrecognised entity: {0}")]
    UnknownEntity(String),
}

/// Combat sub-machine status. Strict cyclic order once entered:
/// `Initiative -> Wait -> Declare -> AttackRoll -> DamageRoll -> Wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombatStatus {
    #[default]
    None,
    Initiative,
    Wait,
    Declare,
    AttackRoll,
    DamageRoll,
}

impl CombatStatus {
    /// The next status in the cycle. `None` stays `None`; advancing out of
    /// `DamageRoll` returns to `Wait`.
    pub fn next(self) -> CombatStatus {
        match self {
            CombatStatus::None => CombatStatus::None,
            CombatStatus::Initiative => CombatStatus::Wait,
            CombatStatus::Wait => CombatStatus::Declare,
            CombatStatus::Declare => CombatStatus::AttackRoll,
            CombatStatus::AttackRoll => CombatStatus::DamageRoll,
            CombatStatus::DamageRoll => CombatStatus::Wait,
        }
    }
}

/// The previous turn's resolved intent, retained for exactly one
/// subsequent turn to allow entity-only follow-up replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIntent {
    pub intent: Intent,
    pub entities: Vec<NluEntity>,
}

/// A nudge offered to a stalled player, accepted via `affirm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedMove {
    pub utterance: String,
    pub intent: Intent,
    pub entities: Vec<NluEntity>,
}

/// An ability check registered by the action layer, resolved by the next
/// `roll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAbilityCheck {
    pub ability: String,
    pub dc: i32,
    pub puzzle: String,
    pub room: String,
}

/// The aggregate root of all mutable session data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub registry: EntityRegistry,
    pub world: WorldGraph,

    combat_status: CombatStatus,
    initiative_order: Vec<EntityId>,
    turn_pointer: usize,
    round: u32,
    current_target: Option<EntityId>,

    expected_intents: Vec<Intent>,
    expected_entities: BTreeSet<String>,
    stored_intent: Option<StoredIntent>,
    suggested_next_move: Option<SuggestedMove>,
    pending_ability_check: Option<PendingAbilityCheck>,

    quest_offered: bool,
    quest_accepted: bool,
    visited_rooms: BTreeSet<String>,

    /// Per-trigger can-still-fire flags keyed `"{owner_id}:{trigger_name}"`,
    /// kept here (not on the in-memory room/monster objects) so they
    /// survive snapshot reload.
    trigger_flags: BTreeMap<String, bool>,

    /// The player's room before the most recent move, for
    /// attack-of-opportunity checks.
    last_player_room: Option<String>,

    turn: u64,
    game_over: bool,
}

impl SessionState {
    pub fn new(registry: EntityRegistry, world: WorldGraph) -> Self {
        Self {
            registry,
            world,
            combat_status: CombatStatus::None,
            initiative_order: Vec::new(),
            turn_pointer: 0,
            round: 0,
            current_target: None,
            expected_intents: Vec::new(),
            expected_entities: BTreeSet::new(),
            stored_intent: None,
            suggested_next_move: None,
            pending_ability_check: None,
            quest_offered: false,
            quest_accepted: false,
            visited_rooms: BTreeSet::new(),
            trigger_flags: BTreeMap::new(),
            last_player_room: None,
            turn: 0,
            game_over: false,
        }
    }

    // ------------------------------------------------------------------
    // Rooms and movement
    // ------------------------------------------------------------------

    /// Current room id of an entity.
    pub fn current_room_of(&self, entity: &EntityId) -> Result<&str, StateError> {
        self.registry
            .get(entity)
            .map(|e| e.room.as_str())
            .ok_or_else(|| StateError::UnknownEntity(entity.to_string()))
    }

    /// The player's current room id.
    pub fn player_room(&self) -> &str {
        &self.registry.player().room
    }

    /// Move an entity to a room. Tracks the player's previous room.
    pub fn set_current_room(&mut self, entity: &EntityId, room: &str) -> Result<(), StateError> {
        if !self.world.rooms.contains_key(room) {
            return Err(StateError::UnknownRoom(room.to_string()));
        }
        if entity.is_player() {
            self.last_player_room = Some(self.registry.player().room.clone());
        }
        let entity = self
            .registry
            .get_mut(entity)
            .ok_or_else(|| StateError::UnknownEntity(entity.to_string()))?;
        entity.room = room.to_string();
        Ok(())
    }

    /// The player's room before their most recent move.
    pub fn last_player_room(&self) -> Option<&str> {
        self.last_player_room.as_deref()
    }

    /// Whether travel between two rooms is currently possible: false if
    /// unconnected, locked, or the door requires an un-accepted quest.
    pub fn travel_allowed(&self, from: &str, to: &str) -> Result<bool, StateError> {
        let from_room = self
            .world
            .room(from)
            .ok_or_else(|| StateError::UnknownRoom(from.to_string()))?;
        if !self.world.rooms.contains_key(to) {
            return Err(StateError::UnknownRoom(to.to_string()));
        }
        let door = match from_room.connections.get(to) {
            Some(door) => door,
            None => return Ok(false),
        };
        if door.locked {
            return Ok(false);
        }
        if door.requires_quest && !self.quest_accepted {
            return Ok(false);
        }
        Ok(true)
    }

    /// Alive monsters in a room the player could target.
    pub fn possible_monster_targets(&self, room: &str) -> Vec<&Entity> {
        self.registry
            .monsters()
            .filter(|m| m.alive && m.room == room)
            .collect()
    }

    pub fn visit_room(&mut self, room: &str) -> bool {
        self.visited_rooms.insert(room.to_string())
    }

    pub fn visited(&self, room: &str) -> bool {
        self.visited_rooms.contains(room)
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    pub fn combat_status(&self) -> CombatStatus {
        self.combat_status
    }

    pub fn in_combat(&self) -> bool {
        self.combat_status != CombatStatus::None
    }

    pub fn set_combat_status(&mut self, status: CombatStatus) {
        debug!(from = ?self.combat_status, to = ?status, "combat status transition");
        self.combat_status = status;
    }

    /// Advance the combat status one step along the cycle.
    pub fn progress_combat_status(&mut self) {
        self.set_combat_status(self.combat_status.next());
    }

    /// Enter combat: status moves to `Initiative`, order and target reset.
    pub fn enter_combat(&mut self) {
        self.set_combat_status(CombatStatus::Initiative);
        self.initiative_order.clear();
        self.turn_pointer = 0;
        self.round = 1;
        self.current_target = None;
    }

    /// End combat: status returns to `None`, expectations cleared.
    pub fn end_combat(&mut self) {
        self.set_combat_status(CombatStatus::None);
        self.initiative_order.clear();
        self.turn_pointer = 0;
        self.current_target = None;
        self.expected_intents.clear();
    }

    /// Fix the turn order for the remainder of this combat instance.
    pub fn set_initiative_order(&mut self, order: Vec<EntityId>) {
        self.initiative_order = order;
        self.turn_pointer = 0;
    }

    pub fn initiative_order(&self) -> &[EntityId] {
        &self.initiative_order
    }

    /// The entity whose turn it currently is.
    pub fn currently_acting(&self) -> Option<&EntityId> {
        self.initiative_order.get(self.turn_pointer)
    }

    /// Advance the turn pointer, wrapping to a new round, skipping nobody;
    /// dead combatants are skipped by the caller's sweep.
    pub fn advance_turn(&mut self) {
        if self.initiative_order.is_empty() {
            return;
        }
        self.turn_pointer += 1;
        if self.turn_pointer >= self.initiative_order.len() {
            self.turn_pointer = 0;
            self.round += 1;
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_target(&self) -> Option<&EntityId> {
        self.current_target.as_ref()
    }

    pub fn set_current_target(&mut self, target: EntityId) {
        self.current_target = Some(target);
    }

    pub fn clear_target(&mut self) {
        self.current_target = None;
    }

    // ------------------------------------------------------------------
    // Expectation fields
    // ------------------------------------------------------------------

    pub fn expected_intents(&self) -> &[Intent] {
        &self.expected_intents
    }

    /// The primary expected intent, if any.
    pub fn expected_intent(&self) -> Option<Intent> {
        self.expected_intents.first().copied()
    }

    pub fn set_expected_intents(&mut self, intents: Vec<Intent>) {
        debug!(?intents, "setting expected intents");
        self.expected_intents = intents;
    }

    pub fn clear_expected_intents(&mut self) {
        self.expected_intents.clear();
    }

    pub fn expected_entities(&self) -> &BTreeSet<String> {
        &self.expected_entities
    }

    pub fn set_expected_entities(&mut self, entity_types: impl IntoIterator<Item = String>) {
        self.expected_entities = entity_types.into_iter().collect();
    }

    pub fn clear_expected_entities(&mut self) {
        self.expected_entities.clear();
    }

    pub fn stored_intent(&self) -> Option<&StoredIntent> {
        self.stored_intent.as_ref()
    }

    /// Record the turn's resolved intent for one turn of carry-over.
    pub fn store_intent(&mut self, intent: Intent, entities: Vec<NluEntity>) {
        self.stored_intent = Some(StoredIntent { intent, entities });
    }

    pub fn clear_stored_intent(&mut self) {
        self.stored_intent = None;
    }

    pub fn suggested_next_move(&self) -> Option<&SuggestedMove> {
        self.suggested_next_move.as_ref()
    }

    pub fn set_suggested_next_move(&mut self, suggestion: SuggestedMove) {
        self.suggested_next_move = Some(suggestion);
    }

    /// Take the pending suggestion, clearing it.
    pub fn take_suggested_next_move(&mut self) -> Option<SuggestedMove> {
        self.suggested_next_move.take()
    }

    pub fn clear_suggested_next_move(&mut self) {
        self.suggested_next_move = None;
    }

    pub fn pending_ability_check(&self) -> Option<&PendingAbilityCheck> {
        self.pending_ability_check.as_ref()
    }

    pub fn set_pending_ability_check(&mut self, check: PendingAbilityCheck) {
        self.pending_ability_check = Some(check);
    }

    pub fn take_pending_ability_check(&mut self) -> Option<PendingAbilityCheck> {
        self.pending_ability_check.take()
    }

    // ------------------------------------------------------------------
    // Quest and progress markers
    // ------------------------------------------------------------------

    pub fn quest_offered(&self) -> bool {
        self.quest_offered
    }

    pub fn offer_quest(&mut self) {
        self.quest_offered = true;
    }

    pub fn quest_accepted(&self) -> bool {
        self.quest_accepted
    }

    pub fn accept_quest(&mut self) {
        self.quest_accepted = true;
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    fn trigger_key(owner: &str, name: &str) -> String {
        format!("{owner}:{name}")
    }

    /// Register a trigger as able to fire. Called at adventure load.
    pub fn init_trigger(&mut self, owner: &str, name: &str) {
        self.trigger_flags
            .entry(Self::trigger_key(owner, name))
            .or_insert(true);
    }

    /// Whether a trigger can still fire. Unregistered triggers cannot.
    pub fn can_trigger(&self, owner: &str, name: &str) -> bool {
        self.trigger_flags
            .get(&Self::trigger_key(owner, name))
            .copied()
            .unwrap_or(false)
    }

    /// Mark a one-shot trigger as spent.
    pub fn disable_trigger(&mut self, owner: &str, name: &str) {
        self.trigger_flags
            .insert(Self::trigger_key(owner, name), false);
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn next_turn(&mut self) {
        self.turn += 1;
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn set_game_over(&mut self) {
        debug!("session entering terminal game-over state");
        self.game_over = true;
    }
}
