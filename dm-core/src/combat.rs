//! The turn-based combat sub-machine.
//!
//! Once combat is entered the status cycles
//! `Initiative -> Wait -> Declare -> AttackRoll -> DamageRoll -> Wait` and
//! the resolver forces every player utterance into a roll (or an attack
//! declaration at the declare stage). Autonomous combatants act inside the
//! wait sweep, planned one turn at a time; the sweep stops whenever it is
//! the player's turn again, leaving the status and expectations set for
//! their next input.

use crate::dice::{DiceSpec, DieType};
use crate::entity::{EntityId, Targetable, TurnTaking};
use crate::nlg::{self, OutputBuilder};
use crate::nlu::Intent;
use crate::planning::{PlannedAction, Planner, PlanningProblem};
use crate::state::{CombatStatus, SessionState};
use crate::triggers;
use rand::Rng;
use tracing::{debug, info};

/// Handle a forced roll from the player, dispatching on the combat status.
///
/// `die` is an optional dice notation the player named in their utterance;
/// an unrecognised notation is rejected without progressing the phase.
pub async fn handle_roll<R: Rng>(
    state: &mut SessionState,
    planner: &mut dyn Planner,
    rng: &mut R,
    die: Option<&str>,
    out: &mut OutputBuilder,
) {
    if let Some(notation) = die {
        if DiceSpec::check(notation).is_err() {
            out.append(nlg::bad_dice(notation));
            state.set_expected_intents(vec![Intent::Roll]);
            return;
        }
    }

    match state.combat_status() {
        CombatStatus::Initiative => {
            roll_initiative(state, rng, out);
            wait_sweep(state, planner, rng, out).await;
        }
        CombatStatus::AttackRoll => {
            player_attack_roll(state, rng, out);
            if state.combat_status() == CombatStatus::Wait {
                wait_sweep(state, planner, rng, out).await;
            }
        }
        CombatStatus::DamageRoll => {
            player_damage_roll(state, rng, out);
            if state.in_combat() {
                wait_sweep(state, planner, rng, out).await;
            }
        }
        CombatStatus::Wait | CombatStatus::Declare => {
            // A roll arriving here means the player owes a declaration.
            out.append(nlg::declare_attack());
            state.set_expected_intents(vec![Intent::Attack]);
        }
        CombatStatus::None => {}
    }
}

/// Roll initiative for the player and every living monster in their room.
/// Descending totals; equal totals keep registration order, so the player
/// wins ties against monsters.
fn roll_initiative<R: Rng>(state: &mut SessionState, rng: &mut R, out: &mut OutputBuilder) {
    let room = state.player_room().to_string();
    let mut combatants = vec![EntityId::player()];
    combatants.extend(
        state
            .possible_monster_targets(&room)
            .into_iter()
            .map(|m| m.id.clone()),
    );

    let mut scored: Vec<(i32, usize, EntityId)> = Vec::with_capacity(combatants.len());
    for id in combatants {
        let entity = match state.registry.get(&id) {
            Some(entity) => entity,
            None => continue,
        };
        let total = DiceSpec::new(1, DieType::D20, entity.initiative_modifier())
            .roll(rng)
            .total;
        let display = if id.is_player() { "you" } else { &entity.name };
        out.append(nlg::initiative_roll(display, total));
        let index = state.registry.registration_index(&id).unwrap_or(usize::MAX);
        scored.push((total, index, id));
    }
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let order: Vec<EntityId> = scored.into_iter().map(|(_, _, id)| id).collect();
    let names: Vec<String> = order
        .iter()
        .map(|id| {
            if id.is_player() {
                "you".to_string()
            } else {
                state
                    .registry
                    .get(id)
                    .map(|e| format!("the {}", e.name))
                    .unwrap_or_else(|| id.to_string())
            }
        })
        .collect();
    info!(?order, "initiative rolled");
    out.append(nlg::initiative_order(&names));
    state.set_initiative_order(order);
    state.progress_combat_status();
}

/// Run autonomous turns until it is the player's turn or combat ends.
async fn wait_sweep<R: Rng>(
    state: &mut SessionState,
    planner: &mut dyn Planner,
    rng: &mut R,
    out: &mut OutputBuilder,
) {
    loop {
        if finish_if_over(state, out) {
            return;
        }
        let actor = match state.currently_acting() {
            Some(actor) => actor.clone(),
            None => return,
        };

        if actor.is_player() {
            prepare_player_turn(state, out);
            return;
        }

        let acts = state
            .registry
            .get(&actor)
            .is_some_and(|m| m.alive && m.room == state.player_room());
        if acts {
            monster_turn(state, planner, rng, &actor, out).await;
            if state.game_over() {
                return;
            }
        }
        state.advance_turn();
    }
}

/// Set up the player's turn: a still-living target skips the declare stage.
fn prepare_player_turn(state: &mut SessionState, out: &mut OutputBuilder) {
    out.append(nlg::entity_turn("you"));
    let target_lives = state
        .current_target()
        .and_then(|t| state.registry.get(t))
        .is_some_and(|t| t.alive && t.room == state.player_room());

    if target_lives {
        state.set_combat_status(CombatStatus::AttackRoll);
        state.set_expected_intents(vec![Intent::Roll]);
        out.append(nlg::perform_attack_roll());
    } else {
        state.clear_target();
        state.set_combat_status(CombatStatus::Declare);
        state.set_expected_intents(vec![Intent::Attack]);
        out.append(nlg::declare_attack());
    }
}

fn player_attack_roll<R: Rng>(state: &mut SessionState, rng: &mut R, out: &mut OutputBuilder) {
    let target_id = match state.current_target() {
        Some(target) => target.clone(),
        None => {
            state.set_combat_status(CombatStatus::Declare);
            state.set_expected_intents(vec![Intent::Attack]);
            out.append(nlg::declare_attack());
            return;
        }
    };

    let (bonus, _) = state.registry.player().attack_numbers();
    let outcome = DiceSpec::new(1, DieType::D20, bonus).roll(rng);
    out.append(outcome.to_string());

    let (target_name, target_ac) = match state.registry.get(&target_id) {
        Some(target) => (target.name.clone(), target.armor_class()),
        None => return,
    };

    if outcome.meets_dc(target_ac) {
        state.progress_combat_status();
        state.set_expected_intents(vec![Intent::Roll]);
        out.append(nlg::perform_damage_roll());
    } else {
        debug!(target = %target_id, total = outcome.total, ac = target_ac, "player attack missed");
        out.append(nlg::attack_missed(&target_name));
        state.advance_turn();
        state.set_combat_status(CombatStatus::Wait);
    }
}

fn player_damage_roll<R: Rng>(state: &mut SessionState, rng: &mut R, out: &mut OutputBuilder) {
    let target_id = match state.current_target() {
        Some(target) => target.clone(),
        None => {
            state.set_combat_status(CombatStatus::Wait);
            return;
        }
    };

    let (_, damage) = state.registry.player().attack_numbers();
    let outcome = damage.roll(rng);
    out.append(outcome.to_string());
    let dealt = outcome.total.max(1);

    if let Some(target) = state.registry.get_mut(&target_id) {
        let name = target.name.clone();
        if !target.take_damage(dealt) {
            info!(target = %target_id, dealt, "target killed");
            out.append(nlg::entity_killed(&name));
            state.clear_target();
        }
    }

    state.advance_turn();
    state.set_combat_status(CombatStatus::Wait);
}

/// End combat when no living monsters remain in the player's room.
/// Returns whether combat was ended.
fn finish_if_over(state: &mut SessionState, out: &mut OutputBuilder) -> bool {
    if !state.in_combat() {
        return true;
    }
    let room = state.player_room().to_string();
    if state.possible_monster_targets(&room).is_empty() {
        info!(room, "combat over");
        out.append(nlg::fight_over());
        state.end_combat();
        triggers::fight_ends(state, &room, out);
        return true;
    }
    false
}

/// One autonomous combatant's turn, decided by the planner.
async fn monster_turn<R: Rng>(
    state: &mut SessionState,
    planner: &mut dyn Planner,
    rng: &mut R,
    actor: &EntityId,
    out: &mut OutputBuilder,
) {
    let (name, room) = match state.registry.get(actor) {
        Some(monster) => (monster.name.clone(), monster.room.clone()),
        None => return,
    };
    out.append(nlg::entity_turn(&name));

    let targets = if state.registry.player().alive {
        vec![EntityId::player()]
    } else {
        Vec::new()
    };
    let problem = PlanningProblem {
        actor: actor.clone(),
        room,
        targets,
    };

    match planner.plan(&problem).await {
        PlannedAction::DeclareAttack { .. } => monster_attack(state, rng, actor, out),
        PlannedAction::Pass { .. } => out.append(nlg::monster_passes(&name)),
    }
}

/// A monster's attack against the player, also used for free attacks of
/// opportunity outside the initiative order.
pub fn monster_attack<R: Rng>(
    state: &mut SessionState,
    rng: &mut R,
    actor: &EntityId,
    out: &mut OutputBuilder,
) {
    let (name, bonus, damage) = match state.registry.get(actor) {
        Some(monster) => {
            let (bonus, damage) = monster.attack_numbers();
            (monster.name.clone(), bonus, damage)
        }
        None => return,
    };

    let player_ac = state.registry.player().armor_class();
    let attack = DiceSpec::new(1, DieType::D20, bonus).roll(rng);
    if !attack.meets_dc(player_ac) {
        out.append(nlg::monster_misses(&name));
        return;
    }

    let dealt = damage.roll(rng).total.max(1);
    let alive = state.registry.player_mut().take_damage(dealt);
    out.append(nlg::monster_hits(&name, dealt));
    if !alive {
        info!(monster = %actor, "player killed");
        out.append(nlg::player_died());
        out.append(nlg::game_over());
        state.end_combat();
        state.set_game_over();
    }
}
