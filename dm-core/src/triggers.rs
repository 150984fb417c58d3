//! The trigger dispatcher.
//!
//! Runs once per turn after the action layer. Room triggers narrate
//! one-shot enter text, descriptions, regained visibility and the quest
//! offer; behavior triggers drive autonomous monsters outside of combat
//! (attacks of opportunity and conditional relocation). One-shot state
//! lives in the session's trigger flags, keyed by owner and trigger name,
//! so it survives snapshot reload.

use crate::combat;
use crate::entity::{EntityId, MonsterBehavior};
use crate::nlg::OutputBuilder;
use crate::nlu::Intent;
use crate::state::SessionState;
use crate::world::{
    TEXT_DESCRIPTION, TEXT_ENTER, TEXT_FIGHT_ENDS, TEXT_NO_VISIBILITY, TEXT_QUEST_OFFER,
    TEXT_VISIBILITY,
};
use rand::Rng;
use tracing::info;

const TRIGGER_ENTER: &str = "enter";
const TRIGGER_VISIBILITY: &str = "visibility";
const TRIGGER_QUEST: &str = "quest";

/// Register every trigger an adventure's content can fire. Called once at
/// adventure load; reloading a snapshot keeps the stored flags instead.
pub fn register_all(state: &mut SessionState) {
    let room_triggers: Vec<(String, &'static str)> = state
        .world
        .rooms
        .values()
        .flat_map(|room| {
            let mut names = Vec::new();
            if room.text(TEXT_ENTER).is_some() {
                names.push((room.id.clone(), TRIGGER_ENTER));
            }
            if room.text(TEXT_VISIBILITY).is_some() {
                names.push((room.id.clone(), TRIGGER_VISIBILITY));
            }
            if room.text(TEXT_FIGHT_ENDS).is_some() {
                names.push((room.id.clone(), "fight_ends"));
            }
            if room.text(TEXT_QUEST_OFFER).is_some() {
                names.push((room.id.clone(), TRIGGER_QUEST));
            }
            names
        })
        .collect();
    for (owner, name) in room_triggers {
        state.init_trigger(&owner, name);
    }

    let behavior_triggers: Vec<(String, &'static str)> = state
        .registry
        .monsters()
        .flat_map(|m| {
            m.behaviors
                .iter()
                .map(|b| (m.id.to_string(), b.name()))
                .collect::<Vec<_>>()
        })
        .collect();
    for (owner, name) in behavior_triggers {
        state.init_trigger(&owner, name);
    }
}

/// Run the per-turn trigger pass. `moved` is whether the player changed
/// rooms this turn.
pub fn run<R: Rng>(state: &mut SessionState, rng: &mut R, moved: bool, out: &mut OutputBuilder) {
    if moved {
        attacks_of_opportunity(state, rng, out);
        if state.game_over() {
            return;
        }
        on_enter(state, out);
    }
    visibility_regained(state, out);
    quest_offer(state, out);
    relocations(state, out);
}

/// Free attacks from living monsters in the room the player just left.
fn attacks_of_opportunity<R: Rng>(state: &mut SessionState, rng: &mut R, out: &mut OutputBuilder) {
    let left = match state.last_player_room() {
        Some(room) => room.to_string(),
        None => return,
    };
    let attackers: Vec<EntityId> = state
        .registry
        .monsters()
        .filter(|m| {
            m.alive
                && m.room == left
                && m.behaviors
                    .iter()
                    .any(|b| matches!(b, MonsterBehavior::AttackOfOpportunity))
                && state.can_trigger(m.id.as_str(), "attack_of_opportunity")
        })
        .map(|m| m.id.clone())
        .collect();

    for attacker in attackers {
        if state.game_over() {
            return;
        }
        let name = state
            .registry
            .get(&attacker)
            .map(|m| m.name.clone())
            .unwrap_or_default();
        info!(monster = %attacker, "attack of opportunity");
        out.append(crate::nlg::attack_of_opportunity(&name));
        combat::monster_attack(state, rng, &attacker, out);
    }
}

/// One-shot enter text, then the room description (or the darkness text).
fn on_enter(state: &mut SessionState, out: &mut OutputBuilder) {
    let room_id = state.player_room().to_string();
    if state.can_trigger(&room_id, TRIGGER_ENTER) {
        if let Some(text) = state.world.room(&room_id).and_then(|r| r.text(TEXT_ENTER)) {
            out.append(text.to_string());
        }
        state.disable_trigger(&room_id, TRIGGER_ENTER);
    }
    describe_room(state, out);
    state.visit_room(&room_id);
}

/// The room description the player can currently perceive.
pub fn describe_room(state: &SessionState, out: &mut OutputBuilder) {
    let room_id = state.player_room();
    let room = match state.world.room(room_id) {
        Some(room) => room,
        None => return,
    };
    let player = state.registry.player();
    let dark = !room.visibility && !player.has_light() && !player.has_darkvision;
    let text = if dark {
        room.text(TEXT_NO_VISIBILITY)
            .unwrap_or("It's pitch black. You can't see a thing.")
    } else {
        room.text(TEXT_DESCRIPTION).unwrap_or("")
    };
    out.append(text.to_string());
    if !dark && !room.treasure.is_empty() {
        let items: Vec<String> = room.treasure.iter().cloned().collect();
        out.append(format!(
            "You spot: {}.",
            crate::nlg::format_list(&items, " and ")
        ));
    }
}

/// Fires once when a dark room becomes visible to the player.
fn visibility_regained(state: &mut SessionState, out: &mut OutputBuilder) {
    let room_id = state.player_room().to_string();
    if !state.can_trigger(&room_id, TRIGGER_VISIBILITY) {
        return;
    }
    let room = match state.world.room(&room_id) {
        Some(room) => room,
        None => return,
    };
    let player = state.registry.player();
    if room.visibility || (!player.has_light() && !player.has_darkvision) {
        return;
    }
    if let Some(text) = room.text(TEXT_VISIBILITY) {
        out.append(text.to_string());
    }
    state.disable_trigger(&room_id, TRIGGER_VISIBILITY);
}

/// Offer the adventure quest once, expecting a yes or no.
fn quest_offer(state: &mut SessionState, out: &mut OutputBuilder) {
    if state.quest_offered() || state.in_combat() {
        return;
    }
    let room_id = state.player_room().to_string();
    if !state.can_trigger(&room_id, TRIGGER_QUEST) {
        return;
    }
    if let Some(text) = state
        .world
        .room(&room_id)
        .and_then(|r| r.text(TEXT_QUEST_OFFER))
    {
        info!(room = room_id, "offering quest");
        out.append(text.to_string());
        state.offer_quest();
        state.set_expected_intents(vec![Intent::Affirm, Intent::Deny]);
        state.disable_trigger(&room_id, TRIGGER_QUEST);
    }
}

/// Fight-end narration for a room, fired by the combat engine.
pub fn fight_ends(state: &mut SessionState, room_id: &str, out: &mut OutputBuilder) {
    if !state.can_trigger(room_id, "fight_ends") {
        return;
    }
    if let Some(text) = state
        .world
        .room(room_id)
        .and_then(|r| r.text(TEXT_FIGHT_ENDS))
    {
        out.append(text.to_string());
    }
    state.disable_trigger(room_id, "fight_ends");
}

/// Conditional one-shot relocation: a monster watching a room moves once
/// every monster of the watched template there is dead.
fn relocations(state: &mut SessionState, out: &mut OutputBuilder) {
    let movers: Vec<(EntityId, String, String, String)> = state
        .registry
        .monsters()
        .filter(|m| m.alive)
        .flat_map(|m| {
            m.behaviors
                .iter()
                .filter_map(|b| match b {
                    MonsterBehavior::RelocateWhenClear {
                        watch_room,
                        watch_template,
                        destination,
                        narration,
                    } => Some((
                        m.id.clone(),
                        format!("{watch_room}:{watch_template}"),
                        destination.clone(),
                        narration.clone(),
                    )),
                    MonsterBehavior::AttackOfOpportunity => None,
                })
                .collect::<Vec<_>>()
        })
        .collect();

    for (mover, watch, destination, narration) in movers {
        if !state.can_trigger(mover.as_str(), "relocate_when_clear") {
            continue;
        }
        let (watch_room, watch_template) = match watch.split_once(':') {
            Some(parts) => parts,
            None => continue,
        };
        let clear = !state
            .registry
            .monsters()
            .any(|m| m.alive && m.room == watch_room && m.template_id.as_deref() == Some(watch_template));
        if !clear {
            continue;
        }
        info!(monster = %mover, destination, "relocation trigger fired");
        if let Some(monster) = state.registry.get_mut(&mover) {
            monster.room = destination.clone();
        }
        if state.player_room() == destination {
            out.append(narration);
        }
        state.disable_trigger(mover.as_str(), "relocate_when_clear");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AbilityScores, Entity, EntityRegistry};
    use crate::world::{Door, Room, WorldGraph};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state() -> SessionState {
        let player = Entity::player("Ros", "inn", AbilityScores::default(), 30, 14)
            .with_equipment(&["torch"]);
        let mut registry = EntityRegistry::new(player);
        registry.register(
            Entity::monster("giant_rat_1", "giant_rat", "cellar")
                .unwrap()
                .with_behavior(MonsterBehavior::AttackOfOpportunity),
        );
        registry.register(
            Entity::monster("skeleton_1", "skeleton", "vault")
                .unwrap()
                .with_behavior(MonsterBehavior::RelocateWhenClear {
                    watch_room: "cellar".to_string(),
                    watch_template: "giant_rat".to_string(),
                    destination: "cellar".to_string(),
                    narration: "Bones rattle in the shadows.".to_string(),
                }),
        );

        let mut world = WorldGraph::default();
        world.add_room(
            Room::new("inn", "Inn")
                .with_text(TEXT_QUEST_OFFER, "Rats in my cellar! Will you help?")
                .with_text(TEXT_DESCRIPTION, "A warm taproom.")
                .with_door(Door::open("cellar")),
        );
        world.add_room(
            Room::new("cellar", "Cellar")
                .unlit()
                .with_text(TEXT_ENTER, "The stairs creak underfoot.")
                .with_text(TEXT_NO_VISIBILITY, "Darkness presses in.")
                .with_text(TEXT_VISIBILITY, "Torchlight reveals damp stone walls.")
                .with_text(TEXT_DESCRIPTION, "Barrels line the walls.")
                .with_text(TEXT_FIGHT_ENDS, "Quiet returns to the cellar.")
                .with_door(Door::open("inn"))
                .with_door(Door::open("vault")),
        );
        world.add_room(Room::new("vault", "Vault").with_door(Door::open("cellar")));

        let mut state = SessionState::new(registry, world);
        register_all(&mut state);
        state
    }

    #[test]
    fn test_quest_offer_fires_once() {
        let mut state = state();
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, false, &mut out);
        assert!(out.format().contains("Will you help?"));
        assert!(state.quest_offered());
        assert_eq!(state.expected_intents(), &[Intent::Affirm, Intent::Deny]);

        let mut out = OutputBuilder::new();
        state.clear_expected_intents();
        run(&mut state, &mut rng, false, &mut out);
        assert!(!out.format().contains("Will you help?"));
    }

    #[test]
    fn test_enter_text_is_one_shot_but_description_repeats() {
        let mut state = state();
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = OutputBuilder::new();
        state
            .set_current_room(&EntityId::player(), "cellar")
            .unwrap();
        run(&mut state, &mut rng, true, &mut out);
        let first = out.format();
        assert!(first.contains("stairs creak"));
        assert!(first.contains("Darkness presses in."));

        // Back out and in again: no enter text, still dark.
        state.set_current_room(&EntityId::player(), "inn").unwrap();
        state.set_current_room(&EntityId::player(), "cellar").unwrap();
        let mut out = OutputBuilder::new();
        // The rat in the cellar gets its free attacks when leaving; ignore
        // narration, just check the enter text is spent.
        run(&mut state, &mut rng, true, &mut out);
        assert!(!out.format().contains("stairs creak"));
    }

    #[test]
    fn test_visibility_trigger_fires_when_light_comes_on() {
        let mut state = state();
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = OutputBuilder::new();
        state.set_current_room(&EntityId::player(), "cellar").unwrap();
        run(&mut state, &mut rng, true, &mut out);
        assert!(!out.format().contains("Torchlight reveals"));

        state
            .registry
            .player_mut()
            .in_use
            .insert("torch".to_string());
        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, false, &mut out);
        assert!(out.format().contains("Torchlight reveals"));

        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, false, &mut out);
        assert!(!out.format().contains("Torchlight reveals"));
    }

    #[test]
    fn test_attack_of_opportunity_on_leaving() {
        let mut state = state();
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = OutputBuilder::new();
        state.set_current_room(&EntityId::player(), "cellar").unwrap();
        run(&mut state, &mut rng, true, &mut out);

        state.set_current_room(&EntityId::player(), "inn").unwrap();
        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, true, &mut out);
        assert!(out.format().contains("snaps at you"));
    }

    #[test]
    fn test_disabled_opportunity_flag_suppresses_the_attack() {
        let mut state = state();
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = OutputBuilder::new();
        state.set_current_room(&EntityId::player(), "cellar").unwrap();
        run(&mut state, &mut rng, true, &mut out);

        state.disable_trigger("giant_rat_1", "attack_of_opportunity");
        state.set_current_room(&EntityId::player(), "inn").unwrap();
        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, true, &mut out);
        assert!(!out.format().contains("snaps at you"));
    }

    #[test]
    fn test_relocation_waits_for_clear_room() {
        let mut state = state();
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, false, &mut out);
        assert_eq!(
            state.registry.get(&EntityId::from("skeleton_1")).unwrap().room,
            "vault"
        );

        state
            .registry
            .get_mut(&EntityId::from("giant_rat_1"))
            .unwrap()
            .alive = false;
        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, false, &mut out);
        assert_eq!(
            state.registry.get(&EntityId::from("skeleton_1")).unwrap().room,
            "cellar"
        );
        // One-shot: killing nothing new, no second move.
        state
            .registry
            .get_mut(&EntityId::from("skeleton_1"))
            .unwrap()
            .room = "vault".to_string();
        let mut out = OutputBuilder::new();
        run(&mut state, &mut rng, false, &mut out);
        assert_eq!(
            state.registry.get(&EntityId::from("skeleton_1")).unwrap().room,
            "vault"
        );
        let _ = out;
    }
}
