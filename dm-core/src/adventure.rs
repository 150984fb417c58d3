//! Adventure definitions: the validated content format a session is built
//! from, plus the built-in sample adventure.
//!
//! Definitions deserialize strictly (`deny_unknown_fields`) so a typo in a
//! content file fails at load instead of silently vanishing. Cross
//! references (door targets, puzzle ids, monster templates) are validated
//! in [`AdventureDef::build`].

use crate::catalog;
use crate::entity::{AbilityScores, Entity, EntityRegistry, MonsterBehavior};
use crate::state::SessionState;
use crate::triggers;
use crate::world::{
    Door, Puzzle, PuzzleSolution, Room, WorldGraph, TEXT_DESCRIPTION, TEXT_ENTER,
    TEXT_FIGHT_ENDS, TEXT_NO_VISIBILITY, TEXT_QUEST_ACCEPT, TEXT_QUEST_OFFER, TEXT_VISIBILITY,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AdventureError {
    #[error("Invalid adventure definition: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Door in room {room} leads to unknown room {to}")]
    DanglingDoor { room: String, to: String },
    #[error("Unknown puzzle reference: {0}")]
    DanglingPuzzle(String),
    #[error("Unknown monster template: {0}")]
    UnknownTemplate(String),
    #[error("Unknown room for entity {entity}: {room}")]
    UnknownEntityRoom { entity: String, room: String },
    #[error("Unknown catalog id: {0}")]
    UnknownCatalogId(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdventureDef {
    pub name: String,
    pub player: PlayerDef,
    pub rooms: Vec<RoomDef>,
    #[serde(default)]
    pub puzzles: Vec<PuzzleDef>,
    #[serde(default)]
    pub monsters: Vec<MonsterDef>,
    #[serde(default)]
    pub npcs: Vec<NpcDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerDef {
    pub name: String,
    pub start_room: String,
    pub scores: [u8; 6],
    pub hp_max: i32,
    pub armor_class: i32,
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
}

fn default_visibility() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomDef {
    pub id: String,
    pub name: String,
    #[serde(default = "default_visibility")]
    pub visibility: bool,
    #[serde(default)]
    pub text: BTreeMap<String, String>,
    #[serde(default)]
    pub treasure: Vec<String>,
    #[serde(default)]
    pub doors: Vec<DoorDef>,
    #[serde(default)]
    pub puzzles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoorDef {
    pub to: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub requires_quest: bool,
    #[serde(default)]
    pub requires_clear: bool,
    #[serde(default)]
    pub puzzle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PuzzleDef {
    pub id: String,
    pub name: String,
    pub solutions: BTreeMap<String, PuzzleSolution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonsterDef {
    pub id: String,
    pub template: String,
    pub room: String,
    #[serde(default)]
    pub behaviors: Vec<BehaviorDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum BehaviorDef {
    AttackOfOpportunity,
    RelocateWhenClear {
        watch_room: String,
        watch_template: String,
        destination: String,
        narration: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NpcDef {
    pub id: String,
    pub name: String,
    pub room: String,
    #[serde(default)]
    pub attack_ends_game: bool,
}

impl AdventureDef {
    /// Parse a JSON adventure definition, rejecting unknown fields.
    pub fn from_json(json: &str) -> Result<Self, AdventureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate cross references and build the initial session state,
    /// with every content trigger registered.
    pub fn build(&self) -> Result<SessionState, AdventureError> {
        let room_ids: Vec<&str> = self.rooms.iter().map(|r| r.id.as_str()).collect();
        let room_known = |id: &str| room_ids.contains(&id);
        let puzzle_known =
            |id: &str| self.puzzles.iter().any(|p| p.id == id);

        if !room_known(&self.player.start_room) {
            return Err(AdventureError::UnknownEntityRoom {
                entity: "player".to_string(),
                room: self.player.start_room.clone(),
            });
        }
        if let Some(weapon) = &self.player.weapon {
            if catalog::weapon(weapon).is_none() {
                return Err(AdventureError::UnknownCatalogId(weapon.clone()));
            }
        }
        for equipment in &self.player.equipment {
            if catalog::equipment(equipment).is_none() {
                return Err(AdventureError::UnknownCatalogId(equipment.clone()));
            }
        }

        let mut world = WorldGraph::default();
        for def in &self.rooms {
            let mut room = Room::new(&def.id, &def.name);
            room.visibility = def.visibility;
            room.text = def.text.clone();
            room.treasure = def.treasure.iter().cloned().collect();
            for door_def in &def.doors {
                if !room_known(&door_def.to) {
                    return Err(AdventureError::DanglingDoor {
                        room: def.id.clone(),
                        to: door_def.to.clone(),
                    });
                }
                if let Some(puzzle) = &door_def.puzzle {
                    if !puzzle_known(puzzle) {
                        return Err(AdventureError::DanglingPuzzle(puzzle.clone()));
                    }
                }
                room = room.with_door(Door {
                    to: door_def.to.clone(),
                    locked: door_def.locked,
                    requires_quest: door_def.requires_quest,
                    requires_clear: door_def.requires_clear,
                    puzzle: door_def.puzzle.clone(),
                });
            }
            for puzzle in &def.puzzles {
                if !puzzle_known(puzzle) {
                    return Err(AdventureError::DanglingPuzzle(puzzle.clone()));
                }
                room = room.with_puzzle(puzzle.clone());
            }
            world.add_room(room);
        }
        for def in &self.puzzles {
            let mut puzzle = Puzzle::new(&def.id, &def.name);
            puzzle.solutions = def.solutions.clone();
            world.add_puzzle(puzzle);
        }

        let [str_, dex, con, int, wis, cha] = self.player.scores;
        let mut player = Entity::player(
            &self.player.name,
            &self.player.start_room,
            AbilityScores::new(str_, dex, con, int, wis, cha),
            self.player.hp_max,
            self.player.armor_class,
        );
        if let Some(weapon) = &self.player.weapon {
            player = player.with_weapon(weapon);
        }
        player
            .equipment
            .extend(self.player.equipment.iter().cloned());

        let mut registry = EntityRegistry::new(player);
        for def in &self.monsters {
            if !room_known(&def.room) {
                return Err(AdventureError::UnknownEntityRoom {
                    entity: def.id.clone(),
                    room: def.room.clone(),
                });
            }
            let mut monster = Entity::monster(&def.id, &def.template, &def.room)
                .ok_or_else(|| AdventureError::UnknownTemplate(def.template.clone()))?;
            for behavior in &def.behaviors {
                monster = monster.with_behavior(match behavior {
                    BehaviorDef::AttackOfOpportunity => MonsterBehavior::AttackOfOpportunity,
                    BehaviorDef::RelocateWhenClear {
                        watch_room,
                        watch_template,
                        destination,
                        narration,
                    } => MonsterBehavior::RelocateWhenClear {
                        watch_room: watch_room.clone(),
                        watch_template: watch_template.clone(),
                        destination: destination.clone(),
                        narration: narration.clone(),
                    },
                });
            }
            registry.register(monster);
        }
        for def in &self.npcs {
            if !room_known(&def.room) {
                return Err(AdventureError::UnknownEntityRoom {
                    entity: def.id.clone(),
                    room: def.room.clone(),
                });
            }
            let mut npc = Entity::npc(&def.id, &def.name, &def.room);
            npc.attack_ends_game = def.attack_ends_game;
            registry.register(npc);
        }

        info!(adventure = self.name, rooms = self.rooms.len(), "adventure built");
        let mut state = SessionState::new(registry, world);
        triggers::register_all(&mut state);
        Ok(state)
    }

    /// The built-in rats-in-the-cellar adventure.
    pub fn sample() -> Self {
        AdventureDef {
            name: "The Stout Meal Inn".to_string(),
            player: PlayerDef {
                name: "Ros".to_string(),
                start_room: "stout_meal_inn".to_string(),
                scores: [12, 16, 14, 10, 10, 10],
                hp_max: 11,
                armor_class: 14,
                weapon: Some("shortsword".to_string()),
                equipment: vec!["torch".to_string(), "rope".to_string()],
            },
            rooms: vec![
                RoomDef {
                    id: "stout_meal_inn".to_string(),
                    name: "Stout Meal Inn".to_string(),
                    visibility: true,
                    text: BTreeMap::from([
                        (
                            TEXT_DESCRIPTION.to_string(),
                            "The taproom of the Stout Meal Inn is warm and smells of stew. \
                             Corvus the innkeeper polishes a mug behind the bar."
                                .to_string(),
                        ),
                        (
                            TEXT_QUEST_OFFER.to_string(),
                            "Corvus leans over the bar. \"Rats in my cellar, big as dogs. \
                             Clear them out and there's coin in it for you. Will you do it?\""
                                .to_string(),
                        ),
                        (
                            TEXT_QUEST_ACCEPT.to_string(),
                            "\"Knew you had the look of a professional. The cellar stairs \
                             are behind the bar.\""
                                .to_string(),
                        ),
                    ]),
                    treasure: vec![],
                    doors: vec![DoorDef {
                        to: "inns_cellar".to_string(),
                        locked: false,
                        requires_quest: true,
                        requires_clear: false,
                        puzzle: None,
                    }],
                    puzzles: vec![],
                },
                RoomDef {
                    id: "inns_cellar".to_string(),
                    name: "Inn's Cellar".to_string(),
                    visibility: false,
                    text: BTreeMap::from([
                        (
                            TEXT_ENTER.to_string(),
                            "The stairs groan under your weight as you descend.".to_string(),
                        ),
                        (
                            TEXT_NO_VISIBILITY.to_string(),
                            "The cellar is pitch black. Something skitters in the dark."
                                .to_string(),
                        ),
                        (
                            TEXT_VISIBILITY.to_string(),
                            "Torchlight spills over broken barrels and gnawed sacks of grain. \
                             A stuck iron door stands in the far wall."
                                .to_string(),
                        ),
                        (
                            TEXT_DESCRIPTION.to_string(),
                            "Broken barrels and gnawed sacks litter the cellar floor."
                                .to_string(),
                        ),
                        (
                            TEXT_FIGHT_ENDS.to_string(),
                            "The cellar falls silent at last.".to_string(),
                        ),
                    ]),
                    treasure: vec!["gold_pouch".to_string()],
                    doors: vec![
                        DoorDef {
                            to: "stout_meal_inn".to_string(),
                            locked: false,
                            requires_quest: false,
                            requires_clear: false,
                            puzzle: None,
                        },
                        DoorDef {
                            to: "storage_vault".to_string(),
                            locked: true,
                            requires_quest: false,
                            requires_clear: false,
                            puzzle: Some("stuck_door".to_string()),
                        },
                    ],
                    puzzles: vec![],
                },
                RoomDef {
                    id: "storage_vault".to_string(),
                    name: "Storage Vault".to_string(),
                    visibility: false,
                    text: BTreeMap::from([
                        (
                            TEXT_NO_VISIBILITY.to_string(),
                            "Cold air and total darkness.".to_string(),
                        ),
                        (
                            TEXT_DESCRIPTION.to_string(),
                            "Shelves of dusty crates, and a scatter of old bones.".to_string(),
                        ),
                    ]),
                    treasure: vec!["silver_locket".to_string()],
                    doors: vec![DoorDef {
                        to: "inns_cellar".to_string(),
                        locked: true,
                        requires_quest: false,
                        requires_clear: false,
                        puzzle: Some("stuck_door".to_string()),
                    }],
                    puzzles: vec![],
                },
            ],
            puzzles: vec![PuzzleDef {
                id: "stuck_door".to_string(),
                name: "stuck iron door".to_string(),
                solutions: BTreeMap::from([
                    (
                        "str".to_string(),
                        PuzzleSolution {
                            ability: Some("str".to_string()),
                            dc: 12,
                            ..Default::default()
                        },
                    ),
                    (
                        "attack".to_string(),
                        PuzzleSolution {
                            intent: Some("attack".to_string()),
                            dc: 0,
                            ac: Some(5),
                            hp: Some(10),
                            ..Default::default()
                        },
                    ),
                ]),
            }],
            monsters: vec![
                MonsterDef {
                    id: "giant_rat_1".to_string(),
                    template: "giant_rat".to_string(),
                    room: "inns_cellar".to_string(),
                    behaviors: vec![BehaviorDef::AttackOfOpportunity],
                },
                MonsterDef {
                    id: "giant_rat_2".to_string(),
                    template: "giant_rat".to_string(),
                    room: "inns_cellar".to_string(),
                    behaviors: vec![BehaviorDef::AttackOfOpportunity],
                },
                MonsterDef {
                    id: "skeleton_1".to_string(),
                    template: "skeleton".to_string(),
                    room: "storage_vault".to_string(),
                    behaviors: vec![BehaviorDef::RelocateWhenClear {
                        watch_room: "inns_cellar".to_string(),
                        watch_template: "giant_rat".to_string(),
                        destination: "inns_cellar".to_string(),
                        narration: "Something bony drags itself up through a hole in the vault \
                                    wall."
                            .to_string(),
                    }],
                },
            ],
            npcs: vec![NpcDef {
                id: "corvus".to_string(),
                name: "Corvus".to_string(),
                room: "stout_meal_inn".to_string(),
                attack_ends_game: true,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_adventure_builds() {
        let state = AdventureDef::sample().build().unwrap();
        assert_eq!(state.player_room(), "stout_meal_inn");
        assert_eq!(state.registry.monsters().count(), 3);
        assert!(state.world.room("inns_cellar").is_some());
        assert!(state
            .world
            .door("inns_cellar", "storage_vault")
            .unwrap()
            .locked);
        // Content triggers are registered and armed.
        assert!(state.can_trigger("stout_meal_inn", "quest"));
        assert!(state.can_trigger("inns_cellar", "enter"));
        assert!(state.can_trigger("skeleton_1", "relocate_when_clear"));
    }

    #[test]
    fn test_sample_round_trips_through_json() {
        let json = serde_json::to_string(&AdventureDef::sample()).unwrap();
        let parsed = AdventureDef::from_json(&json).unwrap();
        assert_eq!(parsed.name, "The Stout Meal Inn");
        parsed.build().unwrap();
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let json = r#"{
            "name": "x",
            "player": {
                "name": "Ros", "start_room": "a", "scores": [10,10,10,10,10,10],
                "hp_max": 10, "armor_class": 10, "hit_dice": "d8"
            },
            "rooms": [{"id": "a", "name": "A"}]
        }"#;
        assert!(matches!(
            AdventureDef::from_json(json),
            Err(AdventureError::Format(_))
        ));
    }

    #[test]
    fn test_dangling_door_is_rejected() {
        let mut def = AdventureDef::sample();
        def.rooms[0].doors.push(DoorDef {
            to: "the_moon".to_string(),
            locked: false,
            requires_quest: false,
            requires_clear: false,
            puzzle: None,
        });
        assert!(matches!(
            def.build(),
            Err(AdventureError::DanglingDoor { .. })
        ));
    }

    #[test]
    fn test_unknown_template_is_rejected() {
        let mut def = AdventureDef::sample();
        def.monsters[0].template = "tarrasque".to_string();
        assert!(matches!(
            def.build(),
            Err(AdventureError::UnknownTemplate(_))
        ));
    }
}
