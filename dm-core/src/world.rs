//! The world graph: rooms, the doors between them, and puzzles.
//!
//! Connection lock state, treasure and trigger text are mutable for the
//! lifetime of the session and serialize with the rest of the snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Text types a room can carry. `Enter`, `Visibility` and `FightEnds` are
/// triggerable; the rest are plain descriptions.
pub const TEXT_DESCRIPTION: &str = "description";
pub const TEXT_NO_VISIBILITY: &str = "no_visibility_description";
pub const TEXT_ENTER: &str = "enter";
pub const TEXT_VISIBILITY: &str = "visibility";
pub const TEXT_FIGHT_ENDS: &str = "fight_ends";
pub const TEXT_QUEST_OFFER: &str = "quest_offer";
pub const TEXT_QUEST_ACCEPT: &str = "quest_accept";

/// A directed connection from one room to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Door {
    pub to: String,

    /// A locked door refuses travel until its puzzle is solved or it is
    /// forced open.
    #[serde(default)]
    pub locked: bool,

    /// Travel requires the adventure quest to have been accepted.
    #[serde(default)]
    pub requires_quest: bool,

    /// Travel requires every hostile in the current room to be dead.
    #[serde(default)]
    pub requires_clear: bool,

    /// Puzzle guarding this door, if any.
    #[serde(default)]
    pub puzzle: Option<String>,
}

impl Door {
    pub fn open(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            locked: false,
            requires_quest: false,
            requires_clear: false,
            puzzle: None,
        }
    }

    pub fn locked(to: impl Into<String>, puzzle: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            locked: true,
            requires_quest: false,
            requires_clear: false,
            puzzle: Some(puzzle.into()),
        }
    }

    pub fn quest_gated(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            locked: false,
            requires_quest: true,
            requires_clear: false,
            puzzle: None,
        }
    }
}

/// A room in the adventure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,

    /// Whether the room is inherently lit. Unlit rooms show only their
    /// minimal description until the player carries a light source.
    pub visibility: bool,

    /// Text keyed by type (`description`, `enter`, `fight_ends`, ...).
    pub text: BTreeMap<String, String>,

    /// Items lying in the room, removed as the player takes them.
    pub treasure: BTreeSet<String>,

    /// Outgoing connections keyed by destination room id.
    pub connections: BTreeMap<String, Door>,

    /// Puzzles attached to the room itself (not its doors).
    pub puzzles: Vec<String>,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            visibility: true,
            text: BTreeMap::new(),
            treasure: BTreeSet::new(),
            connections: BTreeMap::new(),
            puzzles: Vec::new(),
        }
    }

    pub fn with_text(mut self, text_type: &str, text: impl Into<String>) -> Self {
        self.text.insert(text_type.to_string(), text.into());
        self
    }

    pub fn with_door(mut self, door: Door) -> Self {
        self.connections.insert(door.to.clone(), door);
        self
    }

    pub fn with_treasure(mut self, items: &[&str]) -> Self {
        self.treasure.extend(items.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_puzzle(mut self, puzzle_id: impl Into<String>) -> Self {
        self.puzzles.push(puzzle_id.into());
        self
    }

    pub fn unlit(mut self) -> Self {
        self.visibility = false;
        self
    }

    pub fn text(&self, text_type: &str) -> Option<&str> {
        self.text.get(text_type).map(String::as_str)
    }

    pub fn connected_rooms(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.treasure.contains(item)
    }

    pub fn took_item(&mut self, item: &str) -> bool {
        self.treasure.remove(item)
    }
}

/// One keyed solution to a puzzle: a predicate over an ability, skill,
/// item, equipment, intent or spell id, with a difficulty class. The
/// `attack` solution path additionally exposes armor class and hit points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleSolution {
    #[serde(default)]
    pub ability: Option<String>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub spell: Option<String>,

    pub dc: i32,

    /// Door armor class, for the force/attack solution path.
    #[serde(default)]
    pub ac: Option<i32>,
    /// Door hit points, for the force/attack solution path.
    #[serde(default)]
    pub hp: Option<i32>,
}

/// A puzzle attached to a room or to a door between rooms. Once `solved`
/// is true the puzzle is permanently bypassed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    pub name: String,
    pub solutions: BTreeMap<String, PuzzleSolution>,
    pub solved: bool,
    pub triggered: bool,

    /// Damage dealt so far along the attack solution path.
    #[serde(default)]
    pub damage_taken: i32,
}

impl Puzzle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            solutions: BTreeMap::new(),
            solved: false,
            triggered: false,
            damage_taken: 0,
        }
    }

    pub fn with_solution(mut self, key: &str, solution: PuzzleSolution) -> Self {
        self.solutions.insert(key.to_string(), solution);
        self
    }

    pub fn solve(&mut self) {
        self.solved = true;
    }

    /// Mark the puzzle as engaged. Returns true the first time only.
    pub fn trigger(&mut self) -> bool {
        let first = !self.triggered;
        self.triggered = true;
        first
    }

    /// Find the solution keyed to a given ability id, returning its key
    /// and difficulty class.
    pub fn solution_for_ability(&self, ability: &str) -> Option<(&str, i32)> {
        self.solutions
            .iter()
            .find(|(_, s)| s.ability.as_deref() == Some(ability))
            .map(|(key, s)| (key.as_str(), s.dc))
    }

    /// Armor class of the puzzle, if it has an attack solution path.
    pub fn armor_class(&self) -> Option<i32> {
        self.solutions.get("attack").and_then(|s| s.ac)
    }

    /// Hit points of the puzzle, if it has an attack solution path.
    pub fn hit_points(&self) -> Option<i32> {
        self.solutions.get("attack").and_then(|s| s.hp)
    }

    /// Accumulate damage on the attack solution path. Returns true once
    /// the accumulated damage destroys the object.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.damage_taken += amount;
        matches!(self.hit_points(), Some(hp) if self.damage_taken >= hp)
    }
}

/// All rooms and puzzles in the adventure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldGraph {
    pub rooms: BTreeMap<String, Room>,
    pub puzzles: BTreeMap<String, Puzzle>,
}

impl WorldGraph {
    pub fn add_room(&mut self, room: Room) {
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn add_puzzle(&mut self, puzzle: Puzzle) {
        self.puzzles.insert(puzzle.id.clone(), puzzle);
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub fn puzzle(&self, id: &str) -> Option<&Puzzle> {
        self.puzzles.get(id)
    }

    pub fn puzzle_mut(&mut self, id: &str) -> Option<&mut Puzzle> {
        self.puzzles.get_mut(id)
    }

    pub fn door(&self, from: &str, to: &str) -> Option<&Door> {
        self.rooms.get(from).and_then(|r| r.connections.get(to))
    }

    /// Unlock the door between two rooms, in both directions where present.
    pub fn unlock_door(&mut self, from: &str, to: &str) {
        if let Some(door) = self
            .rooms
            .get_mut(from)
            .and_then(|r| r.connections.get_mut(to))
        {
            door.locked = false;
        }
        if let Some(door) = self
            .rooms
            .get_mut(to)
            .and_then(|r| r.connections.get_mut(from))
        {
            door.locked = false;
        }
    }

    /// Puzzle ids guarding doors out of a room.
    pub fn door_puzzles(&self, room_id: &str) -> Vec<&str> {
        self.rooms
            .get(room_id)
            .map(|r| {
                r.connections
                    .values()
                    .filter_map(|d| d.puzzle.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}
