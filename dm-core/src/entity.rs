//! Entities: the player and every non-player combatant.
//!
//! Monsters are stamped out of catalog templates with a per-instance
//! `unique_id` (`giant_rat_1`, `giant_rat_2`); the template data is shared,
//! the instances are not. Entities are never destroyed, only marked dead.

use crate::catalog::{self, Ability};
use crate::dice::DiceSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of an entity within a session (`"player"`, `"giant_rat_1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub const PLAYER: &'static str = "player";

    pub fn player() -> Self {
        EntityId(Self::PLAYER.to_string())
    }

    pub fn is_player(&self) -> bool {
        self.0 == Self::PLAYER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Npc,
    Monster,
}

/// Ability scores. Monsters keep the default flat 10s; their combat
/// numbers come straight from the template instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        (self.get(ability) as i32 - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// An autonomous behavior attached to a monster instance, evaluated by the
/// trigger dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonsterBehavior {
    /// Free attack when the player leaves this monster's room while it lives.
    AttackOfOpportunity,

    /// Relocate to `destination` once every monster stamped from
    /// `watch_template` in `watch_room` is dead. Re-checked every turn; may
    /// never fire.
    RelocateWhenClear {
        watch_room: String,
        watch_template: String,
        destination: String,
        narration: String,
    },
}

impl MonsterBehavior {
    /// Stable name used to key the can-trigger flag in session state.
    pub fn name(&self) -> &'static str {
        match self {
            MonsterBehavior::AttackOfOpportunity => "attack_of_opportunity",
            MonsterBehavior::RelocateWhenClear { .. } => "relocate_when_clear",
        }
    }
}

/// A combatant or NPC in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,

    /// Catalog template this instance was stamped from (monsters only).
    pub template_id: Option<String>,

    pub room: String,
    pub alive: bool,

    pub hp: i32,
    pub hp_max: i32,
    pub armor_class: i32,
    pub initiative_modifier: i32,

    /// Flat attack bonus for monsters; the player's is derived from the
    /// equipped weapon and ability scores instead.
    pub attack_bonus: i32,
    /// Damage dice for monsters.
    pub damage: Option<DiceSpec>,

    pub ability_scores: AbilityScores,

    /// Equipped weapon catalog id (player).
    pub equipped_weapon: Option<String>,
    /// Owned equipment catalog ids.
    pub equipment: BTreeSet<String>,
    /// Equipment currently in use (a lit torch, for example).
    pub in_use: BTreeSet<String>,
    /// Items carried (picked-up treasure).
    pub items: Vec<String>,

    pub has_darkvision: bool,

    /// Attacking this entity ends the game immediately.
    pub attack_ends_game: bool,

    /// Autonomous behaviors (monsters only).
    pub behaviors: Vec<MonsterBehavior>,
}

impl Entity {
    /// Create the player entity.
    pub fn player(
        name: impl Into<String>,
        room: impl Into<String>,
        scores: AbilityScores,
        hp_max: i32,
        armor_class: i32,
    ) -> Self {
        Self {
            id: EntityId::player(),
            kind: EntityKind::Player,
            name: name.into(),
            template_id: None,
            room: room.into(),
            alive: true,
            hp: hp_max,
            hp_max,
            armor_class,
            initiative_modifier: scores.modifier(Ability::Dexterity),
            attack_bonus: 0,
            damage: None,
            ability_scores: scores,
            equipped_weapon: None,
            equipment: BTreeSet::new(),
            in_use: BTreeSet::new(),
            items: Vec::new(),
            has_darkvision: false,
            attack_ends_game: false,
            behaviors: Vec::new(),
        }
    }

    /// Stamp a monster instance out of a catalog template.
    pub fn monster(unique_id: impl Into<String>, template_id: &str, room: impl Into<String>) -> Option<Self> {
        let template = catalog::monster_template(template_id)?;
        Some(Self {
            id: EntityId(unique_id.into()),
            kind: EntityKind::Monster,
            name: template.name.to_string(),
            template_id: Some(template_id.to_string()),
            room: room.into(),
            alive: true,
            hp: template.hp_max,
            hp_max: template.hp_max,
            armor_class: template.armor_class,
            initiative_modifier: template.initiative_modifier,
            attack_bonus: template.attack_bonus,
            damage: Some(template.damage),
            ability_scores: AbilityScores::default(),
            equipped_weapon: None,
            equipment: BTreeSet::new(),
            in_use: BTreeSet::new(),
            items: Vec::new(),
            has_darkvision: true,
            attack_ends_game: false,
            behaviors: Vec::new(),
        })
    }

    /// Create a non-combatant NPC.
    pub fn npc(id: impl Into<String>, name: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            id: EntityId(id.into()),
            kind: EntityKind::Npc,
            name: name.into(),
            template_id: None,
            room: room.into(),
            alive: true,
            hp: 10,
            hp_max: 10,
            armor_class: 10,
            initiative_modifier: 0,
            attack_bonus: 0,
            damage: None,
            ability_scores: AbilityScores::default(),
            equipped_weapon: None,
            equipment: BTreeSet::new(),
            in_use: BTreeSet::new(),
            items: Vec::new(),
            has_darkvision: false,
            attack_ends_game: false,
            behaviors: Vec::new(),
        }
    }

    pub fn with_behavior(mut self, behavior: MonsterBehavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn with_equipment(mut self, ids: &[&str]) -> Self {
        self.equipment.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_weapon(mut self, id: &str) -> Self {
        self.equipped_weapon = Some(id.to_string());
        self
    }

    pub fn ends_game_if_attacked(mut self) -> Self {
        self.attack_ends_game = true;
        self
    }

    /// Attack bonus and damage dice for this entity's attacks.
    ///
    /// Monsters carry flat template numbers. The player's numbers come from
    /// the equipped weapon plus its governing ability modifier and a flat
    /// proficiency bonus of 2.
    pub fn attack_numbers(&self) -> (i32, DiceSpec) {
        if let Some(damage) = self.damage {
            return (self.attack_bonus, damage);
        }

        let weapon = self
            .equipped_weapon
            .as_deref()
            .and_then(catalog::weapon);
        match weapon {
            Some(weapon) => {
                let modifier = self.ability_scores.modifier(weapon.ability);
                (modifier + 2, weapon.damage.plus(modifier))
            }
            // Unarmed strike.
            None => {
                let modifier = self.ability_scores.modifier(Ability::Strength);
                (modifier + 2, DiceSpec::new(1, crate::dice::DieType::D4, modifier))
            }
        }
    }

    /// A light source is in use.
    pub fn has_light(&self) -> bool {
        self.in_use
            .iter()
            .filter_map(|id| catalog::equipment(id))
            .any(|e| e.light_source)
    }
}

/// An entity that can be the target of an attack.
pub trait Targetable {
    fn armor_class(&self) -> i32;
    fn hit_points(&self) -> i32;
    /// Apply damage; returns whether the entity is still alive.
    fn take_damage(&mut self, amount: i32) -> bool;
}

/// An entity that takes its own turn in combat.
pub trait TurnTaking {
    fn initiative_modifier(&self) -> i32;
    /// Whether the engine decides this entity's turn (everyone but the player).
    fn is_autonomous(&self) -> bool;
}

impl Targetable for Entity {
    fn armor_class(&self) -> i32 {
        self.armor_class
    }

    fn hit_points(&self) -> i32 {
        self.hp
    }

    fn take_damage(&mut self, amount: i32) -> bool {
        self.hp = (self.hp - amount).max(0);
        if self.hp == 0 {
            self.alive = false;
        }
        self.alive
    }
}

impl TurnTaking for Entity {
    fn initiative_modifier(&self) -> i32 {
        self.initiative_modifier
    }

    fn is_autonomous(&self) -> bool {
        self.kind != EntityKind::Player
    }
}

/// All entities in a session, in stable registration order.
///
/// Registration order is load-bearing: it is the documented tie-break for
/// equal initiative rolls. The player is always registered first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
}

impl EntityRegistry {
    pub fn new(player: Entity) -> Self {
        Self {
            entities: vec![player],
        }
    }

    pub fn register(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| &e.id == id)
    }

    pub fn player(&self) -> &Entity {
        &self.entities[0]
    }

    pub fn player_mut(&mut self) -> &mut Entity {
        &mut self.entities[0]
    }

    /// Entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Monster instances in registration order.
    pub fn monsters(&self) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(|e| e.kind == EntityKind::Monster)
    }

    /// Position of an entity in registration order, for initiative tie-breaks.
    pub fn registration_index(&self, id: &EntityId) -> Option<usize> {
        self.entities.iter().position(|e| &e.id == id)
    }

    /// Resolve a classifier entity value (a template id or name fragment)
    /// to a living monster in the given room.
    pub fn resolve_monster_in_room(&self, value: &str, room: &str) -> Option<&Entity> {
        let value = value.to_lowercase().replace(' ', "_");
        self.monsters().find(|m| {
            m.alive
                && m.room == room
                && (m.id.as_str() == value
                    || m.template_id.as_deref() == Some(value.as_str())
                    || m.name.replace(' ', "_") == value)
        })
    }
}
