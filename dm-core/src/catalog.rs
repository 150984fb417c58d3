//! Read-only reference data: abilities, skills, weapons, equipment and
//! monster templates.
//!
//! Loaded once into process-wide tables and shared by reference. Session
//! state never copies any of this; entities refer to catalog ids.

use crate::dice::{DiceSpec, DieType};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The six abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn id(&self) -> &'static str {
        match self {
            Ability::Strength => "str",
            Ability::Dexterity => "dex",
            Ability::Constitution => "con",
            Ability::Intelligence => "int",
            Ability::Wisdom => "wis",
            Ability::Charisma => "cha",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Match a classifier entity value (`"strength"`, `"str"`) to an ability.
    pub fn from_value(value: &str) -> Option<Ability> {
        let value = value.to_lowercase();
        Ability::all()
            .into_iter()
            .find(|a| a.id() == value || a.name().to_lowercase() == value)
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Skills, each tied to a governing ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Acrobatics,
    Stealth,
    Investigation,
    Perception,
    Survival,
    Persuasion,
    Intimidation,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::Stealth => Ability::Dexterity,
            Skill::Investigation => Ability::Intelligence,
            Skill::Perception | Skill::Survival => Ability::Wisdom,
            Skill::Persuasion | Skill::Intimidation => Ability::Charisma,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Acrobatics => "Acrobatics",
            Skill::Stealth => "Stealth",
            Skill::Investigation => "Investigation",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Persuasion => "Persuasion",
            Skill::Intimidation => "Intimidation",
        }
    }

    pub fn all() -> [Skill; 8] {
        [
            Skill::Athletics,
            Skill::Acrobatics,
            Skill::Stealth,
            Skill::Investigation,
            Skill::Perception,
            Skill::Survival,
            Skill::Persuasion,
            Skill::Intimidation,
        ]
    }

    /// Match a classifier entity value to a skill.
    pub fn from_value(value: &str) -> Option<Skill> {
        let value = value.to_lowercase();
        Skill::all()
            .into_iter()
            .find(|s| s.name().to_lowercase() == value)
    }
}

/// A weapon definition.
#[derive(Debug, Clone)]
pub struct WeaponSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub damage: DiceSpec,
    /// Ability whose modifier applies to attack and damage rolls.
    pub ability: Ability,
}

/// A piece of non-weapon equipment.
#[derive(Debug, Clone)]
pub struct EquipmentSpec {
    pub id: &'static str,
    pub name: &'static str,
    /// Using this equipment provides light.
    pub light_source: bool,
}

/// A monster template. Instances are stamped out of these at adventure
/// load with a per-instance unique id.
#[derive(Debug, Clone)]
pub struct MonsterTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub hp_max: i32,
    pub armor_class: i32,
    pub initiative_modifier: i32,
    pub attack_bonus: i32,
    pub damage: DiceSpec,
}

lazy_static! {
    static ref WEAPONS: HashMap<&'static str, WeaponSpec> = {
        let mut m = HashMap::new();
        for weapon in [
            WeaponSpec {
                id: "shortsword",
                name: "shortsword",
                damage: DiceSpec::single(DieType::D6),
                ability: Ability::Dexterity,
            },
            WeaponSpec {
                id: "mace",
                name: "mace",
                damage: DiceSpec::single(DieType::D6),
                ability: Ability::Strength,
            },
            WeaponSpec {
                id: "greataxe",
                name: "greataxe",
                damage: DiceSpec::single(DieType::D12),
                ability: Ability::Strength,
            },
            WeaponSpec {
                id: "light_crossbow",
                name: "light crossbow",
                damage: DiceSpec::single(DieType::D8),
                ability: Ability::Dexterity,
            },
        ] {
            m.insert(weapon.id, weapon);
        }
        m
    };
    static ref EQUIPMENT: HashMap<&'static str, EquipmentSpec> = {
        let mut m = HashMap::new();
        for equipment in [
            EquipmentSpec {
                id: "torch",
                name: "torch",
                light_source: true,
            },
            EquipmentSpec {
                id: "rope",
                name: "hempen rope",
                light_source: false,
            },
            EquipmentSpec {
                id: "waterskin",
                name: "waterskin",
                light_source: false,
            },
        ] {
            m.insert(equipment.id, equipment);
        }
        m
    };
    static ref MONSTERS: HashMap<&'static str, MonsterTemplate> = {
        let mut m = HashMap::new();
        for template in [
            MonsterTemplate {
                id: "giant_rat",
                name: "giant rat",
                hp_max: 7,
                armor_class: 12,
                initiative_modifier: 2,
                attack_bonus: 4,
                damage: DiceSpec::new(1, DieType::D4, 2),
            },
            MonsterTemplate {
                id: "skeleton",
                name: "skeleton",
                hp_max: 13,
                armor_class: 13,
                initiative_modifier: 2,
                attack_bonus: 4,
                damage: DiceSpec::new(1, DieType::D6, 2),
            },
        ] {
            m.insert(template.id, template);
        }
        m
    };
}

/// Look up a weapon by catalog id.
pub fn weapon(id: &str) -> Option<&'static WeaponSpec> {
    WEAPONS.get(id)
}

/// Look up equipment by catalog id.
pub fn equipment(id: &str) -> Option<&'static EquipmentSpec> {
    EQUIPMENT.get(id)
}

/// Look up a monster template by catalog id.
pub fn monster_template(id: &str) -> Option<&'static MonsterTemplate> {
    MONSTERS.get(id)
}
