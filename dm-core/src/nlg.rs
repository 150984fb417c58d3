//! Narration strings and the per-turn output accumulator.
//!
//! Prose quality is not the point here; these are small pure functions so
//! the rest of the engine never formats user-facing text inline.

use crate::nlu::Intent;

/// Accumulates newline-delimited narration for one turn.
#[derive(Debug, Default, Clone)]
pub struct OutputBuilder {
    lines: Vec<String>,
}

impl OutputBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, line: impl Into<String>) {
        let line = line.into();
        if !line.is_empty() {
            self.lines.push(line);
        }
    }

    pub fn has_response(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn format(&self) -> String {
        self.lines.join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Join a list with commas and a final delimiter: `a, b or c`.
pub fn format_list(items: &[String], last_delimiter: &str) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].clone(),
        _ => format!(
            "{}{}{}",
            items[..items.len() - 1].join(", "),
            last_delimiter,
            items[items.len() - 1]
        ),
    }
}

pub fn clarify_expected(expected: &[Intent]) -> String {
    let options: Vec<String> = expected
        .iter()
        .map(|i| i.description().to_string())
        .collect();
    format!("I was expecting you to {}.", format_list(&options, " or "))
}

pub fn cannot_move(destination: &str, reason: &str) -> String {
    match reason {
        "same" => "You're already there.".to_string(),
        "locked" => format!("The way to the {destination} is locked."),
        "not connected" => format!("You can't get to the {destination} from here."),
        "no visibility" => "It's too dark to find the way out.".to_string(),
        "no quest" => "You've got no reason to go there yet.".to_string(),
        "must kill" => "You can't leave with enemies still standing.".to_string(),
        "unknown destination" => format!("You've never heard of a place called {destination}."),
        "unknown entity" => "Nobody by that name can move.".to_string(),
        _ => format!("You can't go to the {destination}."),
    }
}

pub fn cannot_use(equipment: &str, reason: &str) -> String {
    match reason {
        "unknown" => format!("You don't know what a {equipment} is."),
        "not owned" => format!("You don't have a {equipment}."),
        "already" => format!("You're already using the {equipment}."),
        "not using" => format!("You're not using the {equipment}."),
        _ => format!("You can't use the {equipment}."),
    }
}

pub fn cannot_attack(target: &str, reason: &str) -> String {
    match reason {
        "not here" => format!("There's no {target} here to attack."),
        _ => format!("You can't attack the {target}."),
    }
}

pub fn using(equipment_name: &str) -> String {
    format!("You start using the {equipment_name}.")
}

pub fn stopped_using(equipment_name: &str) -> String {
    format!("You put away the {equipment_name}.")
}

pub fn no_ability_check(ability_name: &str) -> String {
    format!("There's nothing here that calls for a {ability_name} check.")
}

pub fn who_to_attack() -> String {
    "Who do you want to attack?".to_string()
}

pub fn where_to_go() -> String {
    "Where do you want to go?".to_string()
}

pub fn what_to_use() -> String {
    "What do you want to use?".to_string()
}

pub fn what_to_pick_up() -> String {
    "What do you want to pick up?".to_string()
}

pub fn which_ability() -> String {
    "Which ability do you want to test?".to_string()
}

pub fn quest_accepted() -> String {
    "It's settled, then.".to_string()
}

pub fn quest_declined() -> String {
    "Maybe another time, then.".to_string()
}

pub fn cannot_pick_up(item: &str, reason: &str) -> String {
    match reason {
        "unknown" => format!("You don't see a {item} anywhere."),
        "not here" => format!("There's no {item} here."),
        "must kill" => "Deal with the monsters before rummaging for loot.".to_string(),
        _ => format!("You can't pick up the {item}."),
    }
}

pub fn roll_initiative() -> String {
    "Let's fight! Roll for initiative.".to_string()
}

pub fn initiative_roll(name: &str, total: i32) -> String {
    if name == "you" {
        format!("You roll {total} for initiative.")
    } else {
        format!("The {name} rolls {total} for initiative.")
    }
}

pub fn initiative_order(names: &[String]) -> String {
    format!("Turn order: {}.", format_list(names, ", then "))
}

pub fn bad_dice(notation: &str) -> String {
    format!("I don't recognise {notation} as dice you could roll.")
}

pub fn entity_turn(name: &str) -> String {
    if name == "you" {
        "It's your turn.".to_string()
    } else {
        format!("It's the {name}'s turn.")
    }
}

pub fn declare_attack() -> String {
    "Declare your target.".to_string()
}

pub fn perform_attack_roll() -> String {
    "Roll your attack.".to_string()
}

pub fn perform_damage_roll() -> String {
    "A hit! Roll your damage.".to_string()
}

pub fn attack_missed(target_name: &str) -> String {
    format!("Your attack glances off the {target_name}.")
}

pub fn entity_killed(target_name: &str) -> String {
    format!("The {target_name} collapses, dead.")
}

pub fn fight_over() -> String {
    "The fight is over.".to_string()
}

pub fn monster_hits(name: &str, damage: i32) -> String {
    format!("The {name} hits you for {damage} damage!")
}

pub fn monster_misses(name: &str) -> String {
    format!("The {name} lunges at you and misses.")
}

pub fn monster_passes(name: &str) -> String {
    format!("The {name} circles you warily.")
}

pub fn attack_of_opportunity(name: &str) -> String {
    format!("The {name} snaps at you as you flee!")
}

pub fn attack_npc_ends_game(name: &str) -> String {
    format!("You raise your weapon against {name}. The adventure ends here, in disgrace.")
}

pub fn player_died() -> String {
    "Everything goes dark. Your adventure is over.".to_string()
}

pub fn game_over() -> String {
    "Game over.".to_string()
}

pub fn health_report(hp: i32, hp_max: i32) -> String {
    format!("You have {hp} of {hp_max} hit points.")
}

pub fn suggest_move(utterance: &str) -> String {
    format!("{utterance} Say yes if you'd like to.")
}

pub fn no_intent() -> String {
    "I didn't catch that. What do you do?".to_string()
}

pub fn ability_check_prompt(ability_name: &str) -> String {
    format!("Make a {ability_name} check: roll a d20.")
}

pub fn ability_check_success(puzzle_name: &str) -> String {
    format!("Success! The {puzzle_name} gives way.")
}

pub fn ability_check_failure(puzzle_name: &str) -> String {
    format!("The {puzzle_name} doesn't budge.")
}

pub fn picked_up(item: &str) -> String {
    format!("You pick up the {item}.")
}

pub fn size_up(name: &str) -> String {
    format!("You size up the {name}.")
}

pub fn object_holds(name: &str) -> String {
    format!("The {name} shudders but holds.")
}

pub fn object_destroyed(name: &str) -> String {
    format!("The {name} splinters apart!")
}
