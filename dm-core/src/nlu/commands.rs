//! Slash commands, handled before classification. They never consume a
//! game turn.

use crate::nlg::OutputBuilder;
use crate::state::SessionState;

/// What the session loop should do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Handled,
    Exit,
}

type CommandFn = fn(&SessionState, &mut OutputBuilder) -> CommandOutcome;

struct Command {
    name: &'static str,
    summary: &'static str,
    run: CommandFn,
}

static COMMANDS: &[Command] = &[
    Command {
        name: "help",
        summary: "list available commands",
        run: help,
    },
    Command {
        name: "stats",
        summary: "show your character sheet",
        run: stats,
    },
    Command {
        name: "exit",
        summary: "leave the game",
        run: exit,
    },
];

/// Dispatch a raw input line if it is a slash command. Returns `None` for
/// ordinary utterances.
pub fn dispatch(
    input: &str,
    state: &SessionState,
    out: &mut OutputBuilder,
) -> Option<CommandOutcome> {
    let name = input.trim().strip_prefix('/')?;
    match COMMANDS.iter().find(|c| c.name == name) {
        Some(command) => Some((command.run)(state, out)),
        None => {
            out.append(format!("Unknown command: /{name}. Try /help."));
            Some(CommandOutcome::Handled)
        }
    }
}

fn help(_state: &SessionState, out: &mut OutputBuilder) -> CommandOutcome {
    for command in COMMANDS {
        out.append(format!("/{} - {}", command.name, command.summary));
    }
    CommandOutcome::Handled
}

fn stats(state: &SessionState, out: &mut OutputBuilder) -> CommandOutcome {
    let player = state.registry.player();
    out.append(format!("{}", player.name));
    out.append(format!(
        "HP {}/{}  AC {}",
        player.hp, player.hp_max, player.armor_class
    ));
    let s = &player.ability_scores;
    out.append(format!(
        "STR {} DEX {} CON {} INT {} WIS {} CHA {}",
        s.strength, s.dexterity, s.constitution, s.intelligence, s.wisdom, s.charisma
    ));
    if let Some(weapon) = &player.equipped_weapon {
        out.append(format!("Wielding: {weapon}"));
    }
    if !player.items.is_empty() {
        out.append(format!("Carrying: {}", player.items.join(", ")));
    }
    CommandOutcome::Handled
}

fn exit(_state: &SessionState, out: &mut OutputBuilder) -> CommandOutcome {
    out.append("Farewell, adventurer.");
    CommandOutcome::Exit
}
