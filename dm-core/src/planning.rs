//! Turn planning for autonomous combatants.
//!
//! The combat engine hands a [`PlanningProblem`] to a [`Planner`] and gets
//! back a single action for the acting monster. Plans travel as flat
//! whitespace-delimited tokens so an external planning service can be
//! swapped in behind the same trait; [`InstinctPlanner`] is the built-in
//! fallback that always works.

use crate::entity::EntityId;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Empty plan")]
    Empty,
    #[error("Unrecognised plan operator: {0}")]
    UnknownOperator(String),
    #[error("Malformed plan step: {0}")]
    Malformed(String),
}

/// One planned step for one combatant.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAction {
    /// `declare_attack_against_entity <actor> <target> <room>`
    DeclareAttack {
        actor: EntityId,
        target: EntityId,
        room: String,
    },
    /// `pass <actor>`
    Pass { actor: EntityId },
}

impl PlannedAction {
    pub fn actor(&self) -> &EntityId {
        match self {
            PlannedAction::DeclareAttack { actor, .. } => actor,
            PlannedAction::Pass { actor } => actor,
        }
    }

    /// Parse the token form produced by [`fmt::Display`].
    pub fn parse(step: &str) -> Result<Self, PlanError> {
        let tokens: Vec<&str> = step.split_whitespace().collect();
        match tokens.as_slice() {
            [] => Err(PlanError::Empty),
            ["declare_attack_against_entity", actor, target, room] => {
                Ok(PlannedAction::DeclareAttack {
                    actor: EntityId::from(*actor),
                    target: EntityId::from(*target),
                    room: room.to_string(),
                })
            }
            ["pass", actor] => Ok(PlannedAction::Pass {
                actor: EntityId::from(*actor),
            }),
            ["declare_attack_against_entity", ..] | ["pass", ..] => {
                Err(PlanError::Malformed(step.to_string()))
            }
            [operator, ..] => Err(PlanError::UnknownOperator(operator.to_string())),
        }
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedAction::DeclareAttack {
                actor,
                target,
                room,
            } => write!(f, "declare_attack_against_entity {actor} {target} {room}"),
            PlannedAction::Pass { actor } => write!(f, "pass {actor}"),
        }
    }
}

/// What the acting monster can see when its turn comes up.
#[derive(Debug, Clone)]
pub struct PlanningProblem {
    pub actor: EntityId,
    pub room: String,
    /// Living hostile targets in the same room, player first.
    pub targets: Vec<EntityId>,
}

/// Decides an autonomous combatant's turn.
#[async_trait]
pub trait Planner: Send {
    async fn plan(&mut self, problem: &PlanningProblem) -> PlannedAction;
}

/// Built-in planner: attack the first available target, otherwise pass.
#[derive(Debug, Default)]
pub struct InstinctPlanner;

#[async_trait]
impl Planner for InstinctPlanner {
    async fn plan(&mut self, problem: &PlanningProblem) -> PlannedAction {
        match problem.targets.first() {
            Some(target) => PlannedAction::DeclareAttack {
                actor: problem.actor.clone(),
                target: target.clone(),
                room: problem.room.clone(),
            },
            None => PlannedAction::Pass {
                actor: problem.actor.clone(),
            },
        }
    }
}
