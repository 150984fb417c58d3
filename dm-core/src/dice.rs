//! Dice rolling.
//!
//! Supports the notation the session accepts from players and content
//! files: `d20`, `2d12+2`, `d6-1`. Rolls are routed through a caller
//! supplied RNG so a seeded session is fully deterministic.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Most dice a single notation may roll at once.
pub const MAX_DICE_COUNT: u32 = 20;

/// Error type for dice parsing.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Unrecognised die size: d{0}")]
    InvalidDieSize(u32),
    #[error("Too many dice: {0} (at most {MAX_DICE_COUNT})")]
    TooManyDice(u32),
}

/// Die sizes the engine recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// A parsed dice specification: `count` dice of `die` plus `modifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSpec {
    pub count: u32,
    pub die: DieType,
    pub modifier: i32,
}

impl DiceSpec {
    pub fn new(count: u32, die: DieType, modifier: i32) -> Self {
        Self {
            count,
            die,
            modifier,
        }
    }

    /// A single unmodified die.
    pub fn single(die: DieType) -> Self {
        Self::new(1, die, 0)
    }

    /// Parse a notation string such as `d20`, `2d12+2` or `d6-1`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        let d = notation
            .find('d')
            .ok_or_else(|| DiceError::InvalidNotation(notation.clone()))?;

        let count: u32 = if notation[..d].is_empty() {
            1
        } else {
            notation[..d]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?
        };

        let rest = &notation[d + 1..];
        let split = rest.find(['+', '-']);
        let (sides_str, modifier) = match split {
            Some(pos) => {
                let modifier: i32 = rest[pos..]
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
                (&rest[..pos], modifier)
            }
            None => (rest, 0),
        };

        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
        let die = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

        if count == 0 {
            return Err(DiceError::InvalidNotation(notation));
        }
        if count > MAX_DICE_COUNT {
            return Err(DiceError::TooManyDice(count));
        }

        Ok(Self {
            count,
            die,
            modifier,
        })
    }

    /// Validate a notation string without rolling it.
    pub fn check(notation: &str) -> Result<(), DiceError> {
        Self::parse(notation).map(|_| ())
    }

    /// Add to the modifier, keeping the same dice.
    pub fn plus(mut self, modifier: i32) -> Self {
        self.modifier += modifier;
        self
    }

    /// Roll with the supplied RNG.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> RollOutcome {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.die.sides()))
            .collect();
        let total = rolls.iter().sum::<u32>() as i32 + self.modifier;

        RollOutcome {
            spec: *self,
            rolls,
            total,
        }
    }

    /// The highest total this spec can produce.
    pub fn max(&self) -> i32 {
        (self.count * self.die.sides()) as i32 + self.modifier
    }

    /// The lowest total this spec can produce.
    pub fn min(&self) -> i32 {
        self.count as i32 + self.modifier
    }
}

impl FromStr for DiceSpec {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceSpec::parse(s)
    }
}

impl fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count != 1 {
            write!(f, "{}", self.count)?;
        }
        write!(f, "{}", self.die)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Result of rolling a [`DiceSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollOutcome {
    pub spec: DiceSpec,
    pub rolls: Vec<u32>,
    pub total: i32,
}

impl RollOutcome {
    /// Check if the roll meets or exceeds a difficulty class.
    pub fn meets_dc(&self, dc: i32) -> bool {
        self.total >= dc
    }
}

impl fmt::Display for RollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rolling {}... {}", self.spec, self.total)
    }
}
