//! Dice rolling.
//!
//! Supports static values ("5") and `NdM[+K|-K]` notation ("2d6+1", "d20").
//! Randomness is injected through [`DiceRoller`] so combat can be replayed
//! deterministically in tests.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on dice in one expression.
const MAX_DICE: u32 = 1000;

/// Error type for dice parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Too many dice: {0} (at most 1000)")]
    TooManyDice(u32),
}

/// Source of uniformly distributed integers.
pub trait DiceRoller: Send + Sync {
    /// Draw an integer in `min..=max`.
    fn roll(&self, min: i32, max: i32) -> i32;
}

/// Production roller backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRoller;

impl DiceRoller for RandomRoller {
    fn roll(&self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }
}

/// How damage dice are rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollMode {
    #[default]
    Normal,
    /// Every die is rolled twice; the flat modifier is applied once.
    Critical,
}

/// A parsed dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiceExpression {
    /// A plain number, returned as-is.
    Static(i32),
    /// `count` dice with `sides` faces plus a flat modifier.
    Dice { count: u32, sides: u32, modifier: i32 },
}

impl DiceExpression {
    /// Parse a notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let compact: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if compact.is_empty() {
            return Err(DiceError::NoDice);
        }

        let Some(d_pos) = compact.find('d') else {
            return compact
                .parse::<i32>()
                .map(DiceExpression::Static)
                .map_err(|_| DiceError::InvalidNotation(notation.to_string()));
        };

        let invalid = || DiceError::InvalidNotation(notation.to_string());

        let count_str = &compact[..d_pos];
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| invalid())?
        };

        let rest = &compact[d_pos + 1..];
        let (sides_str, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let value: i32 = rest[pos + 1..].parse().map_err(|_| invalid())?;
                let signed = if rest.as_bytes()[pos] == b'+' {
                    value
                } else {
                    value.checked_neg().ok_or_else(invalid)?
                };
                (&rest[..pos], signed)
            }
            None => (rest, 0),
        };

        let sides: u32 = sides_str.parse().map_err(|_| invalid())?;
        if count == 0 {
            return Err(DiceError::NoDice);
        }
        if count > MAX_DICE {
            return Err(DiceError::TooManyDice(count));
        }
        if sides == 0 || sides > i32::MAX as u32 {
            return Err(DiceError::InvalidDieSize(sides));
        }

        Ok(DiceExpression::Dice {
            count,
            sides,
            modifier,
        })
    }

    /// Roll the expression.
    ///
    /// Dice results are floored at 1; static values are returned unchanged.
    pub fn roll_with(&self, roller: &dyn DiceRoller, mode: RollMode) -> i32 {
        match *self {
            DiceExpression::Static(value) => value,
            DiceExpression::Dice {
                count,
                sides,
                modifier,
            } => {
                let rolled = match mode {
                    RollMode::Normal => count,
                    RollMode::Critical => count * 2,
                };
                let faces = i32::try_from(sides).unwrap_or(i32::MAX);
                let dice_total = (0..rolled)
                    .map(|_| roller.roll(1, faces))
                    .fold(0i32, i32::saturating_add);
                dice_total.saturating_add(modifier).max(1)
            }
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DiceExpression::Static(value) => write!(f, "{value}"),
            DiceExpression::Dice {
                count,
                sides,
                modifier,
            } => {
                write!(f, "{count}d{sides}")?;
                match modifier {
                    0 => Ok(()),
                    m if m > 0 => write!(f, "+{m}"),
                    m => write!(f, "{m}"),
                }
            }
        }
    }
}

/// Roll a notation string, falling back to 1 on malformed input.
///
/// Content data (weapon damage strings and the like) is not trusted, so a bad
/// expression is logged and never surfaces as an error.
pub fn roll_dice(expression: &str, roller: &dyn DiceRoller) -> i32 {
    roll_dice_with_mode(expression, roller, RollMode::Normal)
}

/// [`roll_dice`] with an explicit [`RollMode`].
pub fn roll_dice_with_mode(expression: &str, roller: &dyn DiceRoller, mode: RollMode) -> i32 {
    match DiceExpression::parse(expression) {
        Ok(expr) => expr.roll_with(roller, mode),
        Err(e) => {
            tracing::warn!(expression, error = %e, "dice roll failed, using 1");
            1
        }
    }
}
