//! Dice notation and rolling.
//!
//! Supports `XdY+Z` expressions with any number of dice groups and flat
//! modifiers. Every roll takes an explicit RNG so combat can be replayed in
//! tests.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

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
    TooManyDice(u64),
    #[error("Modifier out of range in {0}")]
    ModifierOverflow(String),
}

/// Most dice a single expression may roll.
pub const MAX_DICE: u32 = 1000;

/// Standard polyhedral die types.
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

    /// Roll a single die of this type.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(1..=self.sides())
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

impl FromStr for DieType {
    type Err = DiceError;

    /// Accepts `d10`, `D10` or a bare `10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches(['d', 'D']);
        let sides: u32 = trimmed
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))
    }
}

/// One `XdY` group inside an expression. A negative sign subtracts the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceGroup {
    pub count: u32,
    pub die_type: DieType,
    pub negative: bool,
}

/// A parsed dice expression such as `2d6+1d4-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub groups: Vec<DiceGroup>,
    pub modifier: i32,
    pub original: String,
}

impl DiceExpression {
    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut groups = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut negative = false;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_term(&current, negative, &mut groups, &mut modifier)?;
                        current.clear();
                    }
                    negative = ch == '-';
                }
                ' ' => continue,
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            Self::parse_term(&current, negative, &mut groups, &mut modifier)?;
        }

        if groups.is_empty() && modifier == 0 {
            return Err(DiceError::NoDice);
        }

        Ok(DiceExpression {
            groups,
            modifier,
            original: notation,
        })
    }

    fn parse_term(
        term: &str,
        negative: bool,
        groups: &mut Vec<DiceGroup>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        match term.split_once('d') {
            Some((count, sides)) => {
                let count: u32 = if count.is_empty() {
                    1
                } else {
                    count
                        .parse()
                        .map_err(|_| DiceError::InvalidNotation(term.to_string()))?
                };
                let sides: u32 = sides
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(term.to_string()))?;
                let die_type = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;
                let total = groups.iter().map(|g| u64::from(g.count)).sum::<u64>()
                    + u64::from(count);
                if total > u64::from(MAX_DICE) {
                    return Err(DiceError::TooManyDice(total));
                }
                groups.push(DiceGroup {
                    count,
                    die_type,
                    negative,
                });
            }
            None => {
                let value: i32 = term
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(term.to_string()))?;
                let signed = if negative { -value } else { value };
                *modifier = modifier
                    .checked_add(signed)
                    .ok_or_else(|| DiceError::ModifierOverflow(term.to_string()))?;
            }
        }
        Ok(())
    }

    /// Roll the expression with the thread-local RNG.
    pub fn roll(&self) -> RollResult {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll with a specific RNG.
    pub fn roll_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> RollResult {
        let mut rolls = Vec::new();
        let mut total = self.modifier;

        for group in &self.groups {
            for _ in 0..group.count {
                let value = group.die_type.roll(rng);
                rolls.push(value);
                let signed = value as i32;
                total = if group.negative {
                    total.saturating_sub(signed)
                } else {
                    total.saturating_add(signed)
                };
            }
        }

        RollResult {
            notation: self.original.clone(),
            rolls,
            modifier: self.modifier,
            total,
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
        write!(f, "{}", self.original)
    }
}

/// Result of rolling an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub notation: String,
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dice = self
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match self.modifier {
            0 => write!(f, "{} [{dice}] = {}", self.notation, self.total),
            m if m > 0 => write!(f, "{} [{dice}] + {m} = {}", self.notation, self.total),
            m => write!(f, "{} [{dice}] - {} = {}", self.notation, m.abs(), self.total),
        }
    }
}

/// Convenience function to roll dice from a notation string.
pub fn roll(notation: &str) -> Result<RollResult, DiceError> {
    Ok(DiceExpression::parse(notation)?.roll())
}

/// Roll `1d20 + modifier` for turn order.
pub fn roll_initiative<R: Rng + ?Sized>(modifier: i32, rng: &mut R) -> i32 {
    DieType::D20.roll(rng) as i32 + modifier
}

/// An attack roll and its damage, rolled together the way the combat screen does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRoll {
    pub to_hit: i32,
    pub damage: i32,
}

/// Roll `1d20` to hit and the given damage die.
pub fn roll_attack<R: Rng + ?Sized>(damage_die: DieType, rng: &mut R) -> AttackRoll {
    AttackRoll {
        to_hit: DieType::D20.roll(rng) as i32,
        damage: damage_die.roll(rng) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr.groups.len(), 1);
        assert_eq!(expr.groups[0].count, 1);
        assert_eq!(expr.groups[0].die_type, DieType::D20);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_with_modifier() {
        assert_eq!(DiceExpression::parse("1d20+5").unwrap().modifier, 5);
        assert_eq!(DiceExpression::parse("2d6-2").unwrap().modifier, -2);
        assert_eq!(DiceExpression::parse("d8").unwrap().groups[0].count, 1);
    }

    #[test]
    fn test_dice_count_is_capped() {
        assert!(DiceExpression::parse("1000d6").is_ok());
        assert_eq!(
            DiceExpression::parse("4000000000d100"),
            Err(DiceError::TooManyDice(4_000_000_000))
        );
        assert_eq!(
            DiceExpression::parse("600d6+500d4"),
            Err(DiceError::TooManyDice(1100))
        );
    }

    #[test]
    fn test_modifier_overflow_is_an_error() {
        assert_eq!(
            DiceExpression::parse("1d4+2147483647+1"),
            Err(DiceError::ModifierOverflow("1".to_string()))
        );
        assert_eq!(
            DiceExpression::parse("1d4+2147483647").unwrap().modifier,
            i32::MAX
        );
    }

    #[test]
    fn test_roll_total_saturates() {
        let mut rng = StdRng::seed_from_u64(3);
        let expr = DiceExpression::parse("2d6+2147483647").unwrap();
        assert_eq!(expr.roll_with_rng(&mut rng).total, i32::MAX);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DiceExpression::parse(""), Err(DiceError::NoDice));
        assert_eq!(
            DiceExpression::parse("1d7"),
            Err(DiceError::InvalidDieSize(7))
        );
        assert!(matches!(
            DiceExpression::parse("xd6"),
            Err(DiceError::InvalidNotation(_))
        ));
    }

    #[test]
    fn test_die_type_from_str() {
        assert_eq!("d10".parse::<DieType>(), Ok(DieType::D10));
        assert_eq!("D6".parse::<DieType>(), Ok(DieType::D6));
        assert_eq!("8".parse::<DieType>(), Ok(DieType::D8));
        assert!("d3".parse::<DieType>().is_err());
    }

    #[test]
    fn test_roll_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let expr = DiceExpression::parse("2d6+3").unwrap();
        for _ in 0..200 {
            let result = expr.roll_with_rng(&mut rng);
            assert!((5..=15).contains(&result.total));
            assert_eq!(result.rolls.len(), 2);
        }
    }

    #[test]
    fn test_negative_group_subtracts() {
        let mut rng = StdRng::seed_from_u64(11);
        let expr = DiceExpression::parse("1d4-1d4").unwrap();
        for _ in 0..100 {
            let result = expr.roll_with_rng(&mut rng);
            assert!((-3..=3).contains(&result.total));
        }
    }

    #[test]
    fn test_initiative_and_attack_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let init = roll_initiative(2, &mut rng);
            assert!((3..=22).contains(&init));

            let attack = roll_attack(DieType::D8, &mut rng);
            assert!((1..=20).contains(&attack.to_hit));
            assert!((1..=8).contains(&attack.damage));
        }
    }
}
