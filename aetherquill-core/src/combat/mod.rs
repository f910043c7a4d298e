//! Turn-based combat.
//!
//! [`InitiativeTracker`] owns an encounter: it orders [`Combatant`]s by
//! initiative, advances turns, ticks [`StatusEffect`]s and resolves attacks
//! into combat log entries.

mod status;
mod tracker;

pub use status::{
    Combatant, EffectKind, StatusEffect, BURNING_DAMAGE, ENRAGED_DAMAGE_BONUS,
    INSPIRED_ATTACK_BONUS, WEAKENED_ATTACK_PENALTY, WEAKENED_DAMAGE_REDUCTION,
};
pub use tracker::{AttackReport, InitiativeTracker};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("Invalid combatant name!")]
    UnknownCombatant(String),

    #[error("{0} is already in the battle!")]
    DuplicateName(String),
}
