//! Combatants and the timed status effects attached to them.

use crate::character::Character;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat bonus an `Inspired` attacker adds to one attack roll.
pub const INSPIRED_ATTACK_BONUS: i32 = 5;
/// Penalty to attack rolls made against a `Weakened` target.
pub const WEAKENED_ATTACK_PENALTY: i32 = 2;
/// Reduction to damage dealt to a `Weakened` target.
pub const WEAKENED_DAMAGE_REDUCTION: i32 = 1;
/// Flat bonus to damage dealt by an `Enraged` attacker.
pub const ENRAGED_DAMAGE_BONUS: i32 = 3;
/// Damage dealt at the start of a `Burning` combatant's turn.
pub const BURNING_DAMAGE: i32 = 5;

// ============================================================================
// Effect kinds
// ============================================================================

/// Effects with mechanical meaning. Anything else is a plain timed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Poisoned,
    Burning,
    Inspired,
    Weakened,
    Enraged,
    Other,
}

impl EffectKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Poisoned" => EffectKind::Poisoned,
            "Burning" => EffectKind::Burning,
            "Inspired" => EffectKind::Inspired,
            "Weakened" => EffectKind::Weakened,
            "Enraged" => EffectKind::Enraged,
            _ => EffectKind::Other,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        match self {
            EffectKind::Poisoned => Some("Poisoned"),
            EffectKind::Burning => Some("Burning"),
            EffectKind::Inspired => Some("Inspired"),
            EffectKind::Weakened => Some("Weakened"),
            EffectKind::Enraged => Some("Enraged"),
            EffectKind::Other => None,
        }
    }
}

// ============================================================================
// StatusEffect
// ============================================================================

/// A named, timed condition on a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub name: String,
    /// Rounds remaining. Expires once this reaches 0 or below.
    pub duration: i32,
    pub source: String,
    pub scaling: String,
    pub removal_method: String,
}

impl StatusEffect {
    pub fn new(name: impl Into<String>, duration: i32) -> Self {
        Self {
            name: name.into(),
            duration,
            source: String::new(),
            scaling: String::new(),
            removal_method: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_scaling(mut self, scaling: impl Into<String>) -> Self {
        self.scaling = scaling.into();
        self
    }

    pub fn with_removal_method(mut self, method: impl Into<String>) -> Self {
        self.removal_method = method.into();
        self
    }

    pub fn kind(&self) -> EffectKind {
        EffectKind::from_name(&self.name)
    }

    pub fn is_expired(&self) -> bool {
        self.duration <= 0
    }
}

impl fmt::Display for StatusEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} rounds)", self.name, self.duration)
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// A participant in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub initiative: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub ac: i32,
    #[serde(default)]
    pub stats: BTreeMap<String, i32>,
    #[serde(default)]
    pub status_effects: Vec<StatusEffect>,
    #[serde(default)]
    pub is_player: bool,
}

impl Combatant {
    /// A new combatant at full health.
    pub fn new(name: impl Into<String>, initiative: i32, hp: i32, ac: i32) -> Self {
        let max_hp = hp.max(0);
        Self {
            name: name.into(),
            initiative,
            hp: max_hp,
            max_hp,
            ac,
            stats: BTreeMap::new(),
            status_effects: Vec::new(),
            is_player: false,
        }
    }

    pub fn with_stats<I, K>(mut self, stats: I) -> Self
    where
        I: IntoIterator<Item = (K, i32)>,
        K: Into<String>,
    {
        self.stats = stats.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    pub fn player(mut self) -> Self {
        self.is_player = true;
        self
    }

    /// A player combatant for `character`, with hp and AC from its derived
    /// stats and its ability scores as stats.
    pub fn from_character(character: &Character, initiative: i32) -> Self {
        let derived = character.derived_stats();
        Self::new(
            character.name.clone(),
            initiative,
            derived.max_health,
            derived.defense,
        )
        .with_stats(
            character
                .abilities
                .iter()
                .map(|(ability, score)| (ability.name(), score)),
        )
        .player()
    }

    /// Reduce hp, never below 0. Negative amounts deal no damage.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let dealt = amount.max(0).min(self.hp);
        self.hp -= dealt;
        dealt
    }

    /// Restore hp, never above max. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let healed = amount.max(0).min(self.max_hp.saturating_sub(self.hp).max(0));
        self.hp += healed;
        healed
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.status_effects.iter().any(|e| e.kind() == kind)
    }

    /// Add an effect. An existing effect with the same name is replaced in
    /// place, so the new duration wins and order is kept.
    pub fn add_status_effect(&mut self, effect: StatusEffect) {
        match self
            .status_effects
            .iter_mut()
            .find(|e| e.name == effect.name)
        {
            Some(existing) => *existing = effect,
            None => self.status_effects.push(effect),
        }
    }

    /// Remove every effect with this name. Returns whether anything was removed.
    pub fn remove_status_effect(&mut self, name: &str) -> bool {
        let before = self.status_effects.len();
        self.status_effects.retain(|e| e.name != name);
        self.status_effects.len() != before
    }

    /// Tick every effect down by one round and return the names that expired.
    pub(crate) fn tick_effects(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        for effect in &mut self.status_effects {
            effect.duration = effect.duration.saturating_sub(1);
            if effect.is_expired() && !expired.contains(&effect.name) {
                expired.push(effect.name.clone());
            }
        }
        expired
    }
}
