//! Initiative order, turn sequencing and attack resolution.

use super::status::{
    Combatant, EffectKind, StatusEffect, BURNING_DAMAGE, ENRAGED_DAMAGE_BONUS,
    INSPIRED_ATTACK_BONUS, WEAKENED_ATTACK_PENALTY, WEAKENED_DAMAGE_REDUCTION,
};
use super::CombatError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of a resolved attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    /// Attack roll after status modifiers.
    pub modified_roll: i32,
    pub hit: bool,
    /// Damage applied to the target (0 on a miss).
    pub damage: i32,
    pub defeated: bool,
    pub message: String,
}

/// Tracks one encounter.
///
/// Combatants are kept sorted by initiative, highest first. Ties keep the
/// order in which combatants joined. Every event is recorded in the combat
/// log prefixed with the round it happened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeTracker {
    combatants: Vec<Combatant>,
    current_index: usize,
    round: u32,
    log: Vec<String>,
}

impl InitiativeTracker {
    pub fn new() -> Self {
        Self {
            combatants: Vec::new(),
            current_index: 0,
            round: 1,
            log: Vec::new(),
        }
    }

    // ========================================================================
    // Roster
    // ========================================================================

    /// Add a combatant and re-sort the initiative order.
    ///
    /// Names identify combatants in every other operation, so a name that is
    /// already in the encounter is rejected.
    pub fn add_combatant(&mut self, combatant: Combatant) -> Result<(), CombatError> {
        if self.position(&combatant.name).is_some() {
            return Err(CombatError::DuplicateName(combatant.name));
        }

        let message = format!(
            "{} joins the battle with initiative {}!",
            combatant.name, combatant.initiative
        );
        self.combatants.push(combatant);
        // stable: equal initiative keeps join order
        self.combatants
            .sort_by(|a, b| b.initiative.cmp(&a.initiative));
        self.log_event(message);
        Ok(())
    }

    /// Withdraw a combatant by name.
    ///
    /// If the current index falls off the end of the list it resets to 0,
    /// which can repeat or skip a turn in the current round.
    pub fn remove_combatant(&mut self, name: &str) -> Option<Combatant> {
        let removed = self
            .position(name)
            .map(|index| self.combatants.remove(index));
        if self.current_index >= self.combatants.len() {
            self.current_index = 0;
        }
        removed
    }

    pub fn current_combatant(&self) -> Option<&Combatant> {
        self.combatants.get(self.current_index)
    }

    pub fn combatant(&self, name: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.name == name)
    }

    /// All combatants in initiative order.
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn combat_log(&self) -> &[String] {
        &self.log
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Reset to an empty encounter in round 1.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // ========================================================================
    // Turns
    // ========================================================================

    /// End the current turn and start the next one.
    ///
    /// The current combatant's effects tick down and expire first. Wrapping
    /// past the last combatant starts a new round. The new combatant's
    /// start-of-turn effects are then applied.
    pub fn next_turn(&mut self) -> Option<&Combatant> {
        if self.combatants.is_empty() {
            return None;
        }

        self.resolve_end_of_turn(self.current_index);

        self.current_index += 1;
        if self.current_index >= self.combatants.len() {
            self.current_index = 0;
            self.round += 1;
            debug!(round = self.round, "Combat round started");
        }

        self.apply_start_of_turn(self.current_index);
        self.combatants.get(self.current_index)
    }

    fn resolve_end_of_turn(&mut self, index: usize) {
        let Some(combatant) = self.combatants.get_mut(index) else {
            return;
        };
        let name = combatant.name.clone();
        for effect in combatant.tick_effects() {
            combatant.remove_status_effect(&effect);
            self.log.push(format!(
                "Round {}: {name} is no longer {effect}!",
                self.round
            ));
        }
    }

    fn apply_start_of_turn(&mut self, index: usize) {
        let Some(combatant) = self.combatants.get_mut(index) else {
            return;
        };
        let mut events = Vec::new();
        let kinds: Vec<EffectKind> = combatant.status_effects.iter().map(|e| e.kind()).collect();
        for kind in kinds {
            match kind {
                EffectKind::Poisoned => events.push(format!(
                    "{} suffers from Poisoned! Applying disadvantage \
                     to attack rolls and ability checks.",
                    combatant.name
                )),
                EffectKind::Burning => {
                    combatant.take_damage(BURNING_DAMAGE);
                    events.push(format!(
                        "{} suffers {BURNING_DAMAGE} burning damage!",
                        combatant.name
                    ));
                }
                _ => {}
            }
        }
        for event in events {
            self.log_event(event);
        }
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Resolve an attack roll and damage between two combatants.
    ///
    /// Unknown names fail without touching state or the log. A roll equal to
    /// the target's armor class hits. A target brought to 0 hp is removed
    /// from the encounter immediately.
    pub fn resolve_attack(
        &mut self,
        attacker: &str,
        target: &str,
        attack_roll: i32,
        damage: i32,
    ) -> Result<AttackReport, CombatError> {
        let attacker_index = self
            .position(attacker)
            .ok_or_else(|| CombatError::UnknownCombatant(attacker.to_string()))?;
        let target_index = self
            .position(target)
            .ok_or_else(|| CombatError::UnknownCombatant(target.to_string()))?;

        let modified_roll = self.modify_attack_roll(attacker_index, target_index, attack_roll);
        let target_ac = self.combatants[target_index].ac;

        if modified_roll < target_ac {
            let message = format!("{attacker} misses {target}!");
            self.log_event(message.clone());
            return Ok(AttackReport {
                modified_roll,
                hit: false,
                damage: 0,
                defeated: false,
                message,
            });
        }

        let modified_damage = self.modify_damage(attacker_index, target_index, damage);
        let defender = &mut self.combatants[target_index];
        defender.take_damage(modified_damage);
        let defeated = defender.is_down();

        let damage = modified_damage.max(0);
        let mut message = format!("{attacker} hits {target} for {damage} damage!");
        if defeated {
            message.push_str(&format!(" {target} has been defeated!"));
            self.remove_combatant(target);
        }
        self.log_event(message.clone());

        Ok(AttackReport {
            modified_roll,
            hit: true,
            damage,
            defeated,
            message,
        })
    }

    fn modify_attack_roll(&mut self, attacker: usize, target: usize, roll: i32) -> i32 {
        let mut roll = roll;

        if self.combatants[attacker].has_effect(EffectKind::Inspired) {
            roll = roll.saturating_add(INSPIRED_ATTACK_BONUS);
            let name = self.combatants[attacker].name.clone();
            self.log_event(format!(
                "{name} is Inspired! Gaining +{INSPIRED_ATTACK_BONUS} to the attack roll."
            ));
            // consumed on use
            self.combatants[attacker].remove_status_effect("Inspired");
            self.log_event(format!("{name} is no longer Inspired!"));
        }

        if self.combatants[target].has_effect(EffectKind::Weakened) {
            roll = roll.saturating_sub(WEAKENED_ATTACK_PENALTY);
            let name = self.combatants[target].name.clone();
            self.log_event(format!(
                "{name} is Weakened! Applying -{WEAKENED_ATTACK_PENALTY} penalty \
                 to the attack roll against them."
            ));
        }

        roll
    }

    fn modify_damage(&mut self, attacker: usize, target: usize, damage: i32) -> i32 {
        let mut damage = damage;

        if self.combatants[attacker].has_effect(EffectKind::Enraged) {
            damage = damage.saturating_add(ENRAGED_DAMAGE_BONUS);
            let name = self.combatants[attacker].name.clone();
            self.log_event(format!(
                "{name} is Enraged! Dealing +{ENRAGED_DAMAGE_BONUS} damage."
            ));
        }

        if self.combatants[target].has_effect(EffectKind::Weakened) {
            damage = damage.saturating_sub(WEAKENED_DAMAGE_REDUCTION);
            let name = self.combatants[target].name.clone();
            self.log_event(format!(
                "{name} is Weakened! Reducing damage taken by {WEAKENED_DAMAGE_REDUCTION}."
            ));
        }

        damage
    }

    /// Heal a combatant, clamped to their maximum hp.
    pub fn heal_combatant(&mut self, name: &str, amount: i32) -> Result<String, CombatError> {
        let index = self
            .position(name)
            .ok_or_else(|| CombatError::UnknownCombatant(name.to_string()))?;
        let healed = self.combatants[index].heal(amount);
        let message = format!("{name} heals for {healed} HP!");
        self.log_event(message.clone());
        Ok(message)
    }

    pub fn apply_status_effect(
        &mut self,
        target: &str,
        effect: StatusEffect,
    ) -> Result<String, CombatError> {
        let index = self
            .position(target)
            .ok_or_else(|| CombatError::UnknownCombatant(target.to_string()))?;
        let message = format!("{target} is afflicted with {}!", effect.name);
        self.combatants[index].add_status_effect(effect);
        self.log_event(message.clone());
        Ok(message)
    }

    pub fn remove_status_effect(
        &mut self,
        target: &str,
        effect_name: &str,
    ) -> Result<String, CombatError> {
        let index = self
            .position(target)
            .ok_or_else(|| CombatError::UnknownCombatant(target.to_string()))?;
        self.combatants[index].remove_status_effect(effect_name);
        let message = format!("{target} is no longer {effect_name}!");
        self.log_event(message.clone());
        Ok(message)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.combatants.iter().position(|c| c.name == name)
    }

    fn log_event(&mut self, message: String) {
        self.log.push(format!("Round {}: {message}", self.round));
    }
}

impl Default for InitiativeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(entries: &[(&str, i32, i32, i32)]) -> InitiativeTracker {
        let mut tracker = InitiativeTracker::new();
        for (name, init, hp, ac) in entries {
            tracker
                .add_combatant(Combatant::new(*name, *init, *hp, *ac))
                .unwrap();
        }
        tracker
    }

    fn names(tracker: &InitiativeTracker) -> Vec<&str> {
        tracker.combatants().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_sorted_by_initiative_with_stable_ties() {
        let tracker = tracker_with(&[
            ("Goblin", 10, 7, 13),
            ("Hero", 18, 20, 16),
            ("Wolf", 10, 11, 13),
            ("Bandit", 4, 11, 12),
            ("Archer", 10, 9, 14),
        ]);
        assert_eq!(names(&tracker), ["Hero", "Goblin", "Wolf", "Archer", "Bandit"]);
        assert_eq!(
            tracker.combat_log()[0],
            "Round 1: Goblin joins the battle with initiative 10!"
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut tracker = tracker_with(&[("Goblin", 10, 7, 13)]);
        let err = tracker
            .add_combatant(Combatant::new("Goblin", 15, 7, 13))
            .unwrap_err();
        assert_eq!(err, CombatError::DuplicateName("Goblin".to_string()));
        assert_eq!(tracker.combatants().len(), 1);
        assert_eq!(tracker.combat_log().len(), 1);
    }

    #[test]
    fn test_empty_tracker_is_safe() {
        let mut tracker = InitiativeTracker::new();
        assert!(tracker.current_combatant().is_none());
        assert!(tracker.next_turn().is_none());
        assert_eq!(tracker.round(), 1);
        assert!(tracker.remove_combatant("Nobody").is_none());

        tracker.add_combatant(Combatant::new("Hero", 10, 10, 10)).unwrap();
        tracker.next_turn();
        tracker.clear();
        assert!(tracker.current_combatant().is_none());
        assert_eq!(tracker.round(), 1);
        assert!(tracker.combat_log().is_empty());
    }

    #[test]
    fn test_full_cycle_increments_round_once() {
        let mut tracker = tracker_with(&[("A", 15, 10, 10), ("B", 12, 10, 10), ("C", 3, 10, 10)]);
        let first = tracker.current_combatant().unwrap().name.clone();

        assert_eq!(tracker.next_turn().unwrap().name, "B");
        assert_eq!(tracker.round(), 1);
        assert_eq!(tracker.next_turn().unwrap().name, "C");
        assert_eq!(tracker.round(), 1);
        assert_eq!(tracker.next_turn().unwrap().name, first);
        assert_eq!(tracker.round(), 2);
    }

    #[test]
    fn test_attack_hit_and_miss() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Ogre", 5, 40, 15)]);

        let report = tracker.resolve_attack("Hero", "Ogre", 16, 5).unwrap();
        assert!(report.hit);
        assert_eq!(report.message, "Hero hits Ogre for 5 damage!");
        assert_eq!(tracker.combatant("Ogre").unwrap().hp, 35);

        let report = tracker.resolve_attack("Hero", "Ogre", 10, 5).unwrap();
        assert!(!report.hit);
        assert_eq!(report.message, "Hero misses Ogre!");
        assert_eq!(tracker.combatant("Ogre").unwrap().hp, 35);

        let log = tracker.combat_log();
        assert_eq!(log[log.len() - 2], "Round 1: Hero hits Ogre for 5 damage!");
        assert_eq!(log[log.len() - 1], "Round 1: Hero misses Ogre!");
    }

    #[test]
    fn test_roll_equal_to_ac_hits() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Ogre", 5, 40, 15)]);
        assert!(tracker.resolve_attack("Hero", "Ogre", 15, 1).unwrap().hit);
    }

    #[test]
    fn test_lethal_damage_removes_target() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Rat", 5, 5, 10)]);
        let report = tracker.resolve_attack("Hero", "Rat", 12, 5).unwrap();
        assert!(report.defeated);
        assert_eq!(report.message, "Hero hits Rat for 5 damage! Rat has been defeated!");
        assert!(tracker.combatant("Rat").is_none());
        assert_eq!(names(&tracker), ["Hero"]);
    }

    #[test]
    fn test_unknown_combatant_leaves_state_untouched() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16)]);
        let log_len = tracker.combat_log().len();

        let err = tracker.resolve_attack("Hero", "Ghost", 20, 5).unwrap_err();
        assert_eq!(err.to_string(), "Invalid combatant name!");
        assert!(tracker
            .apply_status_effect("Ghost", StatusEffect::new("Burning", 2))
            .is_err());
        assert!(tracker.remove_status_effect("Ghost", "Burning").is_err());
        assert!(tracker.heal_combatant("Ghost", 3).is_err());
        assert_eq!(tracker.combat_log().len(), log_len);
    }

    #[test]
    fn test_inspired_is_consumed() {
        let mut tracker = tracker_with(&[("Bard", 18, 20, 12), ("Knight", 5, 30, 18)]);
        tracker
            .apply_status_effect("Bard", StatusEffect::new("Inspired", 3))
            .unwrap();

        let report = tracker.resolve_attack("Bard", "Knight", 14, 4).unwrap();
        assert_eq!(report.modified_roll, 19);
        assert!(report.hit);
        assert!(!tracker
            .combatant("Bard")
            .unwrap()
            .has_effect(EffectKind::Inspired));

        let report = tracker.resolve_attack("Bard", "Knight", 14, 4).unwrap();
        assert!(!report.hit);
    }

    #[test]
    fn test_extreme_rolls_and_damage_saturate() {
        let mut tracker = tracker_with(&[("Bard", 18, 20, 12), ("Knight", 5, 30, 18)]);
        tracker
            .apply_status_effect("Bard", StatusEffect::new("Inspired", 3))
            .unwrap();
        tracker
            .apply_status_effect("Bard", StatusEffect::new("Enraged", 3))
            .unwrap();

        let report = tracker
            .resolve_attack("Bard", "Knight", i32::MAX, i32::MAX)
            .unwrap();
        assert_eq!(report.modified_roll, i32::MAX);
        assert_eq!(report.damage, i32::MAX);
        assert!(report.defeated);

        let mut tracker = tracker_with(&[("Bard", 18, 20, 12), ("Knight", 5, 30, 18)]);
        tracker
            .apply_status_effect("Knight", StatusEffect::new("Weakened", 3))
            .unwrap();
        let report = tracker
            .resolve_attack("Bard", "Knight", i32::MIN, 1)
            .unwrap();
        assert_eq!(report.modified_roll, i32::MIN);
        assert!(!report.hit);

        let report = tracker
            .resolve_attack("Bard", "Knight", 20, i32::MIN)
            .unwrap();
        assert!(report.hit);
        assert_eq!(report.damage, 0);
        assert_eq!(tracker.combatant("Knight").unwrap().hp, 30);
    }

    #[test]
    fn test_weakened_and_enraged_modifiers() {
        let mut tracker = tracker_with(&[("Barbarian", 18, 40, 14), ("Troll", 5, 50, 15)]);
        tracker
            .apply_status_effect("Barbarian", StatusEffect::new("Enraged", 3))
            .unwrap();
        tracker
            .apply_status_effect("Troll", StatusEffect::new("Weakened", 3))
            .unwrap();

        // 17 - 2 = 15 still meets AC 15
        let report = tracker.resolve_attack("Barbarian", "Troll", 17, 6).unwrap();
        assert_eq!(report.modified_roll, 15);
        assert_eq!(report.damage, 8);
        assert_eq!(tracker.combatant("Troll").unwrap().hp, 42);

        let report = tracker.resolve_attack("Barbarian", "Troll", 16, 6).unwrap();
        assert!(!report.hit);
    }

    #[test]
    fn test_negative_modified_damage_clamps_to_zero() {
        let mut tracker = tracker_with(&[("Imp", 18, 5, 10), ("Golem", 5, 30, 5)]);
        tracker
            .apply_status_effect("Golem", StatusEffect::new("Weakened", 3))
            .unwrap();

        let report = tracker.resolve_attack("Imp", "Golem", 20, 0).unwrap();
        assert!(report.hit);
        assert_eq!(report.damage, 0);
        assert_eq!(tracker.combatant("Golem").unwrap().hp, 30);
    }

    #[test]
    fn test_effects_expire_at_end_of_turn() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Goblin", 5, 10, 12)]);
        tracker
            .apply_status_effect("Hero", StatusEffect::new("Blessed", 1))
            .unwrap();

        tracker.next_turn();
        assert!(tracker.combatant("Hero").unwrap().status_effects.is_empty());
        assert!(tracker
            .combat_log()
            .contains(&"Round 1: Hero is no longer Blessed!".to_string()));
    }

    #[test]
    fn test_burning_damages_at_start_of_turn() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Goblin", 5, 12, 12)]);
        tracker
            .apply_status_effect("Goblin", StatusEffect::new("Burning", 2))
            .unwrap();

        assert_eq!(tracker.next_turn().unwrap().hp, 7);
        assert!(tracker
            .combat_log()
            .contains(&"Round 1: Goblin suffers 5 burning damage!".to_string()));
    }

    #[test]
    fn test_burning_to_zero_does_not_remove() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Goblin", 5, 4, 12)]);
        tracker
            .apply_status_effect("Goblin", StatusEffect::new("Burning", 2))
            .unwrap();

        let goblin = tracker.next_turn().unwrap();
        assert_eq!(goblin.hp, 0);
        assert_eq!(tracker.combatants().len(), 2);
    }

    #[test]
    fn test_poisoned_only_logs() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Goblin", 5, 12, 12)]);
        tracker
            .apply_status_effect("Goblin", StatusEffect::new("Poisoned", 2))
            .unwrap();

        assert_eq!(tracker.next_turn().unwrap().hp, 12);
        assert!(tracker.combat_log().iter().any(|l| l.contains("suffers from Poisoned")));
    }

    #[test]
    fn test_removing_last_in_order_resets_index() {
        // Resetting to 0 gives the first combatant another turn this round.
        let mut tracker = tracker_with(&[("A", 15, 10, 10), ("B", 12, 10, 10), ("C", 3, 10, 10)]);
        tracker.next_turn();
        tracker.next_turn();
        assert_eq!(tracker.current_combatant().unwrap().name, "C");

        tracker.remove_combatant("C");
        assert_eq!(tracker.current_combatant().unwrap().name, "A");
        assert_eq!(tracker.round(), 1);
    }

    #[test]
    fn test_heal_clamps_and_logs() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Goblin", 5, 12, 10)]);
        tracker.resolve_attack("Goblin", "Hero", 18, 8).unwrap();
        let message = tracker.heal_combatant("Hero", 20).unwrap();
        assert_eq!(message, "Hero heals for 8 HP!");
        assert_eq!(tracker.combatant("Hero").unwrap().hp, 30);
    }

    #[test]
    fn test_log_uses_current_round() {
        let mut tracker = tracker_with(&[("A", 15, 10, 10), ("B", 12, 10, 10)]);
        tracker.next_turn();
        tracker.next_turn();
        tracker.resolve_attack("A", "B", 1, 1).unwrap();
        assert_eq!(tracker.combat_log().last().unwrap(), "Round 2: A misses B!");
    }

    #[test]
    fn test_serde_snapshot() {
        let mut tracker = tracker_with(&[("Hero", 20, 30, 16), ("Goblin", 5, 12, 10)]);
        tracker
            .apply_status_effect("Goblin", StatusEffect::new("Burning", 2))
            .unwrap();
        tracker.next_turn();

        let json = serde_json::to_string(&tracker).unwrap();
        let restored: InitiativeTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.combatants(), tracker.combatants());
        assert_eq!(restored.round(), tracker.round());
        assert_eq!(
            restored.current_combatant().map(|c| &c.name),
            tracker.current_combatant().map(|c| &c.name)
        );
    }
}
