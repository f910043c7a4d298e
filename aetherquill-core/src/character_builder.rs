//! Character creation.
//!
//! A [`CharacterBuilder`] collects the player's choices into a
//! [`CharacterDraft`]. [`finalize_character`] consumes the draft, applies
//! racial bonuses and produces a level 1 [`Character`]. Because the draft is
//! consumed, racial bonuses can only ever be applied once.

use crate::character::{
    Ability, AbilityScores, Background, Character, CharacterClass, CharacterId, InventoryItem,
    Race, Skill, STARTING_EXPERIENCE_THRESHOLD,
};
use thiserror::Error;
use tracing::debug;

/// Points available in point-buy.
pub const POINT_BUY_BUDGET: i32 = 27;
/// Score every ability starts from before points are spent.
pub const POINT_BUY_BASE: i32 = 8;
/// Highest score point-buy can reach.
pub const POINT_BUY_MAX: i32 = 18;
/// Most skills a new character may pick.
pub const MAX_CHOSEN_SKILLS: usize = 3;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CreationError {
    #[error("Character name is required")]
    MissingName,

    #[error("Race selection is required")]
    MissingRace,

    #[error("Class selection is required")]
    MissingClass,

    #[error("Background selection is required")]
    MissingBackground,

    #[error("{ability} must be between 8 and 18, got {score}")]
    ScoreOutOfRange { ability: Ability, score: i32 },

    #[error("You must spend exactly 27 points. You have {remaining} unspent.")]
    PointsUnspent { remaining: i32 },

    #[error("Choose at most 3 skills, got {0}")]
    TooManySkills(usize),

    #[error("{skill} is not available to a {class}")]
    SkillNotAvailable { skill: Skill, class: CharacterClass },

    #[error("{0} was chosen more than once")]
    DuplicateSkill(Skill),
}

// ============================================================================
// Point buy
// ============================================================================

/// Points spent on a set of scores: one point per step above the base.
pub fn points_spent(scores: &AbilityScores) -> i32 {
    scores.iter().map(|(_, score)| score - POINT_BUY_BASE).sum()
}

/// Check that every score is in range and the whole budget is spent.
pub fn validate_point_buy(scores: &AbilityScores) -> Result<(), CreationError> {
    for (ability, score) in scores.iter() {
        if !(POINT_BUY_BASE..=POINT_BUY_MAX).contains(&score) {
            return Err(CreationError::ScoreOutOfRange { ability, score });
        }
    }

    let remaining = POINT_BUY_BUDGET - points_spent(scores);
    if remaining != 0 {
        return Err(CreationError::PointsUnspent { remaining });
    }
    Ok(())
}

// ============================================================================
// Draft
// ============================================================================

/// Validated choices for a character that has not been finalized yet.
///
/// Scores are the player's point-buy scores without racial bonuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterDraft {
    pub id: CharacterId,
    pub name: String,
    pub race: Race,
    pub class: CharacterClass,
    pub background: Background,
    pub base_scores: AbilityScores,
    pub skills: Vec<Skill>,
}

/// Builder for a [`CharacterDraft`].
#[derive(Debug, Clone)]
pub struct CharacterBuilder {
    name: Option<String>,
    race: Option<Race>,
    class: Option<CharacterClass>,
    background: Option<Background>,
    scores: AbilityScores,
    skills: Vec<Skill>,
}

impl CharacterBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            race: None,
            class: None,
            background: None,
            scores: AbilityScores::uniform(POINT_BUY_BASE),
            skills: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn race(mut self, race: Race) -> Self {
        self.race = Some(race);
        self
    }

    pub fn class(mut self, class: CharacterClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    /// Set point-buy scores.
    pub fn scores(mut self, scores: AbilityScores) -> Self {
        self.scores = scores;
        self
    }

    /// Set a single point-buy score.
    pub fn score(mut self, ability: Ability, value: i32) -> Self {
        self.scores.set(ability, value);
        self
    }

    pub fn skills(mut self, skills: Vec<Skill>) -> Self {
        self.skills = skills;
        self
    }

    /// Points left to spend with the current scores.
    pub fn points_remaining(&self) -> i32 {
        POINT_BUY_BUDGET - points_spent(&self.scores)
    }

    /// Validate the choices and produce a draft.
    pub fn build(self) -> Result<CharacterDraft, CreationError> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(CreationError::MissingName)?;
        let race = self.race.ok_or(CreationError::MissingRace)?;
        let class = self.class.ok_or(CreationError::MissingClass)?;
        let background = self.background.ok_or(CreationError::MissingBackground)?;

        validate_point_buy(&self.scores)?;

        if self.skills.len() > MAX_CHOSEN_SKILLS {
            return Err(CreationError::TooManySkills(self.skills.len()));
        }
        let options = class.skill_options();
        for (i, skill) in self.skills.iter().enumerate() {
            if !options.contains(skill) {
                return Err(CreationError::SkillNotAvailable {
                    skill: *skill,
                    class,
                });
            }
            if self.skills[..i].contains(skill) {
                return Err(CreationError::DuplicateSkill(*skill));
            }
        }

        Ok(CharacterDraft {
            id: CharacterId::new(),
            name,
            race,
            class,
            background,
            base_scores: self.scores,
            skills: self.skills,
        })
    }
}

impl Default for CharacterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Finalize
// ============================================================================

/// Turn a draft into a level 1 character with racial bonuses and class gear.
pub fn finalize_character(draft: CharacterDraft) -> Character {
    let mut abilities = draft.base_scores;
    draft.race.apply_ability_bonuses(&mut abilities);

    let inventory = draft
        .class
        .starting_equipment()
        .iter()
        .map(|item| InventoryItem::new(*item, 1))
        .collect();

    debug!(
        name = %draft.name,
        race = %draft.race,
        class = %draft.class,
        "Character finalized"
    );

    Character {
        id: draft.id,
        name: draft.name,
        race: draft.race,
        class: draft.class,
        background: draft.background,
        abilities,
        skills: draft.skills,
        inventory,
        level: 1,
        experience: 0,
        experience_threshold: STARTING_EXPERIENCE_THRESHOLD,
    }
}
