//! Player characters: abilities, race, class, derived stats and experience.

use crate::dice::DieType;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Experience needed for the first level-up.
pub const STARTING_EXPERIENCE_THRESHOLD: u32 = 100;
/// Base walking speed in feet.
pub const DEFAULT_MOVEMENT_SPEED: i32 = 30;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a character. Keys the saved game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Abilities
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "strength",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Charisma => "charisma",
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Parse a full name or abbreviation, ignoring case.
    pub fn from_name(name: &str) -> Option<Ability> {
        let name = name.trim();
        Ability::all().into_iter().find(|a| {
            a.name().eq_ignore_ascii_case(name) || a.abbreviation().eq_ignore_ascii_case(name)
        })
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Modifier for a raw score: `(score - 10) / 2`, rounded toward negative infinity.
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    /// Every score set to the same value.
    pub fn uniform(score: i32) -> Self {
        Self::new(score, score, score, score, score, score)
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: i32) {
        match ability {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = value,
            Ability::Charisma => self.charisma = value,
        }
    }

    pub fn add(&mut self, ability: Ability, delta: i32) {
        self.set(ability, self.get(ability) + delta);
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability))
    }

    /// Modifiers for every ability, in canonical order.
    pub fn modifiers(&self) -> [(Ability, i32); 6] {
        Ability::all().map(|a| (a, self.modifier(a)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ability, i32)> + '_ {
        Ability::all().into_iter().map(move |a| (a, self.get(a)))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::uniform(10)
    }
}

// ============================================================================
// Skills
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Intimidation,
    Acrobatics,
    Stealth,
    SleightOfHand,
    Endurance,
    Arcana,
    Investigation,
    History,
    Insight,
    Perception,
    Survival,
    Medicine,
    Deception,
    Persuasion,
    Performance,
}

impl Skill {
    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Intimidation => "Intimidation",
            Skill::Acrobatics => "Acrobatics",
            Skill::Stealth => "Stealth",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Endurance => "Endurance",
            Skill::Arcana => "Arcana",
            Skill::Investigation => "Investigation",
            Skill::History => "History",
            Skill::Insight => "Insight",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Medicine => "Medicine",
            Skill::Deception => "Deception",
            Skill::Persuasion => "Persuasion",
            Skill::Performance => "Performance",
        }
    }

    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics | Skill::Intimidation => Ability::Strength,
            Skill::Acrobatics | Skill::Stealth | Skill::SleightOfHand => Ability::Dexterity,
            Skill::Endurance => Ability::Constitution,
            Skill::Arcana | Skill::Investigation | Skill::History => Ability::Intelligence,
            Skill::Insight | Skill::Perception | Skill::Survival | Skill::Medicine => {
                Ability::Wisdom
            }
            Skill::Deception | Skill::Persuasion | Skill::Performance => Ability::Charisma,
        }
    }

    pub fn all() -> [Skill; 16] {
        [
            Skill::Athletics,
            Skill::Intimidation,
            Skill::Acrobatics,
            Skill::Stealth,
            Skill::SleightOfHand,
            Skill::Endurance,
            Skill::Arcana,
            Skill::Investigation,
            Skill::History,
            Skill::Insight,
            Skill::Perception,
            Skill::Survival,
            Skill::Medicine,
            Skill::Deception,
            Skill::Persuasion,
            Skill::Performance,
        ]
    }

    /// Skills governed by one ability.
    pub fn for_ability(ability: Ability) -> Vec<Skill> {
        Skill::all()
            .into_iter()
            .filter(|s| s.ability() == ability)
            .collect()
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Race
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Halfling,
    Orc,
    Gnome,
}

impl Race {
    pub fn all() -> [Race; 6] {
        [
            Race::Human,
            Race::Elf,
            Race::Dwarf,
            Race::Halfling,
            Race::Orc,
            Race::Gnome,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Race::Human => "Human",
            Race::Elf => "Elf",
            Race::Dwarf => "Dwarf",
            Race::Halfling => "Halfling",
            Race::Orc => "Orc",
            Race::Gnome => "Gnome",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Race::Human => {
                "Adaptable and ambitious, humans are found in every corner of the realm."
            }
            Race::Elf => "Graceful and long-lived, with deep magical traditions.",
            Race::Dwarf => "Hardy and traditional, masters of stone and metal.",
            Race::Halfling => "Small but resourceful, naturally stealthy.",
            Race::Orc => "Strong and enduring, with a warrior culture.",
            Race::Gnome => "Inventive and curious, with natural magical talent.",
        }
    }

    pub fn abilities(&self) -> &'static [&'static str] {
        match self {
            Race::Human => &["Versatile", "Quick Learner"],
            Race::Elf => &["Keen Senses", "Fey Ancestry", "Trance"],
            Race::Dwarf => &["Darkvision", "Dwarven Resilience"],
            Race::Halfling => &["Lucky", "Brave", "Nimble"],
            Race::Orc => &["Powerful Build", "Aggressive"],
            Race::Gnome => &["Gnome Cunning", "Artificer's Lore"],
        }
    }

    pub fn cultural_traits(&self) -> &'static [&'static str] {
        match self {
            Race::Human => &["Various Cultural Backgrounds", "Flexible Skill Training"],
            Race::Elf => &["Natural Affinity for Magic", "Enhanced Perception"],
            Race::Dwarf => &["Stonecunning", "Smith's Tools Proficiency"],
            Race::Halfling => &["Halfling Nimbleness", "Naturally Stealthy"],
            Race::Orc => &["Menacing", "Relentless Endurance"],
            Race::Gnome => &["Tinker", "Speak with Small Beasts"],
        }
    }

    /// Ability bonuses granted by this race.
    pub fn ability_bonuses(&self) -> Vec<(Ability, i32)> {
        match self {
            Race::Human => Ability::all().map(|a| (a, 1)).to_vec(),
            Race::Elf => vec![(Ability::Dexterity, 2), (Ability::Intelligence, 1)],
            Race::Dwarf => vec![(Ability::Constitution, 2), (Ability::Wisdom, 1)],
            Race::Halfling => vec![(Ability::Dexterity, 2), (Ability::Charisma, 1)],
            Race::Orc => vec![(Ability::Strength, 2), (Ability::Constitution, 1)],
            Race::Gnome => vec![(Ability::Intelligence, 2), (Ability::Dexterity, 1)],
        }
    }

    pub fn apply_ability_bonuses(&self, scores: &mut AbilityScores) {
        for (ability, bonus) in self.ability_bonuses() {
            scores.add(ability, bonus);
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Class
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Warrior,
    Mage,
    Rogue,
    Cleric,
    Ranger,
    Paladin,
}

impl CharacterClass {
    pub fn all() -> [CharacterClass; 6] {
        [
            CharacterClass::Warrior,
            CharacterClass::Mage,
            CharacterClass::Rogue,
            CharacterClass::Cleric,
            CharacterClass::Ranger,
            CharacterClass::Paladin,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Warrior => "Warrior",
            CharacterClass::Mage => "Mage",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Paladin => "Paladin",
        }
    }

    pub fn hit_die(&self) -> DieType {
        match self {
            CharacterClass::Warrior | CharacterClass::Ranger | CharacterClass::Paladin => {
                DieType::D10
            }
            CharacterClass::Rogue | CharacterClass::Cleric => DieType::D8,
            CharacterClass::Mage => DieType::D6,
        }
    }

    pub fn primary_attributes(&self) -> [Ability; 2] {
        match self {
            CharacterClass::Warrior => [Ability::Strength, Ability::Constitution],
            CharacterClass::Mage => [Ability::Intelligence, Ability::Wisdom],
            CharacterClass::Rogue => [Ability::Dexterity, Ability::Charisma],
            CharacterClass::Cleric => [Ability::Wisdom, Ability::Charisma],
            CharacterClass::Ranger => [Ability::Dexterity, Ability::Wisdom],
            CharacterClass::Paladin => [Ability::Strength, Ability::Charisma],
        }
    }

    /// Class training every member starts with, independent of chosen skills.
    pub fn starting_skills(&self) -> [&'static str; 2] {
        match self {
            CharacterClass::Warrior => ["Combat Training", "Weapon Mastery"],
            CharacterClass::Mage => ["Arcana", "Spellcasting"],
            CharacterClass::Rogue => ["Stealth", "Thieves' Tools"],
            CharacterClass::Cleric => ["Religion", "Divine Magic"],
            CharacterClass::Ranger => ["Survival", "Nature"],
            CharacterClass::Paladin => ["Religion", "Athletics"],
        }
    }

    /// Signature abilities as `(name, description)`.
    pub fn special_abilities(&self) -> [(&'static str, &'static str); 2] {
        match self {
            CharacterClass::Warrior => [
                ("Combat Stance", "Enhanced defensive capabilities in battle"),
                ("Weapon Specialization", "Bonus damage with chosen weapon type"),
            ],
            CharacterClass::Mage => [
                ("Arcane Recovery", "Recover spell slots on short rest"),
                ("Spell Mastery", "Cast certain spells without spell slots"),
            ],
            CharacterClass::Rogue => [
                ("Sneak Attack", "Extra damage when attacking with advantage"),
                ("Cunning Action", "Bonus action to Dash, Disengage, or Hide"),
            ],
            CharacterClass::Cleric => [
                ("Channel Divinity", "Channel divine energy for various effects"),
                ("Divine Domain", "Specialized divine powers and spells"),
            ],
            CharacterClass::Ranger => [
                ("Favored Enemy", "Bonus damage against certain creature types"),
                ("Natural Explorer", "Expertise in navigating certain terrains"),
            ],
            CharacterClass::Paladin => [
                ("Divine Smite", "Channel divine energy into weapon attacks"),
                ("Lay on Hands", "Pool of healing energy"),
            ],
        }
    }

    /// Features unlocked at levels 1, 2 and 3.
    pub fn progression_path(&self) -> [&'static str; 3] {
        match self {
            CharacterClass::Warrior => ["Fighting Style", "Action Surge", "Martial Archetype"],
            CharacterClass::Mage => ["Spellcasting", "Arcane Tradition", "Cantrip Formulas"],
            CharacterClass::Rogue => ["Expertise", "Cunning Action", "Roguish Archetype"],
            CharacterClass::Cleric => ["Divine Domain", "Channel Divinity", "Domain Feature"],
            CharacterClass::Ranger => ["Favored Enemy", "Fighting Style", "Ranger Conclave"],
            CharacterClass::Paladin => ["Divine Sense", "Fighting Style", "Sacred Oath"],
        }
    }

    /// Feature gained at a given level, if the path defines one.
    pub fn feature_at(&self, level: u32) -> Option<&'static str> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.progression_path().get(index).copied()
    }

    /// Ability increases applied on every level-up.
    pub fn stat_progression(&self) -> [(Ability, i32); 2] {
        match self {
            CharacterClass::Warrior => [(Ability::Strength, 2), (Ability::Constitution, 1)],
            CharacterClass::Mage => [(Ability::Intelligence, 2), (Ability::Wisdom, 1)],
            CharacterClass::Rogue => [(Ability::Dexterity, 2), (Ability::Charisma, 1)],
            CharacterClass::Cleric => [(Ability::Wisdom, 2), (Ability::Constitution, 1)],
            CharacterClass::Ranger => [(Ability::Dexterity, 2), (Ability::Strength, 1)],
            CharacterClass::Paladin => [(Ability::Strength, 2), (Ability::Charisma, 1)],
        }
    }

    pub fn starting_equipment(&self) -> [&'static str; 4] {
        match self {
            CharacterClass::Warrior => ["Longsword", "Shield", "Chain Mail", "Adventurer's Pack"],
            CharacterClass::Mage => ["Staff", "Spellbook", "Component Pouch", "Scholar's Pack"],
            CharacterClass::Rogue => [
                "Shortsword",
                "Leather Armor",
                "Thieves' Tools",
                "Burglar's Pack",
            ],
            CharacterClass::Cleric => ["Mace", "Scale Mail", "Holy Symbol", "Priest's Pack"],
            CharacterClass::Ranger => ["Longbow", "Leather Armor", "Explorer's Pack", "Quiver"],
            CharacterClass::Paladin => ["Longsword", "Chain Mail", "Holy Symbol", "Priest's Pack"],
        }
    }

    /// Skills a member of this class may choose: those governed by a primary attribute.
    pub fn skill_options(&self) -> Vec<Skill> {
        let primary = self.primary_attributes();
        Skill::all()
            .into_iter()
            .filter(|s| primary.contains(&s.ability()))
            .collect()
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Background
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Background {
    Noble,
    Soldier,
    Scholar,
    Criminal,
    Merchant,
    Artisan,
}

impl Background {
    pub fn all() -> [Background; 6] {
        [
            Background::Noble,
            Background::Soldier,
            Background::Scholar,
            Background::Criminal,
            Background::Merchant,
            Background::Artisan,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Background::Noble => "Noble",
            Background::Soldier => "Soldier",
            Background::Scholar => "Scholar",
            Background::Criminal => "Criminal",
            Background::Merchant => "Merchant",
            Background::Artisan => "Artisan",
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item: String,
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
}

impl InventoryItem {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Display for InventoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.item, self.quantity)
    }
}

// ============================================================================
// Character
// ============================================================================

/// Stats computed from ability scores and class. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub max_health: i32,
    pub defense: i32,
    pub initiative: i32,
    pub movement_speed: i32,
}

/// A finalized player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub race: Race,
    pub class: CharacterClass,
    pub background: Background,
    pub abilities: AbilityScores,
    pub skills: Vec<Skill>,
    pub inventory: Vec<InventoryItem>,
    pub level: u32,
    pub experience: u32,
    pub experience_threshold: u32,
}

impl Character {
    pub fn modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    pub fn modifiers(&self) -> [(Ability, i32); 6] {
        self.abilities.modifiers()
    }

    pub fn derived_stats(&self) -> DerivedStats {
        let dex = self.modifier(Ability::Dexterity);
        DerivedStats {
            max_health: self.class.hit_die().sides() as i32 + self.modifier(Ability::Constitution),
            defense: 10 + dex,
            initiative: dex,
            movement_speed: DEFAULT_MOVEMENT_SPEED,
        }
    }

    /// Features unlocked so far along the class progression path.
    pub fn features(&self) -> Vec<&'static str> {
        (1..=self.level).filter_map(|l| self.class.feature_at(l)).collect()
    }

    /// Add experience, levelling up as many times as it pays for.
    ///
    /// Each level-up spends the current threshold, applies the class stat
    /// progression and grows the threshold by half. Returns the number of
    /// levels gained.
    pub fn add_experience(&mut self, xp: u32) -> u32 {
        self.experience = self.experience.saturating_add(xp);
        let mut gained = 0;
        // a zero threshold would never terminate
        while self.experience_threshold > 0 && self.experience >= self.experience_threshold {
            self.experience -= self.experience_threshold;
            self.level_up();
            gained += 1;
        }
        gained
    }

    fn level_up(&mut self) {
        self.level += 1;
        for (ability, delta) in self.class.stat_progression() {
            self.abilities.add(ability, delta);
        }
        self.experience_threshold = self.experience_threshold.saturating_mul(3) / 2;
    }

    pub fn experience_to_next_level(&self) -> u32 {
        self.experience_threshold.saturating_sub(self.experience)
    }
}
