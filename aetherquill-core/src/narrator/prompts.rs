//! Prompt templates for the Game Master.

use crate::character::Character;

/// Persona prepended to every prompt unless the caller supplies its own.
pub const DEFAULT_SYSTEM_CONTEXT: &str = "You are the Game Master of a fantasy RPG. \
Generate engaging, consistent narrative responses that advance the story \
while maintaining game balance and player agency.";

/// Recent events included in a prompt.
pub const MAX_PROMPT_EVENTS: usize = 5;
/// Longest scene excerpt included in a prompt, in characters.
pub const MAX_SCENE_CHARS: usize = 1200;

/// One-paragraph description of a character for prompts.
pub fn character_summary(character: &Character) -> String {
    let stats = character
        .abilities
        .iter()
        .map(|(ability, score)| {
            format!("{} {score} ({:+})", ability.abbreviation(), character.modifier(ability))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let skills = if character.skills.is_empty() {
        "none".to_string()
    } else {
        character
            .skills
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "{name}, a level {level} {race} {class} with a {background} background.\n\
         Stats: {stats}\n\
         Skills: {skills}",
        name = character.name,
        level = character.level,
        race = character.race,
        class = character.class,
        background = character.background,
    )
}

pub fn weather_prompt(character: &Character, location: &str) -> String {
    format!(
        "{summary}\n\n\
         Describe the current weather around {location} in one or two sentences. \
         Mention conditions such as rain, wind, storm, snow, fog or clear skies plainly.",
        summary = character_summary(character),
    )
}

pub fn inventory_prompt(character: &Character) -> String {
    format!(
        "{summary}\n\n\
         List 5 starting items suited to {name}. \
         Write one item per line as a bullet: \"- Item name (quantity)\".",
        summary = character_summary(character),
        name = character.name,
    )
}

pub fn opening_scene_prompt(character: &Character, location: &str, weather: &str) -> String {
    format!(
        "{summary}\n\n\
         Location: {location}\n\
         Weather: {weather}\n\n\
         Craft an engaging opening scene for {name} set in {location} that hints at an \
         upcoming adventure. Keep it to around 5 sentences.",
        summary = character_summary(character),
        name = character.name,
    )
}

pub fn scene_prompt(
    character: &Character,
    location: &str,
    weather: &str,
    recent_events: &[String],
) -> String {
    format!(
        "{summary}\n\n\
         Location: {location}\n\
         Weather: {weather}\n\
         Recent events: {events}\n\n\
         Describe the scene around {name}. Keep it brief but atmospheric, focusing on \
         sensory details, and suggest what {name} might do next.",
        summary = character_summary(character),
        events = recent_events_line(recent_events),
        name = character.name,
    )
}

pub fn action_prompt(
    character: &Character,
    action: &str,
    current_scene: &str,
    location: &str,
    weather: &str,
    recent_events: &[String],
) -> String {
    format!(
        "{summary}\n\n\
         Location: {location}\n\
         Weather: {weather}\n\
         Current scene: {scene}\n\
         Recent events: {events}\n\n\
         {name} attempts to {action}. Describe the outcome with sensory details and any \
         consequences, updating the scene. Keep it under 3 sentences.",
        summary = character_summary(character),
        scene = truncate_chars(current_scene.trim(), MAX_SCENE_CHARS),
        events = recent_events_line(recent_events),
        name = character.name,
        action = action.trim(),
    )
}

fn recent_events_line(events: &[String]) -> String {
    let start = events.len().saturating_sub(MAX_PROMPT_EVENTS);
    let recent = &events[start..];
    if recent.is_empty() {
        "none".to_string()
    } else {
        recent.join(" -> ")
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_character;

    #[test]
    fn test_character_summary() {
        let character = sample_character("Thalia");
        let summary = character_summary(&character);
        assert!(summary.starts_with("Thalia, a level 1 "));
        assert!(summary.contains("STR "));
        assert!(summary.contains("Skills: "));
    }

    #[test]
    fn test_action_prompt_bounds_history() {
        let character = sample_character("Thalia");
        let events: Vec<String> = (0..10).map(|i| format!("event {i}")).collect();
        let prompt = action_prompt(&character, "open the door", "A hall.", "Keep", "fog", &events);
        assert!(prompt.contains("event 9"));
        assert!(prompt.contains("event 5"));
        assert!(!prompt.contains("event 4"));
        assert!(prompt.contains("Thalia attempts to open the door."));
    }

    #[test]
    fn test_scene_is_truncated() {
        let character = sample_character("Thalia");
        let scene = "x".repeat(MAX_SCENE_CHARS + 50);
        let prompt = action_prompt(&character, "wait", &scene, "Keep", "clear", &[]);
        assert!(!prompt.contains(&"x".repeat(MAX_SCENE_CHARS + 1)));
        assert!(prompt.contains("Recent events: none"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 5), "hi");
    }
}
