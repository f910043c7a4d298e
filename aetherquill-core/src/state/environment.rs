//! Environmental effects derived from weather text.

const KEYWORDS: &[(&[&str], &[&str])] = &[
    (&["rain"], &["wet", "poor visibility"]),
    (&["wind"], &["breeze"]),
    (&["storm"], &["thunder", "lightning"]),
    (&["snow"], &["cold", "slippery"]),
    (&["fog"], &["limited visibility"]),
    (&["clear", "sun"], &["good visibility"]),
];

/// Tags for every weather keyword found in `weather`, in table order.
///
/// Matching is a case-insensitive substring test, so "raining" and
/// "Thunderstorm" both count. Several keywords may apply at once.
pub fn environmental_effects(weather: &str) -> Vec<String> {
    let weather = weather.to_lowercase();
    let mut effects: Vec<String> = Vec::new();

    for (keywords, tags) in KEYWORDS {
        if keywords.iter().any(|k| weather.contains(k)) {
            for tag in *tags {
                if !effects.iter().any(|e| e == tag) {
                    effects.push(tag.to_string());
                }
            }
        }
    }

    effects
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keyword() {
        assert_eq!(environmental_effects("A light rain falls."), ["wet", "poor visibility"]);
        assert_eq!(environmental_effects("Thick FOG"), ["limited visibility"]);
    }

    #[test]
    fn test_effects_are_additive() {
        let effects = environmental_effects("A windy snowstorm howls");
        assert_eq!(effects, ["breeze", "thunder", "lightning", "cold", "slippery"]);
    }

    #[test]
    fn test_clear_and_sunny_share_a_tag() {
        assert_eq!(environmental_effects("Clear and sunny"), ["good visibility"]);
    }

    #[test]
    fn test_no_keywords() {
        assert!(environmental_effects("Overcast").is_empty());
        assert!(environmental_effects("").is_empty());
    }
}
