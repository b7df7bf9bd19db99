//! Persona and intent classification
//!
//! Keyword matching only:
//! - Persona: coarse tone of the user's message (confused, efficient, chatty, neutral)
//! - Intent: whether a message asks for research on a known company

use crate::models::PersonaTag;

/// Static keyword lists
const CONFUSED_KEYWORDS: &[&str] = &["i don't know", "not sure", "confused", "dont know", "idk"];

const EFFICIENT_KEYWORDS: &[&str] = &["quick", "short", "summary", "bullet"];

const CHATTY_KEYWORDS: &[&str] = &["story", "fun", "talk", "by the way"];

/// Declaration order doubles as tie-break order.
const PERSONA_KEYWORDS: &[(PersonaTag, &[&str])] = &[
    (PersonaTag::Confused, CONFUSED_KEYWORDS),
    (PersonaTag::Efficient, EFFICIENT_KEYWORDS),
    (PersonaTag::Chatty, CHATTY_KEYWORDS),
];

const RESEARCH_KEYWORD: &str = "research";

/// Persona detector
pub struct PersonaDetector;

impl PersonaDetector {
    /// Tag with the most keyword hits; earlier tags win ties; no hits → neutral.
    pub fn detect(text: &str) -> PersonaTag {
        let lowered = text.to_lowercase();

        let mut best = PersonaTag::Neutral;
        let mut best_score = 0;

        for (tag, keywords) in PERSONA_KEYWORDS {
            let score = keywords.iter().filter(|kw| lowered.contains(**kw)).count();
            if score > best_score {
                best = *tag;
                best_score = score;
            }
        }

        best
    }

    /// Lenient parse of a client-supplied persona; unknown values are neutral.
    pub fn parse(raw: &str) -> PersonaTag {
        match raw.trim().to_lowercase().as_str() {
            "confused" => PersonaTag::Confused,
            "efficient" => PersonaTag::Efficient,
            "chatty" => PersonaTag::Chatty,
            _ => PersonaTag::Neutral,
        }
    }
}

/// Whether the message literally asks for research.
pub fn wants_research(text: &str) -> bool {
    text.to_lowercase().contains(RESEARCH_KEYWORD)
}

/// First known entity (in the given order) named in the text.
pub fn mentioned_entity<'a>(text: &str, known: &'a [String]) -> Option<&'a str> {
    let lowered = text.to_lowercase();
    known
        .iter()
        .find(|entity| lowered.contains(&entity.to_lowercase()))
        .map(|entity| entity.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_persona_hits() {
        let cases = vec![
            ("I'm not sure where to start", PersonaTag::Confused),
            ("Give me the quick version", PersonaTag::Efficient),
            ("Tell me a story about your day", PersonaTag::Chatty),
            ("Hello there", PersonaTag::Neutral),
        ];

        for (text, expected) in cases {
            assert_eq!(PersonaDetector::detect(text), expected, "{}", text);
        }
    }

    #[test]
    fn test_highest_count_wins() {
        // one confused hit, two efficient hits
        assert_eq!(
            PersonaDetector::detect("not sure, just a quick summary"),
            PersonaTag::Efficient
        );
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        assert_eq!(PersonaDetector::detect("idk, keep it short"), PersonaTag::Confused);
        assert_eq!(PersonaDetector::detect("a short story"), PersonaTag::Efficient);
    }

    #[test]
    fn test_detection_is_case_insensitive() {
        assert_eq!(PersonaDetector::detect("BY THE WAY"), PersonaTag::Chatty);
        assert_eq!(PersonaDetector::detect("I DON'T KNOW"), PersonaTag::Confused);
    }

    #[test]
    fn test_parse_persona() {
        assert_eq!(PersonaDetector::parse(" Chatty "), PersonaTag::Chatty);
        assert_eq!(PersonaDetector::parse("grumpy"), PersonaTag::Neutral);
    }

    #[test]
    fn test_mentioned_entity_respects_order() {
        let known = vec!["Google".to_string(), "Microsoft".to_string()];
        assert_eq!(mentioned_entity("compare microsoft and GOOGLE", &known), Some("Google"));
        assert_eq!(mentioned_entity("research Initech", &known), None);
        assert!(wants_research("Please RESEARCH Initech"));
        assert!(!wants_research("hello"));
    }
}
