//! Coarse feature extraction for the Analyzer (§4.1): entity candidates,
//! keywords, and intent, all heuristic — no trained NER/intent model is in
//! scope, only the signal this crate needs to drive cache invalidation and
//! routing diagnostics.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Quoted spans ("..." / «...») are treated as entity candidates regardless
/// of capitalisation.
static QUOTED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["«]([^"»]{2,})["»]"#).expect("invalid quoted-span pattern"));

/// Runs of one or more capitalised words (Latin or Cyrillic), the other
/// entity-candidate signal. Excludes a lone capitalised word at the very
/// start of the string, which is just normal sentence case.
static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[.!?]\s+|\s)([A-ZА-ЯЁ][\w'-]*(?:\s+[A-ZА-ЯЁ][\w'-]*)*)")
        .expect("invalid capitalised-run pattern")
});

/// Closed stopword list (Russian + English) filtered out of keyword
/// candidates. Not exhaustive — just the high-frequency function words that
/// would otherwise dominate every query.
const STOPWORDS: &[&str] = &[
    "что", "как", "где", "когда", "почему", "кто", "это", "для", "или", "если", "такое", "такой",
    "какая", "какой", "какие", "все", "всех", "есть", "быть", "его", "она", "они", "был", "была",
    "было", "были", "при", "про", "над", "под", "без", "через",
    "the", "and", "for", "with", "that", "this", "from", "into", "what", "who", "when", "where",
    "why", "how", "are", "was", "were", "does", "did", "have", "has", "had",
];

/// Leading verb/question-word → intent label, checked in order against the
/// lowercased start of the query. Falls back to `"general"`.
const INTENT_LEXICON: &[(&str, &str)] = &[
    ("что такое", "definition"),
    ("кто такой", "identification"),
    ("кто такая", "identification"),
    ("сравни", "comparison"),
    ("проанализируй", "analysis"),
    ("оцени", "evaluation"),
    ("найди", "search"),
    ("перечисли", "enumeration"),
    ("назови", "enumeration"),
    ("объясни", "explanation"),
    ("разработай", "planning"),
    ("what is", "definition"),
    ("who is", "identification"),
    ("compare", "comparison"),
    ("analyze", "analysis"),
    ("list", "enumeration"),
    ("define", "definition"),
    ("explain", "explanation"),
    ("how", "howto"),
    ("why", "explanation"),
];

/// Entity candidates: quoted spans and capitalised runs, deduplicated in
/// order of first appearance, capped to keep `QueryMetadata` bounded.
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut entities = Vec::new();

    for capture in QUOTED_SPAN.captures_iter(text).chain(CAPITALIZED_RUN.captures_iter(text)) {
        let candidate = capture[1].trim();
        if candidate.is_empty() {
            continue;
        }
        if seen.insert(candidate.to_string()) {
            entities.push(candidate.to_string());
            if entities.len() >= 16 {
                break;
            }
        }
    }

    entities
}

/// Stopword-filtered keyword tokens: lowercased, alphanumeric-only,
/// deduplicated, longer than three characters, capped at sixteen.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for word in text.split_whitespace() {
        let cleaned: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        let lowered = cleaned.to_lowercase();
        if lowered.chars().count() > 3 && !STOPWORDS.contains(&lowered.as_str()) && seen.insert(lowered.clone()) {
            keywords.push(lowered);
            if keywords.len() >= 16 {
                break;
            }
        }
    }
    keywords
}

/// Intent label from the query's leading verb or question word, falling
/// back to `"general"` when nothing in `INTENT_LEXICON` matches.
pub fn extract_intent(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    for (prefix, intent) in INTENT_LEXICON {
        if lowered.starts_with(prefix) {
            return intent.to_string();
        }
    }
    "general".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_span_is_an_entity_candidate() {
        let entities = extract_entities(r#"What does "quantum entanglement" mean?"#);
        assert!(entities.iter().any(|e| e == "quantum entanglement"));
    }

    #[test]
    fn capitalised_run_is_an_entity_candidate() {
        let entities = extract_entities("Compare Python and JavaScript for backend work");
        assert!(entities.contains(&"Python".to_string()));
        assert!(entities.contains(&"JavaScript".to_string()));
    }

    #[test]
    fn leading_capitalised_word_alone_is_not_flagged() {
        let entities = extract_entities("Define recursion");
        assert!(!entities.contains(&"Define".to_string()));
    }

    #[test]
    fn keywords_drop_stopwords_and_short_words() {
        let keywords = extract_keywords("What is the difference between Python and Rust?");
        assert!(!keywords.contains(&"what".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
        assert!(keywords.contains(&"difference".to_string()));
        assert!(keywords.contains(&"python".to_string()));
    }

    #[test]
    fn intent_matches_leading_question_word() {
        assert_eq!(extract_intent("What is Rust?"), "definition");
        assert_eq!(extract_intent("Сравни Python и Rust"), "comparison");
        assert_eq!(extract_intent("Разработай стратегию выхода на рынок"), "planning");
    }

    #[test]
    fn intent_falls_back_to_general() {
        assert_eq!(extract_intent("Rust is a systems language"), "general");
    }
}
