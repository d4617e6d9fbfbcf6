//! Query complexity classification: heuristic regex/structural scoring, with
//! an optional model-backed mode that silently degrades to heuristics.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Complexity;

/// Patterns that indicate a short, definitional query.
static SIMPLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)что\s+такое",
        r"(?i)кто\s+такой",
        r"(?i)когда\b",
        r"(?i)где\s+находится",
        r"(?i)какая\s+столица",
        r"(?i)дай\s+определение",
        r"(?i)назови\b",
        r"(?i)перечисли\b",
        r"(?i)^what\s+is\b",
        r"(?i)^who\s+is\b",
        r"(?i)^define\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid simple pattern"))
    .collect()
});

/// Patterns that indicate an analytical, multi-step query. Order matters:
/// the first match wins when several patterns match the same query.
static COMPLEX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)проанализируй\b",
        r"(?i)сравни\b",
        r"(?i)оцени\s+влияние",
        r"(?i)найди\s+все",
        r"(?i)исследуй\b",
        r"(?i)определи\s+взаимосвязь",
        r"(?i)сделай\s+прогноз",
        r"(?i)разработай\s+стратегию",
        r"(?i)\banalyze\b",
        r"(?i)\bcompare\b",
        r"(?i)\bstrategy\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid complex pattern"))
    .collect()
});

/// Connective keywords whose accumulation (≥ 2) promotes `complex` to
/// `multi_hop`.
const MULTI_HOP_KEYWORDS: &[&str] = &[
    "и",
    "а также",
    "кроме того",
    "учитывая",
    "на основе",
    "исходя из",
    "в контексте",
    "and also",
    "based on",
    "in addition",
];

static ENUMERATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.").expect("invalid enumeration pattern"));

/// Result of one classification pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub complexity: Complexity,
    pub confidence: f64,
}

/// Capability that scores a feature vector into complexity-class
/// probabilities. Training it and its concrete implementation are out of
/// scope; the classifier only performs inference and reports the feature
/// vector used, for later offline training.
pub trait ComplexityModel: Send + Sync {
    /// Returns `(complexity, confidence)` or `None` if inference failed, in
    /// which case the classifier silently falls back to heuristic mode.
    fn predict(&self, features: &[f64]) -> Option<(Complexity, f64)>;
}

/// Heuristic + optional model-backed complexity classifier.
pub struct Classifier {
    model: Option<Box<dyn ComplexityModel>>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { model: None }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: Box<dyn ComplexityModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Feature vector: `[len, word_count, ?-count, ,-count,
    /// onehot(simple_patterns)..., onehot(complex_patterns)...,
    /// onehot(multi_hop_keywords)...]`.
    pub fn extract_features(&self, query: &str) -> Vec<f64> {
        let mut features = Vec::with_capacity(4 + SIMPLE_PATTERNS.len() + COMPLEX_PATTERNS.len() + MULTI_HOP_KEYWORDS.len());
        features.push(query.len() as f64);
        features.push(query.split_whitespace().count() as f64);
        features.push(query.matches('?').count() as f64);
        features.push(query.matches(',').count() as f64);
        for pattern in SIMPLE_PATTERNS.iter() {
            features.push(if pattern.is_match(query) { 1.0 } else { 0.0 });
        }
        for pattern in COMPLEX_PATTERNS.iter() {
            features.push(if pattern.is_match(query) { 1.0 } else { 0.0 });
        }
        for keyword in MULTI_HOP_KEYWORDS {
            features.push(if query.contains(keyword) { 1.0 } else { 0.0 });
        }
        features
    }

    /// Classify a query, preferring the model when one is configured.
    pub fn classify(&self, query: &str) -> Classification {
        if let Some(model) = &self.model {
            let features = self.extract_features(query);
            if let Some((complexity, confidence)) = model.predict(&features) {
                return Classification { complexity, confidence };
            }
            tracing::warn!("complexity model inference failed, falling back to heuristics");
        }
        self.classify_heuristic(query)
    }

    /// Always-available heuristic classification (§4.2).
    pub fn classify_heuristic(&self, query: &str) -> Classification {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Classification {
                complexity: Complexity::Simple,
                confidence: 0.85,
            };
        }

        let lowered = trimmed.to_lowercase();

        if SIMPLE_PATTERNS.iter().any(|p| p.is_match(&lowered)) {
            return Classification {
                complexity: Complexity::Simple,
                confidence: 0.85,
            };
        }

        if let Some(_first_match) = COMPLEX_PATTERNS.iter().find(|p| p.is_match(&lowered)) {
            let multi_hop_count = MULTI_HOP_KEYWORDS
                .iter()
                .filter(|kw| lowered.contains(*kw))
                .count();
            let complexity = if multi_hop_count >= 2 {
                Complexity::MultiHop
            } else {
                Complexity::Complex
            };
            return Classification {
                complexity,
                confidence: 0.75,
            };
        }

        let word_count = lowered.split_whitespace().count();
        let (mut complexity, mut confidence) = if word_count < 10 {
            (Complexity::Simple, 0.7)
        } else if word_count < 30 {
            (Complexity::Moderate, 0.6)
        } else if word_count < 50 {
            (Complexity::Complex, 0.6)
        } else {
            (Complexity::MultiHop, 0.7)
        };

        if lowered.matches('?').count() > 1 {
            complexity = Complexity::MultiHop;
            confidence *= 0.9;
        }

        if ENUMERATION_PATTERN.is_match(&lowered) {
            if complexity == Complexity::Simple {
                complexity = Complexity::Moderate;
            }
            confidence *= 0.95;
        }

        Classification { complexity, confidence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_simple() {
        let c = Classifier::new().classify_heuristic("");
        assert_eq!(c.complexity, Complexity::Simple);
        assert_eq!(c.confidence, 0.85);
    }

    #[test]
    fn definitional_query_is_simple() {
        let c = Classifier::new().classify_heuristic("Что такое Python?");
        assert_eq!(c.complexity, Complexity::Simple);
        assert_eq!(c.confidence, 0.85);
    }

    #[test]
    fn analytical_query_is_complex() {
        let c = Classifier::new().classify_heuristic("Сравни Python и JavaScript");
        assert_eq!(c.complexity, Complexity::Complex);
        assert_eq!(c.confidence, 0.75);
    }

    #[test]
    fn multi_hop_requires_two_connectives() {
        let c = Classifier::new().classify_heuristic(
            "Проанализируй влияние AI на экономику и предложи стратегию, учитывая кроме того исторический контекст",
        );
        assert_eq!(c.complexity, Complexity::MultiHop);
    }

    #[test]
    fn short_query_falls_back_to_word_count_bucket() {
        let c = Classifier::new().classify_heuristic("hello there friend");
        assert_eq!(c.complexity, Complexity::Simple);
        assert_eq!(c.confidence, 0.7);
    }

    #[test]
    fn multiple_question_marks_promote_to_multi_hop() {
        let c = Classifier::new().classify_heuristic("what is this? why? how?");
        assert_eq!(c.complexity, Complexity::MultiHop);
    }

    #[test]
    fn enumeration_promotes_simple_to_moderate() {
        let c = Classifier::new().classify_heuristic("list these 1. one 2. two");
        assert_eq!(c.complexity, Complexity::Moderate);
    }

    struct AlwaysFails;
    impl ComplexityModel for AlwaysFails {
        fn predict(&self, _features: &[f64]) -> Option<(Complexity, f64)> {
            None
        }
    }

    #[test]
    fn model_failure_falls_back_to_heuristics() {
        let c = Classifier::with_model(Box::new(AlwaysFails)).classify("Что такое Python?");
        assert_eq!(c.complexity, Complexity::Simple);
    }
}
