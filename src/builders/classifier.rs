use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_LABEL: &str = "Java";

/// What a classification rule inspects.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleTarget {
    /// The raw file content, matched case-sensitively.
    Content,
    /// The lower-cased file path.
    Path,
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTarget::Content => write!(f, "content"),
            RuleTarget::Path => write!(f, "path"),
        }
    }
}

/// A single `needles -> label` rule. The rule fires when any needle is a
/// substring of its target.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClassificationRule {
    pub target: RuleTarget,
    pub needles: Vec<String>,
    pub label: String,
}

impl ClassificationRule {
    pub fn new(target: RuleTarget, needles: &[&str], label: &str) -> Self {
        Self {
            target,
            needles: needles.iter().map(|n| n.to_string()).collect(),
            label: label.to_string(),
        }
    }

    fn fires(&self, content: &str, lowered_path: &str) -> bool {
        let haystack = match self.target {
            RuleTarget::Content => content,
            RuleTarget::Path => lowered_path,
        };
        self.needles
            .iter()
            .any(|needle| haystack.contains(needle.as_str()))
    }
}

/// Ordered, first-match-wins rule list.
///
/// Rule order is the precedence contract: a path containing both `spring` and
/// `test` is labelled by whichever rule comes first.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Classifier {
    pub default_label: String,
    pub rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl Classifier {
    /// The stock rule set for OpenRewrite repositories.
    pub fn standard() -> Self {
        Self {
            default_label: DEFAULT_LABEL.to_string(),
            rules: vec![
                ClassificationRule::new(RuleTarget::Content, &["Refaster"], "Refaster"),
                ClassificationRule::new(RuleTarget::Path, &["migrate"], "Migration"),
                ClassificationRule::new(
                    RuleTarget::Path,
                    &["static", "analysis"],
                    "Static Analysis",
                ),
                ClassificationRule::new(RuleTarget::Path, &["logging"], "Logging"),
                ClassificationRule::new(RuleTarget::Path, &["spring"], "Spring"),
                ClassificationRule::new(RuleTarget::Path, &["test"], "Testing"),
            ],
        }
    }

    /// Returns the label of the first rule that fires, or the default label.
    pub fn classify(&self, content: &str, path: &str) -> &str {
        let lowered_path = path.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.fires(content, &lowered_path))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.default_label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_labels() {
        let classifier = Classifier::standard();
        let plain = "class A extends Recipe {}";
        assert_eq!(classifier.classify(plain, "/r/rewrite-migrate-java/A.java"), "Migration");
        assert_eq!(classifier.classify(plain, "/r/rewrite-static-analysis/A.java"), "Static Analysis");
        assert_eq!(classifier.classify(plain, "/r/dataflow/Analysis/A.java"), "Static Analysis");
        assert_eq!(classifier.classify(plain, "/r/rewrite-logging-frameworks/A.java"), "Logging");
        assert_eq!(classifier.classify(plain, "/r/rewrite-spring/A.java"), "Spring");
        assert_eq!(classifier.classify(plain, "/r/rewrite-testing-frameworks/A.java"), "Testing");
        assert_eq!(classifier.classify(plain, "/r/rewrite/A.java"), "Java");
    }

    #[test]
    fn test_content_rule_wins_over_path_rules() {
        let classifier = Classifier::standard();
        let refaster = "@RecipeDescriptor class A extends Recipe { Refaster template; }";
        assert_eq!(classifier.classify(refaster, "/r/rewrite-migrate-java/A.java"), "Refaster");
    }

    #[test]
    fn test_precedence_between_path_rules() {
        let classifier = Classifier::standard();
        // Both "spring" and "test" appear; "spring" is earlier in the list.
        assert_eq!(classifier.classify("", "/r/spring-test/A.java"), "Spring");
        // "migrate" beats "logging".
        assert_eq!(classifier.classify("", "/r/logging/migrate/A.java"), "Migration");
    }

    #[test]
    fn test_path_rules_are_case_insensitive_but_content_is_not() {
        let classifier = Classifier::standard();
        assert_eq!(classifier.classify("", "/R/Rewrite-SPRING/A.java"), "Spring");
        assert_eq!(classifier.classify("refaster", "/r/core/A.java"), "Java");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = Classifier::standard();
        let first = classifier.classify("x", "/r/logging/test/A.java").to_string();
        for _ in 0..3 {
            assert_eq!(classifier.classify("x", "/r/logging/test/A.java"), first);
        }
    }

    #[test]
    fn test_custom_rules_replace_standard_set() {
        let classifier = Classifier {
            default_label: "Other".to_string(),
            rules: vec![ClassificationRule::new(RuleTarget::Path, &["kotlin"], "Kotlin")],
        };
        assert_eq!(classifier.classify("", "/src/Kotlin/A.kt"), "Kotlin");
        assert_eq!(classifier.classify("", "/r/rewrite-spring/A.java"), "Other");
    }
}
