use anyhow::Result;
use std::collections::HashSet;

use crate::builders::classifier::{ClassificationRule, Classifier};
use crate::core::config::{self, ExtractorConfig, RepositorySource};

/// The `ConfigValidator` trait defines the public interface for validating the
/// extractor configuration.
///
/// Validation never fails the load itself: every problem is reported as a
/// human-readable issue so `validate` can list all of them at once.
pub trait ConfigValidator {
    /// Performs a full validation of the `ExtractorConfig` and returns
    /// a list of issues found.
    fn validate_config(&self, config: &ExtractorConfig) -> Result<Vec<String>>;

    /// Validates the classifier rule list on its own.
    fn validate_classifier(&self, classifier: &Classifier) -> Result<Vec<String>>;
}

/// The `StandardValidator` is a concrete implementation of `ConfigValidator`.
///
/// It checks version compatibility, scan settings, repository roots and the
/// classification rules.
pub struct StandardValidator;

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }

    /// Repository names become record tags, so they must be present and unique.
    fn check_repositories(&self, repositories: &[RepositorySource]) -> Vec<String> {
        let mut issues = Vec::new();
        let mut names = HashSet::new();

        for source in repositories {
            if source.name.trim().is_empty() {
                issues.push(format!(
                    "Repository at {} has an empty name",
                    source.path.display()
                ));
            } else if !names.insert(source.name.as_str()) {
                issues.push(format!("Duplicate repository name: {}", source.name));
            }

            if !source.path.exists() {
                issues.push(format!(
                    "Repository root not found: {} ({})",
                    source.name,
                    source.path.display()
                ));
            } else if !source.path.is_dir() {
                issues.push(format!(
                    "Repository root is not a directory: {} ({})",
                    source.name,
                    source.path.display()
                ));
            }
        }
        issues
    }

    fn check_rule(&self, position: usize, rule: &ClassificationRule) -> Vec<String> {
        let mut issues = Vec::new();

        if rule.label.trim().is_empty() {
            issues.push(format!("Classifier rule {position} has an empty label"));
        }
        if rule.needles.is_empty() {
            issues.push(format!(
                "Classifier rule {position} ({}) has no needles and will never fire",
                rule.label
            ));
        }
        if rule.needles.iter().any(|needle| needle.is_empty()) {
            issues.push(format!(
                "Classifier rule {position} ({}) has an empty needle that matches every {}",
                rule.label, rule.target
            ));
        }
        issues
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(&self, config: &ExtractorConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if config.version != config::CONFIG_VERSION {
            issues.push(format!("Unsupported config version: {}", config.version));
        }

        let extension = config.scan.source_extension.trim_start_matches('.');
        if extension.is_empty() {
            issues.push("Source extension cannot be empty".to_string());
        }

        if config.scan.markers.is_empty() {
            issues.push("No recipe superclass markers configured".to_string());
        }
        for marker in &config.scan.markers {
            if marker.trim().is_empty() || marker.contains(char::is_whitespace) {
                issues.push(format!("Invalid recipe superclass marker: '{marker}'"));
            }
        }

        issues.extend(self.check_repositories(&config.repositories));
        issues.extend(self.validate_classifier(&config.classifier)?);

        Ok(issues)
    }

    fn validate_classifier(&self, classifier: &Classifier) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if classifier.default_label.trim().is_empty() {
            issues.push("Classifier default label cannot be empty".to_string());
        }
        for (position, rule) in classifier.rules.iter().enumerate() {
            issues.extend(self.check_rule(position, rule));
        }

        Ok(issues)
    }
}
