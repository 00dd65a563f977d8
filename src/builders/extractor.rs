use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::builders::patterns::{RecipePatterns, StructuralMatcher};

pub const UNKNOWN_REPOSITORY: &str = "unknown";

/// One recipe found in a source file.
///
/// Records are created by [`MetadataExtractor`], labelled by the classifier
/// and tagged with their repository by the engine. Nothing changes them after
/// that.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub class_name: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub recipe_type: String,
    pub source_code: String,
    #[serde(default)]
    /// `@Option` fields in declaration order.
    pub options: IndexMap<String, String>,
    #[serde(default = "default_repository")]
    pub repository: String,
    #[serde(default)]
    pub file_path: String,
}

fn default_repository() -> String {
    UNKNOWN_REPOSITORY.to_string()
}

impl ExtractedRecord {
    pub fn classified(mut self, label: &str) -> Self {
        self.recipe_type = label.to_string();
        self
    }

    pub fn tagged(mut self, repository: &str) -> Self {
        self.repository = repository.to_string();
        self
    }

    /// Options rendered the way they are stored in tabular output: pretty
    /// printed JSON, or `{}` when the recipe declares none.
    pub fn options_text(&self) -> String {
        serde_json::to_string_pretty(&self.options).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Best-effort parse of stored option text.
///
/// Anything that is not a JSON object yields an empty map. Key order is kept
/// as written and non-string values are kept in their JSON text form.
pub fn parse_options(text: &str) -> IndexMap<String, String> {
    if text.trim().is_empty() {
        return IndexMap::new();
    }
    match serde_json::from_str::<IndexMap<String, serde_json::Value>>(text) {
        Ok(map) => map
            .into_iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect(),
        Err(_) => IndexMap::new(),
    }
}

/// Why a file produced no record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The file does not declare a recipe class.
    NotARecipe,
    /// The file could not be read (permissions, invalid UTF-8, ...).
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotARecipe => write!(f, "not a recipe"),
            SkipReason::Unreadable(reason) => write!(f, "unreadable: {reason}"),
        }
    }
}

/// Result of processing one candidate file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Extracted(ExtractedRecord),
    Skipped(SkipReason),
}

/// Pulls recipe metadata out of matched source text.
pub struct MetadataExtractor {
    patterns: RecipePatterns,
}

impl MetadataExtractor {
    pub fn new(patterns: RecipePatterns) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &RecipePatterns {
        &self.patterns
    }

    /// Builds an unclassified record from file text.
    ///
    /// Returns `None` when no recipe class declaration can be located. The
    /// display name falls back to the class name and the description to an
    /// empty string.
    pub fn extract(&self, content: &str, file_path: &str) -> Option<ExtractedRecord> {
        let class_name = self.patterns.class_name(content)?;
        let name = self.patterns.display_name(content).unwrap_or(class_name);
        let description = self.patterns.description(content).unwrap_or_default();

        Some(ExtractedRecord {
            class_name: class_name.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            recipe_type: String::new(),
            source_code: content.to_string(),
            options: self.patterns.options(content),
            repository: UNKNOWN_REPOSITORY.to_string(),
            file_path: file_path.to_string(),
        })
    }

    /// Reads `path` and extracts a record from it.
    ///
    /// Read failures are logged and reported as [`SkipReason::Unreadable`];
    /// they never abort a scan.
    pub fn extract_file(&self, path: &Path) -> FileOutcome {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                return FileOutcome::Skipped(SkipReason::Unreadable(e.to_string()));
            }
        };

        if !self.patterns.is_recipe(&content) {
            return FileOutcome::Skipped(SkipReason::NotARecipe);
        }

        match self.extract(&content, &path.to_string_lossy()) {
            Some(record) => FileOutcome::Extracted(record),
            None => FileOutcome::Skipped(SkipReason::NotARecipe),
        }
    }
}
