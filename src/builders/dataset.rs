use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builders::extractor::ExtractedRecord;
use crate::core::config::DatasetSettings;
use crate::core::engine::AggregateResult;

/// Rough characters-per-token ratio used for size estimates.
pub const CHARS_PER_TOKEN: usize = 4;

/// Length of a text in characters (Unicode scalar values).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn estimate_tokens(source_code_length: usize) -> usize {
    source_code_length / CHARS_PER_TOKEN
}

/// Values derived from a single recipe entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMetadata {
    pub source_code_length: usize,
    pub has_description: bool,
    pub has_options: bool,
    pub estimated_tokens: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeEntry {
    pub id: usize,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub recipe_type: String,
    pub source_code: String,
    pub options: IndexMap<String, String>,
    pub repository: String,
    pub metadata: RecipeMetadata,
}

impl RecipeEntry {
    pub fn from_record(id: usize, record: ExtractedRecord) -> Self {
        let source_code_length = char_len(&record.source_code);
        let metadata = RecipeMetadata {
            source_code_length,
            has_description: !record.description.trim().is_empty(),
            has_options: !record.options.is_empty(),
            estimated_tokens: estimate_tokens(source_code_length),
        };

        Self {
            id,
            name: record.name,
            description: record.description,
            recipe_type: record.recipe_type,
            source_code: record.source_code,
            options: record.options,
            repository: record.repository,
            metadata,
        }
    }
}

/// Aggregate figures over a whole recipe set. Always recomputed from the
/// entries, never edited. Count maps list labels in first-seen order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_recipes: usize,
    pub recipe_types: IndexMap<String, usize>,
    pub repositories: IndexMap<String, usize>,
    pub average_source_code_length: usize,
    pub total_source_code_length: usize,
    pub recipes_with_descriptions: usize,
    pub recipes_with_options: usize,
    pub estimated_total_tokens: usize,
}

impl Statistics {
    pub fn compute(entries: &[RecipeEntry]) -> Self {
        let mut stats = Statistics {
            total_recipes: entries.len(),
            ..Statistics::default()
        };

        for entry in entries {
            *stats
                .recipe_types
                .entry(entry.recipe_type.clone())
                .or_insert(0) += 1;
            *stats
                .repositories
                .entry(entry.repository.clone())
                .or_insert(0) += 1;

            stats.total_source_code_length += entry.metadata.source_code_length;
            if entry.metadata.has_description {
                stats.recipes_with_descriptions += 1;
            }
            if entry.metadata.has_options {
                stats.recipes_with_options += 1;
            }
            stats.estimated_total_tokens += entry.metadata.estimated_tokens;
        }

        stats.average_source_code_length = stats
            .total_source_code_length
            .checked_div(entries.len())
            .unwrap_or(0);
        stats
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub extraction_date: String,
    pub total_recipes: usize,
    pub source_format: String,
    pub description: String,
}

/// The normalized dataset written by `convert` and `extract --dataset`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatasetDocument {
    pub metadata: DocumentMetadata,
    pub statistics: Statistics,
    pub recipes: Vec<RecipeEntry>,
}

impl DatasetDocument {
    /// Assembles a document from `(id, record)` pairs. Ids come from the
    /// position of each record in its source-of-truth input.
    pub fn assemble<I>(rows: I, settings: &DatasetSettings) -> Self
    where
        I: IntoIterator<Item = (usize, ExtractedRecord)>,
    {
        let recipes: Vec<RecipeEntry> = rows
            .into_iter()
            .map(|(id, record)| RecipeEntry::from_record(id, record))
            .collect();
        let statistics = Statistics::compute(&recipes);

        Self {
            metadata: DocumentMetadata {
                extraction_date: settings.resolved_extraction_date(),
                total_recipes: recipes.len(),
                source_format: settings.source_format.clone(),
                description: settings.description.clone(),
            },
            statistics,
            recipes,
        }
    }

    /// Assembles a document from records in extraction order.
    pub fn from_records(records: Vec<ExtractedRecord>, settings: &DatasetSettings) -> Self {
        Self::assemble(records.into_iter().enumerate(), settings)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub class_name: String,
    pub display_name: String,
    pub description: String,
    pub recipe_type: String,
    pub repository: String,
    pub file_path: String,
}

/// Per-run extraction report, written next to the tabular output.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    pub extraction_date: String,
    pub total_recipes: usize,
    /// Recipe count per repository, in configured root order.
    pub repository_summary: IndexMap<String, usize>,
    pub recipe_types: IndexMap<String, usize>,
    pub recipes: Vec<SummaryEntry>,
}

impl ExtractionSummary {
    pub fn from_result(result: &AggregateResult, settings: &DatasetSettings) -> Self {
        let mut recipe_types = IndexMap::new();
        for record in &result.records {
            *recipe_types.entry(record.recipe_type.clone()).or_insert(0) += 1;
        }

        Self {
            extraction_date: settings.resolved_extraction_date(),
            total_recipes: result.total_recipes(),
            repository_summary: result
                .reports
                .iter()
                .map(|report| (report.name.clone(), report.recipe_count()))
                .collect(),
            recipe_types,
            recipes: result
                .records
                .iter()
                .map(|record| SummaryEntry {
                    class_name: record.class_name.clone(),
                    display_name: record.name.clone(),
                    description: record.description.clone(),
                    recipe_type: record.recipe_type.clone(),
                    repository: record.repository.clone(),
                    file_path: record.file_path.clone(),
                })
                .collect(),
        }
    }
}
