use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{Read, Write};

use crate::builders::extractor::{ExtractedRecord, UNKNOWN_REPOSITORY, parse_options};

pub const COLUMN_NAME: &str = "Recipe name";
pub const COLUMN_DESCRIPTION: &str = "Recipe description";
pub const COLUMN_TYPE: &str = "Recipe type";
pub const COLUMN_SOURCE_CODE: &str = "Recipe source code";
pub const COLUMN_OPTIONS: &str = "Recipe options";
pub const COLUMN_REPOSITORY: &str = "Repository";

/// Name-column text of the description row written under the header. A first
/// data row carrying exactly this name is a pseudo-header, not a recipe.
pub const HEADER_SENTINEL: &str = "The name of the recipe.";

const SENTINEL_ROW: [&str; 6] = [
    HEADER_SENTINEL,
    "The description of the recipe.",
    "Differentiate between recipe types and repositories.",
    "The full source code of the recipe.",
    "JSON format of recipe options.",
    "Source repository of the recipe.",
];

/// Which header names map to which record fields, and what a missing column
/// degrades to.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    pub name: String,
    pub description: String,
    pub recipe_type: String,
    pub source_code: String,
    pub options: String,
    pub repository: String,
    /// Value used when the repository column is absent.
    pub missing_repository: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: COLUMN_NAME.to_string(),
            description: COLUMN_DESCRIPTION.to_string(),
            recipe_type: COLUMN_TYPE.to_string(),
            source_code: COLUMN_SOURCE_CODE.to_string(),
            options: COLUMN_OPTIONS.to_string(),
            repository: COLUMN_REPOSITORY.to_string(),
            missing_repository: UNKNOWN_REPOSITORY.to_string(),
        }
    }
}

impl ColumnMap {
    /// Column names used by spreadsheet exports fed to the fine-tuning
    /// converter.
    pub fn streaming() -> Self {
        Self {
            name: "Name".to_string(),
            description: "Description".to_string(),
            recipe_type: "Recipe type".to_string(),
            source_code: "Source code preview".to_string(),
            options: "Recipe Options".to_string(),
            ..Self::default()
        }
    }
}

/// One data row, with missing columns already replaced by their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRow {
    /// Zero-based position among the data rows (the sentinel row included).
    pub index: usize,
    pub name: String,
    pub description: String,
    pub recipe_type: String,
    pub source_code: String,
    pub options_text: String,
    pub repository: String,
}

impl TabularRow {
    /// Converts the row into a record. Option text is parsed best-effort.
    pub fn into_record(self) -> (usize, ExtractedRecord) {
        let record = ExtractedRecord {
            class_name: self.name.clone(),
            name: self.name,
            description: self.description,
            recipe_type: self.recipe_type,
            source_code: self.source_code,
            options: parse_options(&self.options_text),
            repository: self.repository,
            file_path: String::new(),
        };
        (self.index, record)
    }
}

/// Reads data rows from CSV text with a header line.
///
/// Rows may be shorter than the header; absent cells count as missing
/// columns.
pub fn read_rows<R: Read>(reader: R, columns: &ColumnMap) -> Result<Vec<TabularRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("Failed to read CSV header")?
        .clone();
    let positions: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(position, header)| (header, position))
        .collect();

    let mut rows = Vec::new();
    for (index, result) in csv_reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {index}"))?;
        let cell = |column: &str, default: &str| -> String {
            positions
                .get(column)
                .and_then(|&position| record.get(position))
                .unwrap_or(default)
                .to_string()
        };

        let name = cell(&columns.name, "");
        if index == 0 && name == HEADER_SENTINEL {
            continue;
        }

        rows.push(TabularRow {
            index,
            name,
            description: cell(&columns.description, ""),
            recipe_type: cell(&columns.recipe_type, ""),
            source_code: cell(&columns.source_code, ""),
            options_text: cell(&columns.options, ""),
            repository: cell(&columns.repository, &columns.missing_repository),
        });
    }

    Ok(rows)
}

/// Reads `(id, record)` pairs using the standard column set.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<(usize, ExtractedRecord)>> {
    Ok(read_rows(reader, &ColumnMap::default())?
        .into_iter()
        .map(TabularRow::into_record)
        .collect())
}

/// Writes records with the standard header followed by the sentinel
/// description row.
pub fn write_records<W: Write>(writer: W, records: &[ExtractedRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        COLUMN_NAME,
        COLUMN_DESCRIPTION,
        COLUMN_TYPE,
        COLUMN_SOURCE_CODE,
        COLUMN_OPTIONS,
        COLUMN_REPOSITORY,
    ])?;
    csv_writer.write_record(SENTINEL_ROW)?;

    for record in records {
        let options = record.options_text();
        csv_writer.write_record([
            record.name.as_str(),
            record.description.as_str(),
            record.recipe_type.as_str(),
            record.source_code.as_str(),
            options.as_str(),
            record.repository.as_str(),
        ])?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}
