use anyhow::{Context, Result};
use colored::Colorize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::builders::dataset::{DatasetDocument, ExtractionSummary};
use crate::builders::reporter::{ConsoleReporter, StatusReporter};
use crate::builders::storage::{AtomicFileSink, OutputSink, write_json};
use crate::builders::tabular::{self, ColumnMap};
use crate::builders::training::{
    ConversionOptions, TrainingConverter, TrainingDocument, TrainingTemplates, write_jsonl,
};
use crate::core::config::{ConfigManager, ConfigProvider, ExtractorConfig, RepositorySource};
use crate::core::engine::{AggregateResult, ExtractionEngine};

/// Output paths and root overrides for one `extract` run.
#[derive(Debug, Clone, Default)]
pub struct ExtractRequest {
    /// `NAME=PATH` assignments. When present they replace the configured roots.
    pub repositories: Vec<String>,
    pub csv: PathBuf,
    pub summary: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FinetuneRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub columns: ColumnMap,
    pub options: ConversionOptions,
}

// Helper function to create ConfigManager instance
fn get_config_manager(config_path: Option<&Path>) -> Result<ConfigManager> {
    match config_path {
        Some(path) => Ok(ConfigManager::new_at(path)),
        None => ConfigManager::new(),
    }
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input {}", path.display()))?;
    Ok(BufReader::new(file))
}

pub fn initialize_config(config_path: Option<&Path>) -> Result<()> {
    let config_manager = get_config_manager(config_path)?;
    let path = config_manager.get_config_path()?;
    if config_manager.initialize()? {
        println!("✓ Wrote default configuration to {}", path.display());
        println!("Add [[repositories]] entries, then run 'recipe-harvester extract --csv recipes.csv'");
    } else {
        println!("Configuration already exists at {}", path.display());
    }
    Ok(())
}

/// Prints every configuration issue and fails when there is at least one.
pub fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config_manager = get_config_manager(config_path)?;
    let issues = config_manager.validate_config()?;

    if issues.is_empty() {
        println!("{}", "✓ Configuration is valid".green().bold());
        return Ok(());
    }

    println!("{}", format!("Found {} configuration issues:", issues.len()).red().bold());
    for issue in &issues {
        println!("  └─ {issue}");
    }
    anyhow::bail!("Configuration has {} issues", issues.len())
}

/// Resolves the roots for a run: command-line assignments win over the
/// configuration file.
pub fn resolve_repositories(
    config: &ExtractorConfig,
    assignments: &[String],
) -> Result<Vec<RepositorySource>> {
    if assignments.is_empty() {
        return Ok(config.repositories.clone());
    }
    assignments
        .iter()
        .map(|assignment| RepositorySource::parse_assignment(assignment))
        .collect()
}

/// Runs extraction with an explicit configuration and writes all requested
/// outputs through `sink`.
pub fn extract_with(
    config: &ExtractorConfig,
    request: &ExtractRequest,
    sink: &mut dyn OutputSink,
) -> Result<AggregateResult> {
    let repositories = resolve_repositories(config, &request.repositories)?;
    if repositories.is_empty() {
        warn!("No repositories to scan. Add them to the configuration or pass --repo NAME=PATH");
    }

    let engine = ExtractionEngine::new(config)?;
    let result = engine.aggregate(&repositories);

    sink.write_with(&request.csv, &mut |writer: &mut dyn Write| {
        tabular::write_records(writer, &result.records)
    })
    .context("Failed to write CSV output")?;
    info!(path = %request.csv.display(), records = result.records.len(), "Wrote CSV");

    if let Some(summary_path) = &request.summary {
        let summary = ExtractionSummary::from_result(&result, &config.dataset);
        write_json(sink, summary_path, &summary).context("Failed to write summary")?;
        info!(path = %summary_path.display(), "Wrote extraction summary");
    }

    if let Some(dataset_path) = &request.dataset {
        let document = DatasetDocument::from_records(result.records.clone(), &config.dataset);
        write_json(sink, dataset_path, &document).context("Failed to write dataset")?;
        info!(path = %dataset_path.display(), "Wrote dataset document");
    }

    Ok(result)
}

pub fn extract(config_path: Option<&Path>, request: &ExtractRequest) -> Result<()> {
    let config = get_config_manager(config_path)?.load_config()?;
    let mut sink = AtomicFileSink::new();
    let result = extract_with(&config, request, &mut sink)?;

    let reporter = ConsoleReporter::new();
    reporter.report_extraction(&result);
    println!("Saved to {}", request.csv.display());
    Ok(())
}

/// Reads a tabular collection and writes the dataset document, plus a
/// training document rendered with `templates` when requested.
pub fn convert_with(
    config: &ExtractorConfig,
    input: &Path,
    output: &Path,
    training: Option<(&Path, TrainingTemplates)>,
    sink: &mut dyn OutputSink,
) -> Result<DatasetDocument> {
    let rows = tabular::read_rows(open_input(input)?, &ColumnMap::default())
        .with_context(|| format!("Failed to read {}", input.display()))?;
    debug!(rows = rows.len(), "Read tabular rows");

    if let Some((training_path, templates)) = training {
        let mut converter = TrainingConverter::new(templates, ConversionOptions::default());
        let document = TrainingDocument::new(converter.convert_rows(&rows));
        write_json(sink, training_path, &document).context("Failed to write training document")?;
        info!(
            path = %training_path.display(),
            examples = document.metadata.total_examples,
            "Wrote training document"
        );
    }

    let document = DatasetDocument::assemble(
        rows.into_iter().map(|row| row.into_record()),
        &config.dataset,
    );
    write_json(sink, output, &document).context("Failed to write dataset")?;
    info!(path = %output.display(), recipes = document.recipes.len(), "Wrote dataset document");

    Ok(document)
}

pub fn convert(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    training: Option<(&Path, TrainingTemplates)>,
) -> Result<()> {
    let config = get_config_manager(config_path)?.load_config()?;
    let mut sink = AtomicFileSink::new();
    let document = convert_with(&config, input, output, training, &mut sink)?;

    ConsoleReporter::new().report_statistics(&document.statistics);
    println!("Saved to {}", output.display());
    Ok(())
}

/// Streams a spreadsheet export into JSON Lines training examples. Returns
/// the number of rows read and examples written.
pub fn finetune_with(request: &FinetuneRequest, sink: &mut dyn OutputSink) -> Result<(usize, usize)> {
    let rows = tabular::read_rows(open_input(&request.input)?, &request.columns)
        .with_context(|| format!("Failed to read {}", request.input.display()))?;

    let mut converter = TrainingConverter::new(TrainingTemplates::expert(), request.options.clone());
    let examples = converter.convert_rows(&rows);

    sink.write_with(&request.output, &mut |writer: &mut dyn Write| {
        write_jsonl(writer, &examples)
    })
    .context("Failed to write JSONL output")?;
    info!(path = %request.output.display(), examples = examples.len(), "Wrote JSONL");

    Ok((rows.len(), examples.len()))
}

pub fn finetune(request: &FinetuneRequest) -> Result<()> {
    let mut sink = AtomicFileSink::new();
    let (rows_read, examples) = finetune_with(request, &mut sink)?;
    ConsoleReporter::new().report_training(rows_read, examples);
    Ok(())
}
