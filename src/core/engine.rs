use crate::builders::classifier::Classifier;
use crate::builders::extractor::{ExtractedRecord, FileOutcome, MetadataExtractor, SkipReason};
use crate::builders::patterns::RecipePatterns;
use crate::core::config::{ExtractorConfig, RepositorySource};
use crate::core::walker::TreeWalker;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one configured source root.
#[derive(Debug, Clone, PartialEq)]
pub enum RootStatus {
    Scanned {
        files_scanned: usize,
        unreadable: usize,
        recipes: usize,
    },
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryReport {
    pub name: String,
    pub root: PathBuf,
    pub status: RootStatus,
}

impl RepositoryReport {
    pub fn recipe_count(&self) -> usize {
        match self.status {
            RootStatus::Scanned { recipes, .. } => recipes,
            RootStatus::Missing => 0,
        }
    }
}

/// Records from every root, in root order, plus one report per root.
#[derive(Debug, Clone, Default)]
pub struct AggregateResult {
    pub records: Vec<ExtractedRecord>,
    pub reports: Vec<RepositoryReport>,
}

impl AggregateResult {
    pub fn total_recipes(&self) -> usize {
        self.records.len()
    }
}

/// Drives walk -> match -> extract -> classify over a list of named roots.
pub struct ExtractionEngine {
    walker: TreeWalker,
    extractor: MetadataExtractor,
    classifier: Classifier,
}

impl ExtractionEngine {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let patterns = RecipePatterns::new(&config.scan.markers)?;
        Ok(Self {
            walker: TreeWalker::new(&config.scan),
            extractor: MetadataExtractor::new(patterns),
            classifier: config.classifier.clone(),
        })
    }

    /// Extracts and classifies a single file. The record is left untagged.
    pub fn process_file(&self, path: &Path) -> FileOutcome {
        match self.extractor.extract_file(path) {
            FileOutcome::Extracted(record) => {
                let label = self.classifier.classify(&record.source_code, &record.file_path);
                let label = label.to_string();
                FileOutcome::Extracted(record.classified(&label))
            }
            skipped => skipped,
        }
    }

    /// Scans one root and tags every record with `repository`.
    pub fn scan_root(&self, root: &Path, repository: &str) -> (Vec<ExtractedRecord>, RootStatus) {
        let mut records = Vec::new();
        let mut files_scanned = 0;
        let mut unreadable = 0;

        for path in self.walker.walk(root) {
            files_scanned += 1;
            match self.process_file(&path) {
                FileOutcome::Extracted(record) => {
                    debug!(path = %path.display(), name = %record.name, "Extracted recipe");
                    records.push(record.tagged(repository));
                }
                FileOutcome::Skipped(SkipReason::Unreadable(_)) => unreadable += 1,
                FileOutcome::Skipped(SkipReason::NotARecipe) => {}
            }
        }

        let status = RootStatus::Scanned {
            files_scanned,
            unreadable,
            recipes: records.len(),
        };
        (records, status)
    }

    /// Runs every source in order and concatenates their records.
    ///
    /// A root that does not exist is reported as [`RootStatus::Missing`] and
    /// contributes nothing; the remaining roots are still processed.
    pub fn aggregate(&self, sources: &[RepositorySource]) -> AggregateResult {
        let mut result = AggregateResult::default();

        for source in sources {
            if !source.path.exists() {
                warn!(
                    repository = %source.name,
                    path = %source.path.display(),
                    "Repository not found, skipping"
                );
                result.reports.push(RepositoryReport {
                    name: source.name.clone(),
                    root: source.path.clone(),
                    status: RootStatus::Missing,
                });
                continue;
            }

            info!(repository = %source.name, path = %source.path.display(), "Scanning repository");
            let (records, status) = self.scan_root(&source.path, &source.name);
            info!(repository = %source.name, recipes = records.len(), "Finished repository");

            result.records.extend(records);
            result.reports.push(RepositoryReport {
                name: source.name.clone(),
                root: source.path.clone(),
                status,
            });
        }

        result
    }
}
