// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. These modules hold the per-file extraction logic and everything
// that turns extracted records into output documents.

// `classifier` module:
// Holds the ordered, first-match-wins rule list that assigns a category
// label (`Migration`, `Spring`, `Testing`, ...) to each recipe from its
// content and file path. The rules are plain data so they can be overridden
// from the configuration file.
pub mod classifier;

// `dataset` module:
// Assembles the normalized dataset document (metadata, statistics and one
// entry per recipe) and the per-run extraction summary. Statistics are always
// recomputed from the entries.
pub mod dataset;

// `extractor` module:
// Defines `ExtractedRecord`, the unit every later stage works with, and the
// `MetadataExtractor` that reads one source file and pulls out the class
// name, display name, description and options of a recipe class.
pub mod extractor;

// `patterns` module:
// This is a fundamental module that defines the regular expressions used to
// recognize recipe classes (`StructuralMatcher`) and to locate the metadata
// methods and `@Option` fields inside them.
pub mod patterns;

// `reporter` module:
// This module is responsible for generating human-readable reports. It
// defines a `StatusReporter` trait and its `ConsoleReporter` implementation,
// which prints per-repository counts and dataset statistics.
pub mod reporter;

// `storage` module:
// Provides the `OutputSink` abstraction used for every output file.
// `AtomicFileSink` writes through a temporary file that is renamed into
// place, `MemorySink` keeps outputs in memory for tests.
pub mod storage;

// `tabular` module:
// Reads and writes the flat CSV form of the recipe collection, including the
// description row written under the header and the configurable column map
// used by the fine-tuning converter.
pub mod tabular;

// `training` module:
// Converts recipe rows into instruction/response pairs for model
// fine-tuning: whitespace normalization, optional license stripping,
// response truncation, templating and deduplication.
pub mod training;

// `validator` module:
// This module is dedicated to ensuring the integrity and correctness of
// the configuration. It defines the `ConfigValidator` trait and a
// `StandardValidator` implementation that checks scan settings, repository
// roots and classifier rules.
pub mod validator;
