/// The Big IDEA:
/// OpenRewrite repositories are full of small, well-described code
/// transformations. Each recipe class carries its own name, a description
/// and its options right in the source. Walking those trees and pulling the
/// recipes out gives a clean dataset of "task description -> implementation"
/// pairs, ready for analysis or for fine-tuning a model.
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use recipe_harvester::builders::tabular::ColumnMap;
use recipe_harvester::builders::training::{ConversionOptions, TrainingTemplates};
use recipe_harvester::utils::{self, ExtractRequest, FinetuneRequest};

#[derive(Parser)]
#[command(name = "recipe-harvester")]
#[command(about = "Extract OpenRewrite recipes from source trees into datasets")]
struct Cli {
    /// Log debug diagnostics to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateKind {
    Expert,
    Compact,
}

impl TemplateKind {
    fn templates(self) -> TrainingTemplates {
        match self {
            TemplateKind::Expert => TrainingTemplates::expert(),
            TemplateKind::Compact => TrainingTemplates::compact(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Report problems in the configuration file
    Validate {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Scan repositories and write the recipe collection
    Extract {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Repository root as NAME=PATH; replaces the configured roots
        #[arg(long = "repo", value_name = "NAME=PATH")]
        repositories: Vec<String>,
        /// CSV output path
        #[arg(long)]
        csv: PathBuf,
        /// Optional JSON extraction summary
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Optional JSON dataset document
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Convert a CSV collection into the JSON dataset document
    Convert {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Also write a training document here
        #[arg(long)]
        training: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "expert")]
        template: TemplateKind,
    },
    /// Turn a CSV export into JSON Lines instruction-tuning examples
    Finetune {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Remove a leading /* ... */ block from each source
        #[arg(long)]
        strip_license: bool,
        /// Truncate each response to this many characters
        #[arg(long)]
        max_response_chars: Option<usize>,
        #[arg(long)]
        include_options_in_instruction: bool,
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        deduplicate: bool,
        #[arg(long, default_value = "Name")]
        name_field: String,
        #[arg(long, default_value = "Description")]
        description_field: String,
        #[arg(long, default_value = "Recipe type")]
        recipe_type_field: String,
        #[arg(long, default_value = "Source code preview")]
        source_code_field: String,
        #[arg(long, default_value = "Recipe Options")]
        options_field: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { config } => utils::initialize_config(config.as_deref()),
        Commands::Validate { config } => utils::validate_config(config.as_deref()),
        Commands::Extract {
            config,
            repositories,
            csv,
            summary,
            dataset,
        } => utils::extract(
            config.as_deref(),
            &ExtractRequest {
                repositories,
                csv,
                summary,
                dataset,
            },
        ),
        Commands::Convert {
            config,
            input,
            output,
            training,
            template,
        } => utils::convert(
            config.as_deref(),
            &input,
            &output,
            training.as_deref().map(|path| (path, template.templates())),
        ),
        Commands::Finetune {
            input,
            output,
            strip_license,
            max_response_chars,
            include_options_in_instruction,
            deduplicate,
            name_field,
            description_field,
            recipe_type_field,
            source_code_field,
            options_field,
        } => utils::finetune(&FinetuneRequest {
            input,
            output,
            columns: ColumnMap {
                name: name_field,
                description: description_field,
                recipe_type: recipe_type_field,
                source_code: source_code_field,
                options: options_field,
                ..ColumnMap::streaming()
            },
            options: ConversionOptions {
                strip_license,
                max_response_chars,
                include_options_in_instruction,
                deduplicate,
            },
        }),
    }
}
