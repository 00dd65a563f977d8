use colored::Colorize;
use indexmap::IndexMap;

use crate::builders::dataset::Statistics;
use crate::core::engine::{AggregateResult, RepositoryReport, RootStatus};

/// Renders run summaries for the user. Diagnostics go through `tracing`;
/// this is the human-facing result.
pub trait StatusReporter {
    fn report_extraction(&self, result: &AggregateResult);
    fn report_statistics(&self, statistics: &Statistics);
    fn report_training(&self, rows_read: usize, examples: usize);
}

/// Prints reports to standard output.
///
/// This is the reporter used by the `extract`, `convert` and `finetune`
/// commands.
pub struct ConsoleReporter;

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    /// Formats one repository line, e.g. `🟢 rewrite-spring....  12 recipes (340 files)`.
    ///
    /// 🔴: Root does not exist.
    /// 🟡: Root was scanned but yielded no recipes.
    /// 🟢: Root yielded at least one recipe.
    pub fn format_repository(&self, report: &RepositoryReport) -> String {
        match report.status {
            RootStatus::Missing => format!(
                "🔴 {:.<40} {}",
                report.name,
                format!("not found ({})", report.root.display()).red()
            ),
            RootStatus::Scanned {
                files_scanned,
                unreadable,
                recipes,
            } => {
                let icon = if recipes > 0 { "🟢" } else { "🟡" };
                let mut line = format!(
                    "{icon} {:.<40} {:>4} recipes ({files_scanned} files)",
                    report.name, recipes
                );
                if unreadable > 0 {
                    line.push_str(&format!(", {unreadable} unreadable").yellow().to_string());
                }
                line
            }
        }
    }

    fn print_counts(&self, title: &str, counts: &IndexMap<String, usize>) {
        println!("  {title}:");
        for (label, count) in counts {
            println!("    └─ {label}: {count}");
        }
    }
}

impl StatusReporter for ConsoleReporter {
    fn report_extraction(&self, result: &AggregateResult) {
        println!("📦 Recipe Extraction Report");
        println!("===========================");

        if result.reports.is_empty() {
            println!("No repositories configured.");
            return;
        }

        for report in &result.reports {
            println!("{}", self.format_repository(report));
        }

        let missing = result
            .reports
            .iter()
            .filter(|report| report.status == RootStatus::Missing)
            .count();

        println!(
            "\n{}",
            format!("✓ Extracted {} recipes", result.total_recipes())
                .green()
                .bold()
        );
        if missing > 0 {
            println!("⚠️  {missing} repositories were not found and were skipped");
        }
    }

    fn report_statistics(&self, statistics: &Statistics) {
        println!("\n📈 Statistics:");
        println!("  Total recipes: {}", statistics.total_recipes.to_string().bright_green().bold());
        println!(
            "  Source code: {} chars total, {} average",
            statistics.total_source_code_length, statistics.average_source_code_length
        );
        println!("  With descriptions: {}", statistics.recipes_with_descriptions);
        println!("  With options: {}", statistics.recipes_with_options);
        println!("  Estimated tokens: {}", statistics.estimated_total_tokens);
        self.print_counts("Recipe types", &statistics.recipe_types);
        self.print_counts("Repositories", &statistics.repositories);
    }

    fn report_training(&self, rows_read: usize, examples: usize) {
        let dropped = rows_read.saturating_sub(examples);
        println!(
            "{}",
            format!("✓ Wrote {examples} training examples from {rows_read} rows")
                .green()
                .bold()
        );
        if dropped > 0 {
            println!("  └─ {dropped} rows skipped as blank or duplicate");
        }
    }
}
