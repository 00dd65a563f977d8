use recipe_harvester::builders::dataset::DatasetDocument;
use recipe_harvester::builders::storage::AtomicFileSink;
use recipe_harvester::builders::tabular::ColumnMap;
use recipe_harvester::builders::training::ConversionOptions;
use recipe_harvester::core::config::ExtractorConfig;
use recipe_harvester::utils::{self, ExtractRequest, FinetuneRequest};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_source(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup_repositories() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let logging = dir.path().join("rewrite-logging-frameworks");
    let testing = dir.path().join("rewrite-testing-frameworks");

    write_source(
        &logging,
        "src/main/java/org/openrewrite/java/logging/ParameterizedLogging.java",
        "public class ParameterizedLogging extends Recipe {\n\
         \x20   @Override\n\
         \x20   public String getDisplayName() {\n\
         \x20       return \"Parameterize logging statements\";\n\
         \x20   }\n\
         }\n",
    );
    write_source(
        &testing,
        "src/main/java/org/openrewrite/java/testing/junit5/AssertToAssertions.java",
        "/*\n * Licensed under the Apache License.\n */\n\
         public class AssertToAssertions extends Recipe {\n\
         \x20   @Override\n\
         \x20   public String getDescription() {\n\
         \x20       return \"Change JUnit 4 assertions to JUnit Jupiter.\";\n\
         \x20   }\n\
         }\n",
    );
    write_source(
        &testing,
        "src/main/java/org/openrewrite/java/testing/Util.java",
        "final class Util {}\n",
    );
    dir
}

#[test]
fn test_core_workflow() {
    let td = setup_repositories();
    let out = td.path().join("out");

    // 1. Extract both repositories to disk.
    let request = ExtractRequest {
        repositories: vec![
            format!("logging={}", td.path().join("rewrite-logging-frameworks").display()),
            format!("testing={}", td.path().join("rewrite-testing-frameworks").display()),
            format!("missing={}", td.path().join("rewrite-missing").display()),
        ],
        csv: out.join("recipes.csv"),
        summary: Some(out.join("summary.json")),
        dataset: Some(out.join("dataset.json")),
    };
    let mut sink = AtomicFileSink::new();
    let result = utils::extract_with(&ExtractorConfig::default(), &request, &mut sink).unwrap();

    assert_eq!(result.total_recipes(), 2);
    assert_eq!(result.reports.len(), 3);
    assert_eq!(result.records[0].recipe_type, "Logging");
    assert_eq!(result.records[1].recipe_type, "Testing");
    assert_eq!(result.records[1].name, "AssertToAssertions");

    // 2. The dataset document agrees with the extraction.
    let dataset: DatasetDocument =
        serde_json::from_str(&fs::read_to_string(out.join("dataset.json")).unwrap()).unwrap();
    assert_eq!(dataset.metadata.total_recipes, 2);
    assert_eq!(dataset.statistics.repositories["logging"], 1);
    assert_eq!(dataset.statistics.repositories["testing"], 1);
    assert_eq!(dataset.statistics.recipes_with_descriptions, 1);
    for entry in &dataset.recipes {
        assert_eq!(
            entry.metadata.source_code_length,
            entry.source_code.chars().count()
        );
    }

    // 3. Fine-tune conversion over the standard columns, license stripped.
    let jsonl = out.join("train.jsonl");
    let finetune = FinetuneRequest {
        input: out.join("recipes.csv"),
        output: jsonl.clone(),
        columns: ColumnMap::default(),
        options: ConversionOptions {
            strip_license: true,
            ..ConversionOptions::default()
        },
    };
    let mut sink = AtomicFileSink::new();
    let (rows_read, examples) = utils::finetune_with(&finetune, &mut sink).unwrap();
    assert_eq!(rows_read, 2);
    assert_eq!(examples, 2);

    let lines: Vec<serde_json::Value> = fs::read_to_string(&jsonl)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    let response = lines[1]["response"].as_str().unwrap();
    // "Testing" is not a Java type label, so the fence carries no language.
    assert!(response.starts_with("```\npublic class AssertToAssertions"));
    assert!(!response.contains("Licensed under"));
    assert_eq!(lines[1]["input"], "");
}
