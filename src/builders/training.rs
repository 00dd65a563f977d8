use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;

use crate::builders::tabular::TabularRow;

/// Appended to a response cut down to its character budget.
pub const TRUNCATION_MARKER: &str = "\n\n<<TRUNCATED>>";
pub const NO_SOURCE_PLACEHOLDER: &str = "<NO SOURCE PROVIDED>";

/// Normalizes line endings and blank lines.
///
/// CRLF and lone CR become LF, trailing whitespace is removed from every
/// line, runs of more than two blank lines shrink to two, and the result is
/// trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();
    let mut blank_run = 0;

    for line in text.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
        } else {
            blank_run = 0;
        }
        if blank_run <= 2 {
            lines.push(line);
        }
    }

    lines.join("\n").trim().to_string()
}

/// Removes one `/* ... */` block if it opens at the very start of the text,
/// together with the whitespace that follows it. Anything else is returned
/// unchanged.
pub fn strip_license_header(code: &str) -> String {
    code.strip_prefix("/*")
        .and_then(|body| body.find("*/").map(|close| body[close + 2..].trim_start()))
        .unwrap_or(code)
        .to_string()
}

/// Cuts `text` to at most `max_chars` characters and appends
/// [`TRUNCATION_MARKER`]. Text within budget is returned unchanged.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{}", text[..cut].trim_end(), TRUNCATION_MARKER),
    }
}

/// Wording used to render training examples.
///
/// Templates use `{placeholder}` substitution with: `name`, `recipe_type`,
/// `description`, `description_lower`, `lang`, `code` and `options`. Unknown
/// placeholders are left as written.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrainingTemplates {
    pub instruction: String,
    /// Appended to the instruction when options guidance is requested.
    pub options_guidance: String,
    pub input: String,
    pub response: String,
}

impl Default for TrainingTemplates {
    fn default() -> Self {
        Self::expert()
    }
}

impl TrainingTemplates {
    /// Detailed task prompt with a fenced code response and an options block.
    pub fn expert() -> Self {
        Self {
            instruction: "You were given a task to implement an automated OpenRewrite recipe.\n\n\
                          Task name: {name}\n\
                          Language / Type: {recipe_type}\n\
                          Description: {description}\n\n\
                          Produce the complete implementation/code for this recipe."
                .to_string(),
            options_guidance: "\n\nDo not include any personal commentary. The expected output \
                               should be the code and the recipe options exactly as they appear \
                               in the response field."
                .to_string(),
            input: String::new(),
            response: "```{lang}\n{code}\n```\n\nRecipe Options:\n{options}".to_string(),
        }
    }

    /// Short prompt built from the description, answering with the bare source.
    pub fn compact() -> Self {
        Self {
            instruction: "Create a recipe that {description_lower}".to_string(),
            options_guidance: String::new(),
            input: "Recipe type: {recipe_type}".to_string(),
            response: "{code}".to_string(),
        }
    }
}

/// Single-pass `{key}` substitution. Substituted values are never rescanned.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Per-run switches for the training converter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    pub strip_license: bool,
    pub max_response_chars: Option<usize>,
    pub include_options_in_instruction: bool,
    pub deduplicate: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            strip_license: false,
            max_response_chars: None,
            include_options_in_instruction: false,
            deduplicate: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct TrainingExample {
    pub instruction: String,
    pub input: String,
    pub response: String,
}

/// Borrowed view of the fields a training example is built from.
#[derive(Debug, Clone, Copy)]
pub struct TrainingSource<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub recipe_type: &'a str,
    pub source_code: &'a str,
    pub options: &'a str,
}

impl<'a> TrainingSource<'a> {
    pub fn from_row(row: &'a TabularRow) -> Self {
        Self {
            name: row.name.trim(),
            description: &row.description,
            recipe_type: &row.recipe_type,
            source_code: &row.source_code,
            options: &row.options_text,
        }
    }

    /// Rows whose name, description and source are all blank carry nothing
    /// to learn from.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            && self.description.trim().is_empty()
            && self.source_code.trim().is_empty()
    }
}

/// Turns recipe rows into instruction/response pairs.
///
/// The converter owns the set of pairs already emitted, so one instance must
/// be used for a whole output file when deduplication is on.
pub struct TrainingConverter {
    templates: TrainingTemplates,
    options: ConversionOptions,
    seen: HashSet<(String, String)>,
}

impl TrainingConverter {
    pub fn new(templates: TrainingTemplates, options: ConversionOptions) -> Self {
        Self {
            templates,
            options,
            seen: HashSet::new(),
        }
    }

    /// Renders one example without touching the dedup state.
    pub fn build_example(&self, source: &TrainingSource<'_>) -> TrainingExample {
        let name = normalize_whitespace(source.name);
        let description = normalize_whitespace(source.description);
        let recipe_type = if source.recipe_type.is_empty() {
            "unknown"
        } else {
            source.recipe_type.trim()
        };

        let code = if self.options.strip_license {
            strip_license_header(source.source_code)
        } else {
            source.source_code.to_string()
        };
        let code = normalize_whitespace(&code);
        let code = if code.is_empty() {
            NO_SOURCE_PLACEHOLDER.to_string()
        } else {
            code
        };
        let lang = if recipe_type.to_lowercase().contains("java") {
            "java"
        } else {
            ""
        };
        let options = normalize_whitespace(source.options);
        let description_lower = description.to_lowercase();

        let values = [
            ("name", name.as_str()),
            ("recipe_type", recipe_type),
            ("description", description.as_str()),
            ("description_lower", description_lower.as_str()),
            ("lang", lang),
            ("code", code.as_str()),
            ("options", options.as_str()),
        ];

        let mut instruction = render(&self.templates.instruction, &values);
        if self.options.include_options_in_instruction {
            instruction.push_str(&render(&self.templates.options_guidance, &values));
        }

        let mut response = render(&self.templates.response, &values);
        if let Some(max_chars) = self.options.max_response_chars {
            response = truncate_with_marker(&response, max_chars);
        }

        TrainingExample {
            instruction,
            input: render(&self.templates.input, &values),
            response,
        }
    }

    /// Builds the example for `source` and returns it unless it is blank or,
    /// with deduplication on, an exact repeat of an earlier pair.
    pub fn push(&mut self, source: &TrainingSource<'_>) -> Option<TrainingExample> {
        if source.is_blank() {
            return None;
        }

        let example = self.build_example(source);
        if self.options.deduplicate {
            let key = (example.instruction.clone(), example.response.clone());
            if !self.seen.insert(key) {
                return None;
            }
        }
        Some(example)
    }

    pub fn convert_rows(&mut self, rows: &[TabularRow]) -> Vec<TrainingExample> {
        rows.iter()
            .filter_map(|row| self.push(&TrainingSource::from_row(row)))
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingMetadata {
    pub format: String,
    pub description: String,
    pub total_examples: usize,
}

/// Whole-file training output.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrainingDocument {
    pub metadata: TrainingMetadata,
    pub data: Vec<TrainingExample>,
}

impl TrainingDocument {
    pub fn new(data: Vec<TrainingExample>) -> Self {
        Self {
            metadata: TrainingMetadata {
                format: "instruction_tuning".to_string(),
                description: "OpenRewrite recipes formatted for LLM fine-tuning".to_string(),
                total_examples: data.len(),
            },
            data,
        }
    }
}

/// Writes one JSON object per line.
pub fn write_jsonl<W: Write>(mut writer: W, examples: &[TrainingExample]) -> Result<()> {
    for example in examples {
        serde_json::to_writer(&mut writer, example).context("Failed to serialize example")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source<'a>(name: &'a str, code: &'a str) -> TrainingSource<'a> {
        TrainingSource {
            name,
            description: "Adds a thing.",
            recipe_type: "Java",
            source_code: code,
            options: "{}",
        }
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("a  \r\nb\t\rc"), "a\nb\nc");
        assert_eq!(normalize_whitespace("a\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(normalize_whitespace("a\n\n\nb"), "a\n\n\nb");
        assert_eq!(normalize_whitespace("\n\n  x  \n\n"), "x");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_strip_license_header() {
        assert_eq!(strip_license_header("/* lic */\nfoo();"), "foo();");
        assert_eq!(strip_license_header("foo(); /* lic */"), "foo(); /* lic */");
        assert_eq!(
            strip_license_header("/*\n * Copyright\n */\n/* second */\nfoo();"),
            "/* second */\nfoo();"
        );
        assert_eq!(strip_license_header("/* never closed\nfoo();"), "/* never closed\nfoo();");
        assert_eq!(strip_license_header(""), "");
    }

    #[test]
    fn test_truncation_bounds() {
        let text = "abcdefghij";
        let truncated = truncate_with_marker(text, 4);
        assert_eq!(truncated, "abcd\n\n<<TRUNCATED>>");
        assert!(truncated.chars().count() <= 4 + TRUNCATION_MARKER.chars().count());
        assert!(truncated.ends_with("<<TRUNCATED>>"));

        assert_eq!(truncate_with_marker(text, 10), text);
        assert_eq!(truncate_with_marker(text, 50), text);
        assert_eq!(truncate_with_marker("héllo", 2), "hé\n\n<<TRUNCATED>>");
    }

    #[test]
    fn test_render_is_single_pass() {
        let rendered = render(
            "{name} / {missing} / {",
            &[("name", "{name}"), ("other", "x")],
        );
        assert_eq!(rendered, "{name} / {missing} / {");
    }

    #[test]
    fn test_expert_example() {
        let converter =
            TrainingConverter::new(TrainingTemplates::expert(), ConversionOptions::default());
        let example = converter.build_example(&TrainingSource {
            name: "Add  thing ",
            description: "Adds a thing.\r\n",
            recipe_type: "Java",
            source_code: "/* lic */\nclass A {}   \n",
            options: "{\n  \"x\": \"String field\"\n}",
        });

        assert!(example.instruction.contains("Task name: Add  thing\n"));
        assert!(example.instruction.contains("Language / Type: Java\n"));
        assert!(example.instruction.ends_with("Produce the complete implementation/code for this recipe."));
        assert_eq!(example.input, "");
        assert_eq!(
            example.response,
            "```java\n/* lic */\nclass A {}\n```\n\nRecipe Options:\n{\n  \"x\": \"String field\"\n}"
        );
    }

    #[test]
    fn test_options_and_flags() {
        let converter = TrainingConverter::new(
            TrainingTemplates::expert(),
            ConversionOptions {
                strip_license: true,
                max_response_chars: Some(12),
                include_options_in_instruction: true,
                deduplicate: true,
            },
        );
        let example = converter.build_example(&source("A", "/* lic */\nclass A {}"));

        assert!(example.instruction.ends_with("exactly as they appear in the response field."));
        assert_eq!(example.response, "```java\nclas\n\n<<TRUNCATED>>");
    }

    #[test]
    fn test_missing_source_and_unknown_type() {
        let converter =
            TrainingConverter::new(TrainingTemplates::expert(), ConversionOptions::default());
        let example = converter.build_example(&TrainingSource {
            name: "A",
            description: "",
            recipe_type: "",
            source_code: "   ",
            options: "",
        });
        assert!(example.instruction.contains("Language / Type: unknown"));
        assert_eq!(
            example.response,
            "```\n<NO SOURCE PROVIDED>\n```\n\nRecipe Options:\n"
        );
    }

    #[test]
    fn test_deduplication_is_exact_and_ordered() {
        let mut converter =
            TrainingConverter::new(TrainingTemplates::expert(), ConversionOptions::default());

        let first = converter.push(&source("A", "class A {}"));
        let repeat = converter.push(&source("A", "class A {}"));
        let differs = converter.push(&source("A", "class A {};"));
        let second = converter.push(&source("B", "class A {}"));

        assert!(first.is_some());
        assert!(repeat.is_none());
        assert!(differs.is_some());
        assert!(second.is_some());
    }

    #[test]
    fn test_deduplication_can_be_disabled() {
        let mut converter = TrainingConverter::new(
            TrainingTemplates::expert(),
            ConversionOptions {
                deduplicate: false,
                ..ConversionOptions::default()
            },
        );
        assert!(converter.push(&source("A", "x")).is_some());
        assert!(converter.push(&source("A", "x")).is_some());
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let mut converter =
            TrainingConverter::new(TrainingTemplates::expert(), ConversionOptions::default());
        let blank = TrainingSource {
            name: " ",
            description: "",
            recipe_type: "Java",
            source_code: "\n",
            options: "{\"a\": \"b\"}",
        };
        assert!(converter.push(&blank).is_none());
    }

    #[test]
    fn test_compact_templates() {
        let converter =
            TrainingConverter::new(TrainingTemplates::compact(), ConversionOptions::default());
        let example = converter.build_example(&TrainingSource {
            name: "A",
            description: "Removes Unused Imports.",
            recipe_type: "Java",
            source_code: "class A {}",
            options: "{}",
        });
        assert_eq!(example.instruction, "Create a recipe that removes unused imports.");
        assert_eq!(example.input, "Recipe type: Java");
        assert_eq!(example.response, "class A {}");
    }

    #[test]
    fn test_jsonl_and_document_shapes() {
        let example = TrainingExample {
            instruction: "i".to_string(),
            input: String::new(),
            response: "r\nline".to_string(),
        };
        let mut buffer = Vec::new();
        write_jsonl(&mut buffer, &[example.clone(), example.clone()]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"instruction":"i","input":"","response":"r\nline"}"#);

        let document = serde_json::to_value(TrainingDocument::new(vec![example])).unwrap();
        assert_eq!(document["metadata"]["format"], "instruction_tuning");
        assert_eq!(document["metadata"]["totalExamples"], 1);
        assert_eq!(document["data"][0]["response"], "r\nline");
    }
}
