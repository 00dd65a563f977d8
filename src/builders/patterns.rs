use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;

/// The `StructuralMatcher` trait decides, from raw file text, whether a file
/// declares a recipe class.
///
/// Matching is a plain text search and never parses the source. Comments or
/// string literals that happen to contain a matching declaration are accepted,
/// and unusual formatting (a declaration split by annotations, generics on the
/// class name itself) is missed. Both are known limitations of the approach.
pub trait StructuralMatcher {
    /// Returns `true` if the text contains `class <Name> extends <Marker>`.
    fn is_recipe(&self, content: &str) -> bool;

    /// Returns the declared class name of the first matching declaration.
    fn class_name<'a>(&self, content: &'a str) -> Option<&'a str>;
}

/// Compiled text patterns for recipe sources.
///
/// One instance is built per run from the configured markers and shared by the
/// matcher and the metadata extractor, so both agree on what a recipe
/// declaration looks like.
#[derive(Debug, Clone)]
pub struct RecipePatterns {
    declaration: Regex,
    display_name: Regex,
    description: Regex,
    option: Regex,
}

impl RecipePatterns {
    /// Builds the pattern set for the given superclass markers.
    ///
    /// # Arguments
    /// * `markers`: Superclass names (e.g. `Recipe`, `ScanningRecipe`). Each is
    ///   matched literally and as a whole word.
    pub fn new(markers: &[String]) -> Result<Self> {
        let markers: Vec<String> = markers
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(regex::escape)
            .collect();
        if markers.is_empty() {
            anyhow::bail!("At least one recipe marker is required");
        }

        let declaration = format!(
            r"(?:public\s+)?(?:abstract\s+)?class\s+(\w+)\s+extends\s+(?:{})\b",
            markers.join("|")
        );

        Ok(Self {
            declaration: Regex::new(&declaration).context("Invalid recipe marker pattern")?,
            display_name: Regex::new(r#"getDisplayName\(\)\s*\{\s*return\s+"([^"]+)""#)?,
            description: Regex::new(r#"getDescription\(\)\s*\{\s*return\s+"([^"]+)""#)?,
            option: Regex::new(r"@Option\s*\([^)]+\)\s*(?:\w+\s+)*(\w+)\s+(\w+);")?,
        })
    }

    /// String literal returned by `getDisplayName()`, if any.
    pub fn display_name<'a>(&self, content: &'a str) -> Option<&'a str> {
        first_capture(&self.display_name, content)
    }

    /// String literal returned by `getDescription()`, if any.
    pub fn description<'a>(&self, content: &'a str) -> Option<&'a str> {
        first_capture(&self.description, content)
    }

    /// Collects `@Option`-annotated fields as `field name -> "<Type> field"`,
    /// in declaration order.
    ///
    /// The annotation arguments may not contain a closing parenthesis; options
    /// whose arguments do are not found.
    pub fn options(&self, content: &str) -> IndexMap<String, String> {
        self.option
            .captures_iter(content)
            .map(|caps| (caps[2].to_string(), format!("{} field", &caps[1])))
            .collect()
    }
}

impl StructuralMatcher for RecipePatterns {
    fn is_recipe(&self, content: &str) -> bool {
        self.declaration.is_match(content)
    }

    fn class_name<'a>(&self, content: &'a str) -> Option<&'a str> {
        first_capture(&self.declaration, content)
    }
}

fn first_capture<'a>(regex: &Regex, content: &'a str) -> Option<&'a str> {
    regex
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
