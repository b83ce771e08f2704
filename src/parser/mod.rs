//
//  mod.rs
//  RouteLinter
//

//! Syntax layer: turns a [`SourceUnit`] into a tree-sitter tree.
//!
//! This is the "language-source parser" collaborator. The extractors only
//! ever see [`ParsedUnit`]s.

pub mod helpers;
pub mod language;

pub use language::SupportedLanguage;

use std::path::{Path, PathBuf};

use tree_sitter::{Parser, Tree};

use crate::error::{LintError, Result};
use crate::model::{Diagnostic, DiagnosticKind, SourceLocation};

/// One source file as handed over by the traversal collaborator.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A source unit together with its syntax tree.
pub struct ParsedUnit<'a> {
    pub unit: &'a SourceUnit,
    pub language: SupportedLanguage,
    pub tree: Tree,
}

impl ParsedUnit<'_> {
    pub fn source(&self) -> &[u8] {
        self.unit.text.as_bytes()
    }

    pub fn path(&self) -> &Path {
        &self.unit.path
    }
}

/// Result of parsing one unit: a tree, or a reason it was skipped.
pub enum ParseOutcome<'a> {
    Parsed(ParsedUnit<'a>),
    Skipped(Diagnostic),
}

/// Parse a source unit.
///
/// Unsupported languages and missing trees are parse-local and come back as
/// [`ParseOutcome::Skipped`]. A grammar that can't be loaded is structural.
pub fn parse_unit(unit: &SourceUnit) -> Result<ParseOutcome<'_>> {
    let file_location = SourceLocation::new(unit.path.clone(), 1, 1);

    let Some(language) = SupportedLanguage::from_path(&unit.path) else {
        return Ok(ParseOutcome::Skipped(Diagnostic::new(
            DiagnosticKind::UnsupportedLanguage,
            file_location,
            "unsupported source language",
        )));
    };

    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| LintError::ParserInit(unit.path.clone(), e.to_string()))?;

    match parser.parse(&unit.text, None) {
        Some(tree) => Ok(ParseOutcome::Parsed(ParsedUnit {
            unit,
            language,
            tree,
        })),
        None => Ok(ParseOutcome::Skipped(Diagnostic::new(
            DiagnosticKind::ParseFailed,
            file_location,
            format!("{language} parser produced no tree"),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_javascript_unit() {
        let unit = SourceUnit::new("routes.js", "app.get('/api/users', handler);");
        match parse_unit(&unit).unwrap() {
            ParseOutcome::Parsed(parsed) => {
                assert_eq!(parsed.language, SupportedLanguage::JavaScript);
                assert_eq!(parsed.tree.root_node().kind(), "program");
            }
            ParseOutcome::Skipped(d) => panic!("unexpected skip: {}", d.message),
        }
    }

    #[test]
    fn test_unsupported_language_is_skipped() {
        let unit = SourceUnit::new("routes.py", "@app.get('/x')");
        match parse_unit(&unit).unwrap() {
            ParseOutcome::Skipped(d) => assert_eq!(d.kind, DiagnosticKind::UnsupportedLanguage),
            ParseOutcome::Parsed(_) => panic!("python should not parse"),
        }
    }
}
