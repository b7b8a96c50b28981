//! Core processor framework
//!
//! Defines the traits and types that all language processors must implement.

use crate::repo::EntityRepo;
use crate::scope::{BuiltInTypes, ImportLookup, ImportLookups, QualifiedImports};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// A parsed file ready for merging
#[derive(Debug)]
pub struct ParsedFile {
    /// The file path (relative to the analyzed root)
    pub path: String,
    /// Private entity table rooted at the file entity
    pub entities: EntityRepo,
}

/// Trait for language processors
///
/// Each language processor is responsible for:
/// 1. Identifying files it can parse
/// 2. Mapping the syntax tree of one file onto entities
/// 3. Naming the types its language knows without a declaration
///
/// Processors populate a per-file repository and stop; names are resolved
/// later, over all files at once.
pub trait LangProcessor: Send + Sync {
    /// Get the language name (for display and configuration)
    fn supported_language(&self) -> &str;

    /// Get file extensions this processor handles
    fn file_suffixes(&self) -> &[&str];

    /// Types that resolve without a declaration
    fn built_in_types(&self) -> BuiltInTypes;

    /// How imports of this language bind names
    fn import_lookup(&self) -> Arc<dyn ImportLookup> {
        Arc::new(QualifiedImports)
    }

    /// Check if this processor can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.file_suffixes().contains(&ext)
        } else {
            false
        }
    }

    /// Parse a file into its own entity table
    fn parse_file(&self, path: &str, content: &str) -> Result<ParsedFile>;
}

/// Registry of language processors
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn LangProcessor>>,
}

impl ProcessorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor
    pub fn register(&mut self, processor: impl LangProcessor + 'static) {
        self.processors.push(Box::new(processor));
    }

    /// Find a processor for a file
    pub fn find_processor(&self, path: &Path) -> Option<&dyn LangProcessor> {
        self.processors
            .iter()
            .find(|p| p.can_handle(path))
            .map(|p| p.as_ref())
    }

    /// Get all registered processors
    pub fn processors(&self) -> &[Box<dyn LangProcessor>] {
        &self.processors
    }

    /// Keep only the named languages. An empty list keeps everything.
    pub fn retain_languages(&mut self, languages: &[String]) -> Result<()> {
        if languages.is_empty() {
            return Ok(());
        }
        for language in languages {
            if !self
                .processors
                .iter()
                .any(|p| p.supported_language().eq_ignore_ascii_case(language))
            {
                return Err(Error::Processor(format!("Unsupported language: {}", language)));
            }
        }
        self.processors.retain(|p| {
            languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(p.supported_language()))
        });
        Ok(())
    }

    /// Built-in types of every registered language
    pub fn built_in_types(&self) -> BuiltInTypes {
        let mut built_ins = BuiltInTypes::default();
        for processor in &self.processors {
            built_ins.extend(&processor.built_in_types());
        }
        built_ins
    }

    /// Import lookup of every registered language, keyed by suffix
    pub fn import_lookups(&self) -> ImportLookups {
        let mut lookups = ImportLookups::new();
        for processor in &self.processors {
            let lookup = processor.import_lookup();
            for suffix in processor.file_suffixes() {
                lookups.register(suffix, Arc::clone(&lookup));
            }
        }
        lookups
    }

    /// Parse a file using the appropriate processor
    pub fn parse_file(&self, path: &Path, content: &str) -> Result<Option<ParsedFile>> {
        if let Some(processor) = self.find_processor(path) {
            let rel_path = path.to_string_lossy().replace('\\', "/");
            let parsed = processor.parse_file(&rel_path, content)?;
            Ok(Some(parsed))
        } else {
            Ok(None)
        }
    }
}

/// Create a default registry with all built-in processors
pub fn default_registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    registry.register(super::python::PythonProcessor::new());
    registry.register(super::go::GoProcessor::new());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestProcessor;

    impl LangProcessor for TestProcessor {
        fn supported_language(&self) -> &str { "test" }
        fn file_suffixes(&self) -> &[&str] { &["test"] }
        fn built_in_types(&self) -> BuiltInTypes { BuiltInTypes::new(["num"]) }
        fn parse_file(&self, path: &str, _content: &str) -> Result<ParsedFile> {
            let mut entities = EntityRepo::new();
            entities.add_file(path, "");
            Ok(ParsedFile { path: path.to_string(), entities })
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = ProcessorRegistry::new();
        registry.register(TestProcessor);

        assert!(registry.find_processor(Path::new("foo.test")).is_some());
        assert!(registry.find_processor(Path::new("foo.other")).is_none());
        assert!(registry.built_in_types().contains("num"));
    }

    #[test]
    fn test_import_lookups_follow_processors() {
        let registry = default_registry();
        let lookups = registry.import_lookups();
        let import = crate::entity::Import::module("app.models", None);

        assert_eq!(lookups.for_path("app/views.py").binding_name(&import), "app");
        assert_eq!(lookups.for_path("app/stubs.pyi").binding_name(&import), "app");
        assert_eq!(lookups.for_path("main.go").binding_name(&import), "models");
    }

    #[test]
    fn test_parse_dispatches_by_suffix() {
        let mut registry = ProcessorRegistry::new();
        registry.register(TestProcessor);

        let parsed = registry.parse_file(Path::new("dir/a.test"), "").unwrap().unwrap();
        assert_eq!(parsed.path, "dir/a.test");
        assert_eq!(parsed.entities.files().len(), 1);
        assert!(registry.parse_file(Path::new("a.txt"), "").unwrap().is_none());
    }

    #[test]
    fn test_retain_languages() {
        let mut registry = default_registry();
        registry.retain_languages(&["go".to_string()]).unwrap();
        assert_eq!(registry.processors().len(), 1);
        assert!(registry.find_processor(Path::new("main.py")).is_none());

        let mut registry = default_registry();
        assert!(registry.retain_languages(&["cobol".to_string()]).is_err());
    }
}
