//! Language Processor Framework
//!
//! Each language provides a Tree-sitter grammar and a processor that maps
//! syntax nodes onto entities. The resolution engine never sees
//! language-specific syntax.

pub mod framework;
pub mod python;
pub mod go;

pub use framework::{LangProcessor, ParsedFile, ProcessorRegistry, default_registry};
pub use python::PythonProcessor;
pub use go::GoProcessor;
