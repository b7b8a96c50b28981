//! Scope resolution - binding names to entities
//!
//! The entity model asks a [`Resolver`] for every name it cannot answer
//! from its own members. [`Inferer`] is the concrete resolver and also the
//! driver of the global resolution pass.

pub mod builtin;
pub mod imports;
pub mod resolver;

pub use builtin::BuiltInTypes;
pub use imports::{ImportLookup, ImportLookups, PythonImports, QualifiedImports};
pub use resolver::{Inferer, Resolver};
